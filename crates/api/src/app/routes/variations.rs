use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use durian_core::SpeciesId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(create_variation).get(list_variations))
}

pub async fn create_variation(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateVariationRequest>,
) -> axum::response::Response {
    let species_id: SpeciesId = match dto::parse_id(&body.species_id, "species_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.create_variation(species_id, &body.name).await {
        Ok(variation) => (StatusCode::CREATED, Json(variation)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_variations(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.list_variations().await {
        Ok(variations) => Json(variations).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
