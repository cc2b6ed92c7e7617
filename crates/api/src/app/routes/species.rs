use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(create_species).get(list_species))
}

pub async fn create_species(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateSpeciesRequest>,
) -> axum::response::Response {
    match services.create_species(&body.name).await {
        Ok(species) => (StatusCode::CREATED, Json(species)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_species(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.list_species().await {
        Ok(species) => Json(species).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
