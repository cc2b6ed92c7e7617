use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(dashboard))
}

/// Overall profit plus totals per (species, purchased-as, sold-as).
pub async fn dashboard(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.dashboard().await {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
