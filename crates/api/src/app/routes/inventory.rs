use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use durian_core::VariationId;
use durian_inventory::RecordPurchase;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/lots", post(record_purchase).get(list_lots))
        .route("/stock/:variation_id", get(stock_summary))
}

pub async fn record_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RecordPurchaseRequest>,
) -> axum::response::Response {
    let variation_id: VariationId = match dto::parse_id(&body.variation_id, "variation_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let purchase = RecordPurchase {
        variation_id,
        weight_kg: body.weight_kg,
        cost_per_kg: body.cost_per_kg,
        received_at: body.received_at.unwrap_or_else(Utc::now),
    };

    match services.record_purchase(purchase).await {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_lots(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LotsQuery>,
) -> axum::response::Response {
    let variation_id: Option<VariationId> = match query.variation_id.as_deref() {
        Some(raw) => match dto::parse_id(raw, "variation_id") {
            Ok(v) => Some(v),
            Err(resp) => return resp,
        },
        None => None,
    };

    match services.list_lots(variation_id).await {
        Ok(lots) => Json(lots).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn stock_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Path(variation_id): Path<String>,
) -> axum::response::Response {
    let variation_id: VariationId = match dto::parse_id(&variation_id, "variation id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stock_summary(variation_id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
