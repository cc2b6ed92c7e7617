use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use durian_core::VariationId;
use durian_sales::RecordSale;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(record_sale).get(list_sales))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RecordSaleRequest>,
) -> axum::response::Response {
    let purchase_variation_id: VariationId =
        match dto::parse_id(&body.purchase_variation_id, "purchase_variation_id") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
    let sold_variation_id: VariationId = match dto::parse_id(&body.sold_variation_id, "sold_variation_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let command = RecordSale {
        purchase_variation_id,
        sold_variation_id,
        weight_kg: body.weight_kg,
        sale_price_per_kg: body.sale_price_per_kg,
    };

    match services.record_sale(command).await {
        Ok(recorded) => (
            StatusCode::CREATED,
            Json(dto::RecordedSaleResponse::from(&recorded)),
        )
            .into_response(),
        Err(e) => errors::sale_error_to_response(e),
    }
}

/// Newest first.
pub async fn list_sales(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.list_sales().await {
        Ok(sales) => Json(sales.iter().map(dto::SaleView::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
