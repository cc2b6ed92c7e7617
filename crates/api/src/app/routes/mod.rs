use axum::Router;

pub mod dashboard;
pub mod inventory;
pub mod sales;
pub mod species;
pub mod system;
pub mod variations;

/// Router for all ledger endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/species", species::router())
        .nest("/variations", variations::router())
        .nest("/inventory", inventory::router())
        .nest("/sales", sales::router())
        .nest("/dashboard", dashboard::router())
}
