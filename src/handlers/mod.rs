pub mod auth;
pub mod bom;
pub mod brands;
pub mod common;
pub mod components;
pub mod csv;
pub mod locations;
pub mod lots;
pub mod reports;
pub mod settings;
pub mod skus;
pub mod transactions;
pub mod users;

use axum::Router;

use crate::AppState;

/// The full v1 API surface, nested under `/api/v1` by the caller.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/brands", brands::brand_routes())
        .nest("/components", components::component_routes())
        .nest("/locations", locations::location_routes())
        .nest("/lots", lots::lot_routes())
        .nest("/skus", skus::sku_routes())
        .nest("/bom-versions", bom::bom_routes())
        .nest("/transactions", transactions::transaction_routes())
        .nest("/csv", csv::csv_routes())
        .nest("/reports", reports::report_routes())
        .nest("/settings", settings::settings_routes())
        .nest("/users", users::user_routes())
}
