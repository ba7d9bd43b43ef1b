use axum::{extract::State, response::IntoResponse, routing::get, routing::post, Router};
use tracing::info;

use super::common::{map_service_error, success_response};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::AppState;

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reorder", get(reorder_report))
        .route("/rebuild-balances", post(rebuild_balances))
}

/// Every active component with derived on-hand, reorder status and runout
/// forecast.
async fn reorder_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .components
        .reorder_report(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}

/// Replay the tenant's ledger into the materialized balance table. The
/// ledger is the source of truth; this restores the snapshot after drift.
async fn rebuild_balances(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;

    let rebuilt = state
        .services
        .ledger
        .rebuild(user.company_id)
        .await
        .map_err(map_service_error)?;

    info!(company_id = %user.company_id, rebuilt, "stock balances rebuilt");
    Ok(success_response(serde_json::json!({ "balances": rebuilt })))
}
