use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

use super::common::{map_service_error, success_response};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::AppState;

pub fn bom_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_bom_version))
        .route("/:id/activate", post(activate_bom_version))
}

async fn get_bom_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(version_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .bom
        .get_version(user.company_id, version_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(detail))
}

/// Activate a draft version; the previously active version of the same SKU
/// is superseded in the same database transaction. Responds with the
/// recomputed unit cost and line costs.
async fn activate_bom_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(version_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;

    let detail = state
        .services
        .bom
        .activate(user.company_id, version_id)
        .await
        .map_err(map_service_error)?;

    info!(bom_version_id = %version_id, version = detail.version_number, "BOM version activated");
    Ok(success_response(detail))
}
