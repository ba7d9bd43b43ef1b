use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{map_service_error, success_response, PaginatedResponse, PaginationParams};
use crate::auth::AuthenticatedUser;
use crate::errors::ApiError;
use crate::AppState;

pub fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_lots))
        .route("/:id", get(get_lot))
}

#[derive(Debug, Deserialize)]
pub struct LotListQuery {
    pub component_id: Uuid,
}

async fn list_lots(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<LotListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = pagination.page;
    let per_page = pagination.per_page;
    let (lots, total) = state
        .services
        .lots
        .list_for_component(user.company_id, query.component_id, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        lots, page, per_page, total,
    )))
}

async fn get_lot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let lot = state
        .services
        .lots
        .get(user.company_id, lot_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(lot))
}
