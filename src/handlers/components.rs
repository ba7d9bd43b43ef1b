use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::services::components::{CreateComponentInput, UpdateComponentInput};
use crate::services::reorder::ReorderStatus;
use crate::AppState;

pub fn component_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_component))
        .route("/", get(list_components))
        .route("/:id", get(get_component))
        .route("/:id", put(update_component))
        .route("/:id", delete(deactivate_component))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComponentRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    #[serde(default)]
    pub cost_per_unit: Decimal,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub lead_time_days: i32,
    #[serde(default)]
    pub lot_tracked: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateComponentRequest {
    pub name: Option<String>,
    pub unit_of_measure: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub reorder_point: Option<i64>,
    pub lead_time_days: Option<i32>,
    pub lot_tracked: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentFilterQuery {
    pub reorder_status: Option<String>,
}

async fn create_component(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateComponentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let created = state
        .services
        .components
        .create(
            user.company_id,
            CreateComponentInput {
                code: payload.code,
                name: payload.name,
                unit_of_measure: payload.unit_of_measure,
                cost_per_unit: payload.cost_per_unit,
                reorder_point: payload.reorder_point,
                lead_time_days: payload.lead_time_days,
                lot_tracked: payload.lot_tracked,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(component_id = %created.id, code = %created.code, "component created");
    Ok(created_response(created))
}

async fn list_components(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ComponentFilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status_filter = match filter.reorder_status.as_deref() {
        None => None,
        Some(raw) => Some(ReorderStatus::from_str(raw).ok_or_else(|| {
            ApiError::Validation(format!("unknown reorder_status {raw:?}"))
        })?),
    };

    let page = pagination.page;
    let per_page = pagination.per_page;
    let (items, total) = state
        .services
        .components
        .list(user.company_id, status_filter, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

async fn get_component(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(component_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .components
        .get(user.company_id, component_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(detail))
}

async fn update_component(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(component_id): Path<Uuid>,
    Json(payload): Json<UpdateComponentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let updated = state
        .services
        .components
        .update(
            user.company_id,
            component_id,
            UpdateComponentInput {
                name: payload.name,
                unit_of_measure: payload.unit_of_measure,
                cost_per_unit: payload.cost_per_unit,
                reorder_point: payload.reorder_point,
                lead_time_days: payload.lead_time_days,
                lot_tracked: payload.lot_tracked,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(component_id = %component_id, "component updated");
    Ok(success_response(updated))
}

async fn deactivate_component(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(component_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;

    let deactivated = state
        .services
        .components
        .deactivate(user.company_id, component_id)
        .await
        .map_err(map_service_error)?;

    info!(component_id = %component_id, "component deactivated");
    Ok(success_response(deactivated))
}
