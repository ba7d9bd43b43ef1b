use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
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
use crate::services::bom::NewBomLine;
use crate::services::skus::{CreateSkuInput, UpdateSkuInput};
use crate::AppState;

pub fn sku_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sku))
        .route("/", get(list_skus))
        .route("/:id", get(get_sku))
        .route("/:id", put(update_sku))
        .route("/:id/lot-availability", get(lot_availability))
        .route("/:id/bom-versions", get(list_bom_versions))
        .route("/:id/bom-versions", post(create_bom_version))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSkuRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    pub brand_id: Option<Uuid>,
    pub finished_component_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSkuRequest {
    pub name: Option<String>,
    /// Absent leaves the brand untouched; an explicit null clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub brand_id: Option<Option<Uuid>>,
    /// Absent leaves the finished component untouched; an explicit null
    /// clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub finished_component_id: Option<Option<Uuid>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBomVersionRequest {
    #[validate(length(min = 1))]
    pub lines: Vec<BomVersionLineRequest>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BomVersionLineRequest {
    pub component_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_per_unit: i64,
}

#[derive(Debug, Deserialize)]
pub struct LotAvailabilityQuery {
    pub units: i64,
}

async fn create_sku(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateSkuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let created = state
        .services
        .skus
        .create(
            user.company_id,
            CreateSkuInput {
                code: payload.code,
                name: payload.name,
                brand_id: payload.brand_id,
                finished_component_id: payload.finished_component_id,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(sku_id = %created.id, code = %created.code, "SKU created");
    Ok(created_response(created))
}

async fn list_skus(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (items, total) = state
        .services
        .skus
        .list(user.company_id, pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

async fn get_sku(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sku_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sku = state
        .services
        .skus
        .get(user.company_id, sku_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(sku))
}

async fn update_sku(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sku_id): Path<Uuid>,
    Json(payload): Json<UpdateSkuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let updated = state
        .services
        .skus
        .update(
            user.company_id,
            sku_id,
            UpdateSkuInput {
                name: payload.name,
                brand_id: payload.brand_id,
                finished_component_id: payload.finished_component_id,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(sku_id = %sku_id, "SKU updated");
    Ok(success_response(updated))
}

/// BOM availability check plus FIFO lot preview for a prospective build.
async fn lot_availability(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sku_id): Path<Uuid>,
    Query(query): Query<LotAvailabilityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.units <= 0 {
        return Err(ApiError::Validation("units must be positive".to_string()));
    }

    let preview = state
        .services
        .skus
        .lot_availability(user.company_id, sku_id, query.units)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(preview))
}

async fn list_bom_versions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sku_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let versions = state
        .services
        .bom
        .list_for_sku(user.company_id, sku_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(versions))
}

async fn create_bom_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sku_id): Path<Uuid>,
    Json(payload): Json<CreateBomVersionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let lines = payload
        .lines
        .into_iter()
        .map(|line| NewBomLine {
            component_id: line.component_id,
            quantity_per_unit: line.quantity_per_unit,
        })
        .collect();

    let detail = state
        .services
        .bom
        .create_version(user.company_id, sku_id, lines)
        .await
        .map_err(map_service_error)?;

    info!(sku_id = %sku_id, bom_version_id = %detail.id, "BOM version drafted");
    Ok(created_response(detail))
}
