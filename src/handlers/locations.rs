use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::auth::AuthenticatedUser;
use crate::entities::location::LocationKind;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::services::locations::{CreateLocationInput, UpdateLocationInput};
use crate::AppState;

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_location))
        .route("/", get(list_locations))
        .route("/:id", get(get_location))
        .route("/:id", put(update_location))
        .route("/:id", delete(deactivate_location))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub is_default: Option<bool>,
}

fn parse_kind(raw: &str) -> Result<LocationKind, ApiError> {
    LocationKind::from_str(raw)
        .ok_or_else(|| ApiError::Validation(format!("unknown location kind {raw:?}")))
}

async fn create_location(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let kind = parse_kind(&payload.kind)?;
    let created = state
        .services
        .locations
        .create(
            user.company_id,
            CreateLocationInput {
                name: payload.name,
                kind,
                is_default: payload.is_default,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(location_id = %created.id, name = %created.name, "location created");
    Ok(created_response(created))
}

async fn list_locations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let locations = state
        .services
        .locations
        .list(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(locations))
}

async fn get_location(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(location_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state
        .services
        .locations
        .get(user.company_id, location_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(location))
}

async fn update_location(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(location_id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let kind = payload.kind.as_deref().map(parse_kind).transpose()?;
    let updated = state
        .services
        .locations
        .update(
            user.company_id,
            location_id,
            UpdateLocationInput {
                name: payload.name,
                kind,
                is_default: payload.is_default,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(location_id = %location_id, "location updated");
    Ok(success_response(updated))
}

async fn deactivate_location(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(location_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;

    let deactivated = state
        .services
        .locations
        .deactivate(user.company_id, location_id)
        .await
        .map_err(map_service_error)?;

    info!(location_id = %location_id, "location deactivated");
    Ok(success_response(deactivated))
}
