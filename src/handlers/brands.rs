use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::AppState;

pub fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_brand))
        .route("/", get(list_brands))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBrandRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

async fn create_brand(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let created = state
        .services
        .brands
        .create(user.company_id, payload.name)
        .await
        .map_err(map_service_error)?;

    info!(brand_id = %created.id, name = %created.name, "brand created");
    Ok(created_response(created))
}

async fn list_brands(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let brands = state
        .services
        .brands
        .list(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(brands))
}
