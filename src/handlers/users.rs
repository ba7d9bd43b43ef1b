use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/", get(list_users))
        .route("/:id", delete(deactivate_user))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 12))]
    pub password: String,
    pub role: String,
}

async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let role = Role::from_str(&payload.role)
        .ok_or_else(|| ApiError::Validation(format!("unknown role {:?}", payload.role)))?;

    let created = state
        .auth
        .create_user(user.company_id, &payload.email, &payload.password, role)
        .await
        .map_err(map_service_error)?;

    info!(user_id = %created.id, email = %created.email, "user created");
    Ok(created_response(created))
}

async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;

    let users = state
        .auth
        .list_users(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(users))
}

async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;

    if target_id == user.user_id {
        return Err(ApiError::Validation(
            "you cannot deactivate your own account".to_string(),
        ));
    }

    let deactivated = state
        .auth
        .deactivate_user(user.company_id, target_id)
        .await
        .map_err(map_service_error)?;

    info!(user_id = %target_id, "user deactivated");
    Ok(success_response(deactivated))
}
