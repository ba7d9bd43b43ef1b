use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::common::{map_service_error, success_response, validate_input};
use crate::errors::ApiError;
use crate::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let response = state
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(map_service_error)?;

    info!(email = %payload.email, "user logged in");
    Ok(success_response(response))
}
