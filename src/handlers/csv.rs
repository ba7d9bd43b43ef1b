use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::info;

use super::common::{map_service_error, success_response};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::AppState;

pub fn csv_routes() -> Router<AppState> {
    Router::new()
        .route("/components/import", post(import_components))
        .route("/components/export", get(export_components))
        .route("/skus/import", post(import_skus))
        .route("/skus/export", get(export_skus))
        .route("/initial-inventory/import", post(import_initial_inventory))
}

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn import_components(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Ops).map_err(map_service_error)?;

    let report = state
        .services
        .csv
        .import_components(user.company_id, &body)
        .await
        .map_err(map_service_error)?;

    info!(
        successful = report.successful,
        failed = report.failed,
        skipped = report.skipped_duplicates,
        "component CSV import finished"
    );
    Ok(success_response(report))
}

async fn export_components(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .services
        .csv
        .export_components(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(csv_attachment("components.csv", body))
}

async fn import_skus(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Ops).map_err(map_service_error)?;

    let report = state
        .services
        .csv
        .import_skus(user.company_id, &body)
        .await
        .map_err(map_service_error)?;

    info!(
        successful = report.successful,
        failed = report.failed,
        skipped = report.skipped_duplicates,
        "SKU CSV import finished"
    );
    Ok(success_response(report))
}

async fn export_skus(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .services
        .csv
        .export_skus(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(csv_attachment("skus.csv", body))
}

async fn import_initial_inventory(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Ops).map_err(map_service_error)?;

    let report = state
        .services
        .csv
        .import_initial_inventory(user.company_id, Some(user.user_id), &body)
        .await
        .map_err(map_service_error)?;

    info!(
        successful = report.successful,
        failed = report.failed,
        "initial inventory CSV import finished"
    );
    Ok(success_response(report))
}
