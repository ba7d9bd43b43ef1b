use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::common::{map_service_error, success_response, validate_input};
use crate::auth::AuthenticatedUser;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::services::settings::{EffectiveSettings, SettingsUpdate};
use crate::AppState;

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings))
        .route("/", put(update_settings))
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub reorder_warning_multiplier: Decimal,
    pub forecast_lookback_days: i32,
    pub forecast_safety_days: i32,
    pub lot_expiry_warning_days: i32,
    pub allow_negative_inventory: bool,
    pub alerts_enabled: bool,
    pub slack_webhook_url: Option<String>,
    pub alert_email: Option<String>,
}

impl From<EffectiveSettings> for SettingsResponse {
    fn from(s: EffectiveSettings) -> Self {
        Self {
            reorder_warning_multiplier: s.reorder_warning_multiplier,
            forecast_lookback_days: s.forecast_lookback_days,
            forecast_safety_days: s.forecast_safety_days,
            lot_expiry_warning_days: s.lot_expiry_warning_days,
            allow_negative_inventory: s.allow_negative_inventory,
            alerts_enabled: s.alerts_enabled,
            slack_webhook_url: s.slack_webhook_url,
            alert_email: s.alert_email,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    pub reorder_warning_multiplier: Option<Decimal>,
    pub forecast_lookback_days: Option<i32>,
    pub forecast_safety_days: Option<i32>,
    pub lot_expiry_warning_days: Option<i32>,
    pub allow_negative_inventory: Option<bool>,
    pub alerts_enabled: Option<bool>,
    #[serde(default, deserialize_with = "double_option_string")]
    pub slack_webhook_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option_string")]
    pub alert_email: Option<Option<String>>,
}

fn double_option_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

async fn get_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state
        .services
        .settings
        .effective(user.company_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(SettingsResponse::from(settings)))
}

async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(map_service_error)?;
    validate_input(&payload)?;

    let updated = state
        .services
        .settings
        .update(
            user.company_id,
            SettingsUpdate {
                reorder_warning_multiplier: payload.reorder_warning_multiplier,
                forecast_lookback_days: payload.forecast_lookback_days,
                forecast_safety_days: payload.forecast_safety_days,
                lot_expiry_warning_days: payload.lot_expiry_warning_days,
                allow_negative_inventory: payload.allow_negative_inventory,
                alerts_enabled: payload.alerts_enabled,
                slack_webhook_url: payload.slack_webhook_url,
                alert_email: payload.alert_email,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!(company_id = %user.company_id, "tenant settings updated");
    Ok(success_response(SettingsResponse::from(updated)))
}
