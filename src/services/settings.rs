use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_transaction::TransactionType;
use crate::entities::tenant_settings::{self, Entity as TenantSettingsEntity};
use crate::errors::ServiceError;
use crate::notifications::AlertDestinations;

/// Tenant policy knobs with defaults applied. This is what the rest of the
/// code consumes; raw rows never leave this module.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub reorder_warning_multiplier: Decimal,
    pub forecast_lookback_days: i32,
    pub forecast_safety_days: i32,
    pub lot_expiry_warning_days: i32,
    pub allow_negative_inventory: bool,
    pub alerts_enabled: bool,
    pub slack_webhook_url: Option<String>,
    pub alert_email: Option<String>,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self {
            reorder_warning_multiplier: dec!(1.5),
            forecast_lookback_days: 30,
            forecast_safety_days: 7,
            lot_expiry_warning_days: 30,
            allow_negative_inventory: false,
            alerts_enabled: true,
            slack_webhook_url: None,
            alert_email: None,
        }
    }
}

impl EffectiveSettings {
    /// Transaction types that never count toward the consumption rate.
    pub fn forecast_excluded_types(&self) -> &'static [TransactionType] {
        &[TransactionType::Initial, TransactionType::Adjustment]
    }

    pub fn alert_destinations(&self) -> AlertDestinations {
        AlertDestinations {
            slack_webhook_url: self.slack_webhook_url.clone(),
            email: self.alert_email.clone(),
        }
    }

    fn from_row(row: tenant_settings::Model) -> Self {
        Self {
            reorder_warning_multiplier: row.reorder_warning_multiplier,
            forecast_lookback_days: row.forecast_lookback_days,
            forecast_safety_days: row.forecast_safety_days,
            lot_expiry_warning_days: row.lot_expiry_warning_days,
            allow_negative_inventory: row.allow_negative_inventory,
            alerts_enabled: row.alerts_enabled,
            slack_webhook_url: row.slack_webhook_url,
            alert_email: row.alert_email,
        }
    }
}

/// Partial update; absent fields keep their current (or default) values.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub reorder_warning_multiplier: Option<Decimal>,
    pub forecast_lookback_days: Option<i32>,
    pub forecast_safety_days: Option<i32>,
    pub lot_expiry_warning_days: Option<i32>,
    pub allow_negative_inventory: Option<bool>,
    pub alerts_enabled: Option<bool>,
    pub slack_webhook_url: Option<Option<String>>,
    pub alert_email: Option<Option<String>>,
}

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DbPool>,
}

impl SettingsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn effective(&self, company_id: Uuid) -> Result<EffectiveSettings, ServiceError> {
        Self::effective_in(self.db.as_ref(), company_id).await
    }

    /// Settings lookup usable inside an open database transaction.
    pub async fn effective_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
    ) -> Result<EffectiveSettings, ServiceError> {
        let row = TenantSettingsEntity::find_by_id(company_id).one(conn).await?;
        Ok(row.map(EffectiveSettings::from_row).unwrap_or_default())
    }

    /// Validate and persist a settings update. Settings are checked at write
    /// time; reads always see a well-formed row or the defaults.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        company_id: Uuid,
        update: SettingsUpdate,
    ) -> Result<EffectiveSettings, ServiceError> {
        let current = self.effective(company_id).await?;

        let merged = EffectiveSettings {
            reorder_warning_multiplier: update
                .reorder_warning_multiplier
                .unwrap_or(current.reorder_warning_multiplier),
            forecast_lookback_days: update
                .forecast_lookback_days
                .unwrap_or(current.forecast_lookback_days),
            forecast_safety_days: update
                .forecast_safety_days
                .unwrap_or(current.forecast_safety_days),
            lot_expiry_warning_days: update
                .lot_expiry_warning_days
                .unwrap_or(current.lot_expiry_warning_days),
            allow_negative_inventory: update
                .allow_negative_inventory
                .unwrap_or(current.allow_negative_inventory),
            alerts_enabled: update.alerts_enabled.unwrap_or(current.alerts_enabled),
            slack_webhook_url: update
                .slack_webhook_url
                .unwrap_or(current.slack_webhook_url),
            alert_email: update.alert_email.unwrap_or(current.alert_email),
        };

        Self::validate(&merged)?;

        let now = Utc::now();
        let exists = TenantSettingsEntity::find_by_id(company_id)
            .one(self.db.as_ref())
            .await?
            .is_some();

        let model = tenant_settings::ActiveModel {
            company_id: Set(company_id),
            reorder_warning_multiplier: Set(merged.reorder_warning_multiplier),
            forecast_lookback_days: Set(merged.forecast_lookback_days),
            forecast_safety_days: Set(merged.forecast_safety_days),
            lot_expiry_warning_days: Set(merged.lot_expiry_warning_days),
            allow_negative_inventory: Set(merged.allow_negative_inventory),
            alerts_enabled: Set(merged.alerts_enabled),
            slack_webhook_url: Set(merged.slack_webhook_url.clone()),
            alert_email: Set(merged.alert_email.clone()),
            updated_at: Set(now),
        };

        if exists {
            model.update(self.db.as_ref()).await?;
        } else {
            model.insert(self.db.as_ref()).await?;
        }

        Ok(merged)
    }

    fn validate(settings: &EffectiveSettings) -> Result<(), ServiceError> {
        if settings.reorder_warning_multiplier < Decimal::ONE {
            return Err(ServiceError::validation(
                "reorder_warning_multiplier must be at least 1.0",
            ));
        }
        if !(1..=365).contains(&settings.forecast_lookback_days) {
            return Err(ServiceError::validation(
                "forecast_lookback_days must be between 1 and 365",
            ));
        }
        if !(0..=365).contains(&settings.forecast_safety_days) {
            return Err(ServiceError::validation(
                "forecast_safety_days must be between 0 and 365",
            ));
        }
        if !(0..=365).contains(&settings.lot_expiry_warning_days) {
            return Err(ServiceError::validation(
                "lot_expiry_warning_days must be between 0 and 365",
            ));
        }
        if let Some(url) = settings.slack_webhook_url.as_deref() {
            if !url.starts_with("https://") {
                return Err(ServiceError::validation(
                    "slack_webhook_url must be an https URL",
                ));
            }
        }
        if let Some(email) = settings.alert_email.as_deref() {
            if !email.contains('@') {
                return Err(ServiceError::validation("alert_email is not a valid address"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let s = EffectiveSettings::default();
        assert_eq!(s.reorder_warning_multiplier, dec!(1.5));
        assert_eq!(s.forecast_lookback_days, 30);
        assert!(!s.allow_negative_inventory);
        assert_eq!(
            s.forecast_excluded_types(),
            &[TransactionType::Initial, TransactionType::Adjustment]
        );
    }

    #[test]
    fn multiplier_below_one_is_rejected() {
        let s = EffectiveSettings {
            reorder_warning_multiplier: dec!(0.9),
            ..Default::default()
        };
        assert!(SettingsService::validate(&s).is_err());
    }
}
