use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Alias;
use sea_orm::{ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::component;
use crate::entities::inventory_transaction::{self, Entity as InventoryTransactionEntity};
use crate::entities::transaction_line::{self, Entity as TransactionLineEntity};
use crate::errors::ServiceError;
use crate::services::settings::EffectiveSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderStatus {
    Critical,
    Warning,
    Ok,
}

impl ReorderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReorderStatus::Critical => "critical",
            ReorderStatus::Warning => "warning",
            ReorderStatus::Ok => "ok",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(ReorderStatus::Critical),
            "warning" => Some(ReorderStatus::Warning),
            "ok" => Some(ReorderStatus::Ok),
            _ => None,
        }
    }
}

/// Classify on-hand quantity against the reorder point. At or below the
/// point is critical; within point x multiplier is a warning.
pub fn classify(on_hand: i64, reorder_point: i64, warning_multiplier: Decimal) -> ReorderStatus {
    if on_hand <= reorder_point {
        return ReorderStatus::Critical;
    }
    let warning_threshold = Decimal::from(reorder_point) * warning_multiplier;
    if Decimal::from(on_hand) <= warning_threshold {
        ReorderStatus::Warning
    } else {
        ReorderStatus::Ok
    }
}

/// Linear runout forecast for one component.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConsumptionForecast {
    /// Units consumed per day over the lookback window; None when nothing
    /// was consumed (a runout date cannot be projected from zero).
    pub average_daily_consumption: Option<Decimal>,
    pub days_until_runout: Option<i64>,
    pub runout_date: Option<NaiveDate>,
    pub recommended_reorder_date: Option<NaiveDate>,
}

impl ConsumptionForecast {
    pub fn none() -> Self {
        Self {
            average_daily_consumption: None,
            days_until_runout: None,
            runout_date: None,
            recommended_reorder_date: None,
        }
    }
}

/// Project a runout from on-hand stock and a consumption total over
/// `lookback_days`. Division by a zero rate never happens: zero consumption
/// yields an empty forecast.
pub fn forecast_runout(
    on_hand: i64,
    consumed_in_window: i64,
    lookback_days: i32,
    lead_time_days: i32,
    safety_days: i32,
    as_of: NaiveDate,
) -> ConsumptionForecast {
    if consumed_in_window <= 0 || lookback_days <= 0 {
        return ConsumptionForecast::none();
    }

    let rate = Decimal::from(consumed_in_window) / Decimal::from(lookback_days);
    let days = if on_hand <= 0 {
        0
    } else {
        (Decimal::from(on_hand) / rate)
            .floor()
            .to_i64()
            .unwrap_or(i64::MAX)
    };

    let runout = as_of + Duration::days(days);
    let recommended = runout - Duration::days(i64::from(lead_time_days) + i64::from(safety_days));

    ConsumptionForecast {
        average_daily_consumption: Some(rate.round_dp(4)),
        days_until_runout: Some(days),
        runout_date: Some(runout),
        recommended_reorder_date: Some(recommended),
    }
}

#[derive(Debug, FromQueryResult)]
struct ConsumedRow {
    total: Option<i64>,
}

/// Derives reorder status and runout forecasts from the ledger.
#[derive(Clone)]
pub struct ReorderService {
    db: Arc<DbPool>,
}

impl ReorderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Total units consumed for a component over the settings' lookback
    /// window, excluding the configured transaction types.
    #[instrument(skip(self, settings))]
    pub async fn consumed_in_window(
        &self,
        company_id: Uuid,
        component_id: Uuid,
        settings: &EffectiveSettings,
    ) -> Result<i64, ServiceError> {
        let cutoff = Utc::now() - Duration::days(i64::from(settings.forecast_lookback_days));
        let excluded: Vec<&str> = settings
            .forecast_excluded_types()
            .iter()
            .map(|t| t.as_str())
            .collect();

        let row = TransactionLineEntity::find()
            .select_only()
            .column_as(
                transaction_line::Column::QuantityChange
                    .sum()
                    .cast_as(Alias::new("BIGINT")),
                "total",
            )
            .inner_join(InventoryTransactionEntity)
            .for_company(company_id)
            .filter(transaction_line::Column::ComponentId.eq(component_id))
            .filter(transaction_line::Column::QuantityChange.lt(0))
            .filter(inventory_transaction::Column::CreatedAt.gte(cutoff))
            .filter(inventory_transaction::Column::TransactionType.is_not_in(excluded))
            .into_model::<ConsumedRow>()
            .one(self.db.as_ref())
            .await?;

        // Lines are negative; consumption is reported positive.
        Ok(-row.and_then(|r| r.total).unwrap_or(0))
    }

    #[instrument(skip(self, component, settings))]
    pub async fn forecast_for_component(
        &self,
        company_id: Uuid,
        component: &component::Model,
        on_hand: i64,
        settings: &EffectiveSettings,
    ) -> Result<ConsumptionForecast, ServiceError> {
        let consumed = self
            .consumed_in_window(company_id, component.id, settings)
            .await?;

        Ok(forecast_runout(
            on_hand,
            consumed,
            settings.forecast_lookback_days,
            component.lead_time_days,
            settings.forecast_safety_days,
            Utc::now().date_naive(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn classify_boundaries() {
        assert_eq!(classify(100, 100, dec!(1.5)), ReorderStatus::Critical);
        assert_eq!(classify(120, 100, dec!(1.5)), ReorderStatus::Warning);
        assert_eq!(classify(160, 100, dec!(1.5)), ReorderStatus::Ok);
    }

    #[test]
    fn warning_threshold_is_inclusive() {
        assert_eq!(classify(150, 100, dec!(1.5)), ReorderStatus::Warning);
        assert_eq!(classify(151, 100, dec!(1.5)), ReorderStatus::Ok);
    }

    #[test]
    fn zero_reorder_point_is_critical_only_at_zero() {
        assert_eq!(classify(0, 0, dec!(1.5)), ReorderStatus::Critical);
        assert_eq!(classify(1, 0, dec!(1.5)), ReorderStatus::Ok);
    }

    #[test]
    fn zero_consumption_gives_no_runout() {
        let f = forecast_runout(50, 0, 30, 5, 2, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(f, ConsumptionForecast::none());
    }

    #[test]
    fn runout_math_is_linear() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        // 60 units over 30 days = 2/day; 20 on hand = 10 days.
        let f = forecast_runout(20, 60, 30, 3, 2, as_of);
        assert_eq!(f.average_daily_consumption, Some(dec!(2.0000)));
        assert_eq!(f.days_until_runout, Some(10));
        assert_eq!(f.runout_date, Some(as_of + Duration::days(10)));
        assert_eq!(
            f.recommended_reorder_date,
            Some(as_of + Duration::days(10 - 5))
        );
    }

    #[test]
    fn negative_on_hand_runs_out_immediately() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let f = forecast_runout(-5, 30, 30, 0, 0, as_of);
        assert_eq!(f.days_until_runout, Some(0));
        assert_eq!(f.runout_date, Some(as_of));
    }
}
