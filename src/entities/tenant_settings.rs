use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-tenant policy knobs. One row per company, typed columns rather than a
/// settings blob; values are validated on write and merged with code-level
/// defaults on read (see `services::settings`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub company_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub reorder_warning_multiplier: Decimal,
    pub forecast_lookback_days: i32,
    pub forecast_safety_days: i32,
    pub lot_expiry_warning_days: i32,
    pub allow_negative_inventory: bool,
    pub alerts_enabled: bool,
    pub slack_webhook_url: Option<String>,
    pub alert_email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
