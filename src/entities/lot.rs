use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A dated batch of a component. `quantity` is a maintained running balance,
/// decremented by consuming transaction lines inside the same database
/// transaction; the ledger remains the source of truth.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub component_id: Uuid,
    pub lot_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub received_at: DateTime<Utc>,
    pub quantity: i64,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::component::Entity",
        from = "Column::ComponentId",
        to = "super::component::Column::Id"
    )]
    Component,
    #[sea_orm(has_many = "super::transaction_line::Entity")]
    TransactionLines,
}

impl Related<super::component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl Related<super::transaction_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl crate::db::TenantScoped for Entity {
    fn company_id_column() -> Column {
        Column::CompanyId
    }
}

impl Model {
    /// A lot is expired when its expiry date is strictly before `as_of`.
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < as_of)
    }
}
