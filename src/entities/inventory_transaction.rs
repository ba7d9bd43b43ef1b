use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Types of inventory transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Receipt,
    Initial,
    Build,
    Transfer,
    Adjustment,
    Outbound,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receipt => "receipt",
            TransactionType::Initial => "initial",
            TransactionType::Build => "build",
            TransactionType::Transfer => "transfer",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Outbound => "outbound",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(TransactionType::Receipt),
            "initial" => Some(TransactionType::Initial),
            "build" => Some(TransactionType::Build),
            "transfer" => Some(TransactionType::Transfer),
            "adjustment" => Some(TransactionType::Adjustment),
            "outbound" => Some(TransactionType::Outbound),
            _ => None,
        }
    }
}

/// An immutable record of one inventory event. Lines are append-only;
/// corrections are compensating adjustment transactions, never edits.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub transaction_type: String,
    pub sku_id: Option<Uuid>,
    pub units: Option<i64>,
    pub reason_code: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_line::Entity")]
    TransactionLines,
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
