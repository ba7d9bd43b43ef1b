use chrono::Utc;
use sea_orm::sea_query::Alias;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::stock_balance::{self, Entity as StockBalanceEntity};
use crate::entities::transaction_line::{self, Entity as TransactionLineEntity};
use crate::errors::ServiceError;

#[derive(Debug, FromQueryResult)]
struct QuantitySum {
    total: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct GroupedSum {
    component_id: Uuid,
    location_id: Uuid,
    total: Option<i64>,
}

/// The quantity ledger. On-hand quantity is the sum of signed line changes;
/// writes are inserts only. A materialized `stock_balances` row per
/// (component, location) is kept in step inside the same database
/// transaction, and can always be rebuilt from the ledger.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DbPool>,
}

impl LedgerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Current on-hand quantity derived from the ledger, optionally narrowed
    /// to one location.
    #[instrument(skip(self))]
    pub async fn on_hand(
        &self,
        company_id: Uuid,
        component_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<i64, ServiceError> {
        Self::on_hand_in(self.db.as_ref(), company_id, component_id, location_id).await
    }

    /// Ledger summation usable inside an open database transaction, so that
    /// availability reads and consuming inserts share one transaction.
    pub async fn on_hand_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<i64, ServiceError> {
        let mut query = TransactionLineEntity::find()
            .select_only()
            .column_as(
                transaction_line::Column::QuantityChange
                    .sum()
                    .cast_as(Alias::new("BIGINT")),
                "total",
            )
            .for_company(company_id)
            .filter(transaction_line::Column::ComponentId.eq(component_id));

        if let Some(location_id) = location_id {
            query = query.filter(transaction_line::Column::LocationId.eq(location_id));
        }

        let row = query.into_model::<QuantitySum>().one(conn).await?;
        Ok(row.and_then(|r| r.total).unwrap_or(0))
    }

    /// On-hand across all locations for a set of components, read from the
    /// materialized balances. Used by list endpoints and the alert batch.
    pub async fn balances_by_component(
        &self,
        company_id: Uuid,
        component_ids: &[Uuid],
    ) -> Result<std::collections::HashMap<Uuid, i64>, ServiceError> {
        if component_ids.is_empty() {
            return Ok(Default::default());
        }

        let rows = StockBalanceEntity::find()
            .for_company(company_id)
            .filter(stock_balance::Column::ComponentId.is_in(component_ids.iter().copied()))
            .all(self.db.as_ref())
            .await?;

        let mut totals = std::collections::HashMap::new();
        for row in rows {
            *totals.entry(row.component_id).or_insert(0) += row.on_hand;
        }
        Ok(totals)
    }

    /// Fold one freshly inserted ledger line into the balance table. Must be
    /// called with the same transaction that inserted the line.
    pub async fn apply_line_to_balances<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component_id: Uuid,
        location_id: Uuid,
        quantity_change: i64,
    ) -> Result<(), ServiceError> {
        let existing = StockBalanceEntity::find()
            .for_company(company_id)
            .filter(stock_balance::Column::ComponentId.eq(component_id))
            .filter(stock_balance::Column::LocationId.eq(location_id))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                let on_hand = row.on_hand + quantity_change;
                let mut active: stock_balance::ActiveModel = row.into();
                active.on_hand = Set(on_hand);
                active.updated_at = Set(Utc::now());
                active.update(conn).await?;
            }
            None => {
                stock_balance::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    company_id: Set(company_id),
                    component_id: Set(component_id),
                    location_id: Set(location_id),
                    on_hand: Set(quantity_change),
                    updated_at: Set(Utc::now()),
                }
                .insert(conn)
                .await?;
            }
        }

        Ok(())
    }

    /// Drop and replay one tenant's balances from the ledger. The ledger is
    /// the source of truth; this restores the snapshot after any drift.
    #[instrument(skip(self))]
    pub async fn rebuild(&self, company_id: Uuid) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;

        StockBalanceEntity::delete_many()
            .filter(stock_balance::Column::CompanyId.eq(company_id))
            .exec(&txn)
            .await?;

        let grouped = TransactionLineEntity::find()
            .select_only()
            .column(transaction_line::Column::ComponentId)
            .column(transaction_line::Column::LocationId)
            .column_as(
                transaction_line::Column::QuantityChange
                    .sum()
                    .cast_as(Alias::new("BIGINT")),
                "total",
            )
            .for_company(company_id)
            .group_by(transaction_line::Column::ComponentId)
            .group_by(transaction_line::Column::LocationId)
            .into_model::<GroupedSum>()
            .all(&txn)
            .await?;

        let mut inserted = 0u64;
        for row in grouped {
            stock_balance::ActiveModel {
                id: Set(Uuid::new_v4()),
                company_id: Set(company_id),
                component_id: Set(row.component_id),
                location_id: Set(row.location_id),
                on_hand: Set(row.total.unwrap_or(0)),
                updated_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
            inserted += 1;
        }

        txn.commit().await?;
        info!(%company_id, inserted, "stock balances rebuilt from ledger");
        Ok(inserted)
    }
}
