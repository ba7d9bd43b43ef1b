use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::component;
use crate::entities::lot::{self, Entity as LotEntity};
use crate::errors::{ServiceError, StockShortage};

/// One slice of a withdrawal assigned to a lot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LotAllocation {
    pub lot_id: Uuid,
    pub lot_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: i64,
}

/// Result of selecting lots for a withdrawal. `uncovered` is zero when the
/// allocations fully cover the request; the caller decides whether a
/// remainder blocks the operation or proceeds unlotted.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationOutcome {
    pub allocations: Vec<LotAllocation>,
    pub requested: i64,
    pub allocated: i64,
    pub uncovered: i64,
}

impl AllocationOutcome {
    pub fn shortage_for(&self, component: &component::Model) -> Option<StockShortage> {
        (self.uncovered > 0).then(|| StockShortage {
            component_id: component.id,
            component_code: component.code.clone(),
            required: self.requested,
            available: self.allocated,
            shortage: self.uncovered,
        })
    }
}

/// Explicit caller-chosen allocation, bypassing FIFO selection.
#[derive(Debug, Clone)]
pub struct ManualAllocation {
    pub lot_id: Uuid,
    pub quantity: i64,
}

/// Lot selection and balance upkeep. Consumption follows FIFO-by-expiry:
/// soonest-expiring lots drain first, lots without an expiry date last.
#[derive(Clone)]
pub struct LotsService {
    db: Arc<DbPool>,
}

impl LotsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_for_component(
        &self,
        company_id: Uuid,
        component_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<lot::Model>, u64), ServiceError> {
        let paginator = LotEntity::find()
            .for_company(company_id)
            .filter(lot::Column::ComponentId.eq(component_id))
            .order_by_asc(lot::Column::ReceivedAt)
            .paginate(self.db.as_ref(), per_page.max(1));

        let total = paginator.num_items().await?;
        let lots = paginator.fetch_page(page.max(1) - 1).await?;
        Ok((lots, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, lot_id: Uuid) -> Result<lot::Model, ServiceError> {
        LotEntity::find_by_id(lot_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("lot", lot_id))
    }

    /// Read-only FIFO selection against the current lot balances.
    pub async fn select_for_consumption(
        &self,
        company_id: Uuid,
        component_id: Uuid,
        quantity_needed: i64,
        allow_expired: bool,
        as_of: NaiveDate,
    ) -> Result<AllocationOutcome, ServiceError> {
        Self::select_in(
            self.db.as_ref(),
            company_id,
            component_id,
            quantity_needed,
            allow_expired,
            as_of,
        )
        .await
    }

    /// FIFO selection usable inside an open database transaction so that the
    /// read and the consuming inserts cannot race another withdrawal.
    pub async fn select_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component_id: Uuid,
        quantity_needed: i64,
        allow_expired: bool,
        as_of: NaiveDate,
    ) -> Result<AllocationOutcome, ServiceError> {
        if quantity_needed <= 0 {
            return Err(ServiceError::validation(
                "quantity to allocate must be positive",
            ));
        }

        let mut candidates: Vec<lot::Model> = LotEntity::find()
            .for_company(company_id)
            .filter(lot::Column::ComponentId.eq(component_id))
            .filter(lot::Column::Active.eq(true))
            .filter(lot::Column::Quantity.gt(0))
            .all(conn)
            .await?;

        if !allow_expired {
            candidates.retain(|l| !l.is_expired(as_of));
        }

        // Soonest expiry first, no-expiry lots last; received order breaks
        // ties so repeated runs allocate identically.
        candidates.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x
                .cmp(&y)
                .then(a.received_at.cmp(&b.received_at))
                .then(a.lot_code.cmp(&b.lot_code)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a
                .received_at
                .cmp(&b.received_at)
                .then(a.lot_code.cmp(&b.lot_code)),
        });

        let mut allocations = Vec::new();
        let mut remaining = quantity_needed;
        for candidate in candidates {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(candidate.quantity);
            allocations.push(LotAllocation {
                lot_id: candidate.id,
                lot_code: candidate.lot_code,
                expiry_date: candidate.expiry_date,
                quantity: take,
            });
            remaining -= take;
        }

        Ok(AllocationOutcome {
            allocations,
            requested: quantity_needed,
            allocated: quantity_needed - remaining,
            uncovered: remaining,
        })
    }

    /// Validate explicit per-lot picks: every lot must belong to the tenant
    /// and component, totals must match the request exactly, and no lot may
    /// be drawn below zero.
    pub async fn resolve_manual_allocations<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component_id: Uuid,
        quantity_needed: i64,
        picks: &[ManualAllocation],
    ) -> Result<AllocationOutcome, ServiceError> {
        let mut allocations = Vec::with_capacity(picks.len());
        let mut allocated = 0i64;

        for pick in picks {
            if pick.quantity <= 0 {
                return Err(ServiceError::validation(
                    "manual lot allocations must be positive",
                ));
            }

            let lot = LotEntity::find_by_id(pick.lot_id)
                .for_company(company_id)
                .filter(lot::Column::ComponentId.eq(component_id))
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::not_found("lot", pick.lot_id))?;

            if lot.quantity < pick.quantity {
                return Err(ServiceError::validation(format!(
                    "lot {} holds {} but {} was requested",
                    lot.lot_code, lot.quantity, pick.quantity
                )));
            }

            allocated += pick.quantity;
            allocations.push(LotAllocation {
                lot_id: lot.id,
                lot_code: lot.lot_code,
                expiry_date: lot.expiry_date,
                quantity: pick.quantity,
            });
        }

        if allocated != quantity_needed {
            return Err(ServiceError::validation(format!(
                "manual allocations cover {} but {} is required",
                allocated, quantity_needed
            )));
        }

        Ok(AllocationOutcome {
            allocations,
            requested: quantity_needed,
            allocated,
            uncovered: 0,
        })
    }

    /// Shift a lot's running balance. Must be called within the transaction
    /// that writes the corresponding ledger line.
    pub async fn apply_delta<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        lot_id: Uuid,
        delta: i64,
    ) -> Result<(), ServiceError> {
        let lot = LotEntity::find_by_id(lot_id)
            .for_company(company_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("lot", lot_id))?;

        let quantity = lot.quantity + delta;
        if quantity < 0 {
            return Err(ServiceError::validation(format!(
                "lot {} balance cannot go negative",
                lot.lot_code
            )));
        }

        let mut active: lot::ActiveModel = lot.into();
        active.quantity = Set(quantity);
        active.update(conn).await?;
        Ok(())
    }
}
