use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::bom_line::{self, Entity as BomLineEntity};
use crate::entities::bom_version::{self, BomStatus, Entity as BomVersionEntity};
use crate::entities::component::{self, Entity as ComponentEntity};
use crate::entities::sku::{self, Entity as SkuEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::ledger::LedgerService;

/// One BOM line with costs computed from the component's current cost.
#[derive(Debug, Clone, Serialize)]
pub struct BomLineView {
    pub id: Uuid,
    pub component_id: Uuid,
    pub component_code: String,
    pub component_name: String,
    pub quantity_per_unit: i64,
    pub unit_cost: Decimal,
    pub line_cost: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BomVersionDetail {
    pub id: Uuid,
    pub sku_id: Uuid,
    pub version_number: i32,
    pub status: String,
    pub effective_start: Option<DateTime<Utc>>,
    pub effective_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub unit_cost: Decimal,
    pub lines: Vec<BomLineView>,
}

/// Availability of one component for a requested build quantity.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentAvailability {
    pub component_id: Uuid,
    pub component_code: String,
    pub required: i64,
    pub available: i64,
    pub shortage: i64,
}

#[derive(Debug, Clone)]
pub struct NewBomLine {
    pub component_id: Uuid,
    pub quantity_per_unit: i64,
}

/// Bill-of-materials versions: draft creation, cost roll-up, availability
/// checks and the draft -> active -> superseded lifecycle.
#[derive(Clone)]
pub struct BomService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl BomService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Create a draft version with its lines. The version number continues
    /// the SKU's sequence.
    #[instrument(skip(self, lines))]
    pub async fn create_version(
        &self,
        company_id: Uuid,
        sku_id: Uuid,
        lines: Vec<NewBomLine>,
    ) -> Result<BomVersionDetail, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::validation(
                "a BOM version needs at least one line",
            ));
        }

        let db = self.db.as_ref();

        SkuEntity::find_by_id(sku_id)
            .for_company(company_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("SKU", sku_id))?;

        let mut seen = std::collections::HashSet::new();
        for line in &lines {
            if line.quantity_per_unit <= 0 {
                return Err(ServiceError::validation(
                    "quantity_per_unit must be positive",
                ));
            }
            if !seen.insert(line.component_id) {
                return Err(ServiceError::validation(
                    "a component may appear on a BOM only once",
                ));
            }
            ComponentEntity::find_by_id(line.component_id)
                .for_company(company_id)
                .filter(component::Column::Active.eq(true))
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("component", line.component_id))?;
        }

        let last_version: Option<i32> = BomVersionEntity::find()
            .for_company(company_id)
            .filter(bom_version::Column::SkuId.eq(sku_id))
            .order_by_desc(bom_version::Column::VersionNumber)
            .one(db)
            .await?
            .map(|v| v.version_number);

        let now = Utc::now();
        let version_id = Uuid::new_v4();

        let txn = db.begin().await?;

        bom_version::ActiveModel {
            id: Set(version_id),
            company_id: Set(company_id),
            sku_id: Set(sku_id),
            version_number: Set(last_version.unwrap_or(0) + 1),
            status: Set(BomStatus::Draft.as_str().to_string()),
            effective_start: Set(None),
            effective_end: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            bom_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                company_id: Set(company_id),
                bom_version_id: Set(version_id),
                component_id: Set(line.component_id),
                quantity_per_unit: Set(line.quantity_per_unit),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.get_version(company_id, version_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_sku(
        &self,
        company_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Vec<bom_version::Model>, ServiceError> {
        SkuEntity::find_by_id(sku_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("SKU", sku_id))?;

        BomVersionEntity::find()
            .for_company(company_id)
            .filter(bom_version::Column::SkuId.eq(sku_id))
            .order_by_desc(bom_version::Column::VersionNumber)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get_version(
        &self,
        company_id: Uuid,
        version_id: Uuid,
    ) -> Result<BomVersionDetail, ServiceError> {
        let db = self.db.as_ref();
        let version = BomVersionEntity::find_by_id(version_id)
            .for_company(company_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("BOM version", version_id))?;

        let lines = Self::line_views_in(db, company_id, version_id).await?;
        let unit_cost = lines.iter().map(|l| l.line_cost).sum();

        Ok(BomVersionDetail {
            id: version.id,
            sku_id: version.sku_id,
            version_number: version.version_number,
            status: version.status,
            effective_start: version.effective_start,
            effective_end: version.effective_end,
            created_at: version.created_at,
            unit_cost,
            lines,
        })
    }

    /// Per-unit cost at call time: sum of quantity-per-unit x current
    /// component cost. Never cached, so cost edits show up in the next call
    /// without touching recorded transaction snapshots.
    pub async fn unit_cost_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        version_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let lines = Self::line_views_in(conn, company_id, version_id).await?;
        Ok(lines.iter().map(|l| l.line_cost).sum())
    }

    async fn line_views_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        version_id: Uuid,
    ) -> Result<Vec<BomLineView>, ServiceError> {
        let lines = BomLineEntity::find()
            .for_company(company_id)
            .filter(bom_line::Column::BomVersionId.eq(version_id))
            .all(conn)
            .await?;

        let component_ids: Vec<Uuid> = lines.iter().map(|l| l.component_id).collect();
        let components: HashMap<Uuid, component::Model> = ComponentEntity::find()
            .for_company(company_id)
            .filter(component::Column::Id.is_in(component_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        lines
            .into_iter()
            .map(|line| {
                let component = components.get(&line.component_id).ok_or_else(|| {
                    ServiceError::Internal(format!(
                        "BOM line {} references missing component",
                        line.id
                    ))
                })?;
                let line_cost =
                    Decimal::from(line.quantity_per_unit) * component.cost_per_unit;
                Ok(BomLineView {
                    id: line.id,
                    component_id: line.component_id,
                    component_code: component.code.clone(),
                    component_name: component.name.clone(),
                    quantity_per_unit: line.quantity_per_unit,
                    unit_cost: component.cost_per_unit,
                    line_cost,
                })
            })
            .collect()
    }

    /// Live availability check for building `units` of this version.
    pub async fn check_availability_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        version_id: Uuid,
        units: i64,
        location_id: Option<Uuid>,
    ) -> Result<Vec<ComponentAvailability>, ServiceError> {
        if units <= 0 {
            return Err(ServiceError::validation("units must be positive"));
        }

        let lines = Self::line_views_in(conn, company_id, version_id).await?;
        let mut result = Vec::with_capacity(lines.len());
        for line in lines {
            let required = units * line.quantity_per_unit;
            let available =
                LedgerService::on_hand_in(conn, company_id, line.component_id, location_id)
                    .await?;
            result.push(ComponentAvailability {
                component_id: line.component_id,
                component_code: line.component_code,
                required,
                available,
                shortage: (required - available).max(0),
            });
        }
        Ok(result)
    }

    /// The SKU's single active BOM version, if any.
    pub async fn active_version_for_sku_in<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<bom_version::Model>, ServiceError> {
        BomVersionEntity::find()
            .for_company(company_id)
            .filter(bom_version::Column::SkuId.eq(sku_id))
            .filter(bom_version::Column::Status.eq(BomStatus::Active.as_str()))
            .one(conn)
            .await
            .map_err(ServiceError::from)
    }

    /// Activate a draft version. The previously active version (if any) is
    /// superseded with its effective end stamped, atomically. Re-activating
    /// the active version is a no-op; superseded versions stay superseded.
    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        company_id: Uuid,
        version_id: Uuid,
    ) -> Result<BomVersionDetail, ServiceError> {
        let db = self.db.as_ref();
        let txn = db.begin().await?;

        let version = BomVersionEntity::find_by_id(version_id)
            .for_company(company_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("BOM version", version_id))?;

        match BomStatus::from_str(&version.status) {
            Some(BomStatus::Active) => {
                // Idempotent: already the active version.
                txn.commit().await?;
                return self.get_version(company_id, version_id).await;
            }
            Some(BomStatus::Superseded) => {
                return Err(ServiceError::Conflict(format!(
                    "BOM version {} is superseded and cannot be activated",
                    version.version_number
                )));
            }
            Some(BomStatus::Draft) => {}
            None => {
                return Err(ServiceError::Internal(format!(
                    "BOM version {} has unknown status {}",
                    version.id, version.status
                )));
            }
        }

        let now = Utc::now();

        if let Some(current) = BomVersionEntity::find()
            .for_company(company_id)
            .filter(bom_version::Column::SkuId.eq(version.sku_id))
            .filter(bom_version::Column::Status.eq(BomStatus::Active.as_str()))
            .one(&txn)
            .await?
        {
            let mut active: bom_version::ActiveModel = current.into();
            active.status = Set(BomStatus::Superseded.as_str().to_string());
            active.effective_end = Set(Some(now));
            active.update(&txn).await?;
        }

        let sku_id = version.sku_id;
        let version_number = version.version_number;
        let mut target: bom_version::ActiveModel = version.into();
        target.status = Set(BomStatus::Active.as_str().to_string());
        target.effective_start = Set(Some(now));
        target.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            // A concurrent activation serialized ahead of us.
            ServiceError::Conflict(format!("BOM activation conflicted: {e}"))
        })?;

        self.event_sender
            .send_or_log(Event::BomVersionActivated {
                company_id,
                sku_id,
                bom_version_id: version_id,
                version_number,
            })
            .await;

        self.get_version(company_id, version_id).await
    }
}
