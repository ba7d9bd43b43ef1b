use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::component::{self, Entity as ComponentEntity};
use crate::entities::inventory_transaction::{
    self, Entity as InventoryTransactionEntity, TransactionType,
};
use crate::entities::location::{self, Entity as LocationEntity};
use crate::entities::lot::{self, Entity as LotEntity};
use crate::entities::sku::{self, Entity as SkuEntity};
use crate::entities::transaction_line::{self, Entity as TransactionLineEntity};
use crate::errors::{ServiceError, StockShortage};
use crate::events::{Event, EventSender};
use crate::services::bom::BomService;
use crate::services::ledger::LedgerService;
use crate::services::lots::{LotsService, ManualAllocation};
use crate::services::settings::SettingsService;

/// A posted transaction with its ledger lines, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionWithLines {
    pub transaction: inventory_transaction::Model,
    pub lines: Vec<transaction_line::Model>,
}

#[derive(Debug, Clone)]
pub struct NewLot {
    pub lot_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReceiptInput {
    pub component_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub update_component_cost: bool,
    pub lot: Option<NewLot>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BuildInput {
    pub sku_id: Uuid,
    pub units: i64,
    pub source_location_id: Uuid,
    pub output_location_id: Option<Uuid>,
    pub output_to_finished_goods: bool,
    pub allow_insufficient_inventory: bool,
    pub allow_expired_lots: bool,
    pub manual_allocations: Vec<BuildLotPick>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Explicit lot choice for one component of a build.
#[derive(Debug, Clone)]
pub struct BuildLotPick {
    pub component_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct TransferInput {
    pub component_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub quantity: i64,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdjustmentInput {
    pub component_id: Uuid,
    pub location_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity_change: i64,
    pub reason_code: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutboundInput {
    pub sku_id: Uuid,
    pub location_id: Uuid,
    pub units: i64,
    pub allow_insufficient_inventory: bool,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Validates and atomically persists inventory transactions. All checks run
/// inside the same database transaction as the writes, so an availability
/// read cannot race another consumer between check and insert.
#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl TransactionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<TransactionWithLines, ServiceError> {
        let transaction = InventoryTransactionEntity::find_by_id(transaction_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("transaction", transaction_id))?;

        let lines = TransactionLineEntity::find()
            .for_company(company_id)
            .filter(transaction_line::Column::TransactionId.eq(transaction_id))
            .all(self.db.as_ref())
            .await?;

        Ok(TransactionWithLines { transaction, lines })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        transaction_type: Option<TransactionType>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_transaction::Model>, u64), ServiceError> {
        let mut query = InventoryTransactionEntity::find()
            .for_company(company_id)
            .order_by_desc(inventory_transaction::Column::CreatedAt);

        if let Some(kind) = transaction_type {
            query = query.filter(inventory_transaction::Column::TransactionType.eq(kind.as_str()));
        }

        let paginator = query.paginate(self.db.as_ref(), per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.max(1) - 1).await?;
        Ok((items, total))
    }

    /// Receipt: stock arriving from outside the system.
    pub async fn post_receipt(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        input: ReceiptInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        self.post_inbound(company_id, created_by, TransactionType::Receipt, input)
            .await
    }

    /// Initial: an opening balance. Same shape as a receipt but excluded
    /// from consumption forecasting by default.
    pub async fn post_initial(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        input: ReceiptInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        self.post_inbound(company_id, created_by, TransactionType::Initial, input)
            .await
    }

    #[instrument(skip(self, input), fields(component_id = %input.component_id))]
    async fn post_inbound(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        kind: TransactionType,
        input: ReceiptInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::validation("quantity must be positive"));
        }

        let txn = self.db.begin().await?;

        let component = Self::fetch_component(&txn, company_id, input.component_id).await?;
        Self::fetch_location(&txn, company_id, input.location_id).await?;

        if input.lot.is_some() && !component.lot_tracked {
            return Err(ServiceError::validation(format!(
                "component {} is not lot tracked",
                component.code
            )));
        }

        let unit_cost = input.unit_cost.unwrap_or(component.cost_per_unit);

        let lot_id = match &input.lot {
            Some(new_lot) => Some(
                Self::find_or_create_lot(&txn, company_id, &component, new_lot, input.quantity)
                    .await?,
            ),
            None => None,
        };

        if input.update_component_cost {
            // Latest-cost overwrite; historical lines keep their snapshots.
            let mut active: component::ActiveModel = component.clone().into();
            active.cost_per_unit = Set(unit_cost);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
        }

        let transaction = Self::insert_transaction(
            &txn,
            company_id,
            kind,
            None,
            None,
            None,
            input.reference.clone(),
            input.notes.clone(),
            created_by,
        )
        .await?;

        let line = Self::insert_line(
            &txn,
            company_id,
            transaction.id,
            component.id,
            input.location_id,
            lot_id,
            input.quantity,
            unit_cost,
        )
        .await?;

        txn.commit().await?;

        self.emit_posted(company_id, &transaction, 1).await;
        Ok(TransactionWithLines {
            transaction,
            lines: vec![line],
        })
    }

    /// Build: consume the active BOM's components and produce finished goods.
    #[instrument(skip(self, input), fields(sku_id = %input.sku_id, units = input.units))]
    pub async fn post_build(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        input: BuildInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        if input.units <= 0 {
            return Err(ServiceError::validation("units must be positive"));
        }

        let txn = self.begin_for_build().await?;

        let sku = SkuEntity::find_by_id(input.sku_id)
            .for_company(company_id)
            .filter(sku::Column::Active.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("SKU", input.sku_id))?;

        Self::fetch_location(&txn, company_id, input.source_location_id).await?;

        let version = BomService::active_version_for_sku_in(&txn, company_id, sku.id)
            .await?
            .ok_or_else(|| {
                ServiceError::validation(format!("SKU {} has no active BOM version", sku.code))
            })?;

        let output = if input.output_to_finished_goods {
            let finished_component_id = sku.finished_component_id.ok_or_else(|| {
                ServiceError::validation(format!(
                    "SKU {} has no finished-goods component to receive build output",
                    sku.code
                ))
            })?;
            let location_id = match input.output_location_id {
                Some(id) => {
                    Self::fetch_location(&txn, company_id, id).await?;
                    id
                }
                None => Self::default_location(&txn, company_id).await?,
            };
            Some((finished_component_id, location_id))
        } else {
            None
        };

        let settings = SettingsService::effective_in(&txn, company_id).await?;
        let allow_shortfall =
            input.allow_insufficient_inventory || settings.allow_negative_inventory;
        let unit_cost = BomService::unit_cost_in(&txn, company_id, version.id).await?;

        // Availability is checked for every line before anything is written,
        // so the rejection carries the complete shortage list.
        let availability = BomService::check_availability_in(
            &txn,
            company_id,
            version.id,
            input.units,
            Some(input.source_location_id),
        )
        .await?;

        let shortages: Vec<StockShortage> = availability
            .iter()
            .filter(|a| a.shortage > 0)
            .map(|a| StockShortage {
                component_id: a.component_id,
                component_code: a.component_code.clone(),
                required: a.required,
                available: a.available,
                shortage: a.shortage,
            })
            .collect();

        if !shortages.is_empty() && !allow_shortfall {
            return Err(ServiceError::InsufficientInventory(shortages));
        }

        let transaction = Self::insert_transaction(
            &txn,
            company_id,
            TransactionType::Build,
            Some(sku.id),
            Some(input.units),
            None,
            input.reference.clone(),
            input.notes.clone(),
            created_by,
        )
        .await?;

        let mut lines = Vec::new();
        for item in &availability {
            let component = Self::fetch_component(&txn, company_id, item.component_id).await?;
            let required = item.required;

            if component.lot_tracked {
                let picks: Vec<ManualAllocation> = input
                    .manual_allocations
                    .iter()
                    .filter(|p| p.component_id == component.id)
                    .map(|p| ManualAllocation {
                        lot_id: p.lot_id,
                        quantity: p.quantity,
                    })
                    .collect();

                let outcome = if picks.is_empty() {
                    let outcome = LotsService::select_in(
                        &txn,
                        company_id,
                        component.id,
                        required,
                        input.allow_expired_lots,
                        Utc::now().date_naive(),
                    )
                    .await?;
                    if outcome.uncovered > 0 && !allow_shortfall {
                        let shortage = outcome
                            .shortage_for(&component)
                            .expect("uncovered outcome has shortage");
                        return Err(ServiceError::InsufficientInventory(vec![shortage]));
                    }
                    outcome
                } else {
                    LotsService::resolve_manual_allocations(
                        &txn,
                        company_id,
                        component.id,
                        required,
                        &picks,
                    )
                    .await?
                };

                for allocation in &outcome.allocations {
                    LotsService::apply_delta(
                        &txn,
                        company_id,
                        allocation.lot_id,
                        -allocation.quantity,
                    )
                    .await?;
                    lines.push(
                        Self::insert_line(
                            &txn,
                            company_id,
                            transaction.id,
                            component.id,
                            input.source_location_id,
                            Some(allocation.lot_id),
                            -allocation.quantity,
                            component.cost_per_unit,
                        )
                        .await?,
                    );
                }

                if outcome.uncovered > 0 {
                    // Book the uncovered remainder unlotted so the ledger
                    // still carries the full requirement.
                    lines.push(
                        Self::insert_line(
                            &txn,
                            company_id,
                            transaction.id,
                            component.id,
                            input.source_location_id,
                            None,
                            -outcome.uncovered,
                            component.cost_per_unit,
                        )
                        .await?,
                    );
                }
            } else {
                lines.push(
                    Self::insert_line(
                        &txn,
                        company_id,
                        transaction.id,
                        component.id,
                        input.source_location_id,
                        None,
                        -required,
                        component.cost_per_unit,
                    )
                    .await?,
                );
            }
        }

        if let Some((finished_component_id, output_location_id)) = output {
            lines.push(
                Self::insert_line(
                    &txn,
                    company_id,
                    transaction.id,
                    finished_component_id,
                    output_location_id,
                    None,
                    input.units,
                    unit_cost,
                )
                .await?,
            );
        }

        txn.commit().await?;

        self.emit_posted(company_id, &transaction, lines.len()).await;
        Ok(TransactionWithLines { transaction, lines })
    }

    /// Transfer: move a component quantity between two locations.
    #[instrument(skip(self, input), fields(component_id = %input.component_id))]
    pub async fn post_transfer(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        input: TransferInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::validation("quantity must be positive"));
        }
        if input.from_location_id == input.to_location_id {
            return Err(ServiceError::validation(
                "source and destination locations must differ",
            ));
        }

        let txn = self.db.begin().await?;

        let component = Self::fetch_component(&txn, company_id, input.component_id).await?;
        Self::fetch_location(&txn, company_id, input.from_location_id).await?;
        Self::fetch_location(&txn, company_id, input.to_location_id).await?;

        let settings = SettingsService::effective_in(&txn, company_id).await?;
        Self::ensure_available(
            &txn,
            company_id,
            &component,
            input.from_location_id,
            input.quantity,
            settings.allow_negative_inventory,
        )
        .await?;

        let transaction = Self::insert_transaction(
            &txn,
            company_id,
            TransactionType::Transfer,
            None,
            None,
            None,
            input.reference.clone(),
            input.notes.clone(),
            created_by,
        )
        .await?;

        let out_line = Self::insert_line(
            &txn,
            company_id,
            transaction.id,
            component.id,
            input.from_location_id,
            None,
            -input.quantity,
            component.cost_per_unit,
        )
        .await?;
        let in_line = Self::insert_line(
            &txn,
            company_id,
            transaction.id,
            component.id,
            input.to_location_id,
            None,
            input.quantity,
            component.cost_per_unit,
        )
        .await?;

        txn.commit().await?;

        self.emit_posted(company_id, &transaction, 2).await;
        Ok(TransactionWithLines {
            transaction,
            lines: vec![out_line, in_line],
        })
    }

    /// Adjustment: a single signed correction with a mandatory reason code.
    #[instrument(skip(self, input), fields(component_id = %input.component_id))]
    pub async fn post_adjustment(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        input: AdjustmentInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        if input.quantity_change == 0 {
            return Err(ServiceError::validation("quantity_change cannot be zero"));
        }
        if input.reason_code.trim().is_empty() {
            return Err(ServiceError::validation("reason_code is required"));
        }

        let txn = self.db.begin().await?;

        let component = Self::fetch_component(&txn, company_id, input.component_id).await?;
        Self::fetch_location(&txn, company_id, input.location_id).await?;

        if let Some(lot_id) = input.lot_id {
            LotEntity::find_by_id(lot_id)
                .for_company(company_id)
                .filter(lot::Column::ComponentId.eq(component.id))
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("lot", lot_id))?;
            LotsService::apply_delta(&txn, company_id, lot_id, input.quantity_change).await?;
        }

        if input.quantity_change < 0 {
            let settings = SettingsService::effective_in(&txn, company_id).await?;
            Self::ensure_available(
                &txn,
                company_id,
                &component,
                input.location_id,
                -input.quantity_change,
                settings.allow_negative_inventory,
            )
            .await?;
        }

        let transaction = Self::insert_transaction(
            &txn,
            company_id,
            TransactionType::Adjustment,
            None,
            None,
            Some(input.reason_code.clone()),
            None,
            input.notes.clone(),
            created_by,
        )
        .await?;

        let line = Self::insert_line(
            &txn,
            company_id,
            transaction.id,
            component.id,
            input.location_id,
            input.lot_id,
            input.quantity_change,
            component.cost_per_unit,
        )
        .await?;

        txn.commit().await?;

        self.emit_posted(company_id, &transaction, 1).await;
        Ok(TransactionWithLines {
            transaction,
            lines: vec![line],
        })
    }

    /// Outbound: ship a SKU's finished goods out of the system.
    #[instrument(skip(self, input), fields(sku_id = %input.sku_id, units = input.units))]
    pub async fn post_outbound(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        input: OutboundInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        if input.units <= 0 {
            return Err(ServiceError::validation("units must be positive"));
        }

        let txn = self.db.begin().await?;

        let sku = SkuEntity::find_by_id(input.sku_id)
            .for_company(company_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("SKU", input.sku_id))?;

        let finished_component_id = sku.finished_component_id.ok_or_else(|| {
            ServiceError::validation(format!(
                "SKU {} has no finished-goods component to ship from",
                sku.code
            ))
        })?;
        let component = Self::fetch_component(&txn, company_id, finished_component_id).await?;
        Self::fetch_location(&txn, company_id, input.location_id).await?;

        let settings = SettingsService::effective_in(&txn, company_id).await?;
        let allow = input.allow_insufficient_inventory || settings.allow_negative_inventory;
        Self::ensure_available(
            &txn,
            company_id,
            &component,
            input.location_id,
            input.units,
            allow,
        )
        .await?;

        let transaction = Self::insert_transaction(
            &txn,
            company_id,
            TransactionType::Outbound,
            Some(sku.id),
            Some(input.units),
            None,
            input.reference.clone(),
            input.notes.clone(),
            created_by,
        )
        .await?;

        let line = Self::insert_line(
            &txn,
            company_id,
            transaction.id,
            component.id,
            input.location_id,
            None,
            -input.units,
            component.cost_per_unit,
        )
        .await?;

        txn.commit().await?;

        self.emit_posted(company_id, &transaction, 1).await;
        Ok(TransactionWithLines {
            transaction,
            lines: vec![line],
        })
    }

    /// Builds prefer serializable isolation where the backend offers it, so
    /// two concurrent builds cannot both pass the same availability check.
    async fn begin_for_build(&self) -> Result<DatabaseTransaction, ServiceError> {
        let db = self.db.as_ref();
        let txn = if db.get_database_backend() == DbBackend::Postgres {
            db.begin_with_config(Some(IsolationLevel::Serializable), None)
                .await?
        } else {
            db.begin().await?
        };
        Ok(txn)
    }

    async fn fetch_component<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component_id: Uuid,
    ) -> Result<component::Model, ServiceError> {
        let component = ComponentEntity::find_by_id(component_id)
            .for_company(company_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("component", component_id))?;

        if !component.active {
            return Err(ServiceError::validation(format!(
                "component {} is inactive",
                component.code
            )));
        }
        Ok(component)
    }

    async fn fetch_location<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        location_id: Uuid,
    ) -> Result<location::Model, ServiceError> {
        let location = LocationEntity::find_by_id(location_id)
            .for_company(company_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("location", location_id))?;

        if !location.active {
            return Err(ServiceError::validation(format!(
                "location {} is inactive",
                location.name
            )));
        }
        Ok(location)
    }

    async fn default_location<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
    ) -> Result<Uuid, ServiceError> {
        LocationEntity::find()
            .for_company(company_id)
            .filter(location::Column::IsDefault.eq(true))
            .one(conn)
            .await?
            .map(|l| l.id)
            .ok_or_else(|| ServiceError::validation("tenant has no default location"))
    }

    async fn ensure_available<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component: &component::Model,
        location_id: Uuid,
        needed: i64,
        allow_negative: bool,
    ) -> Result<(), ServiceError> {
        if allow_negative {
            return Ok(());
        }

        let available =
            LedgerService::on_hand_in(conn, company_id, component.id, Some(location_id)).await?;
        if available < needed {
            return Err(ServiceError::InsufficientInventory(vec![StockShortage {
                component_id: component.id,
                component_code: component.code.clone(),
                required: needed,
                available,
                shortage: needed - available,
            }]));
        }
        Ok(())
    }

    async fn find_or_create_lot<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        component: &component::Model,
        new_lot: &NewLot,
        quantity: i64,
    ) -> Result<Uuid, ServiceError> {
        if new_lot.lot_code.trim().is_empty() {
            return Err(ServiceError::validation("lot_code cannot be empty"));
        }

        let existing = LotEntity::find()
            .for_company(company_id)
            .filter(lot::Column::ComponentId.eq(component.id))
            .filter(lot::Column::LotCode.eq(new_lot.lot_code.clone()))
            .one(conn)
            .await?;

        match existing {
            Some(found) => {
                if let (Some(expiry), Some(known)) = (new_lot.expiry_date, found.expiry_date) {
                    if expiry != known {
                        return Err(ServiceError::Conflict(format!(
                            "lot {} already exists with expiry {}",
                            found.lot_code, known
                        )));
                    }
                }
                LotsService::apply_delta(conn, company_id, found.id, quantity).await?;
                Ok(found.id)
            }
            None => {
                let lot_id = Uuid::new_v4();
                lot::ActiveModel {
                    id: Set(lot_id),
                    company_id: Set(company_id),
                    component_id: Set(component.id),
                    lot_code: Set(new_lot.lot_code.clone()),
                    expiry_date: Set(new_lot.expiry_date),
                    supplier: Set(new_lot.supplier.clone()),
                    received_at: Set(Utc::now()),
                    quantity: Set(quantity),
                    active: Set(true),
                }
                .insert(conn)
                .await?;
                Ok(lot_id)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_transaction<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        kind: TransactionType,
        sku_id: Option<Uuid>,
        units: Option<i64>,
        reason_code: Option<String>,
        reference: Option<String>,
        notes: Option<String>,
        created_by: Option<Uuid>,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        inventory_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            transaction_type: Set(kind.as_str().to_string()),
            sku_id: Set(sku_id),
            units: Set(units),
            reason_code: Set(reason_code),
            reference: Set(reference),
            notes: Set(notes),
            created_by: Set(created_by),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::from)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_line<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        transaction_id: Uuid,
        component_id: Uuid,
        location_id: Uuid,
        lot_id: Option<Uuid>,
        quantity_change: i64,
        unit_cost_snapshot: Decimal,
    ) -> Result<transaction_line::Model, ServiceError> {
        let line = transaction_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            transaction_id: Set(transaction_id),
            component_id: Set(component_id),
            location_id: Set(location_id),
            lot_id: Set(lot_id),
            quantity_change: Set(quantity_change),
            unit_cost_snapshot: Set(unit_cost_snapshot),
        }
        .insert(conn)
        .await?;

        LedgerService::apply_line_to_balances(
            conn,
            company_id,
            component_id,
            location_id,
            quantity_change,
        )
        .await?;

        Ok(line)
    }

    async fn emit_posted(
        &self,
        company_id: Uuid,
        transaction: &inventory_transaction::Model,
        line_count: usize,
    ) {
        self.event_sender
            .send_or_log(Event::TransactionPosted {
                company_id,
                transaction_id: transaction.id,
                transaction_type: transaction.transaction_type.clone(),
                line_count,
            })
            .await;
    }
}
