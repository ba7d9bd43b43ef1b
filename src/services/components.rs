use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::component::{self, Entity as ComponentEntity};
use crate::errors::ServiceError;
use crate::services::ledger::LedgerService;
use crate::services::reorder::{classify, ConsumptionForecast, ReorderService, ReorderStatus};
use crate::services::settings::SettingsService;

/// A component with its derived quantities. The stored row never carries an
/// on-hand figure; it is always computed.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentView {
    #[serde(flatten)]
    pub component: component::Model,
    pub quantity_on_hand: i64,
    pub reorder_status: ReorderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentDetail {
    #[serde(flatten)]
    pub view: ComponentView,
    pub forecast: ConsumptionForecast,
}

#[derive(Debug, Clone)]
pub struct CreateComponentInput {
    pub code: String,
    pub name: String,
    pub unit_of_measure: String,
    pub cost_per_unit: Decimal,
    pub reorder_point: i64,
    pub lead_time_days: i32,
    pub lot_tracked: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateComponentInput {
    pub name: Option<String>,
    pub unit_of_measure: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub reorder_point: Option<i64>,
    pub lead_time_days: Option<i32>,
    pub lot_tracked: Option<bool>,
}

#[derive(Clone)]
pub struct ComponentsService {
    db: Arc<DbPool>,
    ledger: LedgerService,
    reorder: ReorderService,
    settings: SettingsService,
}

impl ComponentsService {
    pub fn new(
        db: Arc<DbPool>,
        ledger: LedgerService,
        reorder: ReorderService,
        settings: SettingsService,
    ) -> Self {
        Self {
            db,
            ledger,
            reorder,
            settings,
        }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: CreateComponentInput,
    ) -> Result<component::Model, ServiceError> {
        Self::validate_fields(&input.code, &input.name, input.cost_per_unit, input.reorder_point)?;

        let duplicate = ComponentEntity::find()
            .for_company(company_id)
            .filter(component::Column::Code.eq(input.code.clone()))
            .one(self.db.as_ref())
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "component code {} already exists",
                input.code
            )));
        }

        let now = Utc::now();
        component::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            code: Set(input.code),
            name: Set(input.name),
            unit_of_measure: Set(input.unit_of_measure),
            cost_per_unit: Set(input.cost_per_unit),
            reorder_point: Set(input.reorder_point),
            lead_time_days: Set(input.lead_time_days),
            lot_tracked: Set(input.lot_tracked),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        component_id: Uuid,
        input: UpdateComponentInput,
    ) -> Result<component::Model, ServiceError> {
        let existing = self.fetch(company_id, component_id).await?;

        if let Some(cost) = input.cost_per_unit {
            if cost < Decimal::ZERO {
                return Err(ServiceError::validation("cost_per_unit cannot be negative"));
            }
        }
        if let Some(point) = input.reorder_point {
            if point < 0 {
                return Err(ServiceError::validation("reorder_point cannot be negative"));
            }
        }

        let mut active: component::ActiveModel = existing.into();
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::validation("name cannot be empty"));
            }
            active.name = Set(name);
        }
        if let Some(uom) = input.unit_of_measure {
            active.unit_of_measure = Set(uom);
        }
        if let Some(cost) = input.cost_per_unit {
            active.cost_per_unit = Set(cost);
        }
        if let Some(point) = input.reorder_point {
            active.reorder_point = Set(point);
        }
        if let Some(days) = input.lead_time_days {
            active.lead_time_days = Set(days);
        }
        if let Some(lot_tracked) = input.lot_tracked {
            active.lot_tracked = Set(lot_tracked);
        }
        active.updated_at = Set(Utc::now());

        active.update(self.db.as_ref()).await.map_err(ServiceError::from)
    }

    /// Components are never hard-deleted once referenced by a transaction or
    /// BOM; delete always soft-deactivates.
    #[instrument(skip(self))]
    pub async fn deactivate(
        &self,
        company_id: Uuid,
        component_id: Uuid,
    ) -> Result<component::Model, ServiceError> {
        let existing = self.fetch(company_id, component_id).await?;
        let mut active: component::ActiveModel = existing.into();
        active.active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(self.db.as_ref()).await.map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        company_id: Uuid,
        component_id: Uuid,
    ) -> Result<ComponentDetail, ServiceError> {
        let component = self.fetch(company_id, component_id).await?;
        let settings = self.settings.effective(company_id).await?;

        let on_hand = self.ledger.on_hand(company_id, component.id, None).await?;
        let status = classify(on_hand, component.reorder_point, settings.reorder_warning_multiplier);
        let forecast = self
            .reorder
            .forecast_for_component(company_id, &component, on_hand, &settings)
            .await?;

        Ok(ComponentDetail {
            view: ComponentView {
                component,
                quantity_on_hand: on_hand,
                reorder_status: status,
            },
            forecast,
        })
    }

    /// Paginated list with derived on-hand and reorder status. Filtering by
    /// status has to classify before paging, so that path loads the tenant's
    /// components in full (fine at this catalog scale).
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        status_filter: Option<ReorderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ComponentView>, u64), ServiceError> {
        let settings = self.settings.effective(company_id).await?;
        let per_page = per_page.max(1);
        let page = page.max(1);

        if let Some(wanted) = status_filter {
            let all = ComponentEntity::find()
                .for_company(company_id)
                .filter(component::Column::Active.eq(true))
                .order_by_asc(component::Column::Code)
                .all(self.db.as_ref())
                .await?;

            let views = self.attach_quantities(company_id, all, &settings).await?;
            let matching: Vec<ComponentView> = views
                .into_iter()
                .filter(|v| v.reorder_status == wanted)
                .collect();

            let total = matching.len() as u64;
            let start = ((page - 1) * per_page) as usize;
            let page_items = matching
                .into_iter()
                .skip(start)
                .take(per_page as usize)
                .collect();
            return Ok((page_items, total));
        }

        let paginator = ComponentEntity::find()
            .for_company(company_id)
            .order_by_asc(component::Column::Code)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page - 1).await?;
        let views = self.attach_quantities(company_id, models, &settings).await?;
        Ok((views, total))
    }

    /// Full reorder report: every active component with its status and
    /// runout forecast. The alert job and the report endpoint share this
    /// arithmetic through the classifier and forecaster.
    #[instrument(skip(self))]
    pub async fn reorder_report(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<ComponentDetail>, ServiceError> {
        let settings = self.settings.effective(company_id).await?;
        let components = ComponentEntity::find()
            .for_company(company_id)
            .filter(component::Column::Active.eq(true))
            .order_by_asc(component::Column::Code)
            .all(self.db.as_ref())
            .await?;

        let ids: Vec<Uuid> = components.iter().map(|c| c.id).collect();
        let balances = self.ledger.balances_by_component(company_id, &ids).await?;

        let mut report = Vec::with_capacity(components.len());
        for component in components {
            let on_hand = balances.get(&component.id).copied().unwrap_or(0);
            let status = classify(
                on_hand,
                component.reorder_point,
                settings.reorder_warning_multiplier,
            );
            let forecast = self
                .reorder
                .forecast_for_component(company_id, &component, on_hand, &settings)
                .await?;
            report.push(ComponentDetail {
                view: ComponentView {
                    component,
                    quantity_on_hand: on_hand,
                    reorder_status: status,
                },
                forecast,
            });
        }
        Ok(report)
    }

    async fn attach_quantities(
        &self,
        company_id: Uuid,
        components: Vec<component::Model>,
        settings: &crate::services::settings::EffectiveSettings,
    ) -> Result<Vec<ComponentView>, ServiceError> {
        let ids: Vec<Uuid> = components.iter().map(|c| c.id).collect();
        let balances = self.ledger.balances_by_component(company_id, &ids).await?;

        Ok(components
            .into_iter()
            .map(|component| {
                let on_hand = balances.get(&component.id).copied().unwrap_or(0);
                let status = classify(
                    on_hand,
                    component.reorder_point,
                    settings.reorder_warning_multiplier,
                );
                ComponentView {
                    component,
                    quantity_on_hand: on_hand,
                    reorder_status: status,
                }
            })
            .collect())
    }

    async fn fetch(
        &self,
        company_id: Uuid,
        component_id: Uuid,
    ) -> Result<component::Model, ServiceError> {
        ComponentEntity::find_by_id(component_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("component", component_id))
    }

    fn validate_fields(
        code: &str,
        name: &str,
        cost_per_unit: Decimal,
        reorder_point: i64,
    ) -> Result<(), ServiceError> {
        if code.trim().is_empty() {
            return Err(ServiceError::validation("code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(ServiceError::validation("name cannot be empty"));
        }
        if cost_per_unit < Decimal::ZERO {
            return Err(ServiceError::validation("cost_per_unit cannot be negative"));
        }
        if reorder_point < 0 {
            return Err(ServiceError::validation("reorder_point cannot be negative"));
        }
        Ok(())
    }
}
