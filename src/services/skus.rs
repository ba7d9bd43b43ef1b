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
use crate::entities::brand::{self, Entity as BrandEntity};
use crate::entities::component::{self, Entity as ComponentEntity};
use crate::entities::sku::{self, Entity as SkuEntity};
use crate::errors::ServiceError;
use crate::services::bom::{BomService, ComponentAvailability};
use crate::services::lots::{AllocationOutcome, LotsService};

#[derive(Debug, Clone)]
pub struct CreateSkuInput {
    pub code: String,
    pub name: String,
    pub brand_id: Option<Uuid>,
    pub finished_component_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSkuInput {
    pub name: Option<String>,
    pub brand_id: Option<Option<Uuid>>,
    pub finished_component_id: Option<Option<Uuid>>,
}

/// Availability check plus lot allocation preview for a prospective build.
/// Nothing is reserved; this is what a planner looks at before committing.
#[derive(Debug, Clone, Serialize)]
pub struct LotAvailabilityPreview {
    pub sku_id: Uuid,
    pub bom_version_id: Uuid,
    pub units: i64,
    pub unit_cost: Decimal,
    pub can_build: bool,
    pub components: Vec<ComponentLotPreview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentLotPreview {
    #[serde(flatten)]
    pub availability: ComponentAvailability,
    pub lot_tracked: bool,
    /// FIFO-by-expiry allocation the build would use, for lot-tracked
    /// components.
    pub allocation: Option<AllocationOutcome>,
}

#[derive(Clone)]
pub struct SkusService {
    db: Arc<DbPool>,
}

impl SkusService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: CreateSkuInput,
    ) -> Result<sku::Model, ServiceError> {
        if input.code.trim().is_empty() {
            return Err(ServiceError::validation("code cannot be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::validation("name cannot be empty"));
        }

        let duplicate = SkuEntity::find()
            .for_company(company_id)
            .filter(sku::Column::Code.eq(input.code.clone()))
            .one(self.db.as_ref())
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU code {} already exists",
                input.code
            )));
        }

        if let Some(component_id) = input.finished_component_id {
            self.ensure_component(company_id, component_id).await?;
        }
        if let Some(brand_id) = input.brand_id {
            self.ensure_brand(company_id, brand_id).await?;
        }

        sku::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            brand_id: Set(input.brand_id),
            code: Set(input.code),
            name: Set(input.name),
            finished_component_id: Set(input.finished_component_id),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        sku_id: Uuid,
        input: UpdateSkuInput,
    ) -> Result<sku::Model, ServiceError> {
        let existing = self.get(company_id, sku_id).await?;

        if let Some(Some(component_id)) = input.finished_component_id {
            self.ensure_component(company_id, component_id).await?;
        }
        if let Some(Some(brand_id)) = input.brand_id {
            self.ensure_brand(company_id, brand_id).await?;
        }

        let mut active: sku::ActiveModel = existing.into();
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::validation("name cannot be empty"));
            }
            active.name = Set(name);
        }
        if let Some(brand) = input.brand_id {
            active.brand_id = Set(brand);
        }
        if let Some(finished) = input.finished_component_id {
            active.finished_component_id = Set(finished);
        }

        active.update(self.db.as_ref()).await.map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, sku_id: Uuid) -> Result<sku::Model, ServiceError> {
        SkuEntity::find_by_id(sku_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("SKU", sku_id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<sku::Model>, u64), ServiceError> {
        let paginator = SkuEntity::find()
            .for_company(company_id)
            .order_by_asc(sku::Column::Code)
            .paginate(self.db.as_ref(), per_page.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.max(1) - 1).await?;
        Ok((items, total))
    }

    /// Preview what a build of `units` would need and which lots FIFO
    /// selection would drain, without writing anything.
    #[instrument(skip(self))]
    pub async fn lot_availability(
        &self,
        company_id: Uuid,
        sku_id: Uuid,
        units: i64,
    ) -> Result<LotAvailabilityPreview, ServiceError> {
        let db = self.db.as_ref();
        let sku = self.get(company_id, sku_id).await?;

        let version = BomService::active_version_for_sku_in(db, company_id, sku.id)
            .await?
            .ok_or_else(|| {
                ServiceError::validation(format!("SKU {} has no active BOM version", sku.code))
            })?;

        let availability =
            BomService::check_availability_in(db, company_id, version.id, units, None).await?;
        let unit_cost = BomService::unit_cost_in(db, company_id, version.id).await?;

        let mut components = Vec::with_capacity(availability.len());
        let mut can_build = true;
        for item in availability {
            if item.shortage > 0 {
                can_build = false;
            }

            let model = ComponentEntity::find_by_id(item.component_id)
                .for_company(company_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("component", item.component_id))?;

            let allocation = if model.lot_tracked {
                let outcome = LotsService::select_in(
                    db,
                    company_id,
                    model.id,
                    item.required,
                    false,
                    Utc::now().date_naive(),
                )
                .await?;
                if outcome.uncovered > 0 {
                    can_build = false;
                }
                Some(outcome)
            } else {
                None
            };

            components.push(ComponentLotPreview {
                availability: item,
                lot_tracked: model.lot_tracked,
                allocation,
            });
        }

        Ok(LotAvailabilityPreview {
            sku_id: sku.id,
            bom_version_id: version.id,
            units,
            unit_cost,
            can_build,
            components,
        })
    }

    async fn ensure_component(
        &self,
        company_id: Uuid,
        component_id: Uuid,
    ) -> Result<(), ServiceError> {
        ComponentEntity::find_by_id(component_id)
            .for_company(company_id)
            .filter(component::Column::Active.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("component", component_id))?;
        Ok(())
    }

    async fn ensure_brand(&self, company_id: Uuid, brand_id: Uuid) -> Result<(), ServiceError> {
        BrandEntity::find_by_id(brand_id)
            .for_company(company_id)
            .filter(brand::Column::Active.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("brand", brand_id))?;
        Ok(())
    }
}
