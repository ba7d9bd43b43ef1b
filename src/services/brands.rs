use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::brand::{self, Entity as BrandEntity};
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct BrandsService {
    db: Arc<DbPool>,
}

impl BrandsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        company_id: Uuid,
        name: String,
    ) -> Result<brand::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("name cannot be empty"));
        }

        let duplicate = BrandEntity::find()
            .for_company(company_id)
            .filter(brand::Column::Name.eq(name.clone()))
            .one(self.db.as_ref())
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "brand {name} already exists"
            )));
        }

        brand::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(name),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<brand::Model>, ServiceError> {
        BrandEntity::find()
            .for_company(company_id)
            .order_by_asc(brand::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from)
    }

    /// Scoped existence check used when attaching a SKU to a brand.
    pub async fn ensure_exists(
        &self,
        company_id: Uuid,
        brand_id: Uuid,
    ) -> Result<(), ServiceError> {
        BrandEntity::find_by_id(brand_id)
            .for_company(company_id)
            .filter(brand::Column::Active.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("brand", brand_id))?;
        Ok(())
    }
}
