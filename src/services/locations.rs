use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::location::{self, Entity as LocationEntity, LocationKind};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct CreateLocationInput {
    pub name: String,
    pub kind: LocationKind,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLocationInput {
    pub name: Option<String>,
    pub kind: Option<LocationKind>,
    pub is_default: Option<bool>,
}

/// Location management. Invariant held here: every tenant with locations has
/// exactly one default, and the default cannot be deactivated.
#[derive(Clone)]
pub struct LocationsService {
    db: Arc<DbPool>,
}

impl LocationsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: CreateLocationInput,
    ) -> Result<location::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::validation("name cannot be empty"));
        }

        let txn = self.db.begin().await?;

        let duplicate = LocationEntity::find()
            .for_company(company_id)
            .filter(location::Column::Name.eq(input.name.clone()))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "location {} already exists",
                input.name
            )));
        }

        let has_any = LocationEntity::find()
            .for_company(company_id)
            .one(&txn)
            .await?
            .is_some();

        // The first location always becomes the default.
        let is_default = input.is_default || !has_any;
        if is_default && has_any {
            Self::clear_default(&txn, company_id).await?;
        }

        let created = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(input.name),
            kind: Set(input.kind.as_str().to_string()),
            is_default: Set(is_default),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        location_id: Uuid,
        input: UpdateLocationInput,
    ) -> Result<location::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = LocationEntity::find_by_id(location_id)
            .for_company(company_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("location", location_id))?;

        if input.is_default == Some(false) && existing.is_default {
            return Err(ServiceError::validation(
                "demote the default by making another location the default",
            ));
        }

        let promote = input.is_default == Some(true) && !existing.is_default;
        if promote {
            Self::clear_default(&txn, company_id).await?;
        }

        let mut active: location::ActiveModel = existing.into();
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::validation("name cannot be empty"));
            }
            active.name = Set(name);
        }
        if let Some(kind) = input.kind {
            active.kind = Set(kind.as_str().to_string());
        }
        if promote {
            active.is_default = Set(true);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deletion is always a soft deactivation; the default location refuses.
    #[instrument(skip(self))]
    pub async fn deactivate(
        &self,
        company_id: Uuid,
        location_id: Uuid,
    ) -> Result<location::Model, ServiceError> {
        let existing = LocationEntity::find_by_id(location_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("location", location_id))?;

        if existing.is_default {
            return Err(ServiceError::validation(
                "the default location cannot be deactivated",
            ));
        }

        let mut active: location::ActiveModel = existing.into();
        active.active = Set(false);
        active.update(self.db.as_ref()).await.map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<location::Model>, ServiceError> {
        LocationEntity::find()
            .for_company(company_id)
            .order_by_asc(location::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        company_id: Uuid,
        location_id: Uuid,
    ) -> Result<location::Model, ServiceError> {
        LocationEntity::find_by_id(location_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("location", location_id))
    }

    async fn clear_default<C: sea_orm::ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
    ) -> Result<(), ServiceError> {
        let current = LocationEntity::find()
            .for_company(company_id)
            .filter(location::Column::IsDefault.eq(true))
            .all(conn)
            .await?;

        for row in current {
            let mut active: location::ActiveModel = row.into();
            active.is_default = Set(false);
            active.update(conn).await?;
        }
        Ok(())
    }
}
