use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{DbPool, ScopedSelect};
use crate::entities::company::Entity as CompanyEntity;
use crate::entities::component::{self, Entity as ComponentEntity};
use crate::entities::lot::{self, Entity as LotEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::notifications::{AlertMessage, Notifier};
use crate::services::ledger::LedgerService;
use crate::services::reorder::{classify, ReorderStatus};
use crate::services::settings::SettingsService;

/// Periodic reorder and lot-expiry alert evaluation. Tenants are walked
/// sequentially; each tenant gets its own time budget and its own error
/// handling so one bad tenant cannot take the batch down.
#[derive(Clone)]
pub struct AlertService {
    db: Arc<DbPool>,
    ledger: LedgerService,
    settings: SettingsService,
    event_sender: EventSender,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Default)]
pub struct AlertRunSummary {
    pub tenants_evaluated: usize,
    pub tenants_failed: usize,
    pub alerts_raised: usize,
}

impl AlertService {
    pub fn new(
        db: Arc<DbPool>,
        ledger: LedgerService,
        settings: SettingsService,
        event_sender: EventSender,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            ledger,
            settings,
            event_sender,
            notifier,
        }
    }

    /// Spawn the interval loop. Returns immediately; the loop runs for the
    /// lifetime of the process.
    pub fn start_worker(service: AlertService, cfg: &AppConfig) {
        if !cfg.alerts_enabled {
            info!("alert worker disabled by configuration");
            return;
        }

        let interval = Duration::from_secs(cfg.alert_interval_secs.max(60));
        let per_tenant = Duration::from_secs(cfg.alert_tenant_timeout_secs.max(1));

        tokio::spawn(async move {
            loop {
                match service.run_once(per_tenant).await {
                    Ok(summary) => {
                        info!(
                            tenants = summary.tenants_evaluated,
                            failed = summary.tenants_failed,
                            alerts = summary.alerts_raised,
                            "alert evaluation finished"
                        );
                    }
                    Err(e) => error!(error = %e, "alert evaluation run failed"),
                }
                sleep(interval).await;
            }
        });
    }

    /// One full pass over all tenants.
    #[instrument(skip(self))]
    pub async fn run_once(&self, per_tenant: Duration) -> Result<AlertRunSummary, ServiceError> {
        let companies = CompanyEntity::find().all(self.db.as_ref()).await?;
        let mut summary = AlertRunSummary::default();

        for company in companies {
            summary.tenants_evaluated += 1;
            match timeout(per_tenant, self.evaluate_tenant(company.id)).await {
                Ok(Ok(raised)) => summary.alerts_raised += raised,
                Ok(Err(e)) => {
                    summary.tenants_failed += 1;
                    warn!(company_id = %company.id, error = %e, "tenant alert evaluation failed");
                }
                Err(_) => {
                    summary.tenants_failed += 1;
                    warn!(company_id = %company.id, "tenant alert evaluation timed out");
                }
            }
        }

        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn evaluate_tenant(&self, company_id: Uuid) -> Result<usize, ServiceError> {
        let settings = self.settings.effective(company_id).await?;
        if !settings.alerts_enabled {
            return Ok(0);
        }

        let destinations = settings.alert_destinations();
        let mut raised = 0usize;

        let components = ComponentEntity::find()
            .for_company(company_id)
            .filter(component::Column::Active.eq(true))
            .all(self.db.as_ref())
            .await?;

        let ids: Vec<Uuid> = components.iter().map(|c| c.id).collect();
        let balances = self.ledger.balances_by_component(company_id, &ids).await?;

        for component in &components {
            let on_hand = balances.get(&component.id).copied().unwrap_or(0);
            let status = classify(
                on_hand,
                component.reorder_point,
                settings.reorder_warning_multiplier,
            );
            if status == ReorderStatus::Ok {
                continue;
            }

            raised += 1;
            self.event_sender
                .send_or_log(Event::ComponentBelowReorderPoint {
                    company_id,
                    component_id: component.id,
                    component_code: component.code.clone(),
                    on_hand,
                    reorder_point: component.reorder_point,
                    status: status.as_str().to_string(),
                })
                .await;

            let message = AlertMessage {
                subject: format!("Reorder {}: {}", status.as_str(), component.code),
                body: format!(
                    "{} ({}) is at {} on hand against a reorder point of {}.",
                    component.name, component.code, on_hand, component.reorder_point
                ),
            };
            if let Err(e) = self.notifier.deliver(&destinations, &message).await {
                warn!(company_id = %company_id, error = %e, "alert delivery failed");
            }
        }

        let horizon =
            Utc::now().date_naive() + ChronoDuration::days(i64::from(settings.lot_expiry_warning_days));
        let expiring = LotEntity::find()
            .for_company(company_id)
            .filter(lot::Column::Active.eq(true))
            .filter(lot::Column::Quantity.gt(0))
            .filter(lot::Column::ExpiryDate.is_not_null())
            .filter(lot::Column::ExpiryDate.lte(horizon))
            .all(self.db.as_ref())
            .await?;

        let component_codes: std::collections::HashMap<Uuid, String> = components
            .iter()
            .map(|c| (c.id, c.code.clone()))
            .collect();

        for found in expiring {
            let expiry = match found.expiry_date {
                Some(date) => date,
                None => continue,
            };
            let component_code = component_codes
                .get(&found.component_id)
                .cloned()
                .unwrap_or_default();

            raised += 1;
            self.event_sender
                .send_or_log(Event::LotExpiringSoon {
                    company_id,
                    lot_id: found.id,
                    lot_code: found.lot_code.clone(),
                    component_code: component_code.clone(),
                    expiry_date: expiry,
                })
                .await;

            let message = AlertMessage {
                subject: format!("Lot expiring: {}", found.lot_code),
                body: format!(
                    "Lot {} of {} ({} on hand) expires on {}.",
                    found.lot_code, component_code, found.quantity, expiry
                ),
            };
            if let Err(e) = self.notifier.deliver(&destinations, &message).await {
                warn!(company_id = %company_id, error = %e, "alert delivery failed");
            }
        }

        Ok(raised)
    }
}
