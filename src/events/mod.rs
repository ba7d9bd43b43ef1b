use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Domain events emitted by the services. The processor task logs them; the
/// alert evaluator additionally delivers the alert-class events to the
/// tenant's configured channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TransactionPosted {
        company_id: Uuid,
        transaction_id: Uuid,
        transaction_type: String,
        line_count: usize,
    },
    BomVersionActivated {
        company_id: Uuid,
        sku_id: Uuid,
        bom_version_id: Uuid,
        version_number: i32,
    },
    ComponentBelowReorderPoint {
        company_id: Uuid,
        component_id: Uuid,
        component_code: String,
        on_hand: i64,
        reorder_point: i64,
        status: String,
    },
    LotExpiringSoon {
        company_id: Uuid,
        lot_id: Uuid,
        lot_code: String,
        component_code: String,
        expiry_date: NaiveDate,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TransactionPosted { .. } => "transaction.posted",
            Event::BomVersionActivated { .. } => "bom_version.activated",
            Event::ComponentBelowReorderPoint { .. } => "component.below_reorder_point",
            Event::LotExpiringSoon { .. } => "lot.expiring_soon",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {e}"))
    }

    /// Send an event, logging instead of failing when the channel is closed.
    /// Posting a transaction must not fail because the event loop is gone.
    pub async fn send_or_log(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.send(event).await {
            error!(event = kind, error = %e, "dropping event");
        }
    }
}

/// Drains the event channel for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::TransactionPosted {
                company_id,
                transaction_id,
                transaction_type,
                line_count,
            } => {
                info!(
                    %company_id,
                    %transaction_id,
                    %transaction_type,
                    line_count,
                    "transaction posted"
                );
            }
            Event::BomVersionActivated {
                company_id,
                sku_id,
                bom_version_id,
                version_number,
            } => {
                info!(%company_id, %sku_id, %bom_version_id, version_number, "BOM version activated");
            }
            Event::ComponentBelowReorderPoint {
                company_id,
                component_code,
                on_hand,
                reorder_point,
                status,
                ..
            } => {
                info!(
                    %company_id,
                    %component_code,
                    on_hand,
                    reorder_point,
                    %status,
                    "component at or below reorder threshold"
                );
            }
            Event::LotExpiringSoon {
                company_id,
                lot_code,
                component_code,
                expiry_date,
                ..
            } => {
                info!(%company_id, %lot_code, %component_code, %expiry_date, "lot expiring soon");
            }
        }
    }
}
