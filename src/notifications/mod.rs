use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// An alert ready for delivery, already rendered for humans.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivery destinations resolved from a tenant's settings.
#[derive(Debug, Clone, Default)]
pub struct AlertDestinations {
    pub slack_webhook_url: Option<String>,
    pub email: Option<String>,
}

/// Outbound alert delivery. One implementation per transport; the dispatcher
/// fans a message out to every destination the tenant configured.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(
        &self,
        destinations: &AlertDestinations,
        message: &AlertMessage,
    ) -> Result<(), NotificationError>;
}

/// Posts alerts to a Slack incoming webhook, and logs email alerts (SMTP
/// relaying is owned by the surrounding infrastructure).
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, destinations, message), fields(subject = %message.subject))]
    async fn deliver(
        &self,
        destinations: &AlertDestinations,
        message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        if let Some(url) = &destinations.slack_webhook_url {
            let payload = json!({
                "text": format!("*{}*\n{}", message.subject, message.body),
            });
            let response = self
                .client
                .post(url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| NotificationError::Delivery(e.to_string()))?;

            if !response.status().is_success() {
                return Err(NotificationError::Delivery(format!(
                    "slack webhook returned {}",
                    response.status()
                )));
            }
        }

        if let Some(email) = &destinations.email {
            // Outbound mail goes through the platform relay; record the
            // handoff so operators can trace deliveries.
            info!(to = %email, subject = %message.subject, "email alert queued");
        }

        if destinations.slack_webhook_url.is_none() && destinations.email.is_none() {
            warn!(subject = %message.subject, "alert raised but tenant has no destinations configured");
        }

        Ok(())
    }
}

/// Drops everything; used in tests and when alerting is disabled.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn deliver(
        &self,
        _destinations: &AlertDestinations,
        _message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        Ok(())
    }
}
