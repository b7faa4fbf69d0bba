use std::sync::Arc;

use canlabel_core::config::AppConfig;
use thiserror::Error;
use tracing::{info, warn};

use crate::email::{EmailError, EmailSender, HttpEmailClient, NoopEmailSender};
use crate::notifications::{self, Notifier};
use crate::payments::{PaymentError, PaymentProcessor, StripeCheckoutClient};

/// Shared, immutable handler state. Clients are built once here and injected.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub notifier: Notifier,
    pub payments: Option<Arc<dyn PaymentProcessor>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("email client setup failed: {0}")]
    Email(#[source] EmailError),
    #[error("payment client setup failed: {0}")]
    Payments(#[source] PaymentError),
    #[error("email templates failed to load: {0}")]
    Templates(#[source] tera::Error),
}

/// Builds handler state from an already loaded and validated config. The
/// caller loads config first so logging can be initialized from it.
pub async fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let email: Arc<dyn EmailSender> =
        match HttpEmailClient::from_config(&config.email).map_err(BootstrapError::Email)? {
            Some(client) => Arc::new(client),
            None => {
                warn!(
                    event_name = "system.bootstrap.email_noop",
                    correlation_id = "bootstrap",
                    "email api key not configured, notifications will only be logged"
                );
                Arc::new(NoopEmailSender)
            }
        };

    let payments: Option<Arc<dyn PaymentProcessor>> =
        match StripeCheckoutClient::from_config(&config.payments)
            .map_err(BootstrapError::Payments)?
        {
            Some(client) => Some(Arc::new(client)),
            None => {
                warn!(
                    event_name = "system.bootstrap.payments_disabled",
                    correlation_id = "bootstrap",
                    "payments secret key not configured, sample checkout is disabled"
                );
                None
            }
        };
    if !config.payments.webhook_configured() {
        warn!(
            event_name = "system.bootstrap.webhook_unverifiable",
            correlation_id = "bootstrap",
            "webhook secret not configured, every payment confirmation will be rejected"
        );
    }

    let templates = notifications::init_templates().map_err(BootstrapError::Templates)?;
    let notifier = Notifier::new(email, templates, &config.email);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        email_mode = if notifier.is_noop() { "noop" } else { "http" },
        payments_enabled = payments.is_some(),
        "application state initialized"
    );

    Ok(AppState { config: Arc::new(config), notifier, payments })
}
