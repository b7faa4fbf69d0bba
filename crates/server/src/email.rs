//! Transactional email delivery.
//!
//! [`HttpEmailClient`] posts `{from, to, subject, html}` to a Resend-style API
//! with a bearer key. Without a key the server runs with [`NoopEmailSender`],
//! which only logs.

use std::time::Duration;

use async_trait::async_trait;
use canlabel_core::config::EmailConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<SentEmail, EmailError>;

    /// True when messages are logged instead of delivered.
    fn is_noop(&self) -> bool {
        false
    }
}

pub struct HttpEmailClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl HttpEmailClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, EmailError> {
        let Some(api_key) = config.api_key.clone().filter(|_| config.is_configured()) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            endpoint: format!("{}/emails", config.api_base_url.trim_end_matches('/')),
            api_key,
        }))
    }
}

#[async_trait]
impl EmailSender for HttpEmailClient {
    async fn send(&self, email: &OutboundEmail) -> Result<SentEmail, EmailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::HttpStatus { status: status.as_u16(), body });
        }

        Ok(response.json::<SentEmail>().await?)
    }
}

#[derive(Clone, Debug, Default)]
pub struct NoopEmailSender;

#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<SentEmail, EmailError> {
        let id = format!("noop-{}", Uuid::new_v4().simple());
        info!(
            event_name = "email.noop.skipped",
            email_id = %id,
            to = %email.to,
            subject = %email.subject,
            "email api key not configured, message logged only"
        );
        Ok(SentEmail { id })
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use canlabel_core::config::AppConfig;

    use super::*;

    fn outbound() -> OutboundEmail {
        OutboundEmail {
            from: "Canlabel <preventivi@canlabel.it>".to_string(),
            to: "mario@example.com".to_string(),
            subject: "Richiesta ricevuta".to_string(),
            html: "<p>Grazie</p>".to_string(),
        }
    }

    #[test]
    fn client_is_not_built_without_api_key() {
        let config = AppConfig::default();
        let client = HttpEmailClient::from_config(&config.email).expect("builder should not fail");
        assert!(client.is_none());
    }

    #[test]
    fn client_targets_emails_endpoint() {
        let mut config = AppConfig::default();
        config.email.api_key = Some("re_test_key".to_string().into());
        config.email.api_base_url = "https://mail.example.test/".to_string();

        let client = HttpEmailClient::from_config(&config.email)
            .expect("builder should not fail")
            .expect("client should be built");
        assert_eq!(client.endpoint, "https://mail.example.test/emails");
        assert!(!client.is_noop());
    }

    #[tokio::test]
    async fn noop_sender_reports_success() {
        let sender = NoopEmailSender;
        let sent = sender.send(&outbound()).await.expect("noop never fails");
        assert!(sent.id.starts_with("noop-"));
        assert!(sender.is_noop());
    }

    #[test]
    fn outbound_email_serializes_provider_shape() {
        let value = serde_json::to_value(outbound()).expect("serialize");
        assert_eq!(value["to"], "mario@example.com");
        assert_eq!(value["html"], "<p>Grazie</p>");
    }

    #[test]
    fn email_error_display_http_status() {
        let error = EmailError::HttpStatus { status: 422, body: "invalid from".to_string() };
        assert_eq!(error.to_string(), "email provider returned HTTP 422: invalid from");
    }
}
