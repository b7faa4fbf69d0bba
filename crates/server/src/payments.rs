//! Hosted checkout sessions and webhook signature verification.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use canlabel_core::config::PaymentsConfig;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const CHECKOUT_COMPLETED_EVENT: &str = "checkout.session.completed";

/// One fixed-price line item plus the metadata needed to rebuild the quote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutOrder {
    pub customer_email: String,
    pub product_name: String,
    pub product_description: String,
    pub amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("payment processor returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("payment processor response is missing `{0}`")]
    IncompleteResponse(&'static str),
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        order: &CheckoutOrder,
    ) -> Result<CheckoutSession, PaymentError>;
}

pub struct StripeCheckoutClient {
    client: reqwest::Client,
    endpoint: String,
    secret_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl StripeCheckoutClient {
    /// Returns `None` when no secret key is configured.
    pub fn from_config(config: &PaymentsConfig) -> Result<Option<Self>, PaymentError> {
        let Some(secret_key) = config.secret_key.clone().filter(|_| config.is_configured()) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            endpoint: format!("{}/v1/checkout/sessions", config.api_base_url.trim_end_matches('/')),
            secret_key,
        }))
    }
}

/// Form fields in the processor's bracketed notation.
pub fn checkout_form(order: &CheckoutOrder) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), order.customer_email.clone()),
        ("success_url".to_string(), order.success_url.clone()),
        ("cancel_url".to_string(), order.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("line_items[0][price_data][currency]".to_string(), order.currency.clone()),
        ("line_items[0][price_data][unit_amount]".to_string(), order.amount.to_string()),
        ("line_items[0][price_data][product_data][name]".to_string(), order.product_name.clone()),
        (
            "line_items[0][price_data][product_data][description]".to_string(),
            order.product_description.clone(),
        ),
    ];
    form.extend(order.metadata.iter().map(|(key, value)| (format!("metadata[{key}]"), value.clone())));
    form
}

#[async_trait]
impl PaymentProcessor for StripeCheckoutClient {
    async fn create_checkout_session(
        &self,
        order: &CheckoutOrder,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.secret_key.expose_secret())
            .form(&checkout_form(order))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            return Err(PaymentError::HttpStatus { status: status.as_u16(), message });
        }

        let session = response.json::<SessionResponse>().await?;
        let url = session.url.ok_or(PaymentError::IncompleteResponse("url"))?;
        Ok(CheckoutSession { id: session.id, url })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("webhook signing secret is not configured")]
    NotConfigured,
    #[error("signature header is malformed")]
    MalformedHeader,
    #[error("signature timestamp is outside the tolerance window")]
    StaleTimestamp,
    #[error("no signature matches the payload")]
    Mismatch,
}

/// Verifies a `t=<unix>,v1=<hex>` header against `hmac_sha256("{t}.{payload}")`.
/// Several `v1` entries may be present during secret rotation; any match passes.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: Option<&SecretString>,
    tolerance_secs: u64,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let secret = secret
        .map(|secret| secret.expose_secret())
        .filter(|secret| !secret.is_empty())
        .ok_or(SignatureError::NotConfigured)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::MalformedHeader)?)
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    if now_unix.abs_diff(timestamp) > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }

    let matched = candidates
        .into_iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|signature| {
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return false;
            };
            mac.update(timestamp.to_string().as_bytes());
            mac.update(b".");
            mac.update(payload);
            mac.verify_slice(&signature).is_ok()
        });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
pub(crate) fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use canlabel_core::config::AppConfig;

    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_760_000_000;

    fn secret() -> SecretString {
        SECRET.to_string().into()
    }

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(payload, SECRET, NOW - 10);
        assert_eq!(verify_signature(payload, &header, Some(&secret()), 300, NOW), Ok(()));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = signature_header(br#"{"amount":5000}"#, SECRET, NOW);
        assert_eq!(
            verify_signature(br#"{"amount":1}"#, &header, Some(&secret()), 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = b"{}";
        let header = signature_header(payload, SECRET, NOW - 301);
        assert_eq!(
            verify_signature(payload, &header, Some(&secret()), 300, NOW),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn rotated_secret_matches_any_v1_entry() {
        let payload = b"{}";
        let valid = signature_header(payload, SECRET, NOW);
        let (_, good_signature) = valid.split_once(",v1=").expect("header has v1");
        let header = format!("t={NOW},v1={},v1={good_signature}", "ab".repeat(32));
        assert_eq!(verify_signature(payload, &header, Some(&secret()), 300, NOW), Ok(()));
    }

    #[test]
    fn malformed_header_and_missing_secret_fail() {
        assert_eq!(
            verify_signature(b"{}", "v1=abcd", Some(&secret()), 300, NOW),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(b"{}", "t=abc,v1=abcd", Some(&secret()), 300, NOW),
            Err(SignatureError::MalformedHeader)
        );
        let header = signature_header(b"{}", SECRET, NOW);
        assert_eq!(verify_signature(b"{}", &header, None, 300, NOW), Err(SignatureError::NotConfigured));
    }

    #[test]
    fn non_hex_signatures_never_match() {
        for candidate in ["abc", "zz", ""] {
            let header = format!("t={NOW},v1={candidate}");
            assert_eq!(
                verify_signature(b"{}", &header, Some(&secret()), 300, NOW),
                Err(SignatureError::Mismatch),
                "{candidate:?}"
            );
        }
    }

    #[test]
    fn checkout_form_uses_bracketed_line_items_and_metadata() {
        let order = CheckoutOrder {
            customer_email: "mario@example.com".to_string(),
            product_name: "Campione".to_string(),
            product_description: "White Label".to_string(),
            amount: 5_000,
            currency: "eur".to_string(),
            success_url: "https://canlabel.it/success".to_string(),
            cancel_url: "https://canlabel.it/".to_string(),
            metadata: BTreeMap::from([("schema_version".to_string(), "1".to_string())]),
        };
        let form = checkout_form(&order);

        assert!(form.contains(&("mode".to_string(), "payment".to_string())));
        assert!(form
            .contains(&("line_items[0][price_data][unit_amount]".to_string(), "5000".to_string())));
        assert!(form.contains(&("metadata[schema_version]".to_string(), "1".to_string())));
    }

    #[test]
    fn client_requires_secret_key() {
        let mut config = AppConfig::default();
        assert!(StripeCheckoutClient::from_config(&config.payments)
            .expect("builder should not fail")
            .is_none());

        config.payments.secret_key = Some("sk_test_123".to_string().into());
        let client = StripeCheckoutClient::from_config(&config.payments)
            .expect("builder should not fail")
            .expect("client should be built");
        assert_eq!(client.endpoint, "https://api.stripe.com/v1/checkout/sessions");
    }

    #[test]
    fn completed_session_defaults_missing_metadata() {
        let session: CompletedSession =
            serde_json::from_value(serde_json::json!({"id": "cs_1", "amount_total": 5000}))
                .expect("session");
        assert!(session.metadata.is_empty());
        assert_eq!(session.amount_total, Some(5000));
    }
}
