use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use canlabel_core::{CheckoutMetadata, PaymentRecord, QuoteId};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::bootstrap::AppState;
use crate::payments::{
    verify_signature, CompletedSession, WebhookEvent, CHECKOUT_COMPLETED_EVENT, SIGNATURE_HEADER,
};
use crate::routes::{api_error, correlation_id, ApiError};

pub const MISSING_SIGNATURE: &str = "Missing signature";
pub const WEBHOOK_ERROR: &str = "Webhook error";
pub const INVALID_SESSION: &str = "Invalid session";
pub const MISSING_CUSTOMER_DATA: &str = "Missing customer data";

/// Recorded as the origin of quotes rebuilt from a payment confirmation.
pub const WEBHOOK_ORIGIN: &str = "payment-confirmation";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Received {
    pub received: bool,
}

fn bad_request(message: &'static str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message)
}

/// Every path past signature verification answers 200 so the processor
/// does not retry on notification failures.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Received>, ApiError> {
    let correlation_id = correlation_id();
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| bad_request(MISSING_SIGNATURE))?;

    let payments = &state.config.payments;
    verify_signature(
        &body,
        signature,
        payments.webhook_secret.as_ref(),
        payments.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )
    .map_err(|error| {
        warn!(
            event_name = "webhook.signature.rejected",
            correlation_id = %correlation_id,
            reason = %error,
            "webhook signature verification failed"
        );
        bad_request(WEBHOOK_ERROR)
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|error| {
        warn!(
            event_name = "webhook.event.unreadable",
            correlation_id = %correlation_id,
            error = %error,
            "signed webhook body is not a recognizable event"
        );
        bad_request(WEBHOOK_ERROR)
    })?;

    if event.event_type != CHECKOUT_COMPLETED_EVENT {
        info!(
            event_name = "webhook.event.ignored",
            correlation_id = %correlation_id,
            webhook_event_id = %event.id,
            webhook_event_type = %event.event_type,
            "webhook event acknowledged without action"
        );
        return Ok(Json(Received { received: true }));
    }

    let session: CompletedSession =
        serde_json::from_value(event.data.object).map_err(|error| {
            warn!(
                event_name = "webhook.session.malformed",
                correlation_id = %correlation_id,
                webhook_event_id = %event.id,
                error = %error,
                "completed checkout session could not be read"
            );
            bad_request(INVALID_SESSION)
        })?;

    let metadata = CheckoutMetadata::decode(&session.metadata).map_err(|error| {
        warn!(
            event_name = "webhook.metadata.rejected",
            correlation_id = %correlation_id,
            checkout_session_id = %session.id,
            error = %error,
            "checkout session metadata could not be decoded"
        );
        if error.is_missing_customer_data() {
            bad_request(MISSING_CUSTOMER_DATA)
        } else {
            bad_request(INVALID_SESSION)
        }
    })?;

    let now = Utc::now();
    let payment = PaymentRecord {
        session_id: session.id.clone(),
        amount_paid: session.amount_total.unwrap_or(metadata.amount),
    };
    let quote = metadata.into_quote(now, WEBHOOK_ORIGIN, payment);
    let quote_id = QuoteId::generate(now);

    info!(
        event_name = "webhook.payment.confirmed",
        correlation_id = %correlation_id,
        quote_id = %quote_id,
        checkout_session_id = %session.id,
        amount_paid = session.amount_total,
        "sample payment confirmed"
    );

    state.notifier.dispatch(&quote, &quote_id, &correlation_id).await;

    Ok(Json(Received { received: true }))
}
