use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use canlabel_core::intake::{parse_checkout_request, parse_quote_request};
use canlabel_core::{ApplicationError, CheckoutMetadata, CheckoutRequestError, DomainError};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::bootstrap::AppState;
use crate::payments::CheckoutOrder;
use crate::routes::{api_error, client_ip, correlation_id, interface_error, ApiError};

pub const CHECKOUT_FAILED: &str = "Payment session creation failed";
pub const SAMPLE_PRODUCT_NAME: &str = "Campione Canlabel";
pub const SUCCESS_PATH: &str = "/checkout/success?session_id={CHECKOUT_SESSION_ID}";
pub const CANCEL_PATH: &str = "/?checkout=cancelled";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreated {
    pub success: bool,
    pub session_id: String,
    pub url: String,
}

fn rejected(error: CheckoutRequestError, correlation_id: &str) -> ApiError {
    warn!(
        event_name = "checkout.request.rejected",
        correlation_id,
        reason = %error,
        "checkout request failed validation"
    );
    interface_error(ApplicationError::from(DomainError::from(error)).into_interface(correlation_id))
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CheckoutCreated>, ApiError> {
    let correlation_id = correlation_id();
    let Some(payments) = state.payments.clone() else {
        error!(
            event_name = "checkout.session.disabled",
            correlation_id = %correlation_id,
            "checkout requested but payments are not configured"
        );
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, CHECKOUT_FAILED));
    };

    let body = body.map(|Json(body)| body).unwrap_or(Value::Null);
    let request = parse_checkout_request(&body).map_err(|error| rejected(error, &correlation_id))?;

    // customerData is the same body the quote endpoint accepts.
    let quote = parse_quote_request(&request.customer_data, Utc::now(), &client_ip(&headers))
        .map_err(|reason| {
            warn!(
                event_name = "checkout.customer_data.invalid",
                correlation_id = %correlation_id,
                reason = %reason,
                "checkout customer data is not a valid quote request"
            );
            rejected(CheckoutRequestError::CustomerDataRequired, &correlation_id)
        })?;

    let metadata = CheckoutMetadata::from_quote(
        &quote,
        request.customer_name.clone(),
        request.session_id.clone(),
        request.amount,
    )
    .encode()
    .map_err(|error| {
        error!(
            event_name = "checkout.metadata.encode_failed",
            correlation_id = %correlation_id,
            error = %error,
            "checkout metadata could not be encoded"
        );
        api_error(StatusCode::INTERNAL_SERVER_ERROR, CHECKOUT_FAILED)
    })?;

    let order = CheckoutOrder {
        customer_email: request.customer_email,
        product_name: SAMPLE_PRODUCT_NAME.to_string(),
        product_description: format!("Campione {}", quote.service_type().display_name()),
        amount: request.amount,
        currency: state.config.payments.currency.clone(),
        success_url: state.config.site.url(SUCCESS_PATH),
        cancel_url: state.config.site.url(CANCEL_PATH),
        metadata,
    };

    let session = payments.create_checkout_session(&order).await.map_err(|error| {
        error!(
            event_name = "checkout.session.failed",
            correlation_id = %correlation_id,
            error = %error,
            "payment processor rejected checkout session"
        );
        api_error(StatusCode::INTERNAL_SERVER_ERROR, CHECKOUT_FAILED)
    })?;

    info!(
        event_name = "checkout.session.created",
        correlation_id = %correlation_id,
        checkout_session_id = %session.id,
        service_type = %quote.service_type(),
        "checkout session created"
    );

    Ok(Json(CheckoutCreated { success: true, session_id: session.id, url: session.url }))
}
