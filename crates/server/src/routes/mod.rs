//! HTTP surface.
//!
//! - `POST /api/submit-quote-request`   quote intake and notification fan-out
//! - `POST /api/create-checkout-session` hosted checkout for the paid sample
//! - `POST /api/stripe-webhook`          signed payment confirmation
//! - `GET  /api/template-download`       White Label artwork template
//! - `GET  /api/public-config`           publishable checkout settings
//! - `GET  /health`

pub mod assets;
pub mod checkout;
pub mod quote;
pub mod webhook;

use std::any::Any;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use canlabel_core::InterfaceError;
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;
use uuid::Uuid;

use crate::bootstrap::AppState;
use crate::health;

pub const UNKNOWN_IP: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { success: false, error: message.into() }))
}

impl From<InterfaceError> for ErrorBody {
    fn from(value: InterfaceError) -> Self {
        Self { success: false, error: value.user_message().to_string() }
    }
}

pub fn interface_error(error: InterfaceError) -> ApiError {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody::from(error)))
}

pub fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

/// First hop of `x-forwarded-for`, then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    forwarded.or_else(real_ip).unwrap_or(UNKNOWN_IP).to_string()
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/api/submit-quote-request", post(quote::submit_quote_request))
        .route("/api/create-checkout-session", post(checkout::create_checkout_session))
        .route("/api/stripe-webhook", post(webhook::stripe_webhook))
        .route("/api/template-download", get(assets::template_download))
        .route("/api/public-config", get(assets::public_config))
        .route("/health", get(health::health))
        .with_state(state);
    with_panic_boundary(routes)
}

/// A panicking handler answers 500 `Internal server error` instead of
/// dropping the connection.
fn with_panic_boundary(routes: Router) -> Router {
    routes.layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    let failure = InterfaceError::Internal {
        message: detail.to_string(),
        correlation_id: correlation_id(),
    };
    error!(
        event_name = "system.request.panicked",
        correlation_id = failure.correlation_id(),
        error = %failure,
        "request handler panicked"
    );
    interface_error(failure).into_response()
}
