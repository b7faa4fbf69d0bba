use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use canlabel_core::intake::parse_quote_request;
use canlabel_core::{ApplicationError, DomainError, QuoteId};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::bootstrap::AppState;
use crate::routes::{client_ip, correlation_id, interface_error, ApiError};

pub const ACCEPTED_MESSAGE: &str = "Quote request submitted successfully";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteAccepted {
    pub success: bool,
    pub message: String,
    pub quote_id: String,
}

/// Unreadable bodies are treated as empty, so they fail the contact check.
pub async fn submit_quote_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QuoteAccepted>, ApiError> {
    let correlation_id = correlation_id();
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(
                event_name = "quote.submission.unreadable_body",
                correlation_id = %correlation_id,
                error = %rejection,
                "quote submission body could not be parsed"
            );
            Value::Null
        }
    };

    let now = Utc::now();
    let quote = parse_quote_request(&body, now, &client_ip(&headers)).map_err(|error| {
        warn!(
            event_name = "quote.submission.rejected",
            correlation_id = %correlation_id,
            reason = %error,
            "quote submission failed validation"
        );
        interface_error(
            ApplicationError::from(DomainError::from(error)).into_interface(&correlation_id),
        )
    })?;

    let quote_id = QuoteId::generate(now);
    info!(
        event_name = "quote.submission.accepted",
        correlation_id = %correlation_id,
        quote_id = %quote_id,
        service_type = %quote.service_type(),
        wants_sample = quote.wants_sample,
        "quote submission accepted"
    );

    state.notifier.dispatch(&quote, &quote_id, &correlation_id).await;

    Ok(Json(QuoteAccepted {
        success: true,
        message: ACCEPTED_MESSAGE.to_string(),
        quote_id: quote_id.0,
    }))
}
