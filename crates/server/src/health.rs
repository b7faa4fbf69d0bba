use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub email: &'static str,
    pub payments: &'static str,
    pub checked_at: String,
}

/// Always 200: a missing email or payments key degrades the service, it
/// does not take it down.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let email = if state.notifier.is_noop() { "noop" } else { "ready" };
    let payments = if state.payments.is_some() { "ready" } else { "disabled" };
    let degraded = email != "ready" || payments != "ready";

    let payload = HealthResponse {
        status: if degraded { "degraded" } else { "ready" },
        service: "canlabel-server",
        email,
        payments,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use canlabel_core::config::AppConfig;

    use crate::health::health;
    use crate::notifications::tests::RecordingSender;
    use crate::payments::PaymentProcessor;
    use crate::routes::checkout::tests::FakeProcessor;
    use crate::routes::tests::state_with;

    #[tokio::test]
    async fn health_is_ready_with_both_integrations() {
        let processor: Arc<dyn PaymentProcessor> = Arc::new(FakeProcessor::default());
        let state =
            state_with(AppConfig::default(), Arc::new(RecordingSender::default()), Some(processor));

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.email, "ready");
        assert_eq!(payload.payments, "ready");
    }

    #[tokio::test]
    async fn health_reports_disabled_payments_without_failing() {
        let state = state_with(AppConfig::default(), Arc::new(RecordingSender::default()), None);

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.payments, "disabled");
        assert_eq!(payload.service, "canlabel-server");
    }
}
