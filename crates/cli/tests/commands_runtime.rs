use std::env;
use std::sync::{Mutex, OnceLock};

use canlabel_cli::commands::{config, doctor, price};
use serde_json::Value;

#[test]
fn doctor_warns_but_passes_config_without_integration_keys() {
    with_env(&[], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "warn");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(check_status(checks, "config_validation"), "pass");
        assert_eq!(check_status(checks, "email_delivery"), "warn");
        assert_eq!(check_status(checks, "payments"), "warn");
    });
}

#[test]
fn doctor_fails_when_checkout_cannot_be_confirmed() {
    with_env(&[("CANLABEL_PAYMENTS_SECRET_KEY", "sk_test_123")], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(check_status(checks, "payments"), "pass");
        assert_eq!(check_status(checks, "webhook_verification"), "fail");
    });
}

#[test]
fn doctor_reports_invalid_config_and_skips_the_rest() {
    with_env(&[("CANLABEL_PAYMENTS_SECRET_KEY", "pk_test_123")], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(check_status(checks, "config_validation"), "fail");
        assert_eq!(check_status(checks, "template_archive"), "skipped");
    });
}

#[test]
fn doctor_passes_template_check_when_archive_exists() {
    let directory = tempfile::tempdir().expect("tempdir");
    let archive = directory.path().join("template.zip");
    std::fs::write(&archive, b"PK").expect("write archive");
    let archive = archive.display().to_string();

    with_env(&[("CANLABEL_SITE_TEMPLATE_PATH", archive.as_str())], || {
        let output = doctor::run(false);
        assert!(output.contains("- [ok] template_archive"), "{output}");
    });
}

#[test]
fn config_attributes_env_sources_and_redacts_secrets() {
    with_env(
        &[
            ("CANLABEL_EMAIL_API_KEY", "re_live_supersecret"),
            ("CANLABEL_SERVER_PORT", "8080"),
        ],
        || {
            let output = config::run();
            assert!(output.contains("- server.port = 8080 (source: env (CANLABEL_SERVER_PORT))"));
            assert!(output.contains("- email.api_key = re_live_*** (source: env (CANLABEL_EMAIL_API_KEY))"));
            assert!(output.contains("- payments.secret_key = <unset> (source: default)"));
            assert!(!output.contains("supersecret"));
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("CANLABEL_SERVER_PORT", "not-a-port")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"), "{output}");
    });
}

#[test]
fn price_returns_structured_success() {
    let result = price::run(price::PriceLine::WhiteLabel { quantity: 1_000, sample: false });
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "price");
    assert_eq!(payload["status"], "ok");
    assert!(payload["message"].as_str().unwrap_or_default().contains("EUR 2000.00"));
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn check_status<'a>(checks: &'a [Value], name: &str) -> &'a str {
    checks
        .iter()
        .find(|check| check["name"] == name)
        .and_then(|check| check["status"].as_str())
        .unwrap_or("missing")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CANLABEL_SERVER_BIND_ADDRESS",
        "CANLABEL_SERVER_PORT",
        "CANLABEL_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CANLABEL_PAYMENTS_SECRET_KEY",
        "CANLABEL_PAYMENTS_WEBHOOK_SECRET",
        "CANLABEL_PAYMENTS_PUBLISHABLE_KEY",
        "CANLABEL_PAYMENTS_API_BASE_URL",
        "CANLABEL_PAYMENTS_CURRENCY",
        "CANLABEL_PAYMENTS_WEBHOOK_TOLERANCE_SECS",
        "CANLABEL_PAYMENTS_TIMEOUT_SECS",
        "CANLABEL_EMAIL_API_KEY",
        "CANLABEL_EMAIL_API_BASE_URL",
        "CANLABEL_EMAIL_FROM_ADDRESS",
        "CANLABEL_EMAIL_OPERATOR_ADDRESS",
        "CANLABEL_EMAIL_TIMEOUT_SECS",
        "CANLABEL_SITE_PUBLIC_BASE_URL",
        "CANLABEL_SITE_TEMPLATE_PATH",
        "CANLABEL_LOGGING_LEVEL",
        "CANLABEL_LOGGING_FORMAT",
        "CANLABEL_LOG_LEVEL",
        "CANLABEL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
