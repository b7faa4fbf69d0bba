use canlabel_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_email(&config));
            checks.push(check_payments(&config));
            checks.push(check_webhook(&config));
            checks.push(check_template(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["email_delivery", "payments", "webhook_verification", "template_archive"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    // Missing integration keys degrade the service, so they only warn.
    let failed = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready with degraded integrations"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_email(config: &AppConfig) -> DoctorCheck {
    if config.email.is_configured() {
        DoctorCheck {
            name: "email_delivery",
            status: CheckStatus::Pass,
            details: format!("sending through `{}`", config.email.api_base_url),
        }
    } else {
        DoctorCheck {
            name: "email_delivery",
            status: CheckStatus::Warn,
            details: "email api key not set, notifications will only be logged".to_string(),
        }
    }
}

fn check_payments(config: &AppConfig) -> DoctorCheck {
    if config.payments.is_configured() {
        DoctorCheck {
            name: "payments",
            status: CheckStatus::Pass,
            details: format!("checkout sessions in `{}`", config.payments.currency),
        }
    } else {
        DoctorCheck {
            name: "payments",
            status: CheckStatus::Warn,
            details: "payments secret key not set, sample checkout is disabled".to_string(),
        }
    }
}

fn check_webhook(config: &AppConfig) -> DoctorCheck {
    match (config.payments.is_configured(), config.payments.webhook_configured()) {
        (_, true) => DoctorCheck {
            name: "webhook_verification",
            status: CheckStatus::Pass,
            details: format!(
                "signatures accepted within {}s",
                config.payments.webhook_tolerance_secs
            ),
        },
        (true, false) => DoctorCheck {
            name: "webhook_verification",
            status: CheckStatus::Fail,
            details: "checkout is enabled but the webhook secret is missing, paid samples would never be confirmed".to_string(),
        },
        (false, false) => DoctorCheck {
            name: "webhook_verification",
            status: CheckStatus::Warn,
            details: "webhook secret not set".to_string(),
        },
    }
}

fn check_template(config: &AppConfig) -> DoctorCheck {
    let path = &config.site.template_path;
    if path.is_file() {
        DoctorCheck {
            name: "template_archive",
            status: CheckStatus::Pass,
            details: format!("found `{}`", path.display()),
        }
    } else {
        DoctorCheck {
            name: "template_archive",
            status: CheckStatus::Warn,
            details: format!("`{}` not found, template downloads will return 404", path.display()),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
