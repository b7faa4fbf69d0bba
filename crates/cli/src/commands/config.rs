use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use canlabel_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_PATHS};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Sources {
    file_doc: Option<Value>,
    file_path: Option<PathBuf>,
}

impl Sources {
    fn detect() -> Self {
        let file_path = DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists());
        let file_doc = load_config_file_doc(file_path.as_deref());
        Self { file_doc, file_path }
    }

    fn line(&self, key: &str, value: &str, env_keys: &[&str]) -> String {
        render_line(key, value, self.field_source(key, env_keys))
    }

    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let sources = Sources::detect();

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "server.bind_address",
        &config.server.bind_address,
        &["CANLABEL_SERVER_BIND_ADDRESS"],
    ));
    lines.push(sources.line(
        "server.port",
        &config.server.port.to_string(),
        &["CANLABEL_SERVER_PORT"],
    ));
    lines.push(sources.line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        &["CANLABEL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    ));

    lines.push(sources.line(
        "payments.secret_key",
        &redact_secret(config.payments.secret_key.as_ref()),
        &["CANLABEL_PAYMENTS_SECRET_KEY"],
    ));
    lines.push(sources.line(
        "payments.webhook_secret",
        &redact_secret(config.payments.webhook_secret.as_ref()),
        &["CANLABEL_PAYMENTS_WEBHOOK_SECRET"],
    ));
    lines.push(sources.line(
        "payments.publishable_key",
        config.payments.publishable_key.as_deref().unwrap_or("<unset>"),
        &["CANLABEL_PAYMENTS_PUBLISHABLE_KEY"],
    ));
    lines.push(sources.line(
        "payments.api_base_url",
        &config.payments.api_base_url,
        &["CANLABEL_PAYMENTS_API_BASE_URL"],
    ));
    lines.push(sources.line(
        "payments.currency",
        &config.payments.currency,
        &["CANLABEL_PAYMENTS_CURRENCY"],
    ));
    lines.push(sources.line(
        "payments.webhook_tolerance_secs",
        &config.payments.webhook_tolerance_secs.to_string(),
        &["CANLABEL_PAYMENTS_WEBHOOK_TOLERANCE_SECS"],
    ));

    lines.push(sources.line(
        "email.api_key",
        &redact_secret(config.email.api_key.as_ref()),
        &["CANLABEL_EMAIL_API_KEY"],
    ));
    lines.push(sources.line(
        "email.api_base_url",
        &config.email.api_base_url,
        &["CANLABEL_EMAIL_API_BASE_URL"],
    ));
    lines.push(sources.line(
        "email.from_address",
        &config.email.from_address,
        &["CANLABEL_EMAIL_FROM_ADDRESS"],
    ));
    lines.push(sources.line(
        "email.operator_address",
        &config.email.operator_address,
        &["CANLABEL_EMAIL_OPERATOR_ADDRESS"],
    ));

    lines.push(sources.line(
        "site.public_base_url",
        &config.site.public_base_url,
        &["CANLABEL_SITE_PUBLIC_BASE_URL"],
    ));
    lines.push(sources.line(
        "site.template_path",
        &config.site.template_path.display().to_string(),
        &["CANLABEL_SITE_TEMPLATE_PATH"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["CANLABEL_LOGGING_LEVEL", "CANLABEL_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["CANLABEL_LOGGING_FORMAT", "CANLABEL_LOG_FORMAT"],
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the key family prefix (`sk_test_`, `whsec_`, `re_`) and hides the rest.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.rfind('_') {
        Some(index) if index + 1 < trimmed.len() => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::redact_secret;

    #[test]
    fn secrets_keep_only_their_prefix() {
        let secret: SecretString = "sk_test_51abcdef".to_string().into();
        assert_eq!(redact_secret(Some(&secret)), "sk_test_***");

        let webhook: SecretString = "whsec_abc123".to_string().into();
        assert_eq!(redact_secret(Some(&webhook)), "whsec_***");

        let opaque: SecretString = "plainvalue".to_string().into();
        assert_eq!(redact_secret(Some(&opaque)), "<redacted>");

        assert_eq!(redact_secret(None), "<unset>");
    }
}
