use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["canlabel.toml", "config/canlabel.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub payments: PaymentsConfig,
    pub email: EmailConfig,
    pub site: SiteConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Hosted checkout settings. Checkout is disabled while `secret_key` is unset.
#[derive(Clone, Debug)]
pub struct PaymentsConfig {
    pub secret_key: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub publishable_key: Option<String>,
    pub api_base_url: String,
    pub currency: String,
    pub webhook_tolerance_secs: u64,
    pub timeout_secs: u64,
}

/// Transactional email settings. A missing `api_key` degrades to a no-op sender.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_key: Option<SecretString>,
    pub api_base_url: String,
    pub from_address: String,
    pub operator_address: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub public_base_url: String,
    pub template_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub public_base_url: Option<String>,
    pub template_path: Option<PathBuf>,
    pub payments_secret_key: Option<String>,
    pub payments_webhook_secret: Option<String>,
    pub email_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            payments: PaymentsConfig {
                secret_key: None,
                webhook_secret: None,
                publishable_key: None,
                api_base_url: "https://api.stripe.com".to_string(),
                currency: "eur".to_string(),
                webhook_tolerance_secs: 300,
                timeout_secs: 15,
            },
            email: EmailConfig {
                api_key: None,
                api_base_url: "https://api.resend.com".to_string(),
                from_address: "Canlabel <preventivi@canlabel.it>".to_string(),
                operator_address: "info@canlabel.it".to_string(),
                timeout_secs: 10,
            },
            site: SiteConfig {
                public_base_url: "http://localhost:3000".to_string(),
                template_path: PathBuf::from("assets/canlabel-white-label-template.zip"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl PaymentsConfig {
    pub fn is_configured(&self) -> bool {
        has_secret(self.secret_key.as_ref())
    }

    pub fn webhook_configured(&self) -> bool {
        has_secret(self.webhook_secret.as_ref())
    }
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        has_secret(self.api_key.as_ref())
    }
}

fn has_secret(secret: Option<&SecretString>) -> bool {
    secret.map(|value| !value.expose_secret().trim().is_empty()).unwrap_or(false)
}

impl SiteConfig {
    /// Joins `path` onto the public base URL with exactly one slash.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(payments) = patch.payments {
            if let Some(secret_key) = payments.secret_key {
                self.payments.secret_key = Some(secret_value(secret_key));
            }
            if let Some(webhook_secret) = payments.webhook_secret {
                self.payments.webhook_secret = Some(secret_value(webhook_secret));
            }
            if let Some(publishable_key) = payments.publishable_key {
                self.payments.publishable_key = Some(publishable_key);
            }
            if let Some(api_base_url) = payments.api_base_url {
                self.payments.api_base_url = api_base_url;
            }
            if let Some(currency) = payments.currency {
                self.payments.currency = currency;
            }
            if let Some(webhook_tolerance_secs) = payments.webhook_tolerance_secs {
                self.payments.webhook_tolerance_secs = webhook_tolerance_secs;
            }
            if let Some(timeout_secs) = payments.timeout_secs {
                self.payments.timeout_secs = timeout_secs;
            }
        }

        if let Some(email) = patch.email {
            if let Some(api_key) = email.api_key {
                self.email.api_key = Some(secret_value(api_key));
            }
            if let Some(api_base_url) = email.api_base_url {
                self.email.api_base_url = api_base_url;
            }
            if let Some(from_address) = email.from_address {
                self.email.from_address = from_address;
            }
            if let Some(operator_address) = email.operator_address {
                self.email.operator_address = operator_address;
            }
            if let Some(timeout_secs) = email.timeout_secs {
                self.email.timeout_secs = timeout_secs;
            }
        }

        if let Some(site) = patch.site {
            if let Some(public_base_url) = site.public_base_url {
                self.site.public_base_url = public_base_url;
            }
            if let Some(template_path) = site.template_path {
                self.site.template_path = template_path;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CANLABEL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CANLABEL_SERVER_PORT") {
            self.server.port = parse_u16("CANLABEL_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CANLABEL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CANLABEL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("CANLABEL_PAYMENTS_SECRET_KEY") {
            self.payments.secret_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CANLABEL_PAYMENTS_WEBHOOK_SECRET") {
            self.payments.webhook_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("CANLABEL_PAYMENTS_PUBLISHABLE_KEY") {
            self.payments.publishable_key = Some(value);
        }
        if let Some(value) = read_env("CANLABEL_PAYMENTS_API_BASE_URL") {
            self.payments.api_base_url = value;
        }
        if let Some(value) = read_env("CANLABEL_PAYMENTS_CURRENCY") {
            self.payments.currency = value;
        }
        if let Some(value) = read_env("CANLABEL_PAYMENTS_WEBHOOK_TOLERANCE_SECS") {
            self.payments.webhook_tolerance_secs =
                parse_u64("CANLABEL_PAYMENTS_WEBHOOK_TOLERANCE_SECS", &value)?;
        }
        if let Some(value) = read_env("CANLABEL_PAYMENTS_TIMEOUT_SECS") {
            self.payments.timeout_secs = parse_u64("CANLABEL_PAYMENTS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CANLABEL_EMAIL_API_KEY") {
            self.email.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CANLABEL_EMAIL_API_BASE_URL") {
            self.email.api_base_url = value;
        }
        if let Some(value) = read_env("CANLABEL_EMAIL_FROM_ADDRESS") {
            self.email.from_address = value;
        }
        if let Some(value) = read_env("CANLABEL_EMAIL_OPERATOR_ADDRESS") {
            self.email.operator_address = value;
        }
        if let Some(value) = read_env("CANLABEL_EMAIL_TIMEOUT_SECS") {
            self.email.timeout_secs = parse_u64("CANLABEL_EMAIL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CANLABEL_SITE_PUBLIC_BASE_URL") {
            self.site.public_base_url = value;
        }
        if let Some(value) = read_env("CANLABEL_SITE_TEMPLATE_PATH") {
            self.site.template_path = PathBuf::from(value);
        }

        let log_level =
            read_env("CANLABEL_LOGGING_LEVEL").or_else(|| read_env("CANLABEL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CANLABEL_LOGGING_FORMAT").or_else(|| read_env("CANLABEL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(public_base_url) = overrides.public_base_url {
            self.site.public_base_url = public_base_url;
        }
        if let Some(template_path) = overrides.template_path {
            self.site.template_path = template_path;
        }
        if let Some(secret_key) = overrides.payments_secret_key {
            self.payments.secret_key = Some(secret_value(secret_key));
        }
        if let Some(webhook_secret) = overrides.payments_webhook_secret {
            self.payments.webhook_secret = Some(secret_value(webhook_secret));
        }
        if let Some(api_key) = overrides.email_api_key {
            self.email.api_key = Some(secret_value(api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_payments(&self.payments)?;
        validate_email(&self.email)?;
        validate_site(&self.site)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_timeout(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_payments(payments: &PaymentsConfig) -> Result<(), ConfigError> {
    if !is_http_url(&payments.api_base_url) {
        return Err(ConfigError::Validation(
            "payments.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    let currency = payments.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(
            "payments.currency must be a three-letter ISO code such as `eur`".to_string(),
        ));
    }

    if payments.webhook_tolerance_secs == 0 || payments.webhook_tolerance_secs > 3_600 {
        return Err(ConfigError::Validation(
            "payments.webhook_tolerance_secs must be in range 1..=3600".to_string(),
        ));
    }

    validate_timeout("payments.timeout_secs", payments.timeout_secs)?;

    if let Some(secret_key) = &payments.secret_key {
        let secret_key = secret_key.expose_secret();
        if !secret_key.is_empty() && !secret_key.starts_with("sk_") {
            let hint = if secret_key.starts_with("pk_") {
                " (hint: you may have used the publishable key instead of the secret key)"
            } else {
                ""
            };
            return Err(ConfigError::Validation(format!(
                "payments.secret_key must start with `sk_`{hint}"
            )));
        }
    }

    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if !is_http_url(&email.api_base_url) {
        return Err(ConfigError::Validation(
            "email.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if !email.from_address.contains('@') {
        return Err(ConfigError::Validation(
            "email.from_address must be an email address, optionally with a display name"
                .to_string(),
        ));
    }

    if !email.operator_address.contains('@') {
        return Err(ConfigError::Validation(
            "email.operator_address must be an email address".to_string(),
        ));
    }

    validate_timeout("email.timeout_secs", email.timeout_secs)
}

fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if !is_http_url(&site.public_base_url) {
        return Err(ConfigError::Validation(
            "site.public_base_url must start with http:// or https://".to_string(),
        ));
    }

    if site.template_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("site.template_path must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    payments: Option<PaymentsPatch>,
    email: Option<EmailPatch>,
    site: Option<SitePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentsPatch {
    secret_key: Option<String>,
    webhook_secret: Option<String>,
    publishable_key: Option<String>,
    api_base_url: Option<String>,
    currency: Option<String>,
    webhook_tolerance_secs: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    api_key: Option<String>,
    api_base_url: Option<String>,
    from_address: Option<String>,
    operator_address: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SitePatch {
    public_base_url: Option<String>,
    template_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
