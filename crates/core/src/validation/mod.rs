//! Field sanitization and validation shared by the wizard and the server intake.
//!
//! Every validator takes untrusted input, sanitizes it with [`sanitize_input`]
//! and returns a [`ValidationOutcome`]. Empty input is valid; callers that
//! need a value chain [`ValidationOutcome::required`].

pub mod tracker;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use tracker::{FieldState, ValidationStateManager};

pub const MAX_SANITIZED_LEN: usize = 500;
pub const NAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 100;
pub const PHONE_MAX_LEN: usize = 20;
pub const COMPANY_MAX_LEN: usize = 100;
pub const ADDRESS_MAX_LEN: usize = 200;
pub const CITY_MAX_LEN: usize = 100;

static SCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(javascript|data)\s*:").expect("valid regex"));
static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("valid regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").expect("valid regex")
});
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}][\p{L} .\-]*$").expect("valid regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-./]{6,20}$").expect("valid regex"));
static VAT_ITALY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(IT)?[0-9]{11}$").expect("valid regex"));
static VAT_EU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[0-9A-Z]{2,13}$").expect("valid regex"));
static VAT_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Z]{4,20}$").expect("valid regex"));
static FISCAL_CODE_PERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{6}[0-9LMNPQRSTUV]{2}[A-Z][0-9LMNPQRSTUV]{2}[A-Z][0-9LMNPQRSTUV]{3}[A-Z]$")
        .expect("valid regex")
});
static FISCAL_CODE_COMPANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{11}$").expect("valid regex"));
static CITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}][\p{L} .\-]*$").expect("valid regex"));
static POSTAL_ITALY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("valid regex"));
static POSTAL_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Z][0-9A-Z \-]{1,8}[0-9A-Z]$").expect("valid regex"));
static SDI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9A-Z]{7}$").expect("valid regex"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub sanitized: String,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn accept(sanitized: String) -> Self {
        Self { is_valid: true, sanitized, errors: Vec::new() }
    }

    fn reject(sanitized: String, error: impl Into<String>) -> Self {
        Self { is_valid: false, sanitized, errors: vec![error.into()] }
    }

    /// Marks an empty value as invalid.
    pub fn required(mut self, label: &str) -> Self {
        if self.sanitized.is_empty() {
            self.is_valid = false;
            self.errors.insert(0, format!("{label} is required"));
        }
        self
    }
}

/// Removes markup and script vectors, trims, and caps the result at 500 chars.
///
/// Backslashes and control characters are dropped too (control whitespace
/// becomes a space), so a sanitized value never grows when JSON-encoded.
pub fn sanitize_input(input: &str) -> String {
    let mut current: String = input
        .chars()
        .filter_map(|ch| match ch {
            '<' | '>' | '"' | '\'' | '&' | '\\' => None,
            ch if ch.is_control() && ch.is_whitespace() => Some(' '),
            ch if ch.is_control() => None,
            ch => Some(ch),
        })
        .collect();

    // Removal can splice a new pattern together ("javajavascript:script:"), so repeat.
    loop {
        let next = EVENT_HANDLER.replace_all(&SCRIPT_URI.replace_all(&current, ""), "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }

    truncate_chars(current.trim(), MAX_SANITIZED_LEN)
}

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn sanitized_within(input: &str, max_chars: usize) -> String {
    truncate_chars(&sanitize_input(input), max_chars).trim().to_string()
}

fn is_italy(country: &str) -> bool {
    matches!(country.trim().to_ascii_lowercase().as_str(), "italy" | "italia" | "it")
}

fn compact_upper(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect::<String>().to_ascii_uppercase()
}

/// Sanitizes and caps free text without format rules.
pub fn validate_free_text(input: &str, max_chars: usize) -> ValidationOutcome {
    ValidationOutcome::accept(sanitized_within(input, max_chars))
}

pub fn validate_email(input: &str) -> ValidationOutcome {
    let sanitized = sanitize_input(input).to_lowercase();
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if sanitized.chars().count() > EMAIL_MAX_LEN {
        let truncated = truncate_chars(&sanitized, EMAIL_MAX_LEN);
        return ValidationOutcome::reject(
            truncated,
            format!("Email must be at most {EMAIL_MAX_LEN} characters"),
        );
    }
    if !EMAIL.is_match(&sanitized) {
        return ValidationOutcome::reject(sanitized, "Enter a valid email address");
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_name(input: &str) -> ValidationOutcome {
    let sanitized = sanitized_within(input, NAME_MAX_LEN);
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if sanitized.chars().count() < 2 {
        return ValidationOutcome::reject(sanitized, "Name must be at least 2 characters");
    }
    if !NAME.is_match(&sanitized) {
        return ValidationOutcome::reject(
            sanitized,
            "Name may only contain letters, spaces, dots and hyphens",
        );
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_phone(input: &str) -> ValidationOutcome {
    let sanitized = sanitized_within(input, PHONE_MAX_LEN);
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    let digits = sanitized.chars().filter(char::is_ascii_digit).count();
    if !PHONE.is_match(&sanitized) || digits < 6 {
        return ValidationOutcome::reject(sanitized, "Enter a valid phone number");
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_company(input: &str) -> ValidationOutcome {
    let sanitized = sanitized_within(input, COMPANY_MAX_LEN);
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if sanitized.chars().count() < 2 {
        return ValidationOutcome::reject(sanitized, "Company name must be at least 2 characters");
    }
    ValidationOutcome::accept(sanitized)
}

/// Italian numbers are 11 digits with an optional `IT` prefix; other EU numbers
/// carry their two-letter country prefix.
pub fn validate_vat_number(input: &str, country: &str) -> ValidationOutcome {
    let sanitized = compact_upper(&sanitize_input(input));
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    let valid = if is_italy(country) {
        VAT_ITALY.is_match(&sanitized)
    } else {
        VAT_EU.is_match(&sanitized) || VAT_GENERIC.is_match(&sanitized)
    };
    if !valid {
        return ValidationOutcome::reject(sanitized, "Enter a valid VAT number");
    }
    ValidationOutcome::accept(sanitized)
}

/// Accepts a personal codice fiscale (16 chars, omocodia digits allowed) or a
/// company code (11 digits).
pub fn validate_fiscal_code(input: &str) -> ValidationOutcome {
    let sanitized = compact_upper(&sanitize_input(input));
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if !FISCAL_CODE_PERSON.is_match(&sanitized) && !FISCAL_CODE_COMPANY.is_match(&sanitized) {
        return ValidationOutcome::reject(sanitized, "Enter a valid fiscal code");
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_address(input: &str) -> ValidationOutcome {
    let sanitized = sanitized_within(input, ADDRESS_MAX_LEN);
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if sanitized.chars().count() < 5 {
        return ValidationOutcome::reject(sanitized, "Address must be at least 5 characters");
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_city_or_province(input: &str) -> ValidationOutcome {
    let sanitized = sanitized_within(input, CITY_MAX_LEN);
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if sanitized.chars().count() < 2 || !CITY.is_match(&sanitized) {
        return ValidationOutcome::reject(sanitized, "Enter a valid city or province");
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_postal_code(input: &str, country: &str) -> ValidationOutcome {
    let sanitized = sanitize_input(input).to_ascii_uppercase();
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    let valid = if is_italy(country) {
        POSTAL_ITALY.is_match(&sanitized)
    } else {
        POSTAL_GENERIC.is_match(&sanitized)
    };
    if !valid {
        return ValidationOutcome::reject(sanitized, "Enter a valid postal code");
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_sdi(input: &str) -> ValidationOutcome {
    let sanitized = compact_upper(&sanitize_input(input));
    if sanitized.is_empty() {
        return ValidationOutcome::accept(sanitized);
    }
    if !SDI.is_match(&sanitized) {
        return ValidationOutcome::reject(
            sanitized,
            "SDI code must be exactly 7 alphanumeric characters",
        );
    }
    ValidationOutcome::accept(sanitized)
}

pub fn validate_pec(input: &str) -> ValidationOutcome {
    let outcome = validate_email(input);
    if outcome.is_valid {
        return outcome;
    }
    ValidationOutcome::reject(outcome.sanitized, "Enter a valid PEC address")
}
