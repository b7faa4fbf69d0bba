//! Turns untrusted request bodies into typed quote data.
//!
//! Field access is lenient: strings are sanitized and capped, booleans follow
//! truthiness, numbers are clamped. Only the structural checks below reject a
//! request, in this order.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::domain::contact::{BillingData, ContactForm};
use crate::domain::product::{
    BeverageSelection, CanSelection, PackagingSelection, PackagingType, ProductLine, ServiceType,
    VolumeFormatSelection, CUSTOM_BEVERAGE_ID, PACKAGING_CATALOG,
};
use crate::domain::quote::UnifiedQuoteData;
use crate::pricing::{MAX_CAN_QUANTITY, MIN_CAN_QUANTITY, SAMPLE_PRICE_MINOR};
use crate::validation::{
    sanitize_input, truncate_chars, ADDRESS_MAX_LEN, CITY_MAX_LEN, COMPANY_MAX_LEN, EMAIL_MAX_LEN,
    NAME_MAX_LEN, PHONE_MAX_LEN,
};

const PREFERRED_CALL_TIME_MAX_LEN: usize = 50;
const COUNTRY_MAX_LEN: usize = 100;
const IDENTIFIER_MAX_LEN: usize = 50;
const POSTAL_CODE_MAX_LEN: usize = 20;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum QuoteRequestError {
    #[error("Missing required contact information")]
    MissingContact,
    #[error("Invalid service type request")]
    InvalidServiceType,
    #[error("White Label requests require can selection data")]
    MissingCanSelection,
    #[error("Private Label requests require complete product configuration")]
    IncompletePrivateLabel,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CheckoutRequestError {
    #[error("Customer data required")]
    CustomerDataRequired,
    #[error("Invalid amount for sample order")]
    InvalidAmount,
}

/// Validated body of a checkout-session request.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub customer_name: String,
    pub amount: i64,
    pub session_id: String,
    pub customer_data: Value,
}

/// Loose truthiness: null, false, zero and the empty string are false.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn raw_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn text(object: &Value, key: &str, max_chars: usize) -> String {
    truncate_chars(&sanitize_input(&raw_text(object.get(key))), max_chars).trim().to_string()
}

fn number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(Value::Bool(flag)) => Some(f64::from(u8::from(*flag))),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Float-to-int casts saturate, so negatives land on zero.
fn non_negative(object: &Value, key: &str) -> u32 {
    number(object.get(key)) as u32
}

fn non_negative_decimal(value: Option<&Value>) -> Decimal {
    let parsed = match value {
        Some(Value::Number(number)) => Decimal::from_str(&number.to_string()).ok(),
        Some(Value::String(text)) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    };
    parsed.unwrap_or(Decimal::ZERO).max(Decimal::ZERO)
}

fn object(value: Option<&Value>) -> Option<&Value> {
    value.filter(|candidate| candidate.is_object())
}

pub fn parse_contact_form(raw: &Value) -> ContactForm {
    let email_only = truthy(raw.get("emailOnly"));
    let can_call = truthy(raw.get("canCall")) && !email_only;
    let preferred_call_time = if email_only {
        String::new()
    } else {
        text(raw, "preferredCallTime", PREFERRED_CALL_TIME_MAX_LEN)
    };

    ContactForm {
        first_name: text(raw, "firstName", NAME_MAX_LEN),
        last_name: text(raw, "lastName", NAME_MAX_LEN),
        email: text(raw, "email", EMAIL_MAX_LEN).to_lowercase(),
        phone: text(raw, "phone", PHONE_MAX_LEN),
        company: text(raw, "company", COMPANY_MAX_LEN),
        can_call,
        preferred_call_time,
        email_only,
        billing_data: object(raw.get("billingData")).map(parse_billing_data).filter(|b| !b.is_empty()),
    }
}

pub fn parse_billing_data(raw: &Value) -> BillingData {
    let compact = |key: &str, max_chars: usize| {
        text(raw, key, max_chars)
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    };

    BillingData {
        vat_number: compact("vatNumber", IDENTIFIER_MAX_LEN),
        fiscal_code: compact("fiscalCode", IDENTIFIER_MAX_LEN),
        legal_name: text(raw, "legalName", COMPANY_MAX_LEN),
        billing_address: text(raw, "billingAddress", ADDRESS_MAX_LEN),
        billing_city: text(raw, "billingCity", CITY_MAX_LEN),
        billing_postal_code: text(raw, "billingPostalCode", POSTAL_CODE_MAX_LEN)
            .to_ascii_uppercase(),
        billing_province: text(raw, "billingProvince", CITY_MAX_LEN),
        sdi_code: compact("sdiCode", IDENTIFIER_MAX_LEN),
        pec_email: text(raw, "pecEmail", EMAIL_MAX_LEN).to_lowercase(),
    }
}

fn parse_can_selection(raw: &Value) -> CanSelection {
    let quantity = (number(raw.get("quantity")) as u32).clamp(MIN_CAN_QUANTITY, MAX_CAN_QUANTITY);
    CanSelection { quantity, total_price: non_negative_decimal(raw.get("totalPrice")) }
}

fn parse_beverage_selection(raw: &Value) -> BeverageSelection {
    let selected_beverage = text(raw, "selectedBeverage", IDENTIFIER_MAX_LEN);
    let is_custom = truthy(raw.get("isCustom")) || selected_beverage == CUSTOM_BEVERAGE_ID;
    BeverageSelection {
        selected_beverage,
        custom_beverage_text: sanitize_input(&raw_text(raw.get("customBeverageText"))),
        is_custom,
    }
}

fn parse_volume_format_selection(raw: &Value) -> VolumeFormatSelection {
    VolumeFormatSelection {
        volume_liters: non_negative(raw, "volumeLiters"),
        format_ml: non_negative(raw, "formatMl"),
        total_pieces: non_negative(raw, "totalPieces"),
        cartons_count: non_negative(raw, "cartonsCount"),
        is_custom_volume: truthy(raw.get("isCustomVolume")),
    }
}

fn parse_packaging_selection(raw: &Value) -> PackagingSelection {
    let selected_packaging = text(raw, "selectedPackaging", IDENTIFIER_MAX_LEN);
    let packaging_type = PackagingType::parse(&raw_text(raw.get("packagingType")))
        .or_else(|| {
            PACKAGING_CATALOG
                .iter()
                .find(|(id, _, _)| *id == selected_packaging)
                .map(|(_, _, packaging_type)| *packaging_type)
        })
        .unwrap_or_default();
    PackagingSelection { selected_packaging, packaging_type }
}

/// Parses a quote submission body. `submitted_at` and `ip` come from the
/// request context, never from the body.
pub fn parse_quote_request(
    body: &Value,
    submitted_at: DateTime<Utc>,
    ip: &str,
) -> Result<UnifiedQuoteData, QuoteRequestError> {
    let contact = object(body.get("contactForm")).ok_or(QuoteRequestError::MissingContact)?;
    if !["firstName", "lastName", "email"].iter().all(|key| truthy(contact.get(*key))) {
        return Err(QuoteRequestError::MissingContact);
    }
    let contact_form = parse_contact_form(contact);
    if contact_form.first_name.is_empty()
        || contact_form.last_name.is_empty()
        || contact_form.email.is_empty()
    {
        return Err(QuoteRequestError::MissingContact);
    }

    let request_type = body.get("requestType").and_then(Value::as_str).unwrap_or_default();
    let service_type = ServiceType::from_request_type(request_type)
        .ok_or(QuoteRequestError::InvalidServiceType)?;

    let product = match service_type {
        ServiceType::WhiteLabel => {
            let can_selection = object(body.get("canSelection"))
                .ok_or(QuoteRequestError::MissingCanSelection)?;
            ProductLine::WhiteLabel { can_selection: parse_can_selection(can_selection) }
        }
        ServiceType::PrivateLabel => {
            let (Some(beverage), Some(volume), Some(packaging)) = (
                object(body.get("beverageSelection")),
                object(body.get("volumeFormatSelection")),
                object(body.get("packagingSelection")),
            ) else {
                return Err(QuoteRequestError::IncompletePrivateLabel);
            };
            ProductLine::PrivateLabel {
                beverage_selection: parse_beverage_selection(beverage),
                volume_format_selection: parse_volume_format_selection(volume),
                packaging_selection: parse_packaging_selection(packaging),
            }
        }
    };

    Ok(UnifiedQuoteData {
        contact_form,
        product,
        wants_sample: truthy(body.get("wantsSample")),
        country: text(body, "country", COUNTRY_MAX_LEN),
        submitted_at,
        ip: ip.to_string(),
        payment: None,
    })
}

/// Parses a checkout-session body. Customer data presence is checked before
/// its contents, and both before the amount.
pub fn parse_checkout_request(body: &Value) -> Result<CheckoutRequest, CheckoutRequestError> {
    let customer_data = object(body.get("customerData"))
        .cloned()
        .ok_or(CheckoutRequestError::CustomerDataRequired)?;
    let customer_email = text(body, "customerEmail", EMAIL_MAX_LEN).to_lowercase();
    let customer_name = text(body, "customerName", NAME_MAX_LEN * 2 + 1);
    if customer_email.is_empty() || customer_name.is_empty() {
        return Err(CheckoutRequestError::CustomerDataRequired);
    }

    let amount = body.get("amount").and_then(Value::as_f64);
    if amount != Some(SAMPLE_PRICE_MINOR as f64) {
        return Err(CheckoutRequestError::InvalidAmount);
    }

    Ok(CheckoutRequest {
        customer_email,
        customer_name,
        amount: SAMPLE_PRICE_MINOR,
        session_id: text(body, "sessionId", IDENTIFIER_MAX_LEN * 2),
        customer_data,
    })
}
