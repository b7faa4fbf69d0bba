//! Versioned metadata attached to a sample checkout session and read back
//! when the processor confirms payment.
//!
//! Every value is a string of at most 500 chars. Long custom beverage text is
//! cut in `config_data` and carried whole in `full_beverage_text`; when the
//! product blob would still overflow, the inline text is dropped entirely.
//! The country travels in its own value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::contact::{BillingData, ContactForm};
use crate::domain::product::ProductLine;
use crate::domain::quote::{PaymentRecord, UnifiedQuoteData};
use crate::validation::truncate_chars;

pub const METADATA_SCHEMA_VERSION: &str = "1";
pub const SAMPLE_ORDER_TYPE: &str = "sample_order";
pub const METADATA_VALUE_MAX_CHARS: usize = 500;
pub const INLINE_BEVERAGE_TEXT_MAX_CHARS: usize = 120;

pub const KEY_SCHEMA_VERSION: &str = "schema_version";
pub const KEY_TYPE: &str = "type";
pub const KEY_CUSTOMER_NAME: &str = "customer_name";
pub const KEY_SESSION_ID: &str = "session_id";
pub const KEY_AMOUNT: &str = "amount";
pub const KEY_CONTACT_DATA: &str = "contact_data";
pub const KEY_BILLING_DATA: &str = "billing_data";
pub const KEY_CONFIG_DATA: &str = "config_data";
pub const KEY_COUNTRY: &str = "country";
pub const KEY_FULL_BEVERAGE_TEXT: &str = "full_beverage_text";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata is missing `{0}`")]
    MissingField(&'static str),
    #[error("unsupported metadata schema version `{0}`")]
    UnsupportedVersion(String),
    #[error("unexpected metadata type `{0}`")]
    UnexpectedType(String),
    #[error("metadata value `{key}` is {length} chars, limit is 500")]
    ValueTooLong { key: &'static str, length: usize },
    #[error("failed to encode metadata `{key}`: {source}")]
    Encode { key: &'static str, source: serde_json::Error },
    #[error("failed to decode metadata `{key}`: {source}")]
    Decode { key: &'static str, source: serde_json::Error },
}

impl MetadataError {
    /// True when the customer blobs are absent, as opposed to present but
    /// unreadable.
    pub fn is_missing_customer_data(&self) -> bool {
        matches!(self, Self::MissingField(KEY_CONTACT_DATA | KEY_CONFIG_DATA))
    }
}

/// Country plus the tagged product line. Only the product line is encoded
/// as `config_data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigData {
    pub country: String,
    pub product: ProductLine,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub customer_name: String,
    pub session_id: String,
    pub amount: i64,
    pub contact: ContactForm,
    pub billing: Option<BillingData>,
    pub config: ConfigData,
    /// Verbatim custom beverage text, set only when it exceeds the inline limit.
    pub full_beverage_text: Option<String>,
}

impl CheckoutMetadata {
    pub fn from_quote(
        quote: &UnifiedQuoteData,
        customer_name: impl Into<String>,
        session_id: impl Into<String>,
        amount: i64,
    ) -> Self {
        let mut contact = quote.contact_form.clone();
        let billing = contact.billing_data.take().filter(|billing| !billing.is_empty());

        let mut product = quote.product.clone();
        let mut full_beverage_text = None;
        if let ProductLine::PrivateLabel { beverage_selection, .. } = &mut product {
            let text = &beverage_selection.custom_beverage_text;
            if text.chars().count() > INLINE_BEVERAGE_TEXT_MAX_CHARS {
                full_beverage_text = Some(text.clone());
                beverage_selection.custom_beverage_text =
                    truncate_chars(text, INLINE_BEVERAGE_TEXT_MAX_CHARS);
            }
        }

        Self {
            customer_name: customer_name.into(),
            session_id: session_id.into(),
            amount,
            contact,
            billing,
            config: ConfigData { country: quote.country.clone(), product },
            full_beverage_text,
        }
    }

    pub fn encode(&self) -> Result<BTreeMap<String, String>, MetadataError> {
        let mut entries: Vec<(&'static str, String)> = vec![
            (KEY_SCHEMA_VERSION, METADATA_SCHEMA_VERSION.to_string()),
            (KEY_TYPE, SAMPLE_ORDER_TYPE.to_string()),
            (KEY_CUSTOMER_NAME, self.customer_name.clone()),
            (KEY_SESSION_ID, self.session_id.clone()),
            (KEY_AMOUNT, self.amount.to_string()),
            (KEY_CONTACT_DATA, to_json(KEY_CONTACT_DATA, &self.contact)?),
            (KEY_COUNTRY, self.config.country.clone()),
        ];
        let (config_data, spilled_text) = self.encode_product()?;
        entries.push((KEY_CONFIG_DATA, config_data));
        if let Some(billing) = &self.billing {
            entries.push((KEY_BILLING_DATA, to_json(KEY_BILLING_DATA, &compact_billing(billing))?));
        }
        if let Some(text) = self.full_beverage_text.clone().or(spilled_text) {
            entries.push((KEY_FULL_BEVERAGE_TEXT, text));
        }

        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let length = value.chars().count();
            if length > METADATA_VALUE_MAX_CHARS {
                return Err(MetadataError::ValueTooLong { key, length });
            }
            map.insert(key.to_string(), value);
        }
        Ok(map)
    }

    /// Encodes the product line. If it does not fit, the inline custom text
    /// is removed and returned so it can travel in `full_beverage_text`.
    fn encode_product(&self) -> Result<(String, Option<String>), MetadataError> {
        let encoded = to_json(KEY_CONFIG_DATA, &self.config.product)?;
        if encoded.chars().count() <= METADATA_VALUE_MAX_CHARS {
            return Ok((encoded, None));
        }

        let mut product = self.config.product.clone();
        let ProductLine::PrivateLabel { beverage_selection, .. } = &mut product else {
            return Ok((encoded, None));
        };
        if beverage_selection.custom_beverage_text.is_empty() {
            return Ok((encoded, None));
        }
        let spilled = std::mem::take(&mut beverage_selection.custom_beverage_text);
        Ok((to_json(KEY_CONFIG_DATA, &product)?, Some(spilled)))
    }

    pub fn decode(map: &BTreeMap<String, String>) -> Result<Self, MetadataError> {
        let contact_raw =
            map.get(KEY_CONTACT_DATA).ok_or(MetadataError::MissingField(KEY_CONTACT_DATA))?;
        let config_raw =
            map.get(KEY_CONFIG_DATA).ok_or(MetadataError::MissingField(KEY_CONFIG_DATA))?;

        let version = map.get(KEY_SCHEMA_VERSION).map(String::as_str).unwrap_or_default();
        if version != METADATA_SCHEMA_VERSION {
            return Err(MetadataError::UnsupportedVersion(version.to_string()));
        }
        let order_type = map.get(KEY_TYPE).map(String::as_str).unwrap_or_default();
        if order_type != SAMPLE_ORDER_TYPE {
            return Err(MetadataError::UnexpectedType(order_type.to_string()));
        }

        let mut contact: ContactForm = from_json(KEY_CONTACT_DATA, contact_raw)?;
        contact.billing_data = None;
        let billing = map
            .get(KEY_BILLING_DATA)
            .map(|raw| from_json::<BillingData>(KEY_BILLING_DATA, raw))
            .transpose()?
            .filter(|billing| !billing.is_empty());
        let product = from_json(KEY_CONFIG_DATA, config_raw)?;
        let country = map.get(KEY_COUNTRY).cloned().unwrap_or_default();

        Ok(Self {
            customer_name: map.get(KEY_CUSTOMER_NAME).cloned().unwrap_or_default(),
            session_id: map.get(KEY_SESSION_ID).cloned().unwrap_or_default(),
            amount: map.get(KEY_AMOUNT).and_then(|raw| raw.parse().ok()).unwrap_or_default(),
            contact,
            billing,
            config: ConfigData { country, product },
            full_beverage_text: map.get(KEY_FULL_BEVERAGE_TEXT).cloned(),
        })
    }

    /// Rebuilds the paid quote. The sample flag is forced on.
    pub fn into_quote(
        self,
        submitted_at: DateTime<Utc>,
        ip: impl Into<String>,
        payment: PaymentRecord,
    ) -> UnifiedQuoteData {
        let Self { mut contact, billing, config, full_beverage_text, .. } = self;
        contact.billing_data = billing;

        let ConfigData { country, mut product } = config;
        if let (Some(text), ProductLine::PrivateLabel { beverage_selection, .. }) =
            (full_beverage_text, &mut product)
        {
            beverage_selection.custom_beverage_text = text;
        }

        UnifiedQuoteData {
            contact_form: contact,
            product,
            wants_sample: true,
            country,
            submitted_at,
            ip: ip.into(),
            payment: Some(payment),
        }
    }
}

fn to_json<T: Serialize>(key: &'static str, value: &T) -> Result<String, MetadataError> {
    serde_json::to_string(value).map_err(|source| MetadataError::Encode { key, source })
}

fn from_json<T: for<'de> Deserialize<'de>>(
    key: &'static str,
    raw: &str,
) -> Result<T, MetadataError> {
    serde_json::from_str(raw).map_err(|source| MetadataError::Decode { key, source })
}

/// Billing fields are optional, so empty ones are left out to save room.
fn compact_billing(billing: &BillingData) -> Value {
    match serde_json::to_value(billing) {
        Ok(Value::Object(fields)) => Value::Object(
            fields
                .into_iter()
                .filter(|(_, value)| value.as_str().map_or(true, |text| !text.is_empty()))
                .collect(),
        ),
        Ok(other) => other,
        Err(_) => Value::Null,
    }
}
