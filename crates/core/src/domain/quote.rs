use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::contact::ContactForm;
use crate::domain::product::{
    BeverageSelection, CanSelection, PackagingSelection, ProductLine, ServiceType,
    VolumeFormatSelection,
};

const QUOTE_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    /// `quote_<unix millis>_<9 base36 chars>`
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..QUOTE_ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("quote_{}_{suffix}", now.timestamp_millis()))
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set only when the quote was rebuilt from a confirmed sample payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub session_id: String,
    /// Minor currency units as reported by the processor.
    pub amount_paid: i64,
}

/// One configuration request, built fresh per request and never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnifiedQuoteData {
    pub contact_form: ContactForm,
    pub product: ProductLine,
    pub wants_sample: bool,
    pub country: String,
    pub submitted_at: DateTime<Utc>,
    pub ip: String,
    pub payment: Option<PaymentRecord>,
}

impl UnifiedQuoteData {
    pub fn service_type(&self) -> ServiceType {
        self.product.service_type()
    }

    pub fn payment_completed(&self) -> bool {
        self.payment.is_some()
    }

    pub fn is_italian(&self) -> bool {
        self.country == "Italy"
    }

    /// Flat wire shape with the inapplicable product line nulled out.
    pub fn envelope(&self) -> QuoteEnvelope {
        let (can_selection, beverage_selection, volume_format_selection, packaging_selection) =
            match &self.product {
                ProductLine::WhiteLabel { can_selection } => {
                    (Some(can_selection.clone()), None, None, None)
                }
                ProductLine::PrivateLabel {
                    beverage_selection,
                    volume_format_selection,
                    packaging_selection,
                } => (
                    None,
                    Some(beverage_selection.clone()),
                    Some(volume_format_selection.clone()),
                    Some(packaging_selection.clone()),
                ),
            };

        QuoteEnvelope {
            contact_form: self.contact_form.clone(),
            service_type: self.service_type(),
            can_selection,
            beverage_selection,
            volume_format_selection,
            packaging_selection,
            wants_sample: self.wants_sample,
            country: self.country.clone(),
            submitted_at: self.submitted_at,
            ip: self.ip.clone(),
            payment_completed: self.payment_completed(),
            payment_session_id: self.payment.as_ref().map(|payment| payment.session_id.clone()),
            amount_paid: self.payment.as_ref().map(|payment| payment.amount_paid),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEnvelope {
    pub contact_form: ContactForm,
    pub service_type: ServiceType,
    pub can_selection: Option<CanSelection>,
    pub beverage_selection: Option<BeverageSelection>,
    pub volume_format_selection: Option<VolumeFormatSelection>,
    pub packaging_selection: Option<PackagingSelection>,
    pub wants_sample: bool,
    pub country: String,
    pub submitted_at: DateTime<Utc>,
    pub ip: String,
    pub payment_completed: bool,
    pub payment_session_id: Option<String>,
    pub amount_paid: Option<i64>,
}
