use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub can_call: bool,
    pub preferred_call_time: String,
    pub email_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_data: Option<BillingData>,
}

impl ContactForm {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Italian e-invoicing details. Either `sdi_code` or `pec_email` is expected
/// for electronic invoicing but neither is enforced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingData {
    pub vat_number: String,
    pub fiscal_code: String,
    pub legal_name: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_postal_code: String,
    pub billing_province: String,
    pub sdi_code: String,
    pub pec_email: String,
}

impl BillingData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_e_invoicing_recipient(&self) -> bool {
        !self.sdi_code.is_empty() || !self.pec_email.is_empty()
    }
}
