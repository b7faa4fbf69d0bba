use serde::{Deserialize, Serialize};

use crate::domain::contact::ContactForm;
use crate::domain::product::{
    BeverageSelection, CanSelection, PackagingSelection, ServiceType, VolumeFormatSelection,
};
use crate::validation::ValidationStateManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    Country = 1,
    Service = 2,
    ProductConfig = 3,
    Quote = 4,
    TemplateOrSpec = 5,
    Contact = 6,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        Self::Country,
        Self::Service,
        Self::ProductConfig,
        Self::Quote,
        Self::TemplateOrSpec,
        Self::Contact,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number().checked_sub(1)?)
    }

    /// Step titles differ per product line; ordinals do not.
    pub fn title(self, service_type: Option<ServiceType>) -> &'static str {
        match (self, service_type) {
            (Self::Country, _) => "Country",
            (Self::Service, _) => "Service",
            (Self::ProductConfig, Some(ServiceType::PrivateLabel)) => "Beverage",
            (Self::ProductConfig, _) => "Can quantity",
            (Self::Quote, Some(ServiceType::PrivateLabel)) => "Volume and format",
            (Self::Quote, _) => "Price summary",
            (Self::TemplateOrSpec, Some(ServiceType::PrivateLabel)) => "Packaging",
            (Self::TemplateOrSpec, _) => "Template download",
            (Self::Contact, _) => "Contact details",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactField {
    FirstName,
    LastName,
    Email,
    Phone,
    Company,
    PreferredCallTime,
}

impl ContactField {
    pub fn key(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::PreferredCallTime => "preferredCallTime",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingField {
    VatNumber,
    FiscalCode,
    LegalName,
    Address,
    City,
    PostalCode,
    Province,
    SdiCode,
    PecEmail,
}

impl BillingField {
    pub fn key(self) -> &'static str {
        match self {
            Self::VatNumber => "vatNumber",
            Self::FiscalCode => "fiscalCode",
            Self::LegalName => "legalName",
            Self::Address => "billingAddress",
            Self::City => "billingCity",
            Self::PostalCode => "billingPostalCode",
            Self::Province => "billingProvince",
            Self::SdiCode => "sdiCode",
            Self::PecEmail => "pecEmail",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardAction {
    SelectCountry(String),
    SelectServiceType(ServiceType),
    SelectServiceSubType(String),
    SelectCanQuantity(u32),
    SelectBeverage(String),
    SetCustomBeverageText(String),
    SelectVolumeFormat { volume_liters: u32, format_ml: u32 },
    SelectPackaging(String),
    SetWantsToContinueQuote(bool),
    MarkTemplateDownloaded,
    ToggleSample,
    SetContactField(ContactField, String),
    SetBillingField(BillingField, String),
    SetCanCall(bool),
    SetEmailOnly(bool),
    SetSessionId(String),
    MarkPaymentCompleted,
    RecordSubmitAttempt,
    Next,
    Previous,
    GoTo(WizardStep),
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionRoute {
    Checkout,
    SubmitQuote,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardState {
    pub current_step: WizardStep,
    pub country: Option<String>,
    pub service_type: Option<ServiceType>,
    pub service_sub_type: Option<String>,
    pub can_selection: Option<CanSelection>,
    pub beverage_selection: Option<BeverageSelection>,
    pub volume_format_selection: Option<VolumeFormatSelection>,
    pub packaging_selection: Option<PackagingSelection>,
    pub contact_form: ContactForm,
    pub wants_sample: bool,
    pub has_downloaded_template: bool,
    pub wants_to_continue_quote: bool,
    pub payment_completed: bool,
    pub session_id: String,
    pub submit_attempts: u32,
    pub field_validation: ValidationStateManager,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current_step: WizardStep::Country,
            country: None,
            service_type: None,
            service_sub_type: None,
            can_selection: None,
            beverage_selection: None,
            volume_format_selection: None,
            packaging_selection: None,
            contact_form: ContactForm::default(),
            wants_sample: false,
            has_downloaded_template: false,
            wants_to_continue_quote: false,
            payment_completed: false,
            session_id: String::new(),
            submit_attempts: 0,
            field_validation: ValidationStateManager::default(),
        }
    }
}
