use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::contact::{BillingData, ContactForm};
use crate::domain::product::{
    BeverageSelection, PackagingSelection, ServiceType, BEVERAGE_CATALOG, CUSTOM_BEVERAGE_ID,
    PACKAGING_CATALOG,
};
use crate::pricing::{self, PricingError, SAMPLE_PRICE_MINOR};
use crate::validation::{
    sanitize_input, validate_address, validate_city_or_province, validate_company,
    validate_email, validate_fiscal_code, validate_free_text, validate_name, validate_pec,
    validate_phone, validate_postal_code, validate_sdi, validate_vat_number,
};
use crate::wizard::states::{
    BillingField, ContactField, SubmissionRoute, WizardAction, WizardState, WizardStep,
};

/// Client-side throttle for the submit button. Advisory only; the server
/// does not rely on it.
pub const MAX_SUBMIT_ATTEMPTS: u32 = 5;
const PREFERRED_CALL_TIME_MAX_LEN: usize = 50;

pub type StepPredicate = fn(&WizardState) -> bool;

#[derive(Clone, Copy)]
pub struct StepDefinition {
    pub step: WizardStep,
    pub is_available: StepPredicate,
    pub is_complete: StepPredicate,
}

impl std::fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDefinition").field("step", &self.step).finish_non_exhaustive()
    }
}

pub trait WizardDefinition {
    fn steps(&self) -> &[StepDefinition];

    fn initial_state(&self) -> WizardState {
        WizardState::default()
    }
}

/// The six-step configurator shared by both product lines.
#[derive(Clone, Debug, Default)]
pub struct ConfiguratorWizard;

const CONFIGURATOR_STEPS: [StepDefinition; 6] = [
    StepDefinition {
        step: WizardStep::Country,
        is_available: always,
        is_complete: has_country,
    },
    StepDefinition {
        step: WizardStep::Service,
        is_available: has_country,
        is_complete: has_service_choice,
    },
    StepDefinition {
        step: WizardStep::ProductConfig,
        is_available: has_service_choice,
        is_complete: has_product_choice,
    },
    StepDefinition {
        step: WizardStep::Quote,
        is_available: has_product_choice,
        is_complete: has_quote_confirmation,
    },
    StepDefinition {
        step: WizardStep::TemplateOrSpec,
        is_available: has_quote_confirmation,
        is_complete: has_template_or_spec,
    },
    StepDefinition {
        step: WizardStep::Contact,
        is_available: has_template_or_spec,
        is_complete: has_valid_contact,
    },
];

impl WizardDefinition for ConfiguratorWizard {
    fn steps(&self) -> &[StepDefinition] {
        &CONFIGURATOR_STEPS
    }
}

fn always(_: &WizardState) -> bool {
    true
}

fn has_country(state: &WizardState) -> bool {
    state.country.as_deref().is_some_and(|country| !country.is_empty())
}

fn has_service_choice(state: &WizardState) -> bool {
    match state.service_type {
        Some(ServiceType::WhiteLabel) => state.service_sub_type.is_some(),
        Some(ServiceType::PrivateLabel) => true,
        None => false,
    }
}

fn has_product_choice(state: &WizardState) -> bool {
    match state.service_type {
        Some(ServiceType::WhiteLabel) => state.can_selection.is_some(),
        Some(ServiceType::PrivateLabel) => {
            state.beverage_selection.as_ref().is_some_and(BeverageSelection::is_complete)
        }
        None => false,
    }
}

fn has_quote_confirmation(state: &WizardState) -> bool {
    match state.service_type {
        Some(ServiceType::WhiteLabel) => state.wants_to_continue_quote,
        Some(ServiceType::PrivateLabel) => state.volume_format_selection.is_some(),
        None => false,
    }
}

/// White Label requires the template download before the contact step.
fn has_template_or_spec(state: &WizardState) -> bool {
    match state.service_type {
        Some(ServiceType::WhiteLabel) => state.has_downloaded_template,
        Some(ServiceType::PrivateLabel) => state.packaging_selection.is_some(),
        None => false,
    }
}

fn has_valid_contact(state: &WizardState) -> bool {
    contact_is_valid(&state.contact_form)
}

pub fn contact_is_valid(contact: &ContactForm) -> bool {
    let required_ok = validate_name(&contact.first_name).required("First name").is_valid
        && validate_name(&contact.last_name).required("Last name").is_valid
        && validate_email(&contact.email).required("Email").is_valid;
    let phone_ok = !contact.can_call || validate_phone(&contact.phone).required("Phone").is_valid;
    required_ok && phone_ok
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("step {0:?} is not available yet")]
    StepUnavailable(WizardStep),
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
    #[error("selection requires the {expected} product line")]
    WrongProductLine { expected: ServiceType },
    #[error("unknown {group} option `{value}`")]
    UnknownOption { group: &'static str, value: String },
    #[error("{0} selection cannot be empty")]
    EmptySelection(&'static str),
    #[error("step {0:?} is incomplete")]
    Incomplete(WizardStep),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

pub struct WizardEngine<D> {
    definition: D,
}

impl<D> WizardEngine<D>
where
    D: WizardDefinition,
{
    pub fn new(definition: D) -> Self {
        Self { definition }
    }

    pub fn initial_state(&self) -> WizardState {
        self.definition.initial_state()
    }

    /// A step is reachable only when its own predicate holds and every
    /// earlier step is both reachable and complete.
    pub fn is_available(&self, step: WizardStep, state: &WizardState) -> bool {
        for definition in self.definition.steps() {
            if !(definition.is_available)(state) {
                return false;
            }
            if definition.step == step {
                return true;
            }
            if !(definition.is_complete)(state) {
                return false;
            }
        }
        false
    }

    pub fn is_complete(&self, step: WizardStep, state: &WizardState) -> bool {
        self.is_available(step, state)
            && self
                .definition
                .steps()
                .iter()
                .find(|definition| definition.step == step)
                .is_some_and(|definition| (definition.is_complete)(state))
    }

    /// First step, in order, that is not complete yet.
    pub fn first_incomplete_step(&self, state: &WizardState) -> Option<WizardStep> {
        self.definition
            .steps()
            .iter()
            .map(|definition| definition.step)
            .find(|step| !self.is_complete(*step, state))
    }

    /// Whether the progression control of the current step is enabled.
    pub fn can_proceed(&self, state: &WizardState) -> bool {
        self.is_complete(state.current_step, state)
    }

    pub fn step_statuses(&self, state: &WizardState) -> Vec<(WizardStep, bool, bool)> {
        self.definition
            .steps()
            .iter()
            .map(|definition| {
                let step = definition.step;
                (step, self.is_available(step, state), self.is_complete(step, state))
            })
            .collect()
    }

    pub fn submission_route(&self, state: &WizardState) -> SubmissionRoute {
        if state.wants_sample && !state.payment_completed {
            SubmissionRoute::Checkout
        } else {
            SubmissionRoute::SubmitQuote
        }
    }

    pub fn can_attempt_submit(&self, state: &WizardState) -> bool {
        state.submit_attempts < MAX_SUBMIT_ATTEMPTS
    }

    /// Applies one action to a snapshot and returns the next snapshot; the
    /// input is never modified.
    pub fn apply(
        &self,
        state: &WizardState,
        action: &WizardAction,
    ) -> Result<WizardState, WizardError> {
        let mut next = state.clone();

        match action {
            WizardAction::Next => {
                let target = state.current_step.next().ok_or(WizardError::AtLastStep)?;
                self.ensure_available(target, state)?;
                next.current_step = target;
            }
            WizardAction::Previous => {
                next.current_step = state.current_step.previous().ok_or(WizardError::AtFirstStep)?;
            }
            WizardAction::GoTo(step) => {
                self.ensure_available(*step, state)?;
                next.current_step = *step;
            }
            WizardAction::Reset => return Ok(self.initial_state()),
            WizardAction::SelectCountry(country) => {
                let country = sanitize_input(country);
                if country.is_empty() {
                    return Err(WizardError::EmptySelection("country"));
                }
                next.country = Some(country);
            }
            WizardAction::SelectServiceType(service_type) => {
                next.service_type = Some(*service_type);
            }
            WizardAction::SelectServiceSubType(sub_type) => {
                require_line(state, ServiceType::WhiteLabel)?;
                let sub_type = sanitize_input(sub_type);
                if sub_type.is_empty() {
                    return Err(WizardError::EmptySelection("service sub-type"));
                }
                next.service_sub_type = Some(sub_type);
            }
            WizardAction::SelectCanQuantity(quantity) => {
                require_line(state, ServiceType::WhiteLabel)?;
                next.can_selection = Some(pricing::white_label_selection(*quantity)?);
            }
            WizardAction::SelectBeverage(beverage) => {
                require_line(state, ServiceType::PrivateLabel)?;
                next.beverage_selection = Some(select_beverage(state, beverage)?);
            }
            WizardAction::SetCustomBeverageText(text) => {
                require_line(state, ServiceType::PrivateLabel)?;
                next.beverage_selection = Some(BeverageSelection {
                    selected_beverage: CUSTOM_BEVERAGE_ID.to_string(),
                    custom_beverage_text: sanitize_input(text),
                    is_custom: true,
                });
            }
            WizardAction::SelectVolumeFormat { volume_liters, format_ml } => {
                require_line(state, ServiceType::PrivateLabel)?;
                next.volume_format_selection =
                    Some(pricing::volume_format_selection(*volume_liters, *format_ml)?);
            }
            WizardAction::SelectPackaging(packaging) => {
                require_line(state, ServiceType::PrivateLabel)?;
                let (id, _, packaging_type) = PACKAGING_CATALOG
                    .iter()
                    .find(|(id, _, _)| *id == packaging.as_str())
                    .ok_or_else(|| WizardError::UnknownOption {
                        group: "packaging",
                        value: packaging.clone(),
                    })?;
                next.packaging_selection = Some(PackagingSelection {
                    selected_packaging: (*id).to_string(),
                    packaging_type: *packaging_type,
                });
            }
            WizardAction::SetWantsToContinueQuote(wants) => next.wants_to_continue_quote = *wants,
            WizardAction::MarkTemplateDownloaded => next.has_downloaded_template = true,
            WizardAction::ToggleSample => next.wants_sample = !state.wants_sample,
            WizardAction::SetContactField(field, raw) => set_contact_field(&mut next, *field, raw),
            WizardAction::SetBillingField(field, raw) => set_billing_field(&mut next, *field, raw),
            WizardAction::SetCanCall(can_call) => {
                next.contact_form.can_call = *can_call;
                if *can_call {
                    next.contact_form.email_only = false;
                }
            }
            WizardAction::SetEmailOnly(email_only) => {
                next.contact_form.email_only = *email_only;
                if *email_only {
                    next.contact_form.can_call = false;
                    next.contact_form.preferred_call_time.clear();
                }
            }
            WizardAction::SetSessionId(session_id) => next.session_id = sanitize_input(session_id),
            WizardAction::MarkPaymentCompleted => next.payment_completed = true,
            WizardAction::RecordSubmitAttempt => {
                next.submit_attempts = state.submit_attempts.saturating_add(1);
            }
        }

        // Edits can invalidate the step the user is on, e.g. switching product line.
        while !self.is_available(next.current_step, &next) {
            match next.current_step.previous() {
                Some(step) => next.current_step = step,
                None => break,
            }
        }

        Ok(next)
    }

    fn ensure_available(&self, step: WizardStep, state: &WizardState) -> Result<(), WizardError> {
        if self.is_available(step, state) {
            Ok(())
        } else {
            Err(WizardError::StepUnavailable(step))
        }
    }

    /// Body for `POST /api/submit-quote-request`.
    pub fn quote_request_payload(&self, state: &WizardState) -> Result<Value, WizardError> {
        if let Some(step) = self.first_incomplete_step(state) {
            return Err(WizardError::Incomplete(step));
        }
        let service_type = state.service_type.ok_or(WizardError::Incomplete(WizardStep::Service))?;
        let country = state
            .country
            .clone()
            .filter(|country| !country.is_empty())
            .ok_or(WizardError::Incomplete(WizardStep::Country))?;

        let mut payload = json!({
            "contactForm": state.contact_form,
            "requestType": service_type.request_type(),
            "serviceType": service_type.as_str(),
            "wantsSample": state.wants_sample,
            "country": country,
            "canSelection": Value::Null,
            "beverageSelection": Value::Null,
            "volumeFormatSelection": Value::Null,
            "packagingSelection": Value::Null,
        });

        match service_type {
            ServiceType::WhiteLabel => {
                let can_selection = state
                    .can_selection
                    .as_ref()
                    .ok_or(WizardError::Incomplete(WizardStep::ProductConfig))?;
                payload["canSelection"] = json!(can_selection);
            }
            ServiceType::PrivateLabel => {
                let beverage = state
                    .beverage_selection
                    .as_ref()
                    .ok_or(WizardError::Incomplete(WizardStep::ProductConfig))?;
                let volume = state
                    .volume_format_selection
                    .as_ref()
                    .ok_or(WizardError::Incomplete(WizardStep::Quote))?;
                let packaging = state
                    .packaging_selection
                    .as_ref()
                    .ok_or(WizardError::Incomplete(WizardStep::TemplateOrSpec))?;
                payload["beverageSelection"] = json!(beverage);
                payload["volumeFormatSelection"] = json!(volume);
                payload["packagingSelection"] = json!(packaging);
            }
        }

        Ok(payload)
    }

    /// Body for `POST /api/create-checkout-session`.
    pub fn checkout_request_payload(&self, state: &WizardState) -> Result<Value, WizardError> {
        let customer_data = self.quote_request_payload(state)?;
        Ok(json!({
            "customerEmail": state.contact_form.email,
            "customerName": state.contact_form.full_name(),
            "amount": SAMPLE_PRICE_MINOR,
            "sessionId": state.session_id,
            "customerData": customer_data,
        }))
    }
}

impl Default for WizardEngine<ConfiguratorWizard> {
    fn default() -> Self {
        Self::new(ConfiguratorWizard)
    }
}

fn require_line(state: &WizardState, expected: ServiceType) -> Result<(), WizardError> {
    if state.service_type == Some(expected) {
        Ok(())
    } else {
        Err(WizardError::WrongProductLine { expected })
    }
}

fn select_beverage(state: &WizardState, beverage: &str) -> Result<BeverageSelection, WizardError> {
    if beverage == CUSTOM_BEVERAGE_ID {
        let custom_beverage_text = state
            .beverage_selection
            .as_ref()
            .map(|selection| selection.custom_beverage_text.clone())
            .unwrap_or_default();
        return Ok(BeverageSelection {
            selected_beverage: CUSTOM_BEVERAGE_ID.to_string(),
            custom_beverage_text,
            is_custom: true,
        });
    }

    if !BEVERAGE_CATALOG.iter().any(|(id, _)| *id == beverage) {
        return Err(WizardError::UnknownOption { group: "beverage", value: beverage.to_string() });
    }

    Ok(BeverageSelection {
        selected_beverage: beverage.to_string(),
        custom_beverage_text: String::new(),
        is_custom: false,
    })
}

fn set_contact_field(state: &mut WizardState, field: ContactField, raw: &str) {
    let key = field.key();
    let tracker = &mut state.field_validation;
    let contact = &mut state.contact_form;

    match field {
        ContactField::FirstName => {
            contact.first_name = tracker.validate_field(key, raw, validate_name);
        }
        ContactField::LastName => {
            contact.last_name = tracker.validate_field(key, raw, validate_name);
        }
        ContactField::Email => contact.email = tracker.validate_field(key, raw, validate_email),
        ContactField::Phone => contact.phone = tracker.validate_field(key, raw, validate_phone),
        ContactField::Company => {
            contact.company = tracker.validate_field(key, raw, validate_company);
        }
        ContactField::PreferredCallTime => {
            contact.preferred_call_time = tracker.validate_field(key, raw, |value| {
                validate_free_text(value, PREFERRED_CALL_TIME_MAX_LEN)
            });
        }
    }
}

fn set_billing_field(state: &mut WizardState, field: BillingField, raw: &str) {
    let key = field.key();
    let country = state.country.clone().unwrap_or_default();
    let tracker = &mut state.field_validation;
    let billing = state.contact_form.billing_data.get_or_insert_with(BillingData::default);

    match field {
        BillingField::VatNumber => {
            billing.vat_number =
                tracker.validate_field(key, raw, |value| validate_vat_number(value, &country));
        }
        BillingField::FiscalCode => {
            billing.fiscal_code = tracker.validate_field(key, raw, validate_fiscal_code);
        }
        BillingField::LegalName => {
            billing.legal_name = tracker.validate_field(key, raw, validate_company);
        }
        BillingField::Address => {
            billing.billing_address = tracker.validate_field(key, raw, validate_address);
        }
        BillingField::City => {
            billing.billing_city = tracker.validate_field(key, raw, validate_city_or_province);
        }
        BillingField::PostalCode => {
            billing.billing_postal_code =
                tracker.validate_field(key, raw, |value| validate_postal_code(value, &country));
        }
        BillingField::Province => {
            billing.billing_province = tracker.validate_field(key, raw, validate_city_or_province);
        }
        BillingField::SdiCode => billing.sdi_code = tracker.validate_field(key, raw, validate_sdi),
        BillingField::PecEmail => {
            billing.pec_email = tracker.validate_field(key, raw, validate_pec);
        }
    }

    if billing.is_empty() {
        state.contact_form.billing_data = None;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn engine() -> WizardEngine<ConfiguratorWizard> {
        WizardEngine::default()
    }

    fn run(
        engine: &WizardEngine<ConfiguratorWizard>,
        state: WizardState,
        actions: &[WizardAction],
    ) -> WizardState {
        actions.iter().fold(state, |state, action| {
            engine.apply(&state, action).unwrap_or_else(|error| panic!("{action:?}: {error}"))
        })
    }

    fn contact_actions() -> Vec<WizardAction> {
        vec![
            WizardAction::SetContactField(ContactField::FirstName, "Mario".to_string()),
            WizardAction::SetContactField(ContactField::LastName, "Rossi".to_string()),
            WizardAction::SetContactField(ContactField::Email, "Mario@Example.com".to_string()),
        ]
    }

    fn white_label_at_contact(engine: &WizardEngine<ConfiguratorWizard>) -> WizardState {
        let mut actions = vec![
            WizardAction::SelectCountry("Italy".to_string()),
            WizardAction::Next,
            WizardAction::SelectServiceType(ServiceType::WhiteLabel),
            WizardAction::SelectServiceSubType("classic".to_string()),
            WizardAction::Next,
            WizardAction::SelectCanQuantity(600),
            WizardAction::Next,
            WizardAction::SetWantsToContinueQuote(true),
            WizardAction::Next,
            WizardAction::MarkTemplateDownloaded,
            WizardAction::Next,
        ];
        actions.extend(contact_actions());
        run(engine, engine.initial_state(), &actions)
    }

    #[test]
    fn initial_state_starts_at_country_with_nothing_selected() {
        let state = engine().initial_state();
        assert_eq!(state.current_step, WizardStep::Country);
        assert!(state.country.is_none());
        assert!(!state.wants_sample);
        assert!(!engine().can_proceed(&state));
    }

    #[test]
    fn next_is_blocked_until_country_is_selected() {
        let engine = engine();
        let error = engine
            .apply(&engine.initial_state(), &WizardAction::Next)
            .expect_err("country missing");
        assert_eq!(error, WizardError::StepUnavailable(WizardStep::Service));
    }

    #[test]
    fn previous_is_rejected_on_first_step() {
        let engine = engine();
        let error = engine
            .apply(&engine.initial_state(), &WizardAction::Previous)
            .expect_err("first step");
        assert_eq!(error, WizardError::AtFirstStep);
    }

    #[test]
    fn back_and_forth_navigation_keeps_country() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SelectCountry("Italy".to_string()),
                WizardAction::Next,
                WizardAction::Previous,
            ],
        );

        assert_eq!(state.current_step, WizardStep::Country);
        assert_eq!(state.country.as_deref(), Some("Italy"));

        let again = run(&engine, state, &[WizardAction::Next]);
        assert_eq!(again.current_step, WizardStep::Service);
    }

    #[test]
    fn selecting_a_new_option_replaces_the_previous_one() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SelectCountry("Italy".to_string()),
                WizardAction::SelectCountry("Germany".to_string()),
                WizardAction::SelectServiceType(ServiceType::WhiteLabel),
                WizardAction::SelectCanQuantity(300),
                WizardAction::SelectCanQuantity(1200),
                WizardAction::SelectServiceType(ServiceType::PrivateLabel),
                WizardAction::SelectBeverage("beer".to_string()),
                WizardAction::SelectBeverage("cider".to_string()),
                WizardAction::SelectPackaging("paper-label".to_string()),
                WizardAction::SelectPackaging("digital-print".to_string()),
            ],
        );

        assert_eq!(state.country.as_deref(), Some("Germany"));
        assert_eq!(state.service_type, Some(ServiceType::PrivateLabel));
        assert_eq!(state.can_selection.as_ref().map(|can| can.quantity), Some(1200));
        assert_eq!(
            state.beverage_selection.as_ref().map(|b| b.selected_beverage.as_str()),
            Some("cider")
        );
        let packaging = state.packaging_selection.expect("packaging");
        assert_eq!(packaging.selected_packaging, "digital-print");
        assert_eq!(packaging.packaging_type, crate::domain::product::PackagingType::Digital);
    }

    #[test]
    fn toggling_sample_twice_is_identity() {
        let engine = engine();
        let start = engine.initial_state();
        let toggled =
            run(&engine, start.clone(), &[WizardAction::ToggleSample, WizardAction::ToggleSample]);
        assert_eq!(toggled.wants_sample, start.wants_sample);
        assert!(!toggled.wants_sample);
    }

    #[test]
    fn white_label_walks_all_six_steps() {
        let engine = engine();
        let state = white_label_at_contact(&engine);

        assert_eq!(state.current_step, WizardStep::Contact);
        assert_eq!(
            state.can_selection.as_ref().map(|can| can.total_price),
            Some(Decimal::new(1200, 0))
        );
        assert_eq!(state.contact_form.email, "mario@example.com");
        assert!(engine.can_proceed(&state));
        assert_eq!(engine.apply(&state, &WizardAction::Next), Err(WizardError::AtLastStep));
    }

    #[test]
    fn white_label_contact_step_requires_template_download() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SelectCountry("Italy".to_string()),
                WizardAction::Next,
                WizardAction::SelectServiceType(ServiceType::WhiteLabel),
                WizardAction::SelectServiceSubType("classic".to_string()),
                WizardAction::Next,
                WizardAction::SelectCanQuantity(600),
                WizardAction::Next,
                WizardAction::SetWantsToContinueQuote(true),
                WizardAction::Next,
            ],
        );

        assert_eq!(state.current_step, WizardStep::TemplateOrSpec);
        assert_eq!(
            engine.apply(&state, &WizardAction::Next),
            Err(WizardError::StepUnavailable(WizardStep::Contact))
        );

        let downloaded = run(&engine, state, &[WizardAction::MarkTemplateDownloaded]);
        assert!(engine.apply(&downloaded, &WizardAction::Next).is_ok());
    }

    #[test]
    fn white_label_product_step_requires_sub_type() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SelectCountry("Italy".to_string()),
                WizardAction::Next,
                WizardAction::SelectServiceType(ServiceType::WhiteLabel),
            ],
        );
        assert_eq!(
            engine.apply(&state, &WizardAction::Next),
            Err(WizardError::StepUnavailable(WizardStep::ProductConfig))
        );
    }

    #[test]
    fn private_label_walks_all_six_steps() {
        let engine = engine();
        let mut actions = vec![
            WizardAction::SelectCountry("France".to_string()),
            WizardAction::Next,
            WizardAction::SelectServiceType(ServiceType::PrivateLabel),
            WizardAction::Next,
            WizardAction::SelectBeverage("rd-custom".to_string()),
        ];
        let state = run(&engine, engine.initial_state(), &actions);
        assert_eq!(
            engine.apply(&state, &WizardAction::Next),
            Err(WizardError::StepUnavailable(WizardStep::Quote)),
            "custom beverage without text is incomplete"
        );

        actions = vec![
            WizardAction::SetCustomBeverageText("Ginger beer".to_string()),
            WizardAction::Next,
            WizardAction::SelectVolumeFormat { volume_liters: 2_500, format_ml: 330 },
            WizardAction::Next,
            WizardAction::SelectPackaging("shrink-sleeve".to_string()),
            WizardAction::Next,
        ];
        actions.extend(contact_actions());
        let state = run(&engine, state, &actions);

        assert_eq!(state.current_step, WizardStep::Contact);
        assert!(engine.can_proceed(&state));
        let payload = engine.quote_request_payload(&state).expect("complete");
        assert_eq!(payload["requestType"], "private-label-quote");
        assert!(payload["canSelection"].is_null());
        assert_eq!(payload["beverageSelection"]["customBeverageText"], "Ginger beer");
        assert_eq!(payload["volumeFormatSelection"]["formatMl"], 330);
    }

    #[test]
    fn product_actions_require_matching_line() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[WizardAction::SelectServiceType(ServiceType::PrivateLabel)],
        );
        assert_eq!(
            engine.apply(&state, &WizardAction::SelectCanQuantity(600)),
            Err(WizardError::WrongProductLine { expected: ServiceType::WhiteLabel })
        );
    }

    #[test]
    fn unknown_options_are_rejected() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[WizardAction::SelectServiceType(ServiceType::PrivateLabel)],
        );
        assert!(matches!(
            engine.apply(&state, &WizardAction::SelectBeverage("motor-oil".to_string())),
            Err(WizardError::UnknownOption { group: "beverage", .. })
        ));
        assert!(matches!(
            engine.apply(&state, &WizardAction::SelectPackaging("foil".to_string())),
            Err(WizardError::UnknownOption { group: "packaging", .. })
        ));
    }

    #[test]
    fn email_only_clears_call_preferences() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SetCanCall(true),
                WizardAction::SetContactField(
                    ContactField::PreferredCallTime,
                    "mornings".to_string(),
                ),
                WizardAction::SetEmailOnly(true),
            ],
        );
        assert!(state.contact_form.email_only);
        assert!(!state.contact_form.can_call);
        assert!(state.contact_form.preferred_call_time.is_empty());

        let calling = run(&engine, state, &[WizardAction::SetCanCall(true)]);
        assert!(!calling.contact_form.email_only);
    }

    #[test]
    fn can_call_requires_a_valid_phone() {
        let engine = engine();
        let state = white_label_at_contact(&engine);
        let calling = run(&engine, state, &[WizardAction::SetCanCall(true)]);
        assert!(!engine.can_proceed(&calling));

        let with_phone = run(
            &engine,
            calling,
            &[WizardAction::SetContactField(ContactField::Phone, "+39 02 1234567".to_string())],
        );
        assert!(engine.can_proceed(&with_phone));
    }

    #[test]
    fn first_invalid_field_is_reported() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SetContactField(ContactField::FirstName, "Mario".to_string()),
                WizardAction::SetContactField(ContactField::Email, "mario-at-example".to_string()),
            ],
        );
        let (field, message) = state.field_validation.first_error().expect("invalid email");
        assert_eq!(field, "email");
        assert_eq!(message, "Enter a valid email address");
    }

    #[test]
    fn billing_fields_use_country_rules() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SelectCountry("Italy".to_string()),
                WizardAction::SetBillingField(BillingField::VatNumber, "IT12345678901".to_string()),
                WizardAction::SetBillingField(BillingField::SdiCode, "abc1234".to_string()),
            ],
        );
        let billing = state.contact_form.billing_data.as_ref().expect("billing present");
        assert_eq!(billing.sdi_code, "ABC1234");
        assert!(state.field_validation.is_form_valid());

        let cleared = run(
            &engine,
            state,
            &[
                WizardAction::SetBillingField(BillingField::VatNumber, String::new()),
                WizardAction::SetBillingField(BillingField::SdiCode, String::new()),
            ],
        );
        assert!(cleared.contact_form.billing_data.is_none());
    }

    #[test]
    fn submission_route_depends_on_sample_and_payment() {
        let engine = engine();
        let state = white_label_at_contact(&engine);
        assert_eq!(engine.submission_route(&state), SubmissionRoute::SubmitQuote);

        let sample = run(&engine, state, &[WizardAction::ToggleSample]);
        assert_eq!(engine.submission_route(&sample), SubmissionRoute::Checkout);

        let paid = run(&engine, sample, &[WizardAction::MarkPaymentCompleted]);
        assert_eq!(engine.submission_route(&paid), SubmissionRoute::SubmitQuote);
    }

    #[test]
    fn checkout_payload_carries_fixed_amount_and_configuration() {
        let engine = engine();
        let state = run(
            &engine,
            white_label_at_contact(&engine),
            &[WizardAction::ToggleSample, WizardAction::SetSessionId("sess-42".to_string())],
        );

        let payload = engine.checkout_request_payload(&state).expect("complete");
        assert_eq!(payload["amount"], 5000);
        assert_eq!(payload["customerName"], "Mario Rossi");
        assert_eq!(payload["customerEmail"], "mario@example.com");
        assert_eq!(payload["sessionId"], "sess-42");
        assert_eq!(payload["customerData"]["canSelection"]["quantity"], 600);
        assert_eq!(payload["customerData"]["wantsSample"], true);
    }

    #[test]
    fn payload_requires_complete_contact() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[WizardAction::SelectServiceType(ServiceType::WhiteLabel)],
        );
        assert_eq!(
            engine.quote_request_payload(&state),
            Err(WizardError::Incomplete(WizardStep::Country))
        );
    }

    #[test]
    fn jumping_ahead_requires_every_earlier_step() {
        let engine = engine();
        let mut actions = vec![
            WizardAction::SelectServiceType(ServiceType::WhiteLabel),
            WizardAction::SelectCanQuantity(600),
            WizardAction::MarkTemplateDownloaded,
        ];
        actions.extend(contact_actions());
        let state = run(&engine, engine.initial_state(), &actions);

        assert_eq!(state.current_step, WizardStep::Country);
        assert_eq!(
            engine.apply(&state, &WizardAction::GoTo(WizardStep::Contact)),
            Err(WizardError::StepUnavailable(WizardStep::Contact))
        );
        assert!(!engine.is_available(WizardStep::Service, &state));
        assert!(!engine.is_available(WizardStep::Quote, &state));
        assert_eq!(
            engine.quote_request_payload(&state),
            Err(WizardError::Incomplete(WizardStep::Country))
        );

        let with_country =
            run(&engine, state, &[WizardAction::SelectCountry("Italy".to_string())]);
        assert_eq!(
            engine.apply(&with_country, &WizardAction::GoTo(WizardStep::Contact)),
            Err(WizardError::StepUnavailable(WizardStep::Contact)),
            "sub-type and quote confirmation are still missing"
        );
        assert!(!engine.is_available(WizardStep::ProductConfig, &with_country));
        assert_eq!(engine.first_incomplete_step(&with_country), Some(WizardStep::Service));
    }

    #[test]
    fn switching_product_line_pulls_current_step_back() {
        let engine = engine();
        let state = run(
            &engine,
            engine.initial_state(),
            &[
                WizardAction::SelectCountry("Italy".to_string()),
                WizardAction::Next,
                WizardAction::SelectServiceType(ServiceType::WhiteLabel),
                WizardAction::SelectServiceSubType("classic".to_string()),
                WizardAction::Next,
                WizardAction::SelectCanQuantity(600),
                WizardAction::Next,
            ],
        );
        assert_eq!(state.current_step, WizardStep::Quote);

        let switched =
            run(&engine, state, &[WizardAction::SelectServiceType(ServiceType::PrivateLabel)]);
        assert_eq!(switched.current_step, WizardStep::ProductConfig);
        assert!(!engine.can_proceed(&switched));
    }

    #[test]
    fn submit_attempts_are_throttled_after_limit() {
        let engine = engine();
        let actions = vec![WizardAction::RecordSubmitAttempt; MAX_SUBMIT_ATTEMPTS as usize];
        let state = run(&engine, engine.initial_state(), &actions);
        assert!(!engine.can_attempt_submit(&state));

        let reset = run(&engine, state, &[WizardAction::Reset]);
        assert!(engine.can_attempt_submit(&reset));
    }

    #[test]
    fn apply_never_mutates_the_input_snapshot() {
        let engine = engine();
        let state = engine.initial_state();
        let _ = engine.apply(&state, &WizardAction::SelectCountry("Italy".to_string()));
        assert!(state.country.is_none());
    }

    #[test]
    fn step_ordinals_are_stable() {
        assert_eq!(WizardStep::from_number(3), Some(WizardStep::ProductConfig));
        assert_eq!(WizardStep::from_number(0), None);
        assert_eq!(WizardStep::from_number(7), None);
        assert_eq!(WizardStep::Contact.number(), 6);
        assert_eq!(WizardStep::ProductConfig.title(Some(ServiceType::PrivateLabel)), "Beverage");
        assert_eq!(engine().step_statuses(&WizardState::default()).len(), 6);
    }
}
