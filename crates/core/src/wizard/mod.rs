pub mod engine;
pub mod states;

pub use engine::{
    contact_is_valid, ConfiguratorWizard, StepDefinition, WizardDefinition, WizardEngine,
    WizardError, MAX_SUBMIT_ATTEMPTS,
};
pub use states::{
    BillingField, ContactField, SubmissionRoute, WizardAction, WizardState, WizardStep,
};
