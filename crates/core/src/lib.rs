pub mod config;
pub mod domain;
pub mod errors;
pub mod intake;
pub mod metadata;
pub mod pricing;
pub mod validation;
pub mod wizard;

pub use domain::contact::{BillingData, ContactForm};
pub use domain::product::{ProductLine, ServiceType};
pub use domain::quote::{PaymentRecord, QuoteId, UnifiedQuoteData};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use intake::{CheckoutRequest, CheckoutRequestError, QuoteRequestError};
pub use metadata::{CheckoutMetadata, MetadataError};
pub use wizard::{WizardAction, WizardEngine, WizardState, WizardStep};
