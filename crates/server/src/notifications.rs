//! Operator and customer emails for a quote, rendered with Tera and sent
//! concurrently. Delivery failures are logged and reported, never raised.

use std::sync::Arc;

use canlabel_core::config::EmailConfig;
use canlabel_core::domain::contact::BillingData;
use canlabel_core::domain::product::{PackagingType, ProductLine};
use canlabel_core::pricing::format_minor_units;
use canlabel_core::{QuoteId, UnifiedQuoteData};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::{error, info, warn};

use crate::email::{EmailError, EmailSender, OutboundEmail};

const OPERATOR_TEMPLATE: &str = "operator_quote.html";
const CUSTOMER_TEMPLATE_IT: &str = "customer_quote_it.html";
const CUSTOMER_TEMPLATE_EN: &str = "customer_quote_en.html";

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("template rendering failed: {0}")]
    Render(#[from] tera::Error),
    #[error(transparent)]
    Send(#[from] EmailError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub operator_sent: bool,
    pub customer_sent: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Language {
    Italian,
    English,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct SummaryRow {
    label: &'static str,
    value: String,
}

fn row(label: &'static str, value: impl Into<String>) -> SummaryRow {
    SummaryRow { label, value: value.into() }
}

pub fn init_templates() -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(OPERATOR_TEMPLATE, include_str!("../templates/emails/operator_quote.html"))?;
    tera.add_raw_template(
        CUSTOMER_TEMPLATE_IT,
        include_str!("../templates/emails/customer_quote_it.html"),
    )?;
    tera.add_raw_template(
        CUSTOMER_TEMPLATE_EN,
        include_str!("../templates/emails/customer_quote_en.html"),
    )?;
    Ok(Arc::new(tera))
}

#[derive(Clone)]
pub struct Notifier {
    email: Arc<dyn EmailSender>,
    templates: Arc<Tera>,
    from: String,
    operator_address: String,
}

impl Notifier {
    pub fn new(email: Arc<dyn EmailSender>, templates: Arc<Tera>, config: &EmailConfig) -> Self {
        Self {
            email,
            templates,
            from: config.from_address.clone(),
            operator_address: config.operator_address.clone(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.email.is_noop()
    }

    pub fn operator_email(
        &self,
        quote: &UnifiedQuoteData,
        quote_id: &QuoteId,
    ) -> Result<OutboundEmail, NotificationError> {
        let subject = operator_subject(quote);
        let mut context = base_context(quote, quote_id, Language::Italian, &subject);
        context.insert(
            "billing",
            &quote.contact_form.billing_data.as_ref().map(billing_rows).unwrap_or_default(),
        );

        Ok(OutboundEmail {
            from: self.from.clone(),
            to: self.operator_address.clone(),
            subject,
            html: self.templates.render(OPERATOR_TEMPLATE, &context)?,
        })
    }

    /// Italian for customers in Italy, English for everyone else.
    pub fn customer_email(
        &self,
        quote: &UnifiedQuoteData,
        quote_id: &QuoteId,
    ) -> Result<OutboundEmail, NotificationError> {
        let language = if quote.is_italian() { Language::Italian } else { Language::English };
        let subject = customer_subject(quote, language);
        let context = base_context(quote, quote_id, language, &subject);
        let template = match language {
            Language::Italian => CUSTOMER_TEMPLATE_IT,
            Language::English => CUSTOMER_TEMPLATE_EN,
        };

        Ok(OutboundEmail {
            from: self.from.clone(),
            to: quote.contact_form.email.clone(),
            subject,
            html: self.templates.render(template, &context)?,
        })
    }

    /// Sends both emails concurrently and waits for both to settle.
    pub async fn dispatch(
        &self,
        quote: &UnifiedQuoteData,
        quote_id: &QuoteId,
        correlation_id: &str,
    ) -> DispatchReport {
        if let Some(billing) = &quote.contact_form.billing_data {
            if !billing.has_e_invoicing_recipient() {
                warn!(
                    event_name = "quote.billing.missing_e_invoicing_recipient",
                    correlation_id,
                    quote_id = %quote_id,
                    "billing data has neither SDI code nor PEC address"
                );
            }
        }

        let (operator, customer) = tokio::join!(
            self.send(self.operator_email(quote, quote_id)),
            self.send(self.customer_email(quote, quote_id)),
        );

        let report = DispatchReport {
            operator_sent: log_outcome("operator", operator, correlation_id, quote_id),
            customer_sent: log_outcome("customer", customer, correlation_id, quote_id),
        };
        info!(
            event_name = "quote.notifications.dispatched",
            correlation_id,
            quote_id = %quote_id,
            payment_completed = quote.payment_completed(),
            operator_sent = report.operator_sent,
            customer_sent = report.customer_sent,
            "quote notifications settled"
        );
        report
    }

    async fn send(
        &self,
        email: Result<OutboundEmail, NotificationError>,
    ) -> Result<String, NotificationError> {
        let email = email?;
        Ok(self.email.send(&email).await?.id)
    }
}

fn log_outcome(
    recipient: &'static str,
    outcome: Result<String, NotificationError>,
    correlation_id: &str,
    quote_id: &QuoteId,
) -> bool {
    match outcome {
        Ok(email_id) => {
            info!(
                event_name = "quote.notification.sent",
                correlation_id,
                quote_id = %quote_id,
                recipient,
                email_id = %email_id,
                "notification email accepted by provider"
            );
            true
        }
        Err(error) => {
            error!(
                event_name = "quote.notification.failed",
                correlation_id,
                quote_id = %quote_id,
                recipient,
                error = %error,
                "notification email failed"
            );
            false
        }
    }
}

fn operator_subject(quote: &UnifiedQuoteData) -> String {
    let service = quote.service_type().display_name();
    let name = quote.contact_form.full_name();
    if quote.payment_completed() {
        format!("Campione pagato - {service} - {name}")
    } else {
        format!("Nuova richiesta preventivo {service} - {name}")
    }
}

fn customer_subject(quote: &UnifiedQuoteData, language: Language) -> String {
    let subject = match (language, quote.payment_completed()) {
        (Language::Italian, true) => "Pagamento confermato: il tuo campione è in preparazione",
        (Language::Italian, false) => "Abbiamo ricevuto la tua richiesta di preventivo",
        (Language::English, true) => "Payment confirmed: your sample is being prepared",
        (Language::English, false) => "We have received your quote request",
    };
    subject.to_string()
}

fn base_context(
    quote: &UnifiedQuoteData,
    quote_id: &QuoteId,
    language: Language,
    subject: &str,
) -> Context {
    let mut context = Context::new();
    context.insert("quote", &quote.envelope());
    context.insert("quote_id", &quote_id.0);
    context.insert("subject", subject);
    context.insert("service_name", quote.service_type().display_name());
    context.insert("submitted_at", &quote.submitted_at.format("%d/%m/%Y %H:%M UTC").to_string());
    context.insert("payment_completed", &quote.payment_completed());
    context.insert(
        "amount_paid",
        &quote.payment.as_ref().map(|payment| format_minor_units(payment.amount_paid)),
    );
    context.insert("rows", &summary_rows(quote, language));
    context
}

fn summary_rows(quote: &UnifiedQuoteData, language: Language) -> Vec<SummaryRow> {
    let italian = language == Language::Italian;
    let mut rows = Vec::new();

    match &quote.product {
        ProductLine::WhiteLabel { can_selection } => {
            rows.push(row(
                if italian { "Quantità lattine" } else { "Can quantity" },
                can_selection.quantity.to_string(),
            ));
            rows.push(row(
                if italian { "Prezzo indicativo" } else { "Indicative price" },
                format!("€ {:.2}", can_selection.total_price),
            ));
        }
        ProductLine::PrivateLabel {
            beverage_selection,
            volume_format_selection,
            packaging_selection,
        } => {
            rows.push(row(
                if italian { "Bevanda" } else { "Beverage" },
                beverage_selection.display_name(),
            ));
            rows.push(row(
                if italian { "Formato" } else { "Format" },
                format!("{} ml", volume_format_selection.format_ml),
            ));
            rows.push(row(
                "Volume",
                format!(
                    "{} L{}",
                    volume_format_selection.volume_liters,
                    if volume_format_selection.is_custom_volume {
                        if italian { " (personalizzato)" } else { " (custom)" }
                    } else {
                        ""
                    }
                ),
            ));
            rows.push(row(
                if italian { "Lattine" } else { "Cans" },
                volume_format_selection.total_pieces.to_string(),
            ));
            rows.push(row(
                if italian { "Cartoni" } else { "Cartons" },
                volume_format_selection.cartons_count.to_string(),
            ));
            let technique = match (packaging_selection.packaging_type, italian) {
                (PackagingType::Label, true) => "etichetta",
                (PackagingType::Label, false) => "label",
                (PackagingType::Digital, true) => "stampa digitale",
                (PackagingType::Digital, false) => "digital print",
            };
            rows.push(row(
                "Packaging",
                format!("{} ({technique})", packaging_selection.display_name()),
            ));
        }
    }

    let sample = match (quote.wants_sample, italian) {
        (true, true) => "Sì",
        (true, false) => "Yes",
        (false, _) => "No",
    };
    rows.push(row(if italian { "Campione" } else { "Sample" }, sample));
    rows
}

fn billing_rows(billing: &BillingData) -> Vec<SummaryRow> {
    [
        ("Ragione sociale", &billing.legal_name),
        ("Partita IVA", &billing.vat_number),
        ("Codice fiscale", &billing.fiscal_code),
        ("Indirizzo", &billing.billing_address),
        ("Città", &billing.billing_city),
        ("CAP", &billing.billing_postal_code),
        ("Provincia", &billing.billing_province),
        ("Codice SDI", &billing.sdi_code),
        ("PEC", &billing.pec_email),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| row(label, value.clone()))
    .collect()
}
