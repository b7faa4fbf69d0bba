use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CUSTOM_BEVERAGE_ID: &str = "rd-custom";
const CUSTOM_BEVERAGE_PREFIX: &str = "Ricerca e Sviluppo";
const CUSTOM_BEVERAGE_FALLBACK: &str = "Bevanda personalizzata";

/// Known beverage ids and their display names.
pub const BEVERAGE_CATALOG: [(&str, &str); 8] = [
    ("beer", "Birra"),
    ("cider", "Sidro"),
    ("soft-drink", "Bibita gassata"),
    ("energy-drink", "Energy drink"),
    ("iced-tea", "Tè freddo"),
    ("sparkling-water", "Acqua frizzante"),
    ("ready-cocktail", "Cocktail pronto da bere"),
    ("kombucha", "Kombucha"),
];

/// Known packaging ids and the decoration technique each one uses.
pub const PACKAGING_CATALOG: [(&str, &str, PackagingType); 3] = [
    ("shrink-sleeve", "Sleeve termoretraibile", PackagingType::Label),
    ("paper-label", "Etichetta adesiva", PackagingType::Label),
    ("digital-print", "Stampa digitale diretta", PackagingType::Digital),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    WhiteLabel,
    PrivateLabel,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhiteLabel => "white-label",
            Self::PrivateLabel => "private-label",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WhiteLabel => "White Label",
            Self::PrivateLabel => "Private Label",
        }
    }

    /// Resolves a submission `requestType`. Unrecognized values are rejected
    /// rather than defaulted.
    pub fn from_request_type(raw: &str) -> Option<Self> {
        match raw.trim() {
            "white-label-quote" => Some(Self::WhiteLabel),
            "private-label-quote" => Some(Self::PrivateLabel),
            _ => None,
        }
    }

    pub fn request_type(&self) -> &'static str {
        match self {
            Self::WhiteLabel => "white-label-quote",
            Self::PrivateLabel => "private-label-quote",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanSelection {
    pub quantity: u32,
    pub total_price: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeverageSelection {
    pub selected_beverage: String,
    pub custom_beverage_text: String,
    pub is_custom: bool,
}

impl BeverageSelection {
    pub fn is_complete(&self) -> bool {
        if self.is_custom {
            return !self.custom_beverage_text.trim().is_empty();
        }
        !self.selected_beverage.is_empty()
    }

    pub fn display_name(&self) -> String {
        if self.is_custom {
            return beverage_display_name(CUSTOM_BEVERAGE_ID, &self.custom_beverage_text);
        }
        beverage_display_name(&self.selected_beverage, &self.custom_beverage_text)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeFormatSelection {
    pub volume_liters: u32,
    pub format_ml: u32,
    pub total_pieces: u32,
    pub cartons_count: u32,
    pub is_custom_volume: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingType {
    #[default]
    Label,
    Digital,
}

impl PackagingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Digital => "digital",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "label" => Some(Self::Label),
            "digital" => Some(Self::Digital),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackagingSelection {
    pub selected_packaging: String,
    pub packaging_type: PackagingType,
}

impl PackagingSelection {
    pub fn display_name(&self) -> String {
        PACKAGING_CATALOG
            .iter()
            .find(|(id, _, _)| *id == self.selected_packaging)
            .map(|(_, name, _)| (*name).to_string())
            .unwrap_or_else(|| self.selected_packaging.clone())
    }
}

/// The product-line specific part of a quote. Exactly one line applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "serviceType", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProductLine {
    WhiteLabel {
        can_selection: CanSelection,
    },
    PrivateLabel {
        beverage_selection: BeverageSelection,
        volume_format_selection: VolumeFormatSelection,
        packaging_selection: PackagingSelection,
    },
}

impl ProductLine {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::WhiteLabel { .. } => ServiceType::WhiteLabel,
            Self::PrivateLabel { .. } => ServiceType::PrivateLabel,
        }
    }
}

/// Display name for a beverage id. `rd-custom` renders the customer's own
/// text; unknown ids are shown as given.
pub fn beverage_display_name(id: &str, custom_text: &str) -> String {
    if id == CUSTOM_BEVERAGE_ID {
        let text = custom_text.trim();
        let detail = if text.is_empty() { CUSTOM_BEVERAGE_FALLBACK } else { text };
        return format!("{CUSTOM_BEVERAGE_PREFIX} - {detail}");
    }

    BEVERAGE_CATALOG
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Lenient variant for untyped payloads: null renders empty, numbers and
/// booleans render their text.
pub fn beverage_display_name_value(id: &Value, custom_text: &Value) -> String {
    let custom_text = custom_text.as_str().unwrap_or_default();
    match id {
        Value::String(id) => beverage_display_name(id, custom_text),
        Value::Null => String::new(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn custom_beverage_without_text_uses_fallback() {
        assert_eq!(
            beverage_display_name("rd-custom", ""),
            "Ricerca e Sviluppo - Bevanda personalizzata"
        );
    }

    #[test]
    fn custom_beverage_with_text_shows_text() {
        assert_eq!(
            beverage_display_name("rd-custom", "Birra al bergamotto"),
            "Ricerca e Sviluppo - Birra al bergamotto"
        );
    }

    #[test]
    fn known_and_unknown_ids() {
        assert_eq!(beverage_display_name("beer", ""), "Birra");
        assert_eq!(beverage_display_name("mystery-brew", ""), "mystery-brew");
    }

    #[test]
    fn untyped_ids_never_fail() {
        assert_eq!(beverage_display_name_value(&Value::Null, &Value::Null), "");
        assert_eq!(beverage_display_name_value(&json!(42), &Value::Null), "42");
        assert_eq!(
            beverage_display_name_value(&json!("rd-custom"), &Value::Null),
            "Ricerca e Sviluppo - Bevanda personalizzata"
        );
    }

    #[test]
    fn request_types_resolve_strictly() {
        assert_eq!(
            ServiceType::from_request_type("white-label-quote"),
            Some(ServiceType::WhiteLabel)
        );
        assert_eq!(
            ServiceType::from_request_type("private-label-quote"),
            Some(ServiceType::PrivateLabel)
        );
        assert_eq!(ServiceType::from_request_type("other"), None);
        assert_eq!(ServiceType::from_request_type(""), None);
    }

    #[test]
    fn product_line_serializes_with_service_type_tag() {
        let line = ProductLine::WhiteLabel {
            can_selection: CanSelection { quantity: 600, total_price: Decimal::new(1200, 0) },
        };
        let value = serde_json::to_value(&line).expect("serialize");

        assert_eq!(value["serviceType"], "white-label");
        assert_eq!(value["canSelection"]["quantity"], 600);
    }

    #[test]
    fn custom_beverage_requires_text_to_be_complete() {
        let mut selection = BeverageSelection {
            selected_beverage: CUSTOM_BEVERAGE_ID.to_string(),
            custom_beverage_text: "  ".to_string(),
            is_custom: true,
        };
        assert!(!selection.is_complete());

        selection.custom_beverage_text = "Limonata".to_string();
        assert!(selection.is_complete());
        assert_eq!(selection.display_name(), "Ricerca e Sviluppo - Limonata");
    }
}
