//! Indicative price tables. Prices are EUR, VAT excluded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{CanSelection, VolumeFormatSelection};

/// Fixed price of the physical sample, in minor units (EUR 50.00).
pub const SAMPLE_PRICE_MINOR: i64 = 5_000;
pub const SAMPLE_CURRENCY: &str = "eur";

pub const MIN_CAN_QUANTITY: u32 = 1;
pub const MAX_CAN_QUANTITY: u32 = 10_000;

pub const CANS_PER_CARTON: u32 = 24;
pub const CAN_FORMATS_ML: [u32; 3] = [250, 330, 500];
pub const STANDARD_VOLUMES_LITERS: [u32; 3] = [1_000, 2_500, 5_000];
pub const MIN_CUSTOM_VOLUME_LITERS: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub quantity: u32,
    /// Total for the tier quantity, in cents.
    pub total_cents: i64,
}

impl PriceTier {
    pub fn total(&self) -> Decimal {
        Decimal::new(self.total_cents, 2)
    }

    pub fn unit_price(&self) -> Decimal {
        self.total() / Decimal::from(self.quantity)
    }
}

/// White Label tiers, ascending by quantity.
pub const WHITE_LABEL_TIERS: [PriceTier; 5] = [
    PriceTier { quantity: 300, total_cents: 66_000 },
    PriceTier { quantity: 600, total_cents: 120_000 },
    PriceTier { quantity: 1_200, total_cents: 228_000 },
    PriceTier { quantity: 2_400, total_cents: 432_000 },
    PriceTier { quantity: 4_800, total_cents: 816_000 },
];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("quantity {0} is outside 1..=10000")]
    QuantityOutOfRange(u32),
    #[error("unsupported can format {0} ml")]
    UnsupportedFormat(u32),
    #[error("custom volume must be at least 500 liters")]
    VolumeTooSmall,
}

pub fn tier_for(quantity: u32) -> PriceTier {
    WHITE_LABEL_TIERS
        .iter()
        .rev()
        .find(|tier| tier.quantity <= quantity)
        .copied()
        .unwrap_or(WHITE_LABEL_TIERS[0])
}

/// Exact tier quantities return the table total; other quantities use the
/// unit price of the highest tier not above them.
pub fn white_label_selection(quantity: u32) -> Result<CanSelection, PricingError> {
    if !(MIN_CAN_QUANTITY..=MAX_CAN_QUANTITY).contains(&quantity) {
        return Err(PricingError::QuantityOutOfRange(quantity));
    }

    let tier = tier_for(quantity);
    let total_price = if tier.quantity == quantity {
        tier.total()
    } else {
        (tier.unit_price() * Decimal::from(quantity)).round_dp(2)
    };

    Ok(CanSelection { quantity, total_price })
}

pub fn volume_format_selection(
    volume_liters: u32,
    format_ml: u32,
) -> Result<VolumeFormatSelection, PricingError> {
    if !CAN_FORMATS_ML.contains(&format_ml) {
        return Err(PricingError::UnsupportedFormat(format_ml));
    }
    let is_custom_volume = !STANDARD_VOLUMES_LITERS.contains(&volume_liters);
    if is_custom_volume && volume_liters < MIN_CUSTOM_VOLUME_LITERS {
        return Err(PricingError::VolumeTooSmall);
    }

    let total_pieces = volume_liters.saturating_mul(1_000) / format_ml;
    let cartons_count = total_pieces.div_ceil(CANS_PER_CARTON);

    Ok(VolumeFormatSelection {
        volume_liters,
        format_ml,
        total_pieces,
        cartons_count,
        is_custom_volume,
    })
}

pub fn format_minor_units(amount: i64) -> String {
    Decimal::new(amount, 2).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_tier_returns_table_total() {
        let selection = white_label_selection(600).expect("valid quantity");
        assert_eq!(selection.total_price, Decimal::new(1200, 0));
    }

    #[test]
    fn between_tiers_uses_lower_tier_unit_price() {
        // 600 tier is 2.00 per can.
        let selection = white_label_selection(1000).expect("valid quantity");
        assert_eq!(selection.total_price, Decimal::new(2000, 0));
    }

    #[test]
    fn below_first_tier_uses_first_tier_unit_price() {
        let selection = white_label_selection(10).expect("valid quantity");
        assert_eq!(selection.total_price, Decimal::new(2200, 2));
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        assert_eq!(white_label_selection(0), Err(PricingError::QuantityOutOfRange(0)));
        assert_eq!(
            white_label_selection(10_001),
            Err(PricingError::QuantityOutOfRange(10_001))
        );
    }

    #[test]
    fn volume_derives_pieces_and_cartons() {
        let selection = volume_format_selection(1_000, 330).expect("standard volume");
        assert_eq!(selection.total_pieces, 3_030);
        assert_eq!(selection.cartons_count, 127);
        assert!(!selection.is_custom_volume);

        let custom = volume_format_selection(750, 500).expect("custom volume");
        assert!(custom.is_custom_volume);
        assert_eq!(custom.total_pieces, 1_500);
    }

    #[test]
    fn volume_rejects_unknown_format_and_tiny_volume() {
        assert_eq!(volume_format_selection(1_000, 440), Err(PricingError::UnsupportedFormat(440)));
        assert_eq!(volume_format_selection(100, 330), Err(PricingError::VolumeTooSmall));
    }

    #[test]
    fn sample_price_formats_as_euros() {
        assert_eq!(format_minor_units(SAMPLE_PRICE_MINOR), "50.00");
    }
}
