use canlabel_core::pricing::{
    format_minor_units, tier_for, volume_format_selection, white_label_selection,
    SAMPLE_PRICE_MINOR,
};
use clap::Subcommand;
use rust_decimal::Decimal;

use crate::commands::CommandResult;

const INVALID_INPUT_EXIT_CODE: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum PriceLine {
    #[command(about = "Price a White Label can order by quantity")]
    WhiteLabel {
        #[arg(long, help = "Number of cans (1..=10000)")]
        quantity: u32,
        #[arg(long, help = "Add the paid sample to the estimate")]
        sample: bool,
    },
    #[command(about = "Compute pieces and cartons for a Private Label run")]
    PrivateLabel {
        #[arg(long, help = "Production volume in liters (1000, 2500, 5000 or custom >= 500)")]
        volume: u32,
        #[arg(long, help = "Can format in ml (250, 330 or 500)")]
        format: u32,
        #[arg(long, help = "Add the paid sample to the estimate")]
        sample: bool,
    },
}

pub fn run(line: PriceLine) -> CommandResult {
    match line {
        PriceLine::WhiteLabel { quantity, sample } => match white_label_selection(quantity) {
            Ok(selection) => {
                let tier = tier_for(quantity);
                let mut message = format!(
                    "white label: {} cans = EUR {:.2} (tier {} at EUR {:.4}/can, VAT excluded)",
                    selection.quantity,
                    selection.total_price,
                    tier.quantity,
                    tier.unit_price()
                );
                if sample {
                    let with_sample = selection.total_price + Decimal::new(SAMPLE_PRICE_MINOR, 2);
                    message.push_str(&format!(
                        "; with sample EUR {} = EUR {:.2}",
                        format_minor_units(SAMPLE_PRICE_MINOR),
                        with_sample
                    ));
                }
                CommandResult::success("price", message)
            }
            Err(error) => CommandResult::failure(
                "price",
                "invalid_input",
                error.to_string(),
                INVALID_INPUT_EXIT_CODE,
            ),
        },
        PriceLine::PrivateLabel { volume, format, sample } => {
            match volume_format_selection(volume, format) {
                Ok(selection) => {
                    let mut message = format!(
                        "private label: {} L in {} ml cans = {} pieces in {} cartons{}",
                        selection.volume_liters,
                        selection.format_ml,
                        selection.total_pieces,
                        selection.cartons_count,
                        if selection.is_custom_volume { " (custom volume)" } else { "" }
                    );
                    if sample {
                        message.push_str(&format!(
                            "; sample EUR {}",
                            format_minor_units(SAMPLE_PRICE_MINOR)
                        ));
                    }
                    CommandResult::success("price", message)
                }
                Err(error) => CommandResult::failure(
                    "price",
                    "invalid_input",
                    error.to_string(),
                    INVALID_INPUT_EXIT_CODE,
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{run, PriceLine};

    fn payload(output: &str) -> Value {
        serde_json::from_str(output).expect("command output should be valid JSON")
    }

    #[test]
    fn white_label_tier_price() {
        let result = run(PriceLine::WhiteLabel { quantity: 600, sample: false });
        assert_eq!(result.exit_code, 0);

        let success = payload(&result.output);
        assert_eq!(success["status"], "ok");
        let message = success["message"].as_str().unwrap_or_default();
        assert!(message.contains("600 cans = EUR 1200.00"), "{message}");
    }

    #[test]
    fn white_label_sample_adds_fifty_euros() {
        let result = run(PriceLine::WhiteLabel { quantity: 300, sample: true });
        let message = payload(&result.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(message.contains("with sample EUR 50.00 = EUR 710.00"), "{message}");
    }

    #[test]
    fn private_label_pieces_and_cartons() {
        let result = run(PriceLine::PrivateLabel { volume: 2_500, format: 330, sample: false });
        let message = payload(&result.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(message.contains("7575 pieces in 316 cartons"), "{message}");
    }

    #[test]
    fn invalid_input_is_a_structured_failure() {
        let result = run(PriceLine::PrivateLabel { volume: 100, format: 330, sample: false });
        assert_eq!(result.exit_code, 2);

        let failure = payload(&result.output);
        assert_eq!(failure["status"], "error");
        assert_eq!(failure["error_class"], "invalid_input");

        let result = run(PriceLine::WhiteLabel { quantity: 0, sample: false });
        assert_eq!(payload(&result.output)["message"], "quantity 0 is outside 1..=10000");
    }
}
