pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::price::PriceLine;

#[derive(Debug, Parser)]
#[command(
    name = "canlabel",
    about = "Canlabel operator CLI",
    long_about = "Inspect configuration, check integration readiness, and compute indicative prices.",
    after_help = "Examples:\n  canlabel doctor --json\n  canlabel config\n  canlabel price white-label --quantity 600\n  canlabel price private-label --volume 2500 --format 330"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, email and payment readiness, and the template archive")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Compute an indicative price for a product line")]
    Price {
        #[command(subcommand)]
        line: PriceLine,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Price { line } => commands::price::run(line),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
