use std::process::ExitCode;

fn main() -> ExitCode {
    canlabel_cli::run()
}
