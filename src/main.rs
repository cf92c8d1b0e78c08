//! Siteforge - command-line static site asset builder

use std::process::ExitCode;

use siteforge::cli;

fn main() -> ExitCode {
    cli::run()
}
