//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use wikigeo_cli::CliError;

fn main() {
    if let Err(err) = wikigeo_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = err {
            clap_err.exit();
        }
        eprintln!("wikigeo: {err}");
        std::process::exit(1);
    }
}
