//! Command-line interface for wikigeo's acquisition and ingestion tooling.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::{Parser, Subcommand};

mod error;
mod fetch;
mod ingest;
mod paths;

pub use error::CliError;

use fetch::FetchArgs;
use ingest::IngestArgs;

pub(crate) const ARG_SPATIAL_DIR: &str = "spatial-dir";
pub(crate) const ARG_CATALOGUE: &str = "catalogue";
pub(crate) const ARG_LAYER_GROUP: &str = "layer-group";
pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_DOWNLOAD_LOG: &str = "download-log";
pub(crate) const ARG_WIKIDATA_DUMP: &str = "wikidata-dump";
pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_LANGUAGES: &str = "languages";
pub(crate) const ENV_SPATIAL_DIR: &str = "WIKIGEO_CMDS_FETCH_SPATIAL_DIR";
pub(crate) const ENV_CATALOGUE: &str = "WIKIGEO_CMDS_FETCH_CATALOGUE";
pub(crate) const ENV_LAYER_GROUP: &str = "WIKIGEO_CMDS_FETCH_LAYER_GROUP";
pub(crate) const ENV_NAME: &str = "WIKIGEO_CMDS_FETCH_NAME";
pub(crate) const ENV_WIKIDATA_DUMP: &str = "WIKIGEO_CMDS_INGEST_WIKIDATA_DUMP";
pub(crate) const ENV_DATABASE: &str = "WIKIGEO_CMDS_INGEST_DATABASE";
pub(crate) const ENV_LANGUAGES: &str = "WIKIGEO_CMDS_INGEST_LANGUAGES";

/// Run the wikigeo CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.verbose);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Fetch(args) => {
            let named = fetch::run_fetch(args)?;
            fetch::write_report(&named, &mut out)?;
        }
        Command::Ingest(args) => {
            let summary = ingest::run_ingest(args)?;
            ingest::write_summary(&summary, &mut out)?;
        }
    }
    out.flush().map_err(CliError::WriteOutput)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[derive(Debug, Parser)]
#[command(
    name = "wikigeo",
    about = "Acquire reference datasets and ingest Wikidata coordinates",
    version
)]
struct Cli {
    /// Log per-item decisions as well as progress.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download and stage a catalogued reference dataset.
    Fetch(FetchArgs),
    /// Load Wikidata coordinates into a spatial store.
    Ingest(IngestArgs),
}

#[cfg(test)]
mod tests;
