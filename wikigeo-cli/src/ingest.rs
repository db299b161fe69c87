//! Ingest command implementation for the wikigeo CLI.

use std::{io::Write, num::NonZeroUsize};

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wikigeo_core::LanguageSet;
use wikigeo_data::ingest::IngestSummary;

use crate::paths::{require_directory_or_absent, require_existing_file};
use crate::{
    ARG_DATABASE, ARG_LANGUAGES, ARG_WIKIDATA_DUMP, CliError, ENV_DATABASE, ENV_LANGUAGES,
    ENV_WIKIDATA_DUMP,
};

/// CLI arguments for the `ingest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read a Wikidata JSON dump twice: once to index which \
                 entities have articles in which languages, then again to \
                 store the coordinates of entities in the requested \
                 languages. Dumps may be plain, bzip2, or gzip compressed.",
    about = "Ingest Wikidata coordinates into a SQLite spatial store"
)]
#[ortho_config(prefix = "WIKIGEO")]
pub(crate) struct IngestArgs {
    /// Path to the Wikidata dump file (JSON, optionally .bz2 or .gz).
    #[arg(long = ARG_WIKIDATA_DUMP, value_name = "path")]
    #[serde(default)]
    pub(crate) wikidata_dump: Option<Utf8PathBuf>,
    /// SQLite database receiving accepted records.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Comma-separated language codes, such as "en,de".
    #[arg(long = ARG_LANGUAGES, value_name = "codes")]
    #[serde(default)]
    pub(crate) languages: Option<String>,
    /// Number of worker threads.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<NonZeroUsize>,
    /// Facts that may wait for a worker before reading pauses.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) backlog: Option<usize>,
}

impl IngestArgs {
    pub(crate) fn into_config(self) -> Result<IngestConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        IngestConfig::try_from(merged)
    }
}

/// Resolved `ingest` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IngestConfig {
    pub(crate) wikidata_dump: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) languages: LanguageSet,
    pub(crate) workers: Option<NonZeroUsize>,
    pub(crate) backlog: Option<usize>,
}

impl IngestConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing_file(&self.wikidata_dump, ARG_WIKIDATA_DUMP)?;
        match self.database.parent() {
            Some(parent) if !parent.as_str().is_empty() => {
                require_directory_or_absent(parent, ARG_DATABASE)
            }
            _ => Ok(()),
        }
    }
}

impl TryFrom<IngestArgs> for IngestConfig {
    type Error = CliError;

    fn try_from(args: IngestArgs) -> Result<Self, Self::Error> {
        let wikidata_dump = args.wikidata_dump.ok_or(CliError::MissingArgument {
            field: ARG_WIKIDATA_DUMP,
            env: ENV_WIKIDATA_DUMP,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_DATABASE,
        })?;
        let languages = args
            .languages
            .ok_or(CliError::MissingArgument {
                field: ARG_LANGUAGES,
                env: ENV_LANGUAGES,
            })?
            .parse()?;
        Ok(Self {
            wikidata_dump,
            database,
            languages,
            workers: args.workers,
            backlog: args.backlog,
        })
    }
}

/// Resolve configuration and ingest the configured dump.
pub(crate) fn run_ingest(args: IngestArgs) -> Result<IngestSummary, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    ingest_dump(&config)
}

/// Index concepts from the dump, then stream its coordinates into SQLite.
#[cfg(feature = "store-sqlite")]
pub(crate) fn ingest_dump(config: &IngestConfig) -> Result<IngestSummary, CliError> {
    use log::info;
    use wikigeo_core::{SqliteSpatialStore, WikidataCoordinateDecoder};
    use wikigeo_data::ingest::{FactFilter, IngestOptions, IngestPipeline};
    use wikigeo_data::wikidata::{DumpFactSource, load_concept_index, open_dump};

    let reader = open_dump(&config.wikidata_dump).map_err(|source| {
        CliError::OpenWikidataDump {
            path: config.wikidata_dump.clone(),
            source,
        }
    })?;
    let index = load_concept_index(reader)?;
    info!(
        "indexed {} concepts from {}",
        index.len(),
        config.wikidata_dump
    );

    if let Some(parent) = config.database.parent()
        && !parent.as_str().is_empty()
    {
        wikigeo_fs::ensure_dir(parent).map_err(|source| CliError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let store =
        SqliteSpatialStore::open(&config.database).map_err(|source| CliError::OpenStore {
            path: config.database.clone(),
            source,
        })?;

    let mut options = IngestOptions::default();
    if let Some(workers) = config.workers {
        options = options.with_workers(workers);
    }
    if let Some(backlog) = config.backlog {
        options = options.with_backlog(backlog);
    }
    let pipeline =
        IngestPipeline::new(index, WikidataCoordinateDecoder, store).with_options(options);
    let mut source = DumpFactSource::open(&config.wikidata_dump)?;
    Ok(pipeline.run(&mut source, &FactFilter::default(), &config.languages)?)
}

#[cfg(not(feature = "store-sqlite"))]
pub(crate) fn ingest_dump(_config: &IngestConfig) -> Result<IngestSummary, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "ingest",
    })
}

pub(crate) fn write_summary(summary: &IngestSummary, out: &mut impl Write) -> Result<(), CliError> {
    let rows = [
        ("facts", summary.total),
        ("stored", summary.matched),
        ("unresolved", summary.unresolved),
        ("out of scope", summary.out_of_scope),
        ("undecodable", summary.undecodable),
        ("duplicates", summary.duplicates),
        ("failed writes", summary.failed_writes),
        ("skipped records", summary.skipped_records),
    ];
    for (label, value) in rows {
        writeln!(out, "{label:>15}: {value}").map_err(CliError::WriteOutput)?;
    }
    if summary.cancelled {
        writeln!(out, "run cancelled before the dump was exhausted")
            .map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
