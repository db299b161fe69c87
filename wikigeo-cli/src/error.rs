//! Error types emitted by the wikigeo CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`. Large library errors are boxed.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use wikigeo_core::{LanguageError, StoreError};
use wikigeo_data::dataset::{CatalogueError, DatasetError, DescriptorError, TransportError};
use wikigeo_data::ingest::{FactStreamError, IngestError};
use wikigeo_data::wikidata::WikidataError;

/// Errors emitted by the wikigeo CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        /// Cargo feature that must be enabled.
        feature: &'static str,
        /// Operation that was attempted.
        action: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("{field} path {path:?} is not a directory")]
    OutputDirectoryNotDirectory {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// Creating an output directory failed.
    #[error("failed to create directory {path:?}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The dataset descriptor flags were rejected.
    #[error("invalid dataset selection: {0}")]
    InvalidDescriptor(#[from] DescriptorError),
    /// The language list could not be parsed.
    #[error("invalid --languages value: {0}")]
    InvalidLanguages(#[from] LanguageError),
    /// Loading the dataset catalogue failed.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
    /// Building the HTTP client failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Starting the async runtime for downloads failed.
    #[error("failed to start download runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Dataset acquisition failed.
    #[error(transparent)]
    Dataset(#[from] Box<DatasetError>),
    /// Opening the Wikidata dump failed.
    #[error("failed to open Wikidata dump at {path:?}: {source}")]
    OpenWikidataDump {
        /// Dump path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Building the concept index from the dump failed.
    #[error("failed to index concepts: {0}")]
    ConceptIndex(#[from] WikidataError),
    /// Opening the dump as a fact stream failed.
    #[error(transparent)]
    FactSource(#[from] FactStreamError),
    /// Opening the spatial store failed.
    #[error("failed to open spatial store at {path:?}: {source}")]
    OpenStore {
        /// Database path.
        path: Utf8PathBuf,
        /// Store error.
        #[source]
        source: StoreError,
    },
    /// The ingestion run failed.
    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    /// Writing the command report failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl From<DatasetError> for CliError {
    fn from(err: DatasetError) -> Self {
        Self::Dataset(Box::new(err))
    }
}
