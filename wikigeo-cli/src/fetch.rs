//! Fetch command implementation for the wikigeo CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wikigeo_core::EARTH_REFERENCE_SYSTEM;
use wikigeo_data::dataset::{
    DatasetCache, DatasetCatalogue, DatasetDescriptor, DatasetSource, DownloadLog,
    HttpDatasetSource, NamedDataset, SpatialDataDir,
};

use crate::paths::{require_directory_or_absent, require_existing_file};
use crate::{
    ARG_CATALOGUE, ARG_DOWNLOAD_LOG, ARG_LAYER_GROUP, ARG_NAME, ARG_SPATIAL_DIR, CliError,
    ENV_CATALOGUE, ENV_LAYER_GROUP, ENV_NAME, ENV_SPATIAL_DIR,
};

/// CLI arguments for the `fetch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Download a dataset listed in the catalogue and stage its \
                 shapefile under the spatial data directory. Datasets that \
                 are already staged are left untouched.",
    about = "Fetch and stage a reference dataset"
)]
#[ortho_config(prefix = "WIKIGEO")]
pub(crate) struct FetchArgs {
    /// Root of the spatial data directory.
    #[arg(long = ARG_SPATIAL_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) spatial_dir: Option<Utf8PathBuf>,
    /// JSON catalogue describing where datasets live.
    #[arg(long = ARG_CATALOGUE, value_name = "path")]
    #[serde(default)]
    pub(crate) catalogue: Option<Utf8PathBuf>,
    /// Reference system of the dataset (defaults to "earth").
    #[arg(long = "reference-system", value_name = "name")]
    #[serde(default)]
    pub(crate) reference_system: Option<String>,
    /// Layer group of the dataset, such as "country".
    #[arg(long = ARG_LAYER_GROUP, value_name = "name")]
    #[serde(default)]
    pub(crate) layer_group: Option<String>,
    /// Dataset name within the layer group.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// SQLite file recording every completed download.
    #[arg(long = ARG_DOWNLOAD_LOG, value_name = "path")]
    #[serde(default)]
    pub(crate) download_log: Option<Utf8PathBuf>,
}

impl FetchArgs {
    pub(crate) fn into_config(self) -> Result<FetchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FetchConfig::try_from(merged)
    }
}

/// Resolved `fetch` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchConfig {
    pub(crate) spatial_dir: Utf8PathBuf,
    pub(crate) catalogue: Utf8PathBuf,
    pub(crate) descriptor: DatasetDescriptor,
    pub(crate) download_log: Option<Utf8PathBuf>,
}

impl FetchConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing_file(&self.catalogue, ARG_CATALOGUE)?;
        require_directory_or_absent(&self.spatial_dir, ARG_SPATIAL_DIR)
    }
}

impl TryFrom<FetchArgs> for FetchConfig {
    type Error = CliError;

    fn try_from(args: FetchArgs) -> Result<Self, Self::Error> {
        let spatial_dir = args.spatial_dir.ok_or(CliError::MissingArgument {
            field: ARG_SPATIAL_DIR,
            env: ENV_SPATIAL_DIR,
        })?;
        let catalogue = args.catalogue.ok_or(CliError::MissingArgument {
            field: ARG_CATALOGUE,
            env: ENV_CATALOGUE,
        })?;
        let layer_group = args.layer_group.ok_or(CliError::MissingArgument {
            field: ARG_LAYER_GROUP,
            env: ENV_LAYER_GROUP,
        })?;
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_NAME,
        })?;
        let reference_system = args
            .reference_system
            .unwrap_or_else(|| EARTH_REFERENCE_SYSTEM.to_owned());
        let descriptor = DatasetDescriptor::new(reference_system, layer_group, name)?;
        Ok(Self {
            spatial_dir,
            catalogue,
            descriptor,
            download_log: args.download_log,
        })
    }
}

/// Resolve configuration and fetch over HTTP.
pub(crate) fn run_fetch(args: FetchArgs) -> Result<NamedDataset, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    fetch_with(&config, HttpDatasetSource::new()?)
}

/// Fetch the configured dataset through `source`.
pub(crate) fn fetch_with<S: DatasetSource>(
    config: &FetchConfig,
    source: S,
) -> Result<NamedDataset, CliError> {
    let catalogue = DatasetCatalogue::load(&config.catalogue)?;
    let mut cache = DatasetCache::new(source, SpatialDataDir::new(config.spatial_dir.clone()));
    if let Some(path) = &config.download_log {
        cache = cache.with_log(DownloadLog::initialise(path)?);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    info!("acquiring dataset {}", config.descriptor);
    let named = runtime.block_on(cache.acquire_named(&catalogue, &config.descriptor))?;
    Ok(named)
}

pub(crate) fn write_report(named: &NamedDataset, out: &mut impl Write) -> Result<(), CliError> {
    writeln!(out, "staged {}", named.dataset.directory()).map_err(CliError::WriteOutput)?;
    if let Some(mapping) = &named.mapping {
        writeln!(out, "mapping {}", mapping.path).map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
