//! Fetching, extracting, and staging bulk reference datasets.
//!
//! A dataset is identified by a [`DatasetDescriptor`] and lives under a
//! [`SpatialDataDir`]. [`DatasetCache::acquire`] downloads the source archive
//! once, extracts the named shapefile in a scratch directory, and moves its
//! components into the canonical location. A staged dataset is either
//! complete or absent.
#![forbid(unsafe_code)]

mod archive;
mod cache;
mod catalogue;
mod error;
mod fetch;
mod layout;
mod log;
mod source;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use archive::{ArchiveFormat, ScratchDir, extract};
pub use cache::{DatasetCache, NamedDataset};
pub use catalogue::{CatalogueEntry, CatalogueSpec, DatasetCatalogue};
pub use error::{ArchiveError, CatalogueError, DatasetError, DescriptorError, TransportError};
pub use fetch::download_to;
pub use layout::SpatialDataDir;
pub use self::log::DownloadLog;
pub use source::{DEFAULT_USER_AGENT, DatasetSource, HttpDatasetSource};
pub use types::{
    ArchiveMember, DatasetDescriptor, DatasetUrl, DownloadReport, ENCODING_EXTENSION, Encoding,
    MAPPING_SUFFIX, MappingFile, OPTIONAL_COMPONENTS, REQUIRED_COMPONENTS, StagedDataset,
};

#[cfg(test)]
mod tests;
