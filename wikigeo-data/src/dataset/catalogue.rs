//! Catalogue of named datasets and where to fetch them.

use std::{collections::BTreeMap, io::Read};

use camino::Utf8Path;
use serde::Deserialize;

use super::{ArchiveMember, CatalogueError, DatasetDescriptor, DatasetUrl, Encoding};

/// Raw catalogue entry as written in the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueEntry {
    /// Archive download URL.
    pub url: String,
    /// Shapefile path inside the archive.
    pub archive_member: String,
    /// Attribute text encoding; defaults to UTF-8.
    #[serde(default)]
    pub encoding: Option<String>,
    /// URL of the archive carrying the mapping file, if any.
    #[serde(default)]
    pub mapping_url: Option<String>,
}

/// Validated acquisition inputs for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueSpec {
    /// Archive download URL.
    pub url: DatasetUrl,
    /// Shapefile stem inside the archive.
    pub archive_member: ArchiveMember,
    /// Attribute text encoding.
    pub encoding: Encoding,
    /// Mapping archive URL.
    pub mapping_url: Option<DatasetUrl>,
}

/// Datasets keyed by reference system, layer group, and name.
///
/// # Examples
/// ```
/// # use wikigeo_data::dataset::{DatasetCatalogue, DatasetDescriptor};
/// let json = r#"{
///     "earth": {
///         "country": {
///             "naturalEarth": {
///                 "url": "https://example.org/ne_countries.zip",
///                 "archive_member": "ne_countries.shp",
///                 "encoding": "windows-1252"
///             }
///         }
///     }
/// }"#;
/// let catalogue = DatasetCatalogue::from_reader(json.as_bytes())?;
/// let descriptor = DatasetDescriptor::new("earth", "country", "naturalEarth")?;
/// let spec = catalogue.resolve(&descriptor)?;
/// assert_eq!(spec.encoding.as_str(), "windows-1252");
/// assert!(spec.mapping_url.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DatasetCatalogue {
    datasets: BTreeMap<String, BTreeMap<String, BTreeMap<String, CatalogueEntry>>>,
}

impl DatasetCatalogue {
    /// Load a catalogue from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self, CatalogueError> {
        let file = wikigeo_fs::open_utf8_file(path).map_err(|source| CatalogueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file.into_std())
    }

    /// Parse a catalogue from any JSON reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogueError> {
        serde_json::from_reader(reader).map_err(|source| CatalogueError::Parse { source })
    }

    /// Raw entry for `descriptor`, if listed.
    #[must_use]
    pub fn entry(&self, descriptor: &DatasetDescriptor) -> Option<&CatalogueEntry> {
        self.datasets
            .get(descriptor.reference_system())?
            .get(descriptor.layer_group())?
            .get(descriptor.name())
    }

    /// Validated acquisition inputs for `descriptor`.
    pub fn resolve(&self, descriptor: &DatasetDescriptor) -> Result<CatalogueSpec, CatalogueError> {
        let entry = self
            .entry(descriptor)
            .ok_or_else(|| CatalogueError::UnknownDataset {
                descriptor: descriptor.to_string(),
            })?;
        let invalid = |source| CatalogueError::InvalidEntry {
            descriptor: descriptor.to_string(),
            source,
        };
        Ok(CatalogueSpec {
            url: DatasetUrl::parse(&entry.url).map_err(invalid)?,
            archive_member: ArchiveMember::new(&entry.archive_member).map_err(invalid)?,
            encoding: entry
                .encoding
                .as_deref()
                .map(Encoding::new)
                .transpose()
                .map_err(invalid)?
                .unwrap_or_default(),
            mapping_url: entry
                .mapping_url
                .as_deref()
                .map(DatasetUrl::parse)
                .transpose()
                .map_err(invalid)?,
        })
    }

    /// Iterate every listed descriptor in sorted order.
    pub fn descriptors(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.datasets.iter().flat_map(|(refsys, groups)| {
            groups.iter().flat_map(move |(group, names)| {
                names
                    .keys()
                    .map(move |name| (refsys.as_str(), group.as_str(), name.as_str()))
            })
        })
    }
}
