//! On-disk layout of the spatial data directory.

use camino::{Utf8Path, Utf8PathBuf};

use super::{DatasetDescriptor, DatasetUrl, DescriptorError, Encoding, StagedDataset};

const RAW_DIR: &str = "raw";
const TMP_DIR: &str = "tmp";

/// Root of the spatial data directory.
///
/// ```text
/// <root>/raw/<refsys>_<group>_<name>_<file>   downloaded archives
/// <root>/tmp/                                 scratch directories
/// <root>/<refsys>/<group>/<name>/             staged datasets
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialDataDir {
    root: Utf8PathBuf,
}

impl SpatialDataDir {
    /// Use `root` as the spatial data directory.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory holding downloaded archives.
    #[must_use]
    pub fn raw_dir(&self) -> Utf8PathBuf {
        self.root.join(RAW_DIR)
    }

    /// Directory under which scratch directories are created.
    #[must_use]
    pub fn tmp_dir(&self) -> Utf8PathBuf {
        self.root.join(TMP_DIR)
    }

    /// Deterministic location of the raw archive for `descriptor` and `url`.
    ///
    /// # Examples
    /// ```
    /// # use wikigeo_data::dataset::{DatasetDescriptor, DatasetUrl, SpatialDataDir};
    /// let layout = SpatialDataDir::new("/data/spatial");
    /// let descriptor = DatasetDescriptor::new("earth", "country", "naturalEarth")?;
    /// let url = DatasetUrl::parse("https://example.org/files/countries.zip")?;
    /// assert_eq!(
    ///     layout.raw_archive_path(&descriptor, &url)?.as_str(),
    ///     "/data/spatial/raw/earth_country_naturalEarth_countries.zip"
    /// );
    /// # Ok::<(), wikigeo_data::dataset::DescriptorError>(())
    /// ```
    pub fn raw_archive_path(
        &self,
        descriptor: &DatasetDescriptor,
        url: &DatasetUrl,
    ) -> Result<Utf8PathBuf, DescriptorError> {
        let file = url.file_name().ok_or_else(|| DescriptorError::UnnamedUrl {
            url: url.to_string(),
        })?;
        Ok(self.raw_dir().join(format!(
            "{}_{}_{}_{file}",
            descriptor.reference_system(),
            descriptor.layer_group(),
            descriptor.name()
        )))
    }

    /// Canonical directory for `descriptor`.
    #[must_use]
    pub fn dataset_dir(&self, descriptor: &DatasetDescriptor) -> Utf8PathBuf {
        self.root
            .join(descriptor.reference_system())
            .join(descriptor.layer_group())
            .join(descriptor.name())
    }

    /// Staged dataset handle for `descriptor`, whether or not it exists yet.
    #[must_use]
    pub fn staged(&self, descriptor: &DatasetDescriptor, encoding: Encoding) -> StagedDataset {
        StagedDataset::new(descriptor.clone(), self.dataset_dir(descriptor), encoding)
    }
}
