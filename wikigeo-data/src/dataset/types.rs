//! Domain wrappers for dataset descriptors, URLs, archive members, and staged
//! datasets.

use std::{
    fmt,
    io::{self, Read},
    ops::Deref,
};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use url::Url;

use super::DescriptorError;

/// Extensions of the component files every staged dataset must contain.
pub const REQUIRED_COMPONENTS: [&str; 3] = ["shp", "shx", "dbf"];

/// Extensions copied into the staged dataset when the archive provides them.
pub const OPTIONAL_COMPONENTS: [&str; 1] = ["prj"];

/// Extension of the file recording the attribute text encoding.
pub const ENCODING_EXTENSION: &str = "cpg";

/// Suffix of the auxiliary mapping file stored beside a dataset.
pub const MAPPING_SUFFIX: &str = "wbmapping.csv";

/// Fully qualified URL pointing to a downloadable archive.
///
/// # Examples
/// ```
/// # use wikigeo_data::dataset::DatasetUrl;
/// let url = DatasetUrl::parse("https://example.org/data/countries.zip")?;
/// assert_eq!(url.file_name(), Some("countries.zip"));
/// # Ok::<(), wikigeo_data::dataset::DescriptorError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetUrl(Url);

impl DatasetUrl {
    /// Parse and validate an absolute URL.
    pub fn parse(value: &str) -> Result<Self, DescriptorError> {
        Url::parse(value.trim())
            .map(Self)
            .map_err(|err| DescriptorError::InvalidUrl {
                value: value.to_owned(),
                message: err.to_string(),
            })
    }

    /// Final non-empty path segment, used to name the local download.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .path_segments()?
            .rev()
            .find(|segment| !segment.is_empty())
    }

    /// The URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Borrow the parsed URL.
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for DatasetUrl {
    fn from(value: Url) -> Self {
        Self(value)
    }
}

impl TryFrom<&str> for DatasetUrl {
    type Error = DescriptorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for DatasetUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for DatasetUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for DatasetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Identifies a bulk reference dataset by reference system, layer group, and
/// name.
///
/// Each segment becomes a directory name, so separators, `..`, and leading
/// dots are rejected.
///
/// # Examples
/// ```
/// # use wikigeo_data::dataset::DatasetDescriptor;
/// let descriptor = DatasetDescriptor::new("earth", "country", "naturalEarth")?;
/// assert_eq!(descriptor.to_string(), "earth/country/naturalEarth");
/// assert!(DatasetDescriptor::new("earth", "../etc", "x").is_err());
/// # Ok::<(), wikigeo_data::dataset::DescriptorError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetDescriptor {
    reference_system: String,
    layer_group: String,
    name: String,
}

impl DatasetDescriptor {
    /// Validate and construct a descriptor.
    pub fn new(
        reference_system: impl Into<String>,
        layer_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        Ok(Self {
            reference_system: validate_segment("reference system", reference_system.into())?,
            layer_group: validate_segment("layer group", layer_group.into())?,
            name: validate_segment("dataset name", name.into())?,
        })
    }

    /// Reference system the dataset's coordinates use.
    #[must_use]
    pub fn reference_system(&self) -> &str {
        &self.reference_system
    }

    /// Layer group the dataset belongs to.
    #[must_use]
    pub fn layer_group(&self) -> &str {
        &self.layer_group
    }

    /// Dataset name, also the stem of its staged component files.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.reference_system, self.layer_group, self.name
        )
    }
}

fn validate_segment(field: &'static str, value: String) -> Result<String, DescriptorError> {
    let trimmed = value.trim();
    let valid = !trimmed.is_empty()
        && !trimmed.starts_with('.')
        && !trimmed.contains(['/', '\\', '\0']);
    if valid {
        Ok(trimmed.to_owned())
    } else {
        Err(DescriptorError::InvalidSegment { field, value })
    }
}

/// Path of a shapefile inside an archive, without its extension.
///
/// A trailing `.shp` is stripped so catalogue entries may name either the
/// stem or the geometry file.
///
/// # Examples
/// ```
/// # use wikigeo_data::dataset::ArchiveMember;
/// let member = ArchiveMember::new("10m_cultural/ne_10m_admin_0_countries.shp")?;
/// assert_eq!(member.as_path().as_str(), "10m_cultural/ne_10m_admin_0_countries");
/// # Ok::<(), wikigeo_data::dataset::DescriptorError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember(Utf8PathBuf);

impl ArchiveMember {
    /// Validate an archive-relative member path.
    pub fn new(value: &str) -> Result<Self, DescriptorError> {
        let trimmed = value.trim();
        let stem = trimmed
            .strip_suffix(".shp")
            .or_else(|| trimmed.strip_suffix(".SHP"))
            .unwrap_or(trimmed);
        let path = Utf8PathBuf::from(stem);
        let relative = !stem.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Utf8Component::Normal(_)));
        if relative && path.file_name().is_some() {
            Ok(Self(path))
        } else {
            Err(DescriptorError::InvalidArchiveMember {
                value: value.to_owned(),
            })
        }
    }

    /// Archive-relative path of the shapefile stem.
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }
}

/// Label of the text encoding used by a dataset's attribute table.
///
/// # Examples
/// ```
/// # use wikigeo_data::dataset::Encoding;
/// assert_eq!(Encoding::default().as_str(), "UTF-8");
/// assert!(Encoding::new("windows-1252").is_ok());
/// assert!(Encoding::new("utf 8").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding(String);

impl Encoding {
    /// Validate an encoding label such as `UTF-8` or `windows-1252`.
    pub fn new(value: &str) -> Result<Self, DescriptorError> {
        let trimmed = value.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
        if valid {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(DescriptorError::InvalidEncoding {
                value: value.to_owned(),
            })
        }
    }

    /// The encoding label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self(String::from("UTF-8"))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dataset in canonical storage.
///
/// The dataset lives in its own directory; component files share the
/// dataset name as their stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDataset {
    descriptor: DatasetDescriptor,
    directory: Utf8PathBuf,
    encoding: Encoding,
}

impl StagedDataset {
    pub(crate) fn new(
        descriptor: DatasetDescriptor,
        directory: Utf8PathBuf,
        encoding: Encoding,
    ) -> Self {
        Self {
            descriptor,
            directory,
            encoding,
        }
    }

    /// Descriptor the dataset was staged for.
    #[must_use]
    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    /// Canonical directory holding the component files.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Attribute text encoding.
    #[must_use]
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Path of the component file with `extension`.
    #[must_use]
    pub fn component(&self, extension: &str) -> Utf8PathBuf {
        self.directory
            .join(format!("{}.{extension}", self.descriptor.name()))
    }

    /// Path of the geometry (`.shp`) file.
    #[must_use]
    pub fn shapefile(&self) -> Utf8PathBuf {
        self.component("shp")
    }

    /// Paths every complete dataset must contain.
    #[must_use]
    pub fn required_files(&self) -> Vec<Utf8PathBuf> {
        REQUIRED_COMPONENTS
            .iter()
            .chain(std::iter::once(&ENCODING_EXTENSION))
            .map(|extension| self.component(extension))
            .collect()
    }

    /// File name of the auxiliary mapping file.
    #[must_use]
    pub fn mapping_file_name(&self) -> String {
        format!("{}.{MAPPING_SUFFIX}", self.descriptor.name())
    }

    /// Path of the auxiliary mapping file.
    #[must_use]
    pub fn mapping_file(&self) -> Utf8PathBuf {
        self.directory.join(self.mapping_file_name())
    }

    /// First required file that is absent, if any.
    pub fn first_missing(&self) -> io::Result<Option<Utf8PathBuf>> {
        for path in self.required_files() {
            if !wikigeo_fs::file_is_file(&path)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Encoding label written when the dataset was staged, if any.
    pub fn recorded_encoding(&self) -> io::Result<Option<String>> {
        let path = self.component(ENCODING_EXTENSION);
        if !wikigeo_fs::file_is_file(&path)? {
            return Ok(None);
        }
        let mut label = String::new();
        wikigeo_fs::open_utf8_file(&path)?.read_to_string(&mut label)?;
        Ok(Some(label.trim().to_owned()))
    }

    /// Return whether the encoding on disk names [`Self::encoding`].
    pub fn encoding_is_current(&self) -> io::Result<bool> {
        Ok(self
            .recorded_encoding()?
            .is_some_and(|label| label.eq_ignore_ascii_case(self.encoding.as_str())))
    }

    /// Return whether every required file is present.
    pub fn is_complete(&self) -> io::Result<bool> {
        if !wikigeo_fs::dir_is_dir(&self.directory)? {
            return Ok(false);
        }
        self.first_missing().map(|missing| missing.is_none())
    }
}

/// Mapping file placed beside a staged dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingFile {
    /// Location of the mapping file.
    pub path: Utf8PathBuf,
}

/// Summary of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// URL the bytes came from.
    pub url: DatasetUrl,
    /// Number of bytes written to disk.
    pub bytes_written: u64,
    /// Final location of the download.
    pub output_path: Utf8PathBuf,
}
