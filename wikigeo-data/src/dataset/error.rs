//! Error types produced while acquiring and staging datasets.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors produced while acquiring a dataset or its mapping file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// The descriptor or one of the acquisition inputs was invalid.
    #[error(transparent)]
    InvalidInput(#[from] DescriptorError),
    /// Downloading an archive failed.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        /// URL that could not be fetched.
        url: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// A filesystem operation failed.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        /// Short description of the failed operation.
        operation: &'static str,
        /// Path involved in the operation.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The downloaded archive could not be extracted.
    #[error("failed to extract {archive}: {source}")]
    Extract {
        /// Archive that failed to extract.
        archive: Utf8PathBuf,
        /// Extraction failure.
        #[source]
        source: ArchiveError,
    },
    /// A required component file was absent from the extracted archive.
    #[error("expected file {path} not found in extracted archive")]
    MissingComponent {
        /// Expected location of the component inside the scratch directory.
        path: Utf8PathBuf,
    },
    /// The canonical location was missing a component after staging.
    #[error("staged dataset is incomplete: {path} is missing")]
    IncompleteStaging {
        /// Missing component in the canonical location.
        path: Utf8PathBuf,
    },
    /// The mapping archive did not contain the expected mapping file.
    #[error("missing file {file} in {url}")]
    MissingMappingFile {
        /// Expected mapping file name.
        file: String,
        /// Mapping archive URL.
        url: String,
    },
    /// The catalogue could not be read or did not list the dataset.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
    /// Recording the download in the audit log failed.
    #[error("failed to record download metadata: {source}")]
    RecordLog {
        /// SQLite failure.
        #[source]
        source: rusqlite::Error,
    },
    /// Opening the download log failed.
    #[error("failed to initialise download log at {path}: {source}")]
    InitialiseLog {
        /// Location of the log database.
        path: Utf8PathBuf,
        /// SQLite failure.
        #[source]
        source: rusqlite::Error,
    },
}

impl DatasetError {
    pub(crate) fn io(operation: &'static str, path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Validation failures for descriptors, archive members, encodings, and URLs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DescriptorError {
    /// A descriptor segment was not usable as a single path component.
    #[error("{field} {value:?} must be a non-empty name without path separators")]
    InvalidSegment {
        /// Descriptor field being validated.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
    /// The archive member escaped the archive root or was empty.
    #[error("archive member {value:?} must be a relative path inside the archive")]
    InvalidArchiveMember {
        /// Rejected value.
        value: String,
    },
    /// The text encoding label was empty or contained unexpected characters.
    #[error("encoding {value:?} is not a valid label")]
    InvalidEncoding {
        /// Rejected value.
        value: String,
    },
    /// The URL could not be parsed.
    #[error("{value:?} is not a valid URL: {message}")]
    InvalidUrl {
        /// Rejected value.
        value: String,
        /// Parser message.
        message: String,
    },
    /// The URL has no final path segment to name the local archive.
    #[error("URL {url} has no final path segment to name the download")]
    UnnamedUrl {
        /// Offending URL.
        url: String,
    },
}

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors raised while unpacking an archive.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// The archive format could not be determined.
    #[error("unsupported archive format for {path}")]
    UnsupportedFormat {
        /// Archive path.
        path: Utf8PathBuf,
    },
    /// Reading the archive or writing an entry failed.
    #[error("archive I/O failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },
    /// The zip container was malformed.
    #[error("invalid zip archive: {source}")]
    Zip {
        /// Zip decoder failure.
        #[from]
        source: zip::result::ZipError,
    },
}

/// Errors raised while loading a dataset catalogue.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogueError {
    /// The catalogue file could not be read.
    #[error("failed to read catalogue {path}: {source}")]
    Read {
        /// Catalogue location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The catalogue was not valid JSON of the expected shape.
    #[error("failed to parse catalogue: {source}")]
    Parse {
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The catalogue has no entry for the requested dataset.
    #[error("catalogue has no dataset {descriptor}")]
    UnknownDataset {
        /// Display form of the requested descriptor.
        descriptor: String,
    },
    /// A catalogue entry held an invalid value.
    #[error("catalogue entry {descriptor} is invalid: {source}")]
    InvalidEntry {
        /// Display form of the descriptor owning the entry.
        descriptor: String,
        /// Validation failure.
        #[source]
        source: DescriptorError,
    },
}
