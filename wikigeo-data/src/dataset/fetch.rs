//! Download helper that never leaves a truncated file at its destination.

use std::io::Write;

use camino::Utf8Path;
use log::info;
use tempfile::Builder;

use super::{DatasetError, DatasetSource, DatasetUrl, DownloadReport};

/// Download `url` to `destination` unless a file already exists there.
///
/// Bytes are streamed into a hidden temporary file beside `destination` and
/// renamed into place only after the transfer completes, so an interrupted
/// download cannot be mistaken for a finished one on the next attempt.
/// Returns `None` when the destination was already present.
///
/// # Examples
/// ```
/// # use std::io::Write;
/// # use async_trait::async_trait;
/// # use camino::Utf8PathBuf;
/// # use tempfile::tempdir;
/// # use wikigeo_data::dataset::{DatasetSource, DatasetUrl, TransportError, download_to};
/// struct Fixed(&'static [u8]);
///
/// #[async_trait(?Send)]
/// impl DatasetSource for Fixed {
///     async fn download(
///         &self,
///         url: &DatasetUrl,
///         sink: &mut dyn Write,
///     ) -> Result<u64, TransportError> {
///         sink.write_all(self.0).map_err(|source| TransportError::Network {
///             url: url.to_string(),
///             source,
///         })?;
///         Ok(self.0.len() as u64)
///     }
/// }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let url = DatasetUrl::parse("https://example.org/countries.zip")?;
/// let temp = tempdir()?;
/// let dest = Utf8PathBuf::from_path_buf(temp.path().join("countries.zip"))
///     .map_err(|_| "non-UTF-8 temp path")?;
/// let runtime = tokio::runtime::Builder::new_current_thread().build()?;
///
/// let first = runtime.block_on(download_to(&Fixed(b"PK"), &url, &dest))?;
/// let second = runtime.block_on(download_to(&Fixed(b"PK"), &url, &dest))?;
/// assert_eq!(first.map(|report| report.bytes_written), Some(2));
/// assert!(second.is_none());
/// # Ok(())
/// # }
/// # example().expect("example should run");
/// ```
pub async fn download_to<S: DatasetSource + ?Sized>(
    source: &S,
    url: &DatasetUrl,
    destination: &Utf8Path,
) -> Result<Option<DownloadReport>, DatasetError> {
    if wikigeo_fs::file_is_file(destination)
        .map_err(|err| DatasetError::io("inspect", destination, err))?
    {
        return Ok(None);
    }
    let parent = match destination.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    wikigeo_fs::ensure_dir(parent).map_err(|err| DatasetError::io("create", parent, err))?;

    let mut partial = Builder::new()
        .prefix(".download-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|err| DatasetError::io("create temporary file in", parent, err))?;

    info!("downloading {url} to {destination}");
    let bytes_written = source
        .download(url, partial.as_file_mut())
        .await
        .map_err(|source| DatasetError::Fetch {
            url: url.to_string(),
            source,
        })?;
    partial
        .as_file_mut()
        .flush()
        .map_err(|err| DatasetError::io("flush", destination, err))?;
    partial
        .persist(destination)
        .map_err(|err| DatasetError::io("move download into", destination, err.error))?;

    Ok(Some(DownloadReport {
        url: url.clone(),
        bytes_written,
        output_path: destination.to_path_buf(),
    }))
}
