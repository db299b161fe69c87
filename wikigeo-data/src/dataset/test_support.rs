//! Shared fixtures for dataset acquisition tests.
use std::{
    collections::HashMap,
    future::Future,
    io::{Cursor, Write},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use flate2::{Compression, write::GzEncoder};
use zip::write::SimpleFileOptions;

use super::{DatasetSource, DatasetUrl, TransportError};

/// Stub [`DatasetSource`] serving in-memory archives keyed by URL.
///
/// Unknown URLs answer with HTTP 404. Every call, successful or not, is
/// counted so tests can assert that cached work skipped the network.
#[derive(Debug, Default)]
pub struct StubSource {
    responses: HashMap<String, Vec<u8>>,
    downloads: AtomicUsize,
}

impl StubSource {
    /// Construct a source with no responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.responses.insert(url.into(), body);
        self
    }

    /// Number of download calls made so far.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl DatasetSource for StubSource {
    async fn download(
        &self,
        url: &DatasetUrl,
        sink: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let body = self
            .responses
            .get(url.as_str())
            .ok_or_else(|| TransportError::Http {
                url: url.to_string(),
                status: 404,
                message: String::from("not found"),
            })?;
        sink.write_all(body)
            .map_err(|source| TransportError::Network {
                url: url.to_string(),
                source,
            })?;
        Ok(u64::try_from(body.len()).unwrap_or(u64::MAX))
    }
}

/// Drive `future` to completion on a current-thread runtime.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(future),
        Err(err) => panic!("failed to build Tokio runtime: {err}"),
    }
}

/// Build a zip archive holding `entries` as `(path, contents)` pairs.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, contents) in entries {
        if let Err(err) = writer.start_file(*path, SimpleFileOptions::default()) {
            panic!("failed to start zip entry {path}: {err}");
        }
        if let Err(err) = writer.write_all(contents) {
            panic!("failed to write zip entry {path}: {err}");
        }
    }
    match writer.finish() {
        Ok(cursor) => cursor.into_inner(),
        Err(err) => panic!("failed to finish zip archive: {err}"),
    }
}

/// Build a gzip-compressed tarball holding `entries`.
pub fn tar_gz_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(u64::try_from(contents.len()).unwrap_or(u64::MAX));
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        if let Err(err) = builder.append_data(&mut header, path, *contents) {
            panic!("failed to append tar entry {path}: {err}");
        }
    }
    let encoder = match builder.into_inner() {
        Ok(encoder) => encoder,
        Err(err) => panic!("failed to finish tar archive: {err}"),
    };
    match encoder.finish() {
        Ok(bytes) => bytes,
        Err(err) => panic!("failed to finish gzip stream: {err}"),
    }
}

/// Zip archive containing a complete shapefile `<dir>/<stem>` plus a `.prj`.
pub fn shapefile_zip(dir: &str, stem: &str) -> Vec<u8> {
    let names: Vec<String> = ["shp", "shx", "dbf", "prj"]
        .iter()
        .map(|ext| format!("{dir}/{stem}.{ext}"))
        .collect();
    let entries: Vec<(&str, &[u8])> = names
        .iter()
        .map(|name| (name.as_str(), name.as_bytes()))
        .collect();
    zip_archive(&entries)
}
