use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, params};

use super::{DatasetError, DownloadReport};

/// Captures a persisted audit trail of dataset downloads.
#[derive(Debug)]
pub struct DownloadLog {
    connection: Connection,
    location: Utf8PathBuf,
}

impl DownloadLog {
    /// Open (or create) the download log at the supplied path.
    pub fn initialise(path: &Utf8Path) -> Result<Self, DatasetError> {
        let connection = Connection::open(path).map_err(|source| DatasetError::InitialiseLog {
            source,
            path: path.to_path_buf(),
        })?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS downloads (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_name TEXT NOT NULL,
                    url TEXT NOT NULL,
                    bytes_written INTEGER NOT NULL,
                    output_path TEXT NOT NULL,
                    downloaded_at INTEGER NOT NULL
                )",
                [],
            )
            .map_err(|source| DatasetError::InitialiseLog {
                source,
                path: path.to_path_buf(),
            })?;
        Ok(Self {
            connection,
            location: path.to_path_buf(),
        })
    }

    /// Record a completed download in the log.
    pub fn record(&self, report: &DownloadReport) -> Result<(), DatasetError> {
        let conversion = |err: Box<dyn std::error::Error + Send + Sync>| DatasetError::RecordLog {
            source: rusqlite::Error::ToSqlConversionFailure(err),
        };
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| conversion(Box::new(err)))?;
        let timestamp =
            i64::try_from(duration.as_secs()).map_err(|err| conversion(Box::new(err)))?;
        let bytes = i64::try_from(report.bytes_written).map_err(|err| conversion(Box::new(err)))?;
        let file_name = report.output_path.file_name().unwrap_or_default();
        self.connection
            .execute(
                "INSERT INTO downloads (
                    file_name,
                    url,
                    bytes_written,
                    output_path,
                    downloaded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    file_name,
                    report.url.as_str(),
                    bytes,
                    report.output_path.as_str(),
                    timestamp
                ],
            )
            .map_err(|source| DatasetError::RecordLog { source })?;
        Ok(())
    }

    /// Number of downloads recorded for `url`.
    pub fn count_for(&self, url: &str) -> Result<u64, DatasetError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM downloads WHERE url = ?1", [url], |row| {
                row.get(0)
            })
            .map_err(|source| DatasetError::RecordLog { source })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Location of the underlying SQLite database.
    pub fn path(&self) -> &Utf8Path {
        &self.location
    }
}
