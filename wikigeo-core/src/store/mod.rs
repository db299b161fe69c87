//! Write-side interface to the spatial store.
//!
//! The `SpatialStore` trait is the only surface ingestion needs from the
//! persistence layer: one call to save an accepted geometry and one to bump a
//! named counter. Implementations are shared by all ingestion workers and so
//! must be `Sync`; interior locking is their concern.

use thiserror::Error;

use crate::{AcceptedRecord, EntityId};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteSpatialStore;

/// Counters maintained alongside stored geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CounterKind {
    /// Number of geometries written by ingestion.
    Geometry,
}

impl CounterKind {
    /// Stable name used when persisting the counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
        }
    }
}

/// Errors reported by [`SpatialStore`] implementations.
///
/// Use [`StoreError::is_fatal`] to decide whether ingestion can carry on
/// after a failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store cannot accept any more writes.
    #[error("spatial store unavailable: {message}")]
    Unavailable {
        /// Human-readable cause.
        message: String,
    },
    /// The geometry could not be serialised for storage.
    #[error("failed to encode geometry for {entity}: {source}")]
    Encode {
        /// Entity whose geometry failed to encode.
        entity: EntityId,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// The entity identifier does not fit the store's key column.
    #[error("entity {entity} exceeds the store's identifier range")]
    EntityIdOutOfRange {
        /// The offending entity.
        entity: EntityId,
    },
    /// The store refused this particular record.
    #[error("spatial store rejected {entity}: {reason}")]
    Rejected {
        /// Entity whose record was refused.
        entity: EntityId,
        /// Reason given by the store.
        reason: String,
    },
    /// A SQLite operation failed.
    #[cfg(feature = "store-sqlite")]
    #[error("SQLite {operation} failed: {source}")]
    Sqlite {
        /// Operation that failed.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Return `true` when no further writes can succeed.
    ///
    /// Per-record failures such as constraint violations are not fatal;
    /// I/O failures, corruption, and a full disk are.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Encode { .. } | Self::EntityIdOutOfRange { .. } | Self::Rejected { .. } => false,
            #[cfg(feature = "store-sqlite")]
            Self::Sqlite { source, .. } => matches!(
                source.sqlite_error_code(),
                Some(
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::NotADatabase
                        | rusqlite::ErrorCode::DatabaseCorrupt
                        | rusqlite::ErrorCode::SystemIoFailure
                        | rusqlite::ErrorCode::DiskFull
                )
            ),
        }
    }
}

/// Write access to persisted geometries.
///
/// # Examples
///
/// ```rust
/// use std::sync::Mutex;
/// use geo::{Geometry, Point};
/// use wikigeo_core::{AcceptedRecord, CounterKind, EntityId, SpatialStore, StoreError};
///
/// #[derive(Default)]
/// struct VecStore {
///     records: Mutex<Vec<AcceptedRecord>>,
/// }
///
/// impl SpatialStore for VecStore {
///     fn save(&self, record: &AcceptedRecord) -> Result<(), StoreError> {
///         self.records
///             .lock()
///             .map_err(|_| StoreError::Unavailable { message: "poisoned".into() })?
///             .push(record.clone());
///         Ok(())
///     }
///
///     fn increment_counter(&self, _kind: CounterKind) -> Result<(), StoreError> {
///         Ok(())
///     }
/// }
///
/// let store = VecStore::default();
/// let record = AcceptedRecord::new(
///     EntityId::new(64),
///     "wikidata",
///     "earth",
///     Geometry::Point(Point::new(13.38, 52.51)),
/// );
/// store.save(&record)?;
/// assert_eq!(store.records.lock().map(|r| r.len()).unwrap_or(0), 1);
/// # Ok::<(), StoreError>(())
/// ```
pub trait SpatialStore {
    /// Persist `record`, replacing any geometry already stored for the same
    /// entity, layer, and reference system.
    fn save(&self, record: &AcceptedRecord) -> Result<(), StoreError>;

    /// Add one to the counter named by `kind`.
    fn increment_counter(&self, kind: CounterKind) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;
    use geo::{Geometry, Point};
    use rstest::rstest;

    fn record(id: u64) -> AcceptedRecord {
        AcceptedRecord::new(
            EntityId::new(id),
            crate::WIKIDATA_LAYER,
            crate::EARTH_REFERENCE_SYSTEM,
            Geometry::Point(Point::new(1.0, 2.0)),
        )
    }

    #[rstest]
    fn memory_store_keeps_saved_records() {
        let store = MemoryStore::default();
        store.save(&record(1)).expect("save should succeed");
        store
            .increment_counter(CounterKind::Geometry)
            .expect("counter should increment");

        assert_eq!(store.records(), vec![record(1)]);
        assert_eq!(store.counter(CounterKind::Geometry), 1);
    }

    #[rstest]
    fn memory_store_reports_configured_failures() {
        let store = MemoryStore::default().with_failure(EntityId::new(2));
        let error = store.save(&record(2)).expect_err("entity 2 should fail");
        assert!(!error.is_fatal());
        assert!(store.save(&record(3)).is_ok());
    }

    #[rstest]
    #[case(StoreError::Unavailable { message: "gone".into() }, true)]
    #[case(StoreError::Rejected { entity: EntityId::new(1), reason: "no".into() }, false)]
    #[case(StoreError::EntityIdOutOfRange { entity: EntityId::new(u64::MAX) }, false)]
    fn classifies_fatal_errors(#[case] error: StoreError, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
    }

    #[rstest]
    fn counter_names_are_stable() {
        assert_eq!(CounterKind::Geometry.as_str(), "geometry");
    }
}
