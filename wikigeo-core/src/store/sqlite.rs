//! SQLite-backed spatial store.

use std::{
    fmt,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use geo::Geometry;
use log::debug;
use rusqlite::{Connection, OptionalExtension};

use crate::{AcceptedRecord, EntityId};

use super::{CounterKind, SpatialStore, StoreError};

const SCHEMA_VERSION: i64 = 1;

/// Spatial store persisting geometries as JSON rows in SQLite.
///
/// Rows are keyed by `(entity_id, layer, reference_system)`, so saving the
/// same entity twice replaces the earlier geometry. The connection sits behind
/// a mutex; concurrent ingestion workers serialise on it.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use wikigeo_core::{AcceptedRecord, CounterKind, EntityId, SpatialStore, SqliteSpatialStore};
///
/// let store = SqliteSpatialStore::open_in_memory()?;
/// let record = AcceptedRecord::new(
///     EntityId::new(64),
///     "wikidata",
///     "earth",
///     Geometry::Point(Point::new(13.38, 52.51)),
/// );
/// store.save(&record)?;
/// store.increment_counter(CounterKind::Geometry)?;
///
/// assert_eq!(store.record_count("wikidata")?, 1);
/// assert_eq!(store.counter(CounterKind::Geometry)?, 1);
/// # Ok::<(), wikigeo_core::StoreError>(())
/// ```
pub struct SqliteSpatialStore {
    connection: Mutex<Connection>,
}

impl fmt::Debug for SqliteSpatialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSpatialStore").finish_non_exhaustive()
    }
}

impl SqliteSpatialStore {
    /// Open (or create) a store at `path` and initialise its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Sqlite {
            operation: "open database",
            source,
        })?;
        debug!("opened spatial store at {}", path.display());
        Self::from_connection(connection)
    }

    /// Open a transient store held entirely in memory.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Sqlite {
            operation: "open in-memory database",
            source,
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, StoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Unavailable {
            message: "connection lock poisoned by a panicking writer".into(),
        })
    }

    /// Read back the geometry stored for `entity` in `layer`.
    pub fn geometry(
        &self,
        entity: EntityId,
        layer: &str,
        reference_system: &str,
    ) -> Result<Option<Geometry<f64>>, StoreError> {
        let entity_id = entity_key(entity)?;
        let connection = self.lock()?;
        let json: Option<String> = connection
            .query_row(
                "SELECT geometry FROM spatial_geometries
                 WHERE entity_id = ?1 AND layer = ?2 AND reference_system = ?3",
                (entity_id, layer, reference_system),
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| StoreError::Sqlite {
                operation: "read geometry",
                source,
            })?;
        json.map(|json| {
            serde_json::from_str(&json).map_err(|source| StoreError::Encode { entity, source })
        })
        .transpose()
    }

    /// Number of geometries stored in `layer`.
    pub fn record_count(&self, layer: &str) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        let count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM spatial_geometries WHERE layer = ?1",
                [layer],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "count geometries",
                source,
            })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Current value of the counter named by `kind`.
    pub fn counter(&self, kind: CounterKind) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        let total: Option<i64> = connection
            .query_row(
                "SELECT total FROM record_counters WHERE kind = ?1",
                [kind.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| StoreError::Sqlite {
                operation: "read counter",
                source,
            })?;
        Ok(total.and_then(|total| u64::try_from(total).ok()).unwrap_or(0))
    }
}

impl SpatialStore for SqliteSpatialStore {
    fn save(&self, record: &AcceptedRecord) -> Result<(), StoreError> {
        let entity_id = entity_key(record.entity)?;
        let geometry =
            serde_json::to_string(&record.geometry).map_err(|source| StoreError::Encode {
                entity: record.entity,
                source,
            })?;
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(
                "INSERT OR REPLACE INTO spatial_geometries (
                    entity_id,
                    layer,
                    reference_system,
                    geometry
                ) VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare save geometry",
                source,
            })?;
        statement
            .execute((
                entity_id,
                record.layer.as_str(),
                record.reference_system.as_str(),
                geometry,
            ))
            .map_err(|source| StoreError::Sqlite {
                operation: "save geometry",
                source,
            })?;
        Ok(())
    }

    fn increment_counter(&self, kind: CounterKind) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(
                "INSERT INTO record_counters (kind, total) VALUES (?1, 1)
                 ON CONFLICT(kind) DO UPDATE SET total = total + 1",
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare increment counter",
                source,
            })?;
        statement
            .execute([kind.as_str()])
            .map_err(|source| StoreError::Sqlite {
                operation: "increment counter",
                source,
            })?;
        Ok(())
    }
}

fn entity_key(entity: EntityId) -> Result<i64, StoreError> {
    i64::try_from(entity.as_u64()).map_err(|_| StoreError::EntityIdOutOfRange { entity })
}

fn initialise_schema(connection: &mut Connection) -> Result<(), StoreError> {
    let transaction = connection
        .transaction()
        .map_err(|source| StoreError::Sqlite {
            operation: "begin schema transaction",
            source,
        })?;

    run_migration_step(
        &transaction,
        "create spatial_geometries",
        "CREATE TABLE IF NOT EXISTS spatial_geometries (
            entity_id INTEGER NOT NULL,
            layer TEXT NOT NULL CHECK (length(trim(layer)) > 0),
            reference_system TEXT NOT NULL CHECK (length(trim(reference_system)) > 0),
            geometry TEXT NOT NULL CHECK (json_valid(geometry)),
            PRIMARY KEY (entity_id, layer, reference_system)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        &transaction,
        "create record_counters",
        "CREATE TABLE IF NOT EXISTS record_counters (
            kind TEXT PRIMARY KEY,
            total INTEGER NOT NULL CHECK (total >= 0)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        &transaction,
        "create spatial_schema_version",
        "CREATE TABLE IF NOT EXISTS spatial_schema_version (version INTEGER NOT NULL)",
    )?;

    let existing: Option<i64> = transaction
        .query_row(
            "SELECT version FROM spatial_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| StoreError::Sqlite {
            operation: "read schema version",
            source,
        })?;
    match existing {
        None => {
            transaction
                .execute(
                    "INSERT INTO spatial_schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|source| StoreError::Sqlite {
                    operation: "record schema version",
                    source,
                })?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(found) => {
            return Err(StoreError::Unavailable {
                message: format!(
                    "schema version {found} does not match supported version {SCHEMA_VERSION}"
                ),
            });
        }
    }

    transaction.commit().map_err(|source| StoreError::Sqlite {
        operation: "commit schema transaction",
        source,
    })
}

fn run_migration_step(
    transaction: &rusqlite::Transaction<'_>,
    operation: &'static str,
    sql: &str,
) -> Result<(), StoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| StoreError::Sqlite { operation, source })
}
