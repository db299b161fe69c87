//! Test-only, in-memory `SpatialStore` implementation used by unit and
//! behaviour tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{AcceptedRecord, CounterKind, EntityId, SpatialStore, StoreError};

/// In-memory `SpatialStore` that records every write.
///
/// Failures can be scripted per entity (non-fatal) or for the whole store
/// (fatal) to exercise error handling in callers.
#[derive(Default, Debug)]
pub struct MemoryStore {
    records: Mutex<Vec<AcceptedRecord>>,
    counters: Mutex<HashMap<CounterKind, u64>>,
    failing: HashSet<EntityId>,
    outage: AtomicBool,
}

impl MemoryStore {
    /// Make saves for `entity` fail with a non-fatal rejection.
    #[must_use]
    pub fn with_failure(mut self, entity: EntityId) -> Self {
        self.failing.insert(entity);
        self
    }

    /// Make every save fail with a fatal error.
    #[must_use]
    pub fn with_outage(self) -> Self {
        self.outage.store(true, Ordering::SeqCst);
        self
    }

    /// Snapshot of saved records in write order.
    pub fn records(&self) -> Vec<AcceptedRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Saved records belonging to `entity`.
    pub fn records_for(&self, entity: EntityId) -> Vec<AcceptedRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.entity == entity)
            .collect()
    }

    /// Current value of the counter named by `kind`.
    pub fn counter(&self, kind: CounterKind) -> u64 {
        self.counters
            .lock()
            .map(|counters| counters.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl SpatialStore for MemoryStore {
    fn save(&self, record: &AcceptedRecord) -> Result<(), StoreError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "scripted outage".into(),
            });
        }
        if self.failing.contains(&record.entity) {
            return Err(StoreError::Rejected {
                entity: record.entity,
                reason: "scripted failure".into(),
            });
        }
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable {
                message: "record lock poisoned".into(),
            })?
            .push(record.clone());
        Ok(())
    }

    fn increment_counter(&self, kind: CounterKind) -> Result<(), StoreError> {
        let mut counters = self.counters.lock().map_err(|_| StoreError::Unavailable {
            message: "counter lock poisoned".into(),
        })?;
        *counters.entry(kind).or_insert(0) += 1;
        Ok(())
    }
}
