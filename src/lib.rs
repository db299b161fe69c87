//! Facade crate for the wikigeo spatial ingestion toolkit.
//!
//! This crate re-exports the core domain types alongside the dataset cache and
//! ingestion pipeline from `wikigeo-data`. The SQLite spatial store is exposed
//! behind the `store-sqlite` feature flag.

#![forbid(unsafe_code)]

pub use wikigeo_core::{
    AcceptedRecord, CandidateFact, Concept, ConceptIndex, ConceptResolver, CounterKind,
    DecodeError, EntityId, GeometryDecoder, Language, LanguageSet, PropertyId, SpatialStore,
    StoreError, WikidataCoordinateDecoder,
};

#[cfg(feature = "store-sqlite")]
pub use wikigeo_core::SqliteSpatialStore;

pub use wikigeo_data::{dataset, ingest, wikidata};
