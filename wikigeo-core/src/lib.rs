//! Core domain types for the wikigeo spatial ingestion toolkit.
//!
//! The crate defines the identifiers, facts, and records that flow through
//! ingestion, together with the three collaborator seams the pipeline talks
//! to: [`ConceptResolver`], [`GeometryDecoder`], and [`SpatialStore`].
//! Constructors return `Result` so malformed identifiers are rejected at the
//! boundary rather than deep inside a worker thread.

mod concept;
mod entity;
mod geometry;
mod record;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use concept::{Concept, ConceptIndex, ConceptResolver};
pub use entity::{
    EntityId, EntityIdError, Language, LanguageError, LanguageSet, PropertyId, PropertyIdError,
};
pub use geometry::{DecodeError, EARTH_GLOBE, GeometryDecoder, WikidataCoordinateDecoder};
pub use record::{AcceptedRecord, CandidateFact, EARTH_REFERENCE_SYSTEM, WIKIDATA_LAYER};
pub use store::{CounterKind, SpatialStore, StoreError};

#[cfg(feature = "store-sqlite")]
pub use store::SqliteSpatialStore;
