//! Facts entering ingestion and the records it produces.

use geo::Geometry;
use serde_json::Value;

use crate::{EntityId, PropertyId};

/// Reference system name for geometries in WGS84 longitude/latitude.
pub const EARTH_REFERENCE_SYSTEM: &str = "earth";

/// Layer that holds point geometries taken from Wikidata claims.
pub const WIKIDATA_LAYER: &str = "wikidata";

/// One raw claim from a fact stream, not yet resolved or decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFact {
    /// Entity the claim is about.
    pub entity: EntityId,
    /// Property the claim asserts.
    pub property: PropertyId,
    /// Raw claim value as found in the source.
    pub payload: Value,
}

impl CandidateFact {
    /// Construct a fact from its parts.
    #[must_use]
    pub const fn new(entity: EntityId, property: PropertyId, payload: Value) -> Self {
        Self {
            entity,
            property,
            payload,
        }
    }
}

/// A resolved, decoded, and deduplicated geometry ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedRecord {
    /// Entity the geometry belongs to.
    pub entity: EntityId,
    /// Layer the geometry is written to.
    pub layer: String,
    /// Reference system of the coordinates.
    pub reference_system: String,
    /// Decoded geometry.
    pub geometry: Geometry<f64>,
}

impl AcceptedRecord {
    /// Construct a record for `entity`.
    pub fn new(
        entity: EntityId,
        layer: impl Into<String>,
        reference_system: impl Into<String>,
        geometry: Geometry<f64>,
    ) -> Self {
        Self {
            entity,
            layer: layer.into(),
            reference_system: reference_system.into(),
            geometry,
        }
    }
}
