//! Line-level parsing of Wikidata JSON dump entities.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;
use wikigeo_core::{CandidateFact, EntityId, PropertyId};

/// One entity from a dump, keeping only the parts ingestion reads.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    id: String,
    #[serde(default)]
    claims: BTreeMap<String, Vec<RawClaim>>,
    #[serde(default)]
    sitelinks: BTreeMap<String, IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    #[serde(rename = "mainsnak")]
    main_snak: RawSnak,
    #[serde(default)]
    rank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSnak {
    #[serde(rename = "snaktype")]
    snak_type: String,
    #[serde(rename = "datavalue")]
    data_value: Option<Value>,
}

impl RawEntity {
    /// Parse one entity from a JSON slice.
    pub(crate) fn parse(json: &str) -> Result<Self, simd_json::Error> {
        let mut bytes = json.as_bytes().to_vec();
        simd_json::from_slice(bytes.as_mut_slice())
    }

    /// Item identifier; `None` for properties, lexemes, and other non-items.
    pub(crate) fn item_id(&self) -> Option<EntityId> {
        self.id
            .starts_with(['Q', 'q'])
            .then(|| EntityId::parse(&self.id).ok())
            .flatten()
    }

    /// Site keys such as `enwiki` the entity links to.
    pub(crate) fn site_keys(&self) -> impl Iterator<Item = &str> {
        self.sitelinks.keys().map(String::as_str)
    }

    /// Candidate facts for every valued, non-deprecated `property` claim.
    pub(crate) fn into_facts(mut self, property: PropertyId) -> Vec<CandidateFact> {
        let Some(entity) = self.item_id() else {
            return Vec::new();
        };
        self.claims
            .remove(&property.to_string())
            .into_iter()
            .flatten()
            .filter(|claim| claim.rank.as_deref() != Some("deprecated"))
            .filter(|claim| claim.main_snak.snak_type == "value")
            .filter_map(|claim| claim.main_snak.data_value)
            .map(|payload| CandidateFact::new(entity, property, payload))
            .collect()
    }
}

/// Strip array punctuation from a dump line, returning the entity JSON.
///
/// Public dumps wrap one entity per line in a JSON array, so lines carry a
/// trailing comma and the first and last lines hold only brackets.
pub(crate) fn entity_json(line: &str) -> Option<&str> {
    let trimmed = line.trim().trim_start_matches(',').trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed).trim();
    if trimmed.is_empty() || trimmed == "[" || trimmed == "]" {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("[", None)]
    #[case("]", None)]
    #[case("   ", None)]
    #[case(r#"{"id":"Q1"},"#, Some(r#"{"id":"Q1"}"#))]
    #[case(r#"{"id":"Q1"}"#, Some(r#"{"id":"Q1"}"#))]
    fn strips_array_punctuation(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(entity_json(line), expected);
    }

    #[rstest]
    fn keeps_valued_claims_for_the_requested_property() {
        let entity = RawEntity::parse(
            r#"{"id":"Q64","claims":{
                "P625":[
                    {"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":52.5,"longitude":13.4}}},"rank":"preferred"},
                    {"mainsnak":{"snaktype":"somevalue"},"rank":"normal"},
                    {"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":0,"longitude":0}}},"rank":"deprecated"}
                ],
                "P31":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"wikibase-entityid","value":{"id":"Q515"}}}}]
            }}"#,
        )
        .expect("entity parses");

        let facts = entity.into_facts(PropertyId::COORDINATE_LOCATION);

        assert_eq!(facts.len(), 1);
        let fact = facts.first().expect("one fact");
        assert_eq!(fact.entity, EntityId::new(64));
        assert_eq!(fact.payload["value"]["latitude"], 52.5);
    }

    #[rstest]
    fn property_entities_yield_no_facts() {
        let entity = RawEntity::parse(
            r#"{"id":"P17","claims":{"P625":[{"mainsnak":{"snaktype":"value","datavalue":{}}}]}}"#,
        )
        .expect("entity parses");
        assert!(entity.item_id().is_none());
        assert!(entity.into_facts(PropertyId::COORDINATE_LOCATION).is_empty());
    }
}
