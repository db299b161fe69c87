//! Building a concept index from dump sitelinks.

use std::io::BufRead;

use log::{debug, info, warn};
use wikigeo_core::{Concept, ConceptIndex, Language};

use super::WikidataError;
use super::entity::{RawEntity, entity_json};

/// Site keys ending in `wiki` that are not language editions.
const PROJECT_SITES: &[&str] = &[
    "commonswiki",
    "foundationwiki",
    "incubatorwiki",
    "mediawikiwiki",
    "metawiki",
    "outreachwiki",
    "sourceswiki",
    "specieswiki",
    "test2wiki",
    "testwiki",
    "testwikidatawiki",
    "wikidatawiki",
    "wikifunctionswiki",
    "wikimaniawiki",
];

/// Language of the Wikipedia edition behind a sitelink key.
///
/// Only Wikipedia editions count: sister projects (`enwikivoyage`) and
/// project-wide wikis (`commonswiki`) yield `None`.
///
/// # Examples
/// ```
/// use wikigeo_data::wikidata::sitelink_language;
///
/// assert_eq!(sitelink_language("dewiki").map(|l| l.to_string()), Some("de".into()));
/// assert_eq!(
///     sitelink_language("zh_min_nanwiki").map(|l| l.to_string()),
///     Some("zh-min-nan".into())
/// );
/// assert!(sitelink_language("commonswiki").is_none());
/// assert!(sitelink_language("enwikivoyage").is_none());
/// ```
#[must_use]
pub fn sitelink_language(site: &str) -> Option<Language> {
    if PROJECT_SITES.contains(&site) {
        return None;
    }
    let code = site.strip_suffix("wiki")?;
    Language::new(code).ok()
}

/// Read every item in a dump and record which Wikipedia editions cover it.
///
/// Items without any Wikipedia article are left out, so the index only
/// resolves entities that can fall inside a language scope. Malformed lines
/// are skipped; read failures end the load.
pub fn load_concept_index(reader: impl BufRead) -> Result<ConceptIndex, WikidataError> {
    let mut index = ConceptIndex::new();
    let mut skipped = 0_u64;
    let mut line_number = 0_u64;
    for line in reader.lines() {
        line_number += 1;
        let line = line.map_err(|source| WikidataError::Read {
            line: line_number,
            source,
        })?;
        let Some(json) = entity_json(&line) else {
            continue;
        };
        let entity = match RawEntity::parse(json) {
            Ok(entity) => entity,
            Err(err) => {
                debug!("skipping malformed entity at line {line_number}: {err}");
                skipped += 1;
                continue;
            }
        };
        let Some(id) = entity.item_id() else {
            continue;
        };
        let languages: Vec<Language> = entity.site_keys().filter_map(sitelink_language).collect();
        if !languages.is_empty() {
            index.insert(Concept::new(id, languages));
        }
    }
    if skipped > 0 {
        warn!("skipped {skipped} malformed entities while indexing concepts");
    }
    info!("indexed {} concepts from {line_number} dump lines", index.len());
    Ok(index)
}
