use super::*;
use crate::ingest::{FactFilter, FactSource, FactStreamError};
use bzip2::{Compression as BzCompression, write::BzEncoder};
use camino::Utf8PathBuf;
use flate2::{Compression as GzCompression, write::GzEncoder};
use rstest::{fixture, rstest};
use std::io::{Cursor, Write};
use tempfile::TempDir;
use wikigeo_core::{ConceptResolver, EntityId, Language, PropertyId};

const BERLIN: &str = r#"{"id":"Q64","claims":{"P625":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":52.52,"longitude":13.40,"globe":"http://www.wikidata.org/entity/Q2"}}},"rank":"normal"}]},"sitelinks":{"dewiki":{"site":"dewiki","title":"Berlin"},"enwiki":{"site":"enwiki","title":"Berlin"},"commonswiki":{"site":"commonswiki","title":"Category:Berlin"}}}"#;
const OLYMPUS_MONS: &str = r#"{"id":"Q520","claims":{"P625":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":18.65,"longitude":226.2,"globe":"http://www.wikidata.org/entity/Q111"}}}}]},"sitelinks":{"frwiki":{"site":"frwiki","title":"Olympus Mons"}}}"#;
const COUNTRY: &str = r#"{"id":"P17","claims":{},"sitelinks":{}}"#;
const UNLINKED: &str = r#"{"id":"Q999","claims":{"P31":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"wikibase-entityid","value":{"id":"Q5"}}}}]},"sitelinks":{"enwikivoyage":{"site":"enwikivoyage","title":"Nowhere"}}}"#;

#[fixture]
fn dump() -> String {
    format!("[\n{BERLIN},\n{COUNTRY},\n{{not json,\n{OLYMPUS_MONS},\n{UNLINKED}\n]\n")
}

#[rstest]
fn streams_coordinate_claims_and_reports_malformed_lines(dump: String) {
    let mut source = DumpFactSource::new(Cursor::new(dump));
    assert!(source.supports_pushdown());

    let items: Vec<_> = source
        .facts(&FactFilter::default())
        .expect("stream opens")
        .collect();

    assert_eq!(items.len(), 3);
    let entities: Vec<EntityId> = items
        .iter()
        .filter_map(|item| item.as_ref().ok())
        .map(|fact| fact.entity)
        .collect();
    assert_eq!(entities, [EntityId::new(64), EntityId::new(520)]);
    assert!(items.iter().any(|item| matches!(
        item,
        Err(FactStreamError::Parse { line: 4, .. })
    )));
}

#[rstest]
fn other_properties_can_be_streamed(dump: String) {
    let mut source = DumpFactSource::new(Cursor::new(dump));
    let instance_of = FactFilter::property(PropertyId::new(31));

    let facts: Vec<_> = source
        .facts(&instance_of)
        .expect("stream opens")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(facts.len(), 1);
    assert_eq!(facts.first().map(|fact| fact.entity), Some(EntityId::new(999)));
}

#[rstest]
fn concept_index_keeps_wikipedia_languages_only(dump: String) {
    let index = load_concept_index(Cursor::new(dump)).expect("index loads");

    assert_eq!(index.len(), 2);
    let berlin = index.resolve(&EntityId::new(64)).expect("Berlin is indexed");
    let languages: Vec<&str> = berlin.languages.iter().map(Language::as_str).collect();
    assert_eq!(languages, ["de", "en"]);
    assert!(index.resolve(&EntityId::new(999)).is_none());
}

fn temp_dump(dir: &TempDir, name: &str, bytes: &[u8]) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf-8 temp path");
    std::fs::write(&path, bytes).expect("write dump");
    path
}

#[rstest]
#[case::plain("dump.json")]
#[case::bzip2("dump.json.bz2")]
#[case::gzip("dump.json.gz")]
fn opens_compressed_dumps(dump: String, #[case] name: &str) {
    let bytes = if name.ends_with(".bz2") {
        let mut encoder = BzEncoder::new(Vec::new(), BzCompression::fast());
        encoder.write_all(dump.as_bytes()).expect("compress");
        encoder.finish().expect("finish bzip2")
    } else if name.ends_with(".gz") {
        let mut encoder = GzEncoder::new(Vec::new(), GzCompression::fast());
        encoder.write_all(dump.as_bytes()).expect("compress");
        encoder.finish().expect("finish gzip")
    } else {
        dump.into_bytes()
    };
    let dir = TempDir::new().expect("create temp dir");
    let path = temp_dump(&dir, name, &bytes);

    let mut source = DumpFactSource::open(&path).expect("dump opens");
    let facts = source
        .facts(&FactFilter::default())
        .expect("stream opens")
        .filter_map(Result::ok)
        .count();

    assert_eq!(facts, 2);
}

#[rstest]
fn missing_dumps_fail_to_open() {
    let dir = TempDir::new().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.json.bz2")).expect("utf-8");

    let result = DumpFactSource::open(&path);

    assert!(matches!(
        result,
        Err(FactStreamError::Open { ref name, .. }) if name.ends_with("absent.json.bz2")
    ));
}
