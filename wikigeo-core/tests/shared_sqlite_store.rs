//! Concurrent writers sharing one SQLite store through the `SpatialStore` seam.

use std::thread;

use geo::{Geometry, Point};
use rstest::rstest;
use tempfile::TempDir;
use wikigeo_core::{
    AcceptedRecord, CounterKind, EARTH_REFERENCE_SYSTEM, EntityId, SpatialStore,
    SqliteSpatialStore, WIKIDATA_LAYER,
};

fn save_range(store: &dyn SpatialStore, ids: std::ops::Range<u64>) {
    for id in ids {
        let record = AcceptedRecord::new(
            EntityId::new(id),
            WIKIDATA_LAYER,
            EARTH_REFERENCE_SYSTEM,
            Geometry::Point(Point::new(0.0, 0.0)),
        );
        store.save(&record).expect("save record");
        store
            .increment_counter(CounterKind::Geometry)
            .expect("increment counter");
    }
}

#[rstest]
fn writers_on_several_threads_share_one_file() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("shared.db");
    let store = SqliteSpatialStore::open(&path).expect("open store");

    thread::scope(|scope| {
        for chunk in 0..4_u64 {
            let store = &store;
            scope.spawn(move || save_range(store, chunk * 25..(chunk + 1) * 25));
        }
    });
    drop(store);

    let reopened = SqliteSpatialStore::open(&path).expect("reopen store");
    assert_eq!(reopened.record_count(WIKIDATA_LAYER).expect("count"), 100);
    assert_eq!(reopened.counter(CounterKind::Geometry).expect("counter"), 100);
    assert_eq!(reopened.record_count("osm").expect("count"), 0);
}
