//! Test helpers for composing CLI datasets.

use std::{fs, io::Write};

use bzip2::{Compression, write::BzEncoder};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use wikigeo_data::dataset::test_support::shapefile_zip;

pub(super) const ARCHIVE_URL: &str = "https://example.org/ne_countries.zip";

const DUMP_LINES: [&str; 3] = [
    r#"{"id":"Q64","claims":{"P625":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":52.52,"longitude":13.405,"globe":"http://www.wikidata.org/entity/Q2"}}}}]},"sitelinks":{"dewiki":{"site":"dewiki","title":"Berlin"}}},"#,
    r#"{"id":"Q90","claims":{"P625":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":48.8567,"longitude":2.3508,"globe":"http://www.wikidata.org/entity/Q2"}}}}]},"sitelinks":{"frwiki":{"site":"frwiki","title":"Paris"}}},"#,
    r#"{"id":"Q1490","claims":{"P625":[{"mainsnak":{"snaktype":"value","datavalue":{"type":"globecoordinate","value":{"latitude":35.68,"longitude":139.77,"globe":"http://www.wikidata.org/entity/Q2"}}}}]},"sitelinks":{"dewiki":{"site":"dewiki","title":"Tokio"}}}"#,
];

/// Scratch files shared by CLI tests.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Write a bzip2 compressed dump with three coordinate-bearing items.
    pub(super) fn write_dump(&self) -> Utf8PathBuf {
        let path = self.path("latest-all.json.bz2");
        let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
        writeln!(encoder, "[").expect("write dump");
        for line in DUMP_LINES {
            writeln!(encoder, "{line}").expect("write dump");
        }
        writeln!(encoder, "]").expect("write dump");
        fs::write(&path, encoder.finish().expect("finish bzip2")).expect("write dump file");
        path
    }

    /// Write a catalogue naming `earth/country/naturalEarth`.
    pub(super) fn write_catalogue(&self) -> Utf8PathBuf {
        let path = self.path("catalogue.json");
        let json = format!(
            r#"{{"earth":{{"country":{{"naturalEarth":{{"url":"{ARCHIVE_URL}","archive_member":"data/ne_countries.shp","encoding":"windows-1252"}}}}}}}}"#
        );
        fs::write(&path, json).expect("write catalogue");
        path
    }
}

pub(super) fn country_archive() -> Vec<u8> {
    shapefile_zip("data", "ne_countries")
}
