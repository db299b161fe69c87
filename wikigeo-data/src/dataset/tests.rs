use super::test_support::{StubSource, block_on_for_tests, shapefile_zip, tar_gz_archive, zip_archive};
use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;


const ARCHIVE_URL: &str = "https://example.org/files/countries.zip";
const MAPPING_URL: &str = "https://example.org/files/countries-mapping.zip";

struct Workspace {
    _dir: TempDir,
    layout: SpatialDataDir,
}

impl Workspace {
    fn root(&self) -> &Utf8Path {
        self.layout.root()
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().join("spatial")).expect("utf-8 temp path");
    Workspace {
        _dir: dir,
        layout: SpatialDataDir::new(root),
    }
}

#[fixture]
fn descriptor() -> DatasetDescriptor {
    DatasetDescriptor::new("earth", "country", "naturalEarth").expect("valid descriptor")
}

#[fixture]
fn member() -> ArchiveMember {
    ArchiveMember::new("10m_cultural/ne_countries.shp").expect("valid member")
}

fn url(value: &str) -> DatasetUrl {
    DatasetUrl::parse(value).expect("valid url")
}

fn stub_with_countries() -> StubSource {
    StubSource::new().with_response(ARCHIVE_URL, shapefile_zip("10m_cultural", "ne_countries"))
}

fn acquire(
    cache: &DatasetCache<StubSource>,
    descriptor: &DatasetDescriptor,
    member: &ArchiveMember,
) -> Result<StagedDataset, DatasetError> {
    block_on_for_tests(cache.acquire(descriptor, &url(ARCHIVE_URL), member, &Encoding::default()))
}

fn entries(dir: &Utf8Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(read) => {
            let mut names: Vec<String> = read
                .map(|entry| {
                    entry
                        .expect("read dir entry")
                        .file_name()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            names.sort();
            names
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => panic!("failed to list {dir}: {err}"),
    }
}

#[rstest]
fn stages_required_components(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let cache = DatasetCache::new(stub_with_countries(), workspace.layout.clone());
    let staged = acquire(&cache, &descriptor, &member).expect("acquire succeeds");

    assert_eq!(
        staged.directory(),
        workspace.root().join("earth/country/naturalEarth")
    );
    assert_eq!(
        entries(staged.directory()),
        [
            "naturalEarth.cpg",
            "naturalEarth.dbf",
            "naturalEarth.prj",
            "naturalEarth.shp",
            "naturalEarth.shx",
        ]
    );
    let encoding = fs::read_to_string(staged.component("cpg")).expect("read cpg");
    assert_eq!(encoding, "UTF-8");
    let shp = fs::read_to_string(staged.shapefile()).expect("read shp");
    assert_eq!(shp, "10m_cultural/ne_countries.shp");
    assert!(staged.is_complete().expect("inspect staged dataset"));
}

#[rstest]
fn keeps_raw_archive_and_clears_scratch(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let cache = DatasetCache::new(stub_with_countries(), workspace.layout.clone());
    acquire(&cache, &descriptor, &member).expect("acquire succeeds");

    assert_eq!(
        entries(&workspace.layout.raw_dir()),
        ["earth_country_naturalEarth_countries.zip"]
    );
    assert!(entries(&workspace.layout.tmp_dir()).is_empty());
    assert!(
        entries(&workspace.root().join("earth/country"))
            .iter()
            .all(|name| !name.starts_with(".staging-")),
        "staging directory should have been renamed into place"
    );
}

#[rstest]
fn second_acquire_skips_the_network(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let cache = DatasetCache::new(stub_with_countries(), workspace.layout.clone());
    let first = acquire(&cache, &descriptor, &member).expect("first acquire");
    let second = acquire(&cache, &descriptor, &member).expect("second acquire");

    assert_eq!(first, second);
    assert_eq!(cache.source().download_count(), 1);
}

#[rstest]
fn a_new_encoding_restages_from_the_raw_archive(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let cache = DatasetCache::new(stub_with_countries(), workspace.layout.clone());
    let latin = Encoding::new("windows-1252").expect("valid encoding");
    acquire(&cache, &descriptor, &member).expect("first acquire");

    let restaged = block_on_for_tests(cache.acquire(&descriptor, &url(ARCHIVE_URL), &member, &latin))
        .expect("restage with new encoding");

    assert_eq!(restaged.encoding(), &latin);
    let on_disk = fs::read_to_string(restaged.component("cpg")).expect("read cpg");
    assert_eq!(on_disk, "windows-1252");
    assert!(restaged.encoding_is_current().expect("inspect encoding"));
    assert_eq!(cache.source().download_count(), 1);

    let again = block_on_for_tests(cache.acquire(&descriptor, &url(ARCHIVE_URL), &member, &latin))
        .expect("third acquire");
    assert_eq!(again, restaged);
    assert_eq!(cache.source().download_count(), 1);
}

#[rstest]
fn reuses_an_existing_raw_archive(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let raw = workspace
        .layout
        .raw_archive_path(&descriptor, &url(ARCHIVE_URL))
        .expect("raw path");
    fs::create_dir_all(workspace.layout.raw_dir()).expect("create raw dir");
    fs::write(&raw, shapefile_zip("10m_cultural", "ne_countries")).expect("seed raw archive");

    let cache = DatasetCache::new(StubSource::new(), workspace.layout.clone());
    let staged = acquire(&cache, &descriptor, &member).expect("acquire succeeds");

    assert!(staged.is_complete().expect("inspect staged dataset"));
    assert_eq!(cache.source().download_count(), 0);
}

#[rstest]
fn missing_member_leaves_no_canonical_directory(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
) {
    let cache = DatasetCache::new(stub_with_countries(), workspace.layout.clone());
    let absent = ArchiveMember::new("10m_cultural/ne_rivers").expect("valid member");

    let err = acquire(&cache, &descriptor, &absent).expect_err("member is absent");

    match err {
        DatasetError::MissingComponent { path } => {
            assert_eq!(path.file_name(), Some("ne_rivers.shp"));
        }
        other => panic!("expected MissingComponent, got {other:?}"),
    }
    assert!(!workspace.layout.dataset_dir(&descriptor).exists());
    assert!(entries(&workspace.layout.tmp_dir()).is_empty());
}

#[rstest]
fn missing_index_file_is_reported(workspace: Workspace, descriptor: DatasetDescriptor) {
    let archive = zip_archive(&[
        ("data/roads.shp", b"shp".as_slice()),
        ("data/roads.dbf", b"dbf".as_slice()),
    ]);
    let cache = DatasetCache::new(
        StubSource::new().with_response(ARCHIVE_URL, archive),
        workspace.layout.clone(),
    );
    let roads = ArchiveMember::new("data/roads").expect("valid member");

    let err = acquire(&cache, &descriptor, &roads).expect_err("shx is absent");

    assert!(
        matches!(&err, DatasetError::MissingComponent { path } if path.extension() == Some("shx")),
        "unexpected error: {err:?}"
    );
    assert!(!workspace.layout.dataset_dir(&descriptor).exists());
}

#[rstest]
fn failed_fetch_leaves_no_partial_archive(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let cache = DatasetCache::new(StubSource::new(), workspace.layout.clone());

    let err = acquire(&cache, &descriptor, &member).expect_err("url is unknown");

    assert!(
        matches!(
            &err,
            DatasetError::Fetch {
                source: TransportError::Http { status: 404, .. },
                ..
            }
        ),
        "unexpected error: {err:?}"
    );
    assert!(entries(&workspace.layout.raw_dir()).is_empty());
    assert!(!workspace.layout.dataset_dir(&descriptor).exists());
}

#[rstest]
fn stages_from_a_tarball(workspace: Workspace, descriptor: DatasetDescriptor) {
    let tarball_url = "https://example.org/files/countries.tar.gz";
    let archive = tar_gz_archive(&[
        ("countries.shp", b"shp".as_slice()),
        ("countries.shx", b"shx".as_slice()),
        ("countries.dbf", b"dbf".as_slice()),
    ]);
    let cache = DatasetCache::new(
        StubSource::new().with_response(tarball_url, archive),
        workspace.layout.clone(),
    );
    let encoding = Encoding::new("windows-1252").expect("valid encoding");
    let member = ArchiveMember::new("countries").expect("valid member");

    let staged = block_on_for_tests(cache.acquire(&descriptor, &url(tarball_url), &member, &encoding))
        .expect("acquire succeeds");

    assert_eq!(
        entries(staged.directory()),
        [
            "naturalEarth.cpg",
            "naturalEarth.dbf",
            "naturalEarth.shp",
            "naturalEarth.shx",
        ]
    );
    let cpg = fs::read_to_string(staged.component("cpg")).expect("read cpg");
    assert_eq!(cpg, "windows-1252");
}

#[rstest]
fn replaces_an_incomplete_canonical_directory(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let dataset_dir = workspace.layout.dataset_dir(&descriptor);
    fs::create_dir_all(&dataset_dir).expect("create dataset dir");
    fs::write(dataset_dir.join("naturalEarth.shp"), b"stale").expect("seed stale file");
    fs::write(dataset_dir.join("leftover.txt"), b"stale").expect("seed leftover");

    let cache = DatasetCache::new(stub_with_countries(), workspace.layout.clone());
    let staged = acquire(&cache, &descriptor, &member).expect("acquire succeeds");

    let shp = fs::read_to_string(staged.shapefile()).expect("read shp");
    assert_eq!(shp, "10m_cultural/ne_countries.shp");
    assert!(!dataset_dir.join("leftover.txt").exists());
    assert_eq!(cache.source().download_count(), 1);
}

fn mapping_archive(content: &str) -> Vec<u8> {
    zip_archive(&[("naturalEarth.wbmapping.csv", content.as_bytes())])
}

#[rstest]
fn installs_and_replaces_the_mapping_file(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let cache = DatasetCache::new(
        stub_with_countries().with_response(MAPPING_URL, mapping_archive("Q1,FRA\n")),
        workspace.layout.clone(),
    );
    let staged = acquire(&cache, &descriptor, &member).expect("acquire succeeds");

    let mapping = block_on_for_tests(cache.acquire_mapping(&url(MAPPING_URL), &staged))
        .expect("mapping succeeds");
    assert_eq!(mapping.path, staged.mapping_file());
    assert_eq!(
        fs::read_to_string(&mapping.path).expect("read mapping"),
        "Q1,FRA\n"
    );

    fs::write(&mapping.path, "outdated").expect("overwrite mapping");
    block_on_for_tests(cache.acquire_mapping(&url(MAPPING_URL), &staged))
        .expect("second mapping succeeds");

    assert_eq!(
        fs::read_to_string(staged.mapping_file()).expect("read mapping"),
        "Q1,FRA\n"
    );
    assert_eq!(cache.source().download_count(), 3);
    assert!(
        entries(staged.directory())
            .iter()
            .all(|name| !name.ends_with(".incoming"))
    );
}

#[rstest]
fn mapping_archive_without_the_expected_file_is_rejected(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    let wrong = zip_archive(&[("other.wbmapping.csv", b"Q2,DEU\n".as_slice())]);
    let cache = DatasetCache::new(
        stub_with_countries().with_response(MAPPING_URL, wrong),
        workspace.layout.clone(),
    );
    let staged = acquire(&cache, &descriptor, &member).expect("acquire succeeds");
    fs::write(staged.mapping_file(), "previous").expect("seed mapping");

    let err = block_on_for_tests(cache.acquire_mapping(&url(MAPPING_URL), &staged))
        .expect_err("mapping file is absent");

    match err {
        DatasetError::MissingMappingFile { file, url } => {
            assert_eq!(file, "naturalEarth.wbmapping.csv");
            assert_eq!(url, MAPPING_URL);
        }
        other => panic!("expected MissingMappingFile, got {other:?}"),
    }
    assert_eq!(
        fs::read_to_string(staged.mapping_file()).expect("read mapping"),
        "previous"
    );
    assert!(entries(&workspace.layout.tmp_dir()).is_empty());
}

#[rstest]
fn acquires_named_datasets_from_the_catalogue(workspace: Workspace, descriptor: DatasetDescriptor) {
    let catalogue = DatasetCatalogue::from_reader(
        format!(
            r#"{{"earth": {{"country": {{"naturalEarth": {{
                "url": "{ARCHIVE_URL}",
                "archive_member": "10m_cultural/ne_countries.shp",
                "encoding": "latin1",
                "mapping_url": "{MAPPING_URL}"
            }}}}}}}}"#
        )
        .as_bytes(),
    )
    .expect("catalogue parses");
    let cache = DatasetCache::new(
        stub_with_countries().with_response(MAPPING_URL, mapping_archive("Q1,FRA\n")),
        workspace.layout.clone(),
    );

    let named = block_on_for_tests(cache.acquire_named(&catalogue, &descriptor))
        .expect("named acquisition succeeds");

    assert_eq!(named.dataset.encoding().as_str(), "latin1");
    assert_eq!(
        named.mapping.map(|mapping| mapping.path),
        Some(named.dataset.mapping_file())
    );
}

#[rstest]
fn unknown_catalogue_entries_are_rejected(workspace: Workspace) {
    let catalogue = DatasetCatalogue::default();
    let cache = DatasetCache::new(StubSource::new(), workspace.layout.clone());
    let unknown = DatasetDescriptor::new("earth", "river", "hydro").expect("valid descriptor");

    let err = block_on_for_tests(cache.acquire_named(&catalogue, &unknown))
        .expect_err("dataset is not listed");

    assert!(
        matches!(
            &err,
            DatasetError::Catalogue(CatalogueError::UnknownDataset { descriptor })
                if descriptor == "earth/river/hydro"
        ),
        "unexpected error: {err:?}"
    );
    assert_eq!(cache.source().download_count(), 0);
}

#[rstest]
fn catalogue_rejects_invalid_urls() {
    let catalogue = DatasetCatalogue::from_reader(
        br#"{"earth": {"country": {"broken": {"url": "not a url", "archive_member": "a"}}}}"#
            .as_slice(),
    )
    .expect("catalogue parses");
    let broken = DatasetDescriptor::new("earth", "country", "broken").expect("valid descriptor");

    let err = catalogue.resolve(&broken).expect_err("url is invalid");

    assert!(matches!(
        err,
        CatalogueError::InvalidEntry {
            source: DescriptorError::InvalidUrl { .. },
            ..
        }
    ));
    assert_eq!(
        catalogue.descriptors().collect::<Vec<_>>(),
        [("earth", "country", "broken")]
    );
}

#[rstest]
fn download_log_records_network_fetches_only(
    workspace: Workspace,
    descriptor: DatasetDescriptor,
    member: ArchiveMember,
) {
    fs::create_dir_all(workspace.root()).expect("create root");
    let log_path = workspace.root().join("downloads.sqlite");
    let log = DownloadLog::initialise(&log_path).expect("initialise log");
    let cache =
        DatasetCache::new(stub_with_countries(), workspace.layout.clone()).with_log(log);

    acquire(&cache, &descriptor, &member).expect("first acquire");
    acquire(&cache, &descriptor, &member).expect("second acquire");

    let reopened = DownloadLog::initialise(&log_path).expect("reopen log");
    assert_eq!(reopened.count_for(ARCHIVE_URL).expect("count downloads"), 1);
}

#[rstest]
#[case("earth", "", "countries")]
#[case("earth", "a/b", "countries")]
#[case("..", "country", "countries")]
#[case("earth", "country", ".hidden")]
fn descriptors_reject_unsafe_segments(
    #[case] refsys: &str,
    #[case] group: &str,
    #[case] name: &str,
) {
    let err = DatasetDescriptor::new(refsys, group, name).expect_err("segment is unsafe");
    assert!(matches!(err, DescriptorError::InvalidSegment { .. }));
}

#[rstest]
#[case("../escape")]
#[case("/absolute/path.shp")]
#[case(".shp")]
#[case("")]
fn archive_members_must_stay_inside_the_archive(#[case] value: &str) {
    let err = ArchiveMember::new(value).expect_err("member is invalid");
    assert!(matches!(err, DescriptorError::InvalidArchiveMember { .. }));
}

#[rstest]
fn urls_without_a_file_name_cannot_be_staged(workspace: Workspace, descriptor: DatasetDescriptor) {
    let bare = url("https://example.org/");
    let err = workspace
        .layout
        .raw_archive_path(&descriptor, &bare)
        .expect_err("no final segment");
    assert!(matches!(err, DescriptorError::UnnamedUrl { .. }));
}
