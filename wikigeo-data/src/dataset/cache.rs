//! Idempotent fetch, validate, and activate of reference datasets.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};

use super::archive::{self, ScratchDir};
use super::fetch::download_to;
use super::types::{ENCODING_EXTENSION, OPTIONAL_COMPONENTS, REQUIRED_COMPONENTS};
use super::{
    ArchiveMember, DatasetCatalogue, DatasetDescriptor, DatasetError, DatasetSource, DatasetUrl,
    DescriptorError, DownloadLog, Encoding, MappingFile, SpatialDataDir, StagedDataset,
};

/// Outcome of [`DatasetCache::acquire_named`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDataset {
    /// The staged dataset.
    pub dataset: StagedDataset,
    /// Mapping file, when the catalogue lists a mapping URL.
    pub mapping: Option<MappingFile>,
}

/// Fetches archives once and stages their shapefiles into canonical storage.
///
/// Callers must not run concurrent acquisitions for the same descriptor; the
/// canonical directory is assumed to have a single writer.
#[derive(Debug)]
pub struct DatasetCache<S> {
    source: S,
    layout: SpatialDataDir,
    log: Option<DownloadLog>,
}

impl<S: DatasetSource> DatasetCache<S> {
    /// Build a cache that fetches through `source` into `layout`.
    pub fn new(source: S, layout: SpatialDataDir) -> Self {
        Self {
            source,
            layout,
            log: None,
        }
    }

    /// Record every completed network fetch in `log`.
    #[must_use]
    pub fn with_log(mut self, log: DownloadLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Source used for downloads.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Directory layout the cache writes to.
    pub fn layout(&self) -> &SpatialDataDir {
        &self.layout
    }

    /// Ensure the dataset for `descriptor` is staged, fetching and extracting
    /// only when needed.
    ///
    /// A complete staged dataset recorded with the same encoding is returned
    /// without touching the network; a different encoding restages it.
    /// An existing raw archive skips the download but is still extracted.
    /// On any failure the canonical directory keeps its prior state.
    pub async fn acquire(
        &self,
        descriptor: &DatasetDescriptor,
        url: &DatasetUrl,
        member: &ArchiveMember,
        encoding: &Encoding,
    ) -> Result<StagedDataset, DatasetError> {
        let staged = self.layout.staged(descriptor, encoding.clone());
        let inspect = |err| DatasetError::io("inspect", staged.directory(), err);
        if staged.is_complete().map_err(inspect)? {
            if staged.encoding_is_current().map_err(inspect)? {
                info!("dataset {descriptor} already staged at {}", staged.directory());
                return Ok(staged);
            }
            warn!(
                "dataset {descriptor} was staged with another encoding; restaging as {encoding}"
            );
        }

        let raw_path = self.layout.raw_archive_path(descriptor, url)?;
        self.fetch(url, &raw_path).await?;

        let scratch = self.scratch()?;
        archive::extract(&raw_path, scratch.path()).map_err(|source| DatasetError::Extract {
            archive: raw_path.clone(),
            source,
        })?;

        let components = locate_components(&scratch.path().join(member.as_path()))?;
        activate(&staged, &components)?;

        if let Some(path) = staged
            .first_missing()
            .map_err(|err| DatasetError::io("inspect", staged.directory(), err))?
        {
            return Err(DatasetError::IncompleteStaging { path });
        }
        info!("staged dataset {descriptor} at {}", staged.directory());
        Ok(staged)
    }

    /// Fetch the mapping archive at `url` and replace the mapping file of
    /// `staged` with the one it contains.
    ///
    /// The archive is always downloaded afresh. The mapping file must sit at
    /// the archive root under the name [`StagedDataset::mapping_file_name`].
    pub async fn acquire_mapping(
        &self,
        url: &DatasetUrl,
        staged: &StagedDataset,
    ) -> Result<MappingFile, DatasetError> {
        let file_name = staged.mapping_file_name();
        let archive_name = url.file_name().ok_or_else(|| DescriptorError::UnnamedUrl {
            url: url.to_string(),
        })?;

        let scratch = self.scratch()?;
        let archive_path = scratch.path().join(archive_name);
        self.fetch(url, &archive_path).await?;

        let exploded = scratch.path().join("exploded");
        wikigeo_fs::ensure_dir(&exploded)
            .map_err(|err| DatasetError::io("create", exploded.as_path(), err))?;
        archive::extract(&archive_path, &exploded).map_err(|source| DatasetError::Extract {
            archive: archive_path.clone(),
            source,
        })?;

        let extracted = exploded.join(&file_name);
        if !wikigeo_fs::file_is_file(&extracted)
            .map_err(|err| DatasetError::io("inspect", extracted.as_path(), err))?
        {
            return Err(DatasetError::MissingMappingFile {
                file: file_name,
                url: url.to_string(),
            });
        }

        let destination = staged.mapping_file();
        let incoming = staged.directory().join(format!(".{file_name}.incoming"));
        wikigeo_fs::move_path(&extracted, &incoming)
            .map_err(|err| DatasetError::io("move mapping file to", incoming.as_path(), err))?;
        if let Err(err) = wikigeo_fs::move_path(&incoming, &destination) {
            let _ = wikigeo_fs::remove_file_if_exists(&incoming);
            return Err(DatasetError::io(
                "replace mapping file",
                destination.as_path(),
                err,
            ));
        }
        info!("installed mapping file {destination}");
        Ok(MappingFile { path: destination })
    }

    /// Acquire a dataset listed in `catalogue`, then its mapping file when
    /// the entry names one.
    pub async fn acquire_named(
        &self,
        catalogue: &DatasetCatalogue,
        descriptor: &DatasetDescriptor,
    ) -> Result<NamedDataset, DatasetError> {
        let spec = catalogue.resolve(descriptor)?;
        let dataset = self
            .acquire(descriptor, &spec.url, &spec.archive_member, &spec.encoding)
            .await?;
        let mapping = match &spec.mapping_url {
            Some(mapping_url) => Some(self.acquire_mapping(mapping_url, &dataset).await?),
            None => None,
        };
        Ok(NamedDataset { dataset, mapping })
    }

    async fn fetch(&self, url: &DatasetUrl, destination: &Utf8Path) -> Result<(), DatasetError> {
        match download_to(&self.source, url, destination).await? {
            Some(report) => {
                if let Some(log) = &self.log {
                    log.record(&report)?;
                }
            }
            None => debug!("reusing downloaded archive {destination}"),
        }
        Ok(())
    }

    fn scratch(&self) -> Result<ScratchDir, DatasetError> {
        let tmp = self.layout.tmp_dir();
        ScratchDir::create_in(&tmp)
            .map_err(|err| DatasetError::io("create scratch directory in", tmp, err))
    }
}

/// Component files found in an extracted archive, paired with their
/// extensions.
struct Components {
    files: Vec<(Utf8PathBuf, &'static str)>,
}

fn locate_components(stem: &Utf8Path) -> Result<Components, DatasetError> {
    let mut files = Vec::with_capacity(REQUIRED_COMPONENTS.len() + OPTIONAL_COMPONENTS.len());
    for extension in REQUIRED_COMPONENTS {
        let path = component_path(stem, extension);
        let present = wikigeo_fs::file_is_file(&path)
            .map_err(|err| DatasetError::io("inspect", path.as_path(), err))?;
        if !present {
            return Err(DatasetError::MissingComponent { path });
        }
        files.push((path, extension));
    }
    for extension in OPTIONAL_COMPONENTS {
        let path = component_path(stem, extension);
        if wikigeo_fs::file_is_file(&path)
            .map_err(|err| DatasetError::io("inspect", path.as_path(), err))?
        {
            files.push((path, extension));
        }
    }
    Ok(Components { files })
}

fn component_path(stem: &Utf8Path, extension: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{stem}.{extension}"))
}

/// Move `components` into a staging directory beside the canonical one and
/// rename it into place.
fn activate(staged: &StagedDataset, components: &Components) -> Result<(), DatasetError> {
    let target = staged.directory();
    let parent = target.parent().unwrap_or(target);
    wikigeo_fs::ensure_dir(parent).map_err(|err| DatasetError::io("create", parent, err))?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)
        .map_err(|err| DatasetError::io("create staging directory in", parent, err))?;
    let staging_path = Utf8PathBuf::from_path_buf(staging.path().to_path_buf()).map_err(|path| {
        DatasetError::io(
            "use staging directory",
            path.to_string_lossy().into_owned(),
            std::io::Error::other("path is not UTF-8"),
        )
    })?;

    let stem = staged.descriptor().name();
    for (source, extension) in &components.files {
        let destination = staging_path.join(format!("{stem}.{extension}"));
        wikigeo_fs::move_path(source, &destination)
            .map_err(|err| DatasetError::io("move component to", destination.as_path(), err))?;
    }
    let encoding_file = staging_path.join(format!("{stem}.{ENCODING_EXTENSION}"));
    wikigeo_fs::create_utf8_file(&encoding_file)
        .and_then(|mut file| file.write_all(staged.encoding().as_str().as_bytes()))
        .map_err(|err| DatasetError::io("write", encoding_file.as_path(), err))?;

    if wikigeo_fs::path_exists(target).map_err(|err| DatasetError::io("inspect", target, err))? {
        warn!("replacing dataset directory {target}");
        wikigeo_fs::remove_dir_all_if_exists(target)
            .map_err(|err| DatasetError::io("remove", target, err))?;
    }

    let _ = staging.keep();
    if let Err(err) = wikigeo_fs::move_path(&staging_path, target) {
        let _ = wikigeo_fs::remove_dir_all_if_exists(&staging_path);
        return Err(DatasetError::io("activate", target, err));
    }
    Ok(())
}
