//! Archive extraction and scratch directory lifecycle.

use std::io::{self, BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use log::{debug, info};
use tempfile::TempDir;

use super::ArchiveError;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const TAR_MAGIC_OFFSET: usize = 257;

/// Container formats the stager can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// PKZIP container.
    Zip,
    /// Gzip-compressed tarball.
    TarGz,
    /// Uncompressed tarball.
    Tar,
}

impl ArchiveFormat {
    /// Infer the format from the file name, falling back to magic bytes.
    pub fn detect(path: &Utf8Path) -> Result<Self, ArchiveError> {
        let name = path.file_name().unwrap_or_default().to_ascii_lowercase();
        if name.ends_with(".zip") {
            return Ok(Self::Zip);
        }
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            return Ok(Self::TarGz);
        }
        if name.ends_with(".tar") {
            return Ok(Self::Tar);
        }

        let mut header = [0_u8; 512];
        let read = read_prefix(wikigeo_fs::open_utf8_file(path)?.into_std(), &mut header)?;
        let prefix = header.get(..read).unwrap_or_default();
        if prefix.starts_with(&ZIP_MAGIC) {
            Ok(Self::Zip)
        } else if prefix.starts_with(&GZIP_MAGIC) {
            Ok(Self::TarGz)
        } else if prefix
            .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5)
            .is_some_and(|magic| magic == b"ustar")
        {
            Ok(Self::Tar)
        } else {
            Err(ArchiveError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }
}

fn read_prefix(mut reader: impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let Some(rest) = buf.get_mut(filled..) else {
            break;
        };
        match reader.read(rest)? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Unpack `archive` into `target`.
///
/// Entries that would escape `target` are refused by the underlying readers.
pub fn extract(archive: &Utf8Path, target: &Utf8Path) -> Result<(), ArchiveError> {
    let format = ArchiveFormat::detect(archive)?;
    info!("extracting {archive} ({format:?}) to {target}");
    let file = BufReader::new(wikigeo_fs::open_utf8_file(archive)?.into_std());
    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(file)?;
            zip.extract(target)?;
        }
        ArchiveFormat::TarGz => tar::Archive::new(GzDecoder::new(file)).unpack(target)?,
        ArchiveFormat::Tar => tar::Archive::new(file).unpack(target)?,
    }
    Ok(())
}

/// Uniquely named temporary directory removed when dropped.
///
/// Dropping happens on every exit path of the owning scope, including early
/// returns through `?`.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    path: Utf8PathBuf,
}

impl ScratchDir {
    /// Create a fresh scratch directory inside `parent`.
    pub fn create_in(parent: &Utf8Path) -> io::Result<Self> {
        wikigeo_fs::ensure_dir(parent)?;
        let dir = tempfile::Builder::new()
            .prefix("wikigeo-")
            .suffix(".exploded")
            .tempdir_in(parent)?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|_| io::Error::other("scratch directory path is not UTF-8"))?;
        debug!("created scratch directory {path}");
        Ok(Self { dir, path })
    }

    /// Location of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Remove the directory now, reporting any failure.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::{tar_gz_archive, zip_archive};
    use rstest::{fixture, rstest};

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, path)
    }

    #[rstest]
    #[case("countries.zip", ArchiveFormat::Zip)]
    #[case("COUNTRIES.ZIP", ArchiveFormat::Zip)]
    #[case("countries.tar.gz", ArchiveFormat::TarGz)]
    #[case("countries.tgz", ArchiveFormat::TarGz)]
    #[case("countries.tar", ArchiveFormat::Tar)]
    fn detects_format_from_name(#[case] name: &str, #[case] expected: ArchiveFormat) {
        assert_eq!(
            ArchiveFormat::detect(Utf8Path::new(name)).expect("format from name"),
            expected
        );
    }

    #[rstest]
    fn sniffs_zip_without_extension(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let path = root.join("download");
        std::fs::write(&path, zip_archive(&[("a.txt", b"a")])).expect("write archive");
        assert_eq!(
            ArchiveFormat::detect(&path).expect("sniff format"),
            ArchiveFormat::Zip
        );
    }

    #[rstest]
    fn rejects_unknown_formats(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let path = root.join("download.bin");
        std::fs::write(&path, b"not an archive").expect("write file");
        assert!(matches!(
            ArchiveFormat::detect(&path),
            Err(ArchiveError::UnsupportedFormat { .. })
        ));
    }

    #[rstest]
    #[case("bundle.zip", zip_archive(&[("nested/a.shp", b"shp")]))]
    #[case("bundle.tar.gz", tar_gz_archive(&[("nested/a.shp", b"shp")]))]
    fn extracts_nested_entries(root: (TempDir, Utf8PathBuf), #[case] name: &str, #[case] bytes: Vec<u8>) {
        let (_guard, root) = root;
        let archive = root.join(name);
        std::fs::write(&archive, bytes).expect("write archive");
        let target = root.join("out");
        std::fs::create_dir(&target).expect("create target");

        extract(&archive, &target).expect("extract archive");

        let contents = std::fs::read(target.join("nested/a.shp")).expect("read entry");
        assert_eq!(contents, b"shp");
    }

    #[rstest]
    fn corrupt_zip_reports_error(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let archive = root.join("broken.zip");
        std::fs::write(&archive, b"PK\x03\x04garbage").expect("write archive");
        let target = root.join("out");
        std::fs::create_dir(&target).expect("create target");

        assert!(extract(&archive, &target).is_err());
    }

    #[rstest]
    fn scratch_dir_is_removed_on_drop(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let path = {
            let scratch = ScratchDir::create_in(&root.join("tmp")).expect("create scratch");
            std::fs::write(scratch.path().join("file"), b"x").expect("write into scratch");
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
