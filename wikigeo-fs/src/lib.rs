//! Capability-scoped filesystem helpers for dataset staging.
//!
//! Every helper resolves an ambient base directory (the filesystem root, a
//! Windows drive, or the current directory) once and then performs the
//! operation relative to it through `cap-std`, so callers can work with plain
//! UTF-8 paths without handing out broader authority.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open a UTF-8 file path for reading.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Create (or truncate) the file at `path`, creating missing parents first.
pub fn create_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    dir.create(name)
}

/// Open the directory containing `path` and return it with the final component.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} should include a file name")))?
        .to_string();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create `path` and all missing ancestors.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<()> {
    let (base, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Return whether anything exists at `path`.
pub fn path_exists(path: &Utf8Path) -> io::Result<bool> {
    let (base, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(true);
    }
    base.try_exists(&relative)
}

/// Return whether `path` exists and is a regular file.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (base, relative) = base_dir_and_relative(path)?;
    match base.metadata(&relative) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Return whether `path` exists and is a directory.
pub fn dir_is_dir(path: &Utf8Path) -> io::Result<bool> {
    let (base, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(true);
    }
    match base.metadata(&relative) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// List the file names directly inside `dir`, sorted.
pub fn list_file_names(dir: &Utf8Path) -> io::Result<Vec<String>> {
    let handle = fs_utf8::Dir::open_ambient_dir(dir, ambient_authority())?;
    let mut names = Vec::new();
    for entry in handle.entries()? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name()?);
        }
    }
    names.sort();
    Ok(names)
}

/// Move a file or directory from `from` to `to`.
///
/// A plain rename is tried first. When that fails because the paths live on
/// different filesystems, regular files are copied and the source removed.
/// Directories cannot cross filesystems and report the rename error.
pub fn move_path(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    let (from_dir, from_name) = open_dir_and_file(from)?;
    let (to_dir, to_name) = open_dir_and_file(to)?;
    match from_dir.rename(&from_name, &to_dir, &to_name) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) && from_dir.metadata(&from_name)?.is_file() => {
            from_dir.copy(&from_name, &to_dir, &to_name)?;
            from_dir.remove_file(&from_name)
        }
        Err(err) => Err(err),
    }
}

/// Remove the file at `path`, treating a missing file as success.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.remove_file(&name) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove the directory tree at `path`, treating a missing tree as success.
pub fn remove_dir_all_if_exists(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.remove_dir_all(&name) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(18)
}

/// Split a path into an ambient base directory and the remaining relative part.
///
/// Absolute paths are anchored at the root (or drive prefix on Windows);
/// relative paths are anchored at the current directory.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, path)
    }

    #[rstest]
    fn ensure_dir_creates_nested_directories(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let nested = root.join("earth/natural/coastline");
        ensure_dir(&nested).expect("create nested dirs");
        assert!(dir_is_dir(&nested).expect("stat nested dir"));
    }

    #[rstest]
    fn create_file_makes_parents(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let path = root.join("raw/archive.zip");
        let mut file = create_utf8_file(&path).expect("create file");
        file.write_all(b"PK").expect("write file");
        assert!(file_is_file(&path).expect("stat file"));
        assert!(path_exists(&path).expect("check existence"));
    }

    #[rstest]
    fn missing_paths_are_not_files(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let path = root.join("absent.shp");
        assert!(!file_is_file(&path).expect("stat missing file"));
        assert!(!path_exists(&path).expect("check missing path"));
    }

    #[rstest]
    fn move_path_renames_directories(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        let from = root.join("staging");
        ensure_dir(&from).expect("create staging dir");
        create_utf8_file(&from.join("a.shp")).expect("create component");

        let to = root.join("final");
        move_path(&from, &to).expect("move dir");

        assert!(!path_exists(&from).expect("check source"));
        assert_eq!(
            list_file_names(&to).expect("list moved dir"),
            vec![String::from("a.shp")]
        );
    }

    #[rstest]
    fn removals_ignore_missing_targets(root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = root;
        remove_file_if_exists(&root.join("nothing.csv")).expect("missing file is fine");
        remove_dir_all_if_exists(&root.join("nothing")).expect("missing dir is fine");
    }
}
