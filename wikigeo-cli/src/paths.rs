//! Path checks shared by the subcommands.

use camino::Utf8Path;

use crate::CliError;

/// Require `path` to name an existing regular file.
pub(crate) fn require_existing_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    let inspect = |source| CliError::InspectSourcePath {
        field,
        path: path.to_path_buf(),
        source,
    };
    if !wikigeo_fs::path_exists(path).map_err(inspect)? {
        return Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        });
    }
    if wikigeo_fs::file_is_file(path).map_err(inspect)? {
        Ok(())
    } else {
        Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        })
    }
}

/// Require `path` to be a directory when anything exists there.
pub(crate) fn require_directory_or_absent(
    path: &Utf8Path,
    field: &'static str,
) -> Result<(), CliError> {
    let inspect = |source| CliError::InspectSourcePath {
        field,
        path: path.to_path_buf(),
        source,
    };
    if !wikigeo_fs::path_exists(path).map_err(inspect)? {
        return Ok(());
    }
    if wikigeo_fs::dir_is_dir(path).map_err(inspect)? {
        Ok(())
    } else {
        Err(CliError::OutputDirectoryNotDirectory {
            field,
            path: path.to_path_buf(),
        })
    }
}
