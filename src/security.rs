//! Owner-only permissions for the store folder and database files
//!
//! Settings often carry tokens or endpoints, so on Unix a newly created
//! store folder is `0o700` and the database plus its WAL/SHM side files are
//! `0o600`. On other platforms these are no-ops.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// SQLite side files that sit next to the main database in WAL mode
const SIDE_FILE_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

#[cfg(unix)]
fn restrict_to_owner(path: &Path, mode: u32) -> Result<()> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .permissions();
    perms.set_mode(mode);

    fs::set_permissions(path, perms).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Create the store folder if needed.
///
/// A folder created here is restricted to the owner when `secure` is set.
/// An existing folder is left untouched.
///
/// # Errors
///
/// * `Error::DirectoryCreate` - If the folder cannot be created
/// * `Error::FileRead` / `Error::FileWrite` - If permissions cannot be applied
pub fn prepare_folder(folder: &Path, secure: bool) -> Result<()> {
    if folder.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(folder).map_err(|e| Error::DirectoryCreate {
        path: folder.to_path_buf(),
        source: e,
    })?;

    if secure {
        restrict_to_owner(folder, 0o700)?;
    }
    Ok(())
}

/// Restrict the database file and any existing side files to the owner
///
/// # Errors
///
/// Returns an error if permissions of an existing file cannot be changed.
pub fn secure_database_files(database: &Path) -> Result<()> {
    let mut files = vec![database.to_path_buf()];
    for suffix in SIDE_FILE_SUFFIXES {
        let mut name = database.as_os_str().to_os_string();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }

    for file in files.iter().filter(|f| f.exists()) {
        restrict_to_owner(file, 0o600)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_prepare_folder_creates_nested() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("a/b/c");

        prepare_folder(&folder, true).unwrap();
        assert!(folder.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&folder).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_prepare_folder_rejects_file_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, "x").unwrap();

        let result = prepare_folder(&file, true);
        assert!(matches!(result, Err(Error::DirectoryCreate { .. })));
    }

    #[test]
    fn test_secure_database_files() {
        let dir = tempdir().unwrap();
        let database = dir.path().join("settings.sqlite");
        fs::write(&database, "").unwrap();
        fs::write(dir.path().join("settings.sqlite-wal"), "").unwrap();

        secure_database_files(&database).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for name in ["settings.sqlite", "settings.sqlite-wal"] {
                let mode = fs::metadata(dir.path().join(name))
                    .unwrap()
                    .permissions()
                    .mode();
                assert_eq!(mode & 0o777, 0o600, "{name}");
            }
        }
    }
}
