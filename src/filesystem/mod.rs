use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Represents errors that can occur while preparing extraction destinations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// Wrapper for standard IO errors.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Error for empty path input.
    #[error("Path is empty")]
    EmptyPath,
    /// Something other than a directory already exists at the path.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// Error when the home directory cannot be determined.
    #[error("Home directory not found")]
    HomeDirNotFound,
    /// Error for unsupported user expansion in paths (e.g., ~user).
    #[error("User expansion (~user) not supported")]
    UserExpansionNotSupported,
}

/// Creates a directory, and any missing parents, if it does not exist.
///
/// An existing directory is not an error. Anything else in the way is.
///
/// # Arguments
///
/// * `dir` - Path to the directory to create.
///
/// # Errors
///
/// Returns `FilesystemError` if the directory cannot be created.
pub fn create_if_not_exists<P: AsRef<Path>>(dir: P) -> Result<(), FilesystemError> {
    let path = dir.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FilesystemError::EmptyPath);
    }

    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(FilesystemError::NotADirectory(path.to_path_buf()));
    }

    fs::create_dir_all(path)?;

    debug!(directory = %path.display(), "created directory");
    Ok(())
}

/// Expands a path that starts with `~` to the user's home directory.
///
/// Paths not starting with `~` (including non UTF-8 ones) are returned unchanged.
///
/// # Errors
///
/// * `FilesystemError::HomeDirNotFound` if the home directory is unknown.
/// * `FilesystemError::UserExpansionNotSupported` for `~user` forms.
pub fn expand_home<P: AsRef<Path>>(path: P) -> Result<PathBuf, FilesystemError> {
    let path = path.as_ref();
    let raw = match path.to_str() {
        Some(raw) if raw.starts_with('~') => raw,
        _ => return Ok(path.to_path_buf()),
    };

    let home = dirs::home_dir().ok_or(FilesystemError::HomeDirNotFound)?;
    if raw == "~" {
        return Ok(home);
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(home.join(rest));
    }
    Err(FilesystemError::UserExpansionNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("c");
        create_if_not_exists(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn existing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("once");
        create_if_not_exists(&target).unwrap();
        create_if_not_exists(&target).unwrap();
        create_if_not_exists(dir.path()).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn file_in_the_way_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = create_if_not_exists(&blocker).unwrap_err();
        assert!(matches!(err, FilesystemError::NotADirectory(ref p) if p == &blocker));
        assert!(create_if_not_exists(blocker.join("below")).is_err());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            create_if_not_exists(""),
            Err(FilesystemError::EmptyPath)
        ));
    }

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(expand_home("/tmp/out").unwrap(), PathBuf::from("/tmp/out"));
        assert_eq!(expand_home("rel/out").unwrap(), PathBuf::from("rel/out"));
    }

    #[test]
    fn expands_tilde_prefix() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~").unwrap(), home);
            assert_eq!(expand_home("~/assets").unwrap(), home.join("assets"));
        }
    }

    #[test]
    fn rejects_other_users_home() {
        if dirs::home_dir().is_some() {
            assert!(matches!(
                expand_home("~someone/assets"),
                Err(FilesystemError::UserExpansionNotSupported)
            ));
        }
    }
}
