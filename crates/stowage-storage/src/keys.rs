//! Object path derivation shared by every storage operation.
//!
//! Path format: `{root}/{file_name}.encrypted`.

use crate::traits::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use stowage_core::ENCRYPTED_SUFFIX;

/// Reject names that could escape the storage root or address a nested path.
pub fn validate_file_name(file_name: &str) -> StorageResult<()> {
    if file_name.trim().is_empty() {
        return Err(StorageError::InvalidKey("File name is empty".to_string()));
    }

    if file_name.contains("..")
        || file_name.starts_with('/')
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains('\0')
    {
        return Err(StorageError::InvalidKey(format!(
            "File name contains invalid characters: {}",
            file_name
        )));
    }

    Ok(())
}

/// Object path for `file_name` under `root`
pub fn object_path(root: &Path, file_name: &str) -> StorageResult<PathBuf> {
    validate_file_name(file_name)?;
    Ok(root.join(format!("{}{}", file_name, ENCRYPTED_SUFFIX)))
}

/// Append the encrypted suffix to an arbitrary destination path
pub(crate) fn with_encrypted_suffix(destination: &Path) -> PathBuf {
    let mut raw = destination.as_os_str().to_os_string();
    raw.push(ENCRYPTED_SUFFIX);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_suffixed_path_under_root() {
        let path = object_path(Path::new("/srv/stowage"), "report.pdf").unwrap();
        assert_eq!(path, PathBuf::from("/srv/stowage/report.pdf.encrypted"));
    }

    #[test]
    fn same_name_same_path() {
        let root = Path::new("data");
        assert_eq!(
            object_path(root, "a.txt").unwrap(),
            object_path(root, "a.txt").unwrap()
        );
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for name in ["../etc/passwd", "/abs", "nested/name", "a\\b", "..", "", "  "] {
            assert!(
                matches!(validate_file_name(name), Err(StorageError::InvalidKey(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn suffix_is_appended_not_replacing_extension() {
        assert_eq!(
            with_encrypted_suffix(Path::new("out/photo.jpg")),
            PathBuf::from("out/photo.jpg.encrypted")
        );
    }
}
