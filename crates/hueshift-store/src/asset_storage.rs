//! Directory-backed image storage

use crate::StoreError;
use hueshift_domain::has_image_extension;
use std::fs;
use std::path::{Path, PathBuf};

/// A directory of stored image assets
///
/// Only files with an image extension are considered part of the storage.
#[derive(Debug, Clone)]
pub struct AssetStorage {
    root: PathBuf,
}

impl AssetStorage {
    /// Open (and create if needed) the storage directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    /// The storage directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stored image files, sorted by filename
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let is_image = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(has_image_extension);
            if is_file && is_image {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Persist `bytes` under a stable name derived from `filename`
    ///
    /// The name is sanitized; if it is already taken a numeric suffix is
    /// added (`banner-1.png`, `banner-2.png`, ...).
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.free_path(&sanitize_filename(filename));
        fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Read a stored file
    pub fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        self.check_inside(path)?;
        fs::read(path).map_err(|e| StoreError::io(path, e))
    }

    /// Delete a stored file; returns `false` if it was already gone
    pub fn delete(&self, path: &Path) -> Result<bool, StoreError> {
        self.check_inside(path)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Whether `path` belongs to this storage directory
    pub fn contains(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path())
    }

    fn check_inside(&self, path: &Path) -> Result<(), StoreError> {
        if self.contains(path) {
            Ok(())
        } else {
            Err(StoreError::OutsideRoot(path.to_path_buf()))
        }
    }

    fn free_path(&self, name: &str) -> PathBuf {
        let candidate = self.root.join(name);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (name, None),
        };
        (1..)
            .map(|n| match ext {
                Some(ext) => self.root.join(format!("{}-{}.{}", stem, n, ext)),
                None => self.root.join(format!("{}-{}", stem, n)),
            })
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

/// Reduce an uploaded filename to a safe, flat file name
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; everything else becomes
/// `_`. Leading dots are dropped so the result is never hidden or a
/// relative path component.
///
/// # Examples
///
/// ```
/// use hueshift_store::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
/// assert_eq!(sanitize_filename("my banner (1).PNG"), "my_banner__1_.PNG");
/// ```
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("banner.png"), "banner.png");
        assert_eq!(sanitize_filename("..."), "image");
        assert_eq!(sanitize_filename("a/b\\c.gif"), "a_b_c.gif");
    }

    #[test]
    fn test_save_avoids_collisions() {
        let dir = TempDir::new().unwrap();
        let storage = AssetStorage::open(dir.path()).unwrap();

        let first = storage.save("banner.png", b"one").unwrap();
        let second = storage.save("banner.png", b"two").unwrap();
        let third = storage.save("banner.png", b"three").unwrap();

        assert_eq!(first.file_name().unwrap(), "banner.png");
        assert_eq!(second.file_name().unwrap(), "banner-1.png");
        assert_eq!(third.file_name().unwrap(), "banner-2.png");
        assert_eq!(storage.read(&first).unwrap(), b"one");
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let storage = AssetStorage::open(dir.path()).unwrap();
        storage.save("b.gif", b"x").unwrap();
        storage.save("a.JPG", b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = storage
            .list()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.gif"]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = AssetStorage::open(dir.path()).unwrap();
        let path = storage.save("gone.png", b"x").unwrap();

        assert!(storage.delete(&path).unwrap());
        assert!(!storage.delete(&path).unwrap());
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        let storage = AssetStorage::open(dir.path().join("banners")).unwrap();
        let outside = dir.path().join("secret.png");

        assert!(matches!(storage.delete(&outside), Err(StoreError::OutsideRoot(_))));
        assert!(matches!(storage.read(&outside), Err(StoreError::OutsideRoot(_))));
    }
}
