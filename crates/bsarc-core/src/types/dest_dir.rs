//! Validated destination directory type.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use super::EntryPath;
use crate::ExtractionError;
use crate::Result;
use crate::error::FormatError;

/// The root directory an archive is extracted into.
///
/// Construction creates the directory (and missing parents) and stores its
/// canonical form. Every output path is derived from it through
/// [`DestDir::join`], which only accepts a validated [`EntryPath`].
///
/// # Examples
///
/// ```no_run
/// use bsarc_core::types::{DestDir, EntryPath};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/tmp/mod")?;
/// let target = dest.join(&EntryPath::parse(r"meshes\a.nif")?);
/// assert!(target.starts_with(dest.as_path()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Creates the directory if needed and canonicalizes it.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Destination`] if the directory cannot be
    /// created, is not a directory, or cannot be canonicalized.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |source| ExtractionError::Destination {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(path).map_err(unavailable)?;
        let canonical = path.canonicalize().map_err(unavailable)?;
        if !canonical.is_dir() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        Ok(Self(canonical))
    }

    /// Returns the canonical root.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Output path for an archive entry.
    #[must_use]
    pub fn join(&self, entry: &EntryPath) -> PathBuf {
        self.0.join(entry.to_path_buf())
    }

    /// Whether `path`, once canonicalized by the caller, lies under the root.
    #[must_use]
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.0)
    }

    /// Creates the parent directories of `entry` and returns its output path.
    ///
    /// Directories are created one component at a time. Each component that
    /// already exists is canonicalized first, so a symlink planted in the
    /// destination that points elsewhere stops the walk before anything is
    /// created outside the root.
    ///
    /// # Errors
    ///
    /// - [`FormatError::PathEscape`] if an existing component resolves
    ///   outside the root
    /// - I/O errors from creating or inspecting directories
    pub fn create_parents(&self, entry: &EntryPath) -> Result<PathBuf> {
        let escape = || FormatError::PathEscape {
            path: entry.to_string(),
        };
        let components: Vec<&str> = entry.components().collect();
        let Some((_, dirs)) = components.split_last() else {
            return Err(escape().into());
        };

        let mut current = self.0.clone();
        for dir in dirs {
            current.push(dir);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    if !self.contains(&current.canonicalize()?) {
                        return Err(escape().into());
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => match fs::create_dir(&current) {
                    // Another worker created it first.
                    Err(err) if err.kind() != io::ErrorKind::AlreadyExists => return Err(err.into()),
                    _ => {}
                },
                Err(err) => return Err(err.into()),
            }
        }

        Ok(self.join(entry))
    }

    /// Whether the directory has no entries yet.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be listed.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(std::fs::read_dir(&self.0)?.next().is_none())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_create_makes_missing_parents() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let dest = DestDir::create(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(dest.as_path().is_absolute());
        assert!(dest.is_empty().unwrap());
    }

    #[test]
    fn test_create_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let err = DestDir::create(&file).unwrap_err();
        assert!(matches!(err, ExtractionError::Destination { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_join_stays_under_root() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::create(temp.path()).unwrap();
        let entry = EntryPath::parse(r"textures\sky.dds").unwrap();
        let target = dest.join(&entry);
        assert!(target.starts_with(dest.as_path()));
        assert!(target.ends_with("sky.dds"));
        assert!(dest.contains(&target));
    }

    #[test]
    fn test_create_parents_nested() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::create(temp.path()).unwrap();
        let entry = EntryPath::parse(r"meshes\actors\a.nif").unwrap();
        let target = dest.create_parents(&entry).unwrap();
        assert!(dest.as_path().join("meshes/actors").is_dir());
        assert!(!target.exists());
        // idempotent
        dest.create_parents(&entry).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_create_parents_stops_at_escaping_symlink() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        let dest = DestDir::create(temp.path().join("out")).unwrap();
        std::os::unix::fs::symlink(&outside, dest.as_path().join("link")).unwrap();

        let entry = EntryPath::parse(r"link\sub\deeper\a.txt").unwrap();
        let err = dest.create_parents(&entry).unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::PathEscape { .. })));
        assert!(!outside.join("sub").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_create_parents_follows_contained_symlink() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::create(temp.path()).unwrap();
        std::fs::create_dir(dest.as_path().join("real")).unwrap();
        std::os::unix::fs::symlink(dest.as_path().join("real"), dest.as_path().join("alias")).unwrap();

        let entry = EntryPath::parse("alias/sub/a.txt").unwrap();
        dest.create_parents(&entry).unwrap();
        assert!(dest.as_path().join("real/sub").is_dir());
    }

    #[test]
    fn test_is_empty_after_write() {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::create(temp.path()).unwrap();
        std::fs::write(temp.path().join("x"), b"1").unwrap();
        assert!(!dest.is_empty().unwrap());
    }
}
