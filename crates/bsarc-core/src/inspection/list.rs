//! Archive listing implementation.

use std::path::Path;

use crate::ArchiveHandle;
use crate::ExtractionConfig;
use crate::Result;
use crate::inspection::manifest::ArchiveManifest;

/// Lists archive contents without extracting.
///
/// Reads the header, record tables and names; no file data is decoded and
/// nothing is written. Names are validated exactly as for extraction, so an
/// archive that lists cleanly will not fail extraction on a path escape.
///
/// # Errors
///
/// Returns the same errors as [`ArchiveHandle::open`].
///
/// # Examples
///
/// ```no_run
/// use bsarc_core::ExtractionConfig;
/// use bsarc_core::list_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manifest = list_archive("Fallout4 - Meshes.ba2", &ExtractionConfig::default())?;
/// println!("{} ({}) holds {} files", manifest.kind, manifest.codec, manifest.total_entries);
/// for entry in manifest.entries {
///     println!("{}", entry.path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn list_archive<P: AsRef<Path>>(archive_path: P, config: &ExtractionConfig) -> Result<ArchiveManifest> {
    let handle = ArchiveHandle::open(archive_path, config)?;
    Ok(handle.manifest())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::formats::ArchiveKind;
    use crate::test_utils::Tes4Builder;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_list_tes4() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.bsa");
        let bytes = Tes4Builder::new(104)
            .compressed(true)
            .file("meshes", "a.nif", b"aaaa")
            .raw_file("textures", "b.dds", b"bbbbbb")
            .build();
        std::fs::write(&path, bytes).unwrap();

        let manifest = list_archive(&path, &ExtractionConfig::default()).unwrap();
        assert_eq!(manifest.kind, ArchiveKind::Tes4);
        assert_eq!(manifest.total_entries, 2);
        assert_eq!(manifest.entries[0].path, PathBuf::from("meshes").join("a.nif"));
        assert!(manifest.entries[0].compressed);
        assert_eq!(manifest.entries[0].size, None);
        assert_eq!(manifest.entries[1].size, Some(6));
        assert_eq!(manifest.total_size, 6);
        assert_eq!(manifest.unknown_sizes(), 1);
    }
}
