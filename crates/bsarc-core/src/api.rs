//! High-level public API for archive extraction.

use std::path::Path;
use std::time::Instant;

use crate::ArchiveHandle;
use crate::ExtractionConfig;
use crate::ExtractionReport;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;

/// Extracts an archive to the specified output directory.
///
/// The container family is detected from the file signature. The whole
/// index is read and every name validated before the destination is created
/// or anything is written.
///
/// # Arguments
///
/// * `archive_path` - Path to the `.bsa` or `.ba2` file
/// * `output_dir` - Directory where files will be extracted; created if
///   missing
/// * `config` - Limits and overwrite policy
///
/// # Errors
///
/// Returns an error only for problems that affect the whole archive:
/// - the archive cannot be read, or its signature, version or tables are
///   invalid
/// - a name is corrupt or would escape `output_dir`
/// - the archive declares more files than `config` allows
/// - `output_dir` cannot be created
///
/// Failures of individual files are collected in
/// [`ExtractionReport::failures`] and do not stop the other files.
///
/// # Examples
///
/// ```no_run
/// use bsarc_core::ExtractionConfig;
/// use bsarc_core::extract_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let report = extract_archive("Skyrim - Textures0.bsa", "/tmp/output", &config)?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    config: &ExtractionConfig,
) -> Result<ExtractionReport> {
    let mut noop = NoopProgress;
    extract_archive_with_progress(archive_path, output_dir, config, &mut noop)
}

/// Extracts an archive with progress reporting.
///
/// Same as [`extract_archive`] but calls `progress` for every file.
///
/// # Errors
///
/// Same as [`extract_archive`].
///
/// # Examples
///
/// ```no_run
/// use bsarc_core::ExtractionConfig;
/// use bsarc_core::ProgressCallback;
/// use bsarc_core::extract_archive_with_progress;
/// use std::path::Path;
///
/// struct Counter(usize);
///
/// impl ProgressCallback for Counter {
///     fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///     fn on_entry_complete(&mut self, _path: &Path) {
///         self.0 += 1;
///     }
///     fn on_entry_failed(&mut self, _path: &Path, _message: &str) {}
///     fn on_complete(&mut self) {}
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut counter = Counter(0);
/// let report = extract_archive_with_progress(
///     "Fallout4 - Interface.ba2",
///     "/tmp/output",
///     &ExtractionConfig::default(),
///     &mut counter,
/// )?;
/// assert_eq!(counter.0, report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn extract_archive_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    config: &ExtractionConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let start = Instant::now();
    let handle = ArchiveHandle::open(archive_path, config)?;
    let mut report = handle.extract_with_progress(output_dir, config, progress)?;
    report.duration = start.elapsed();
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::Tes3Builder;
    use tempfile::TempDir;

    #[test]
    fn test_extract_archive_tes3() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("morrowind.bsa");
        let bytes = Tes3Builder::new()
            .file(r"meshes\c\a.nif", b"first")
            .file(r"textures\b.dds", b"second")
            .build();
        std::fs::write(&archive, bytes).unwrap();

        let out = temp.path().join("out");
        let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
        assert!(report.success());
        assert_eq!(report.files_extracted, 2);
        assert_eq!(std::fs::read(out.join("meshes/c/a.nif")).unwrap(), b"first");
        assert_eq!(std::fs::read(out.join("textures/b.dds")).unwrap(), b"second");
    }

    #[test]
    fn test_bad_magic_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("not.bsa");
        std::fs::write(&archive, b"PK\x03\x04 definitely a zip").unwrap();
        let out = temp.path().join("out");

        let err = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap_err();
        assert!(err.as_format().is_some());
        assert!(!out.exists());
    }
}
