//! Archive verification implementation.

use std::path::Path;

use crate::ArchiveHandle;
use crate::ExtractionConfig;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::extraction;

/// Decodes every file of an archive without writing anything.
///
/// Each file is decompressed and its size checked exactly as during
/// extraction, so the report lists the same failures an extraction would.
///
/// # Errors
///
/// Returns the same errors as [`ArchiveHandle::open`]. Per-file problems are
/// reported in [`ExtractionReport::failures`], not as errors.
///
/// # Examples
///
/// ```no_run
/// use bsarc_core::ExtractionConfig;
/// use bsarc_core::verify_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = verify_archive("Oblivion - Sounds.bsa", &ExtractionConfig::default())?;
/// if !report.success() {
///     for failure in &report.failures {
///         eprintln!("{failure}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn verify_archive<P: AsRef<Path>>(archive_path: P, config: &ExtractionConfig) -> Result<ExtractionReport> {
    verify_archive_with_progress(archive_path, config, &mut crate::NoopProgress)
}

/// Like [`verify_archive`], reporting progress to `progress`.
///
/// # Errors
///
/// Returns the same errors as [`ArchiveHandle::open`].
pub fn verify_archive_with_progress<P: AsRef<Path>>(
    archive_path: P,
    config: &ExtractionConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let handle = ArchiveHandle::open(archive_path, config)?;
    Ok(extraction::verify(&handle, config, progress))
}
