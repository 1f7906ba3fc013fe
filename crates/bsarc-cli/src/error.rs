//! Error conversion utilities for CLI.
//!
//! Converts bsarc-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use bsarc_core::ExtractionError;
use bsarc_core::ExtractionReport;
use bsarc_core::error::CodecError;
use bsarc_core::error::FormatError;
use std::fmt::Write;
use std::path::Path;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::Format(FormatError::PathEscape { path }) => {
            anyhow!(
                "Security violation: Archive '{}' contains a name that escapes the destination: '{}'\n\
                 HINT: This archive may be malicious. Nothing was extracted.",
                archive.display(),
                path
            )
        }
        ExtractionError::Format(FormatError::BadMagic { found }) => {
            anyhow!(
                "Not a Bethesda archive: '{}' (signature {:02x?})\n\
                 HINT: Supported formats: Morrowind BSA, Oblivion through Skyrim SE BSA, Fallout 4/Starfield BA2",
                archive.display(),
                found
            )
        }
        ExtractionError::Format(FormatError::UnsupportedVersion { version }) => {
            anyhow!(
                "Archive version {} in '{}' is not supported\n\
                 HINT: Supported versions: BSA 103, 104, 105 and BA2 1, 2, 3, 7, 8.",
                version,
                archive.display()
            )
        }
        ExtractionError::Format(format_err) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or truncated.",
                archive.display(),
                format_err
            )
        }
        ExtractionError::QuotaExceeded { resource } => {
            anyhow!(
                "Extraction limit exceeded for '{}': {}\n\
                 HINT: Raise --max-files, --max-total-size or --max-file-size if the archive is trusted.",
                archive.display(),
                resource
            )
        }
        ExtractionError::Destination { path, source } => {
            anyhow!(
                "Cannot use output directory '{}': {}\n\
                 HINT: Check that the directory is writable.",
                path.display(),
                source
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        ExtractionError::Codec(CodecError::Unsupported { name }) => {
            anyhow!(
                "Archive '{}' uses the {} codec, which is not supported\n\
                 HINT: Console (Xbox 360) archives cannot be extracted.",
                archive.display(),
                name
            )
        }
        ExtractionError::Codec(_) => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}

/// Turns a report with failed files into an error naming every one of them.
pub fn report_failures(report: &ExtractionReport, archive: &Path) -> anyhow::Result<()> {
    if report.success() {
        return Ok(());
    }

    let mut message = format!(
        "{} of {} files in '{}' failed:",
        report.files_failed(),
        report.files_total,
        archive.display()
    );
    for failure in &report.failures {
        let _ = write!(message, "\n  {failure}");
    }
    message.push_str("\nHINT: The archive may be damaged. The files listed above were skipped and the archive was kept.");
    Err(anyhow!(message))
}
