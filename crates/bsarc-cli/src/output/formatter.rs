//! Output formatter trait for CLI results.

use anyhow::Result;
use bsarc_core::ArchiveManifest;
use bsarc_core::ExtractionReport;
use bsarc_core::formats::ArchiveExtension;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the outcome of extracting one archive
    fn format_extraction_result(&self, archive: &Path, report: &ExtractionReport) -> Result<()>;

    /// Format archive listing (short)
    fn format_manifest_short(&self, manifest: &ArchiveManifest) -> Result<()>;

    /// Format archive listing (long)
    fn format_manifest_long(&self, manifest: &ArchiveManifest, human_readable: bool) -> Result<()>;

    /// Format the outcome of verifying one archive
    fn format_verification_report(&self, archive: &Path, report: &ExtractionReport) -> Result<()>;

    /// Format the archives found in a mod directory
    fn format_scan_result(&self, mod_dir: &Path, extension: ArchiveExtension, archives: &[PathBuf]) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);

    /// Format success message
    fn format_success(&self, message: &str);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// Some files failed; the rest were processed.
    Partial,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self::with_status(operation, Status::Success, data)
    }

    pub fn with_status(operation: impl Into<String>, status: Status, data: T) -> Self {
        Self {
            operation: operation.into(),
            status,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
