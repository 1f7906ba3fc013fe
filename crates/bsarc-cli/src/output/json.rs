//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::Status;
use anyhow::Result;
use bsarc_core::ArchiveManifest;
use bsarc_core::ExtractionReport;
use bsarc_core::formats::ArchiveExtension;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

pub struct JsonFormatter;

#[derive(Serialize)]
struct FailureOutput {
    index: usize,
    path: String,
    kind: String,
    message: String,
}

#[derive(Serialize)]
struct ReportOutput {
    archive: String,
    format: Option<&'static str>,
    files_total: usize,
    files_processed: usize,
    files_failed: usize,
    bytes_written: u64,
    duration_ms: u128,
    failures: Vec<FailureOutput>,
}

impl ReportOutput {
    fn new(archive: &Path, report: &ExtractionReport) -> Self {
        Self {
            archive: archive.display().to_string(),
            format: report.kind.map(|kind| kind.name()),
            files_total: report.files_total,
            files_processed: report.files_extracted,
            files_failed: report.files_failed(),
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
            failures: report
                .failures
                .iter()
                .map(|failure| FailureOutput {
                    index: failure.index,
                    path: failure.path.display().to_string(),
                    kind: failure.kind.to_string(),
                    message: failure.message.clone(),
                })
                .collect(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }

    fn report(operation: &str, archive: &Path, report: &ExtractionReport) -> Result<()> {
        let status = if report.success() {
            Status::Success
        } else {
            Status::Partial
        };
        let output = JsonOutput::with_status(operation, status, ReportOutput::new(archive, report));
        Self::output(&output)
    }

    fn manifest(manifest: &ArchiveManifest, long: bool) -> Result<()> {
        #[derive(Serialize)]
        struct EntryOutput {
            path: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            size: Option<u64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            stored_size: Option<u64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            compressed: Option<bool>,
        }

        #[derive(Serialize)]
        struct ManifestOutput {
            format: &'static str,
            version: u32,
            codec: String,
            total_entries: usize,
            total_size: u64,
            total_stored_size: u64,
            entries: Vec<EntryOutput>,
        }

        let data = ManifestOutput {
            format: manifest.kind.name(),
            version: manifest.version,
            codec: manifest.codec.to_string(),
            total_entries: manifest.total_entries,
            total_size: manifest.total_size,
            total_stored_size: manifest.total_stored_size,
            entries: manifest
                .entries
                .iter()
                .map(|entry| EntryOutput {
                    path: entry.path.display().to_string(),
                    size: if long { entry.size } else { None },
                    stored_size: long.then_some(entry.stored_size),
                    compressed: long.then_some(entry.compressed),
                })
                .collect(),
        };

        Self::output(&JsonOutput::success("list", data))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, archive: &Path, report: &ExtractionReport) -> Result<()> {
        Self::report("extract", archive, report)
    }

    fn format_manifest_short(&self, manifest: &ArchiveManifest) -> Result<()> {
        Self::manifest(manifest, false)
    }

    fn format_manifest_long(&self, manifest: &ArchiveManifest, _human_readable: bool) -> Result<()> {
        Self::manifest(manifest, true)
    }

    fn format_verification_report(&self, archive: &Path, report: &ExtractionReport) -> Result<()> {
        Self::report("verify", archive, report)
    }

    fn format_scan_result(&self, mod_dir: &Path, extension: ArchiveExtension, archives: &[PathBuf]) -> Result<()> {
        #[derive(Serialize)]
        struct ScanOutput {
            mod_dir: String,
            extension: &'static str,
            archives: Vec<String>,
        }

        let data = ScanOutput {
            mod_dir: mod_dir.display().to_string(),
            extension: extension.as_str(),
            archives: archives.iter().map(|a| a.display().to_string()).collect(),
        };
        Self::output(&JsonOutput::success("scan", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("error", format!("{error:#}"));
        let _ = Self::output(&output);
    }

    fn format_success(&self, message: &str) {
        #[derive(Serialize)]
        struct MessageData<'a> {
            message: &'a str,
        }

        let output = JsonOutput::success("message", MessageData { message });
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData<'a> {
            message: &'a str,
        }

        let output = JsonOutput::success("warning", WarningData { message });
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bsarc_core::ArchiveKind;
    use bsarc_core::ExtractionError;
    use bsarc_core::FileFailure;
    use bsarc_core::error::CodecError;

    #[test]
    fn test_report_output_lists_failures() {
        let mut report = ExtractionReport {
            kind: Some(ArchiveKind::Tes4),
            files_total: 3,
            files_extracted: 2,
            bytes_written: 10,
            ..ExtractionReport::default()
        };
        let err = ExtractionError::from(CodecError::SizeMismatch { expected: 8, actual: 5 });
        report.add_failure(FileFailure::new(2, Path::new("c.dds"), &err));

        let json = serde_json::to_value(ReportOutput::new(Path::new("test.bsa"), &report)).unwrap();
        assert_eq!(json["archive"], "test.bsa");
        assert_eq!(json["files_processed"], 2);
        assert_eq!(json["files_failed"], 1);
        assert_eq!(json["failures"][0]["index"], 2);
        assert_eq!(json["failures"][0]["kind"], "codec");
    }

    #[test]
    fn test_status_serialization() {
        let output = JsonOutput::with_status("extract", Status::Partial, 1);
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"status\":\"partial\""));
        assert!(!json.contains("\"error\""));
    }
}
