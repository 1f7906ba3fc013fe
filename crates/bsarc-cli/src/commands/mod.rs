//! Subcommand implementations.

pub mod completion;
pub mod extract;
pub mod list;
pub mod scan;
pub mod verify;

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use anyhow::bail;
use bsarc_core::ExtractionConfig;
use bsarc_core::ExtractionReport;
use bsarc_core::NoopProgress;
use bsarc_core::extract_archive_with_progress;
use tracing::info;
use tracing::warn;

use crate::cli::LimitArgs;
use crate::error::add_archive_context;
use crate::error::report_failures;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;

impl LimitArgs {
    /// Builds the engine configuration from command-line limits.
    pub fn config(&self, overwrite: bool) -> ExtractionConfig {
        let defaults = ExtractionConfig::default();
        ExtractionConfig {
            max_file_count: self.max_files,
            max_total_size: self.max_total_size.unwrap_or(defaults.max_total_size),
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            overwrite_existing: overwrite,
            parallel: !self.sequential,
        }
    }
}

/// How a batch of archives is extracted.
pub struct BatchOptions<'a> {
    pub config: ExtractionConfig,
    pub delete_archives: bool,
    pub show_progress: bool,
    pub formatter: &'a dyn OutputFormatter,
}

/// Extracts `archives` one after another.
///
/// `destination` maps each archive to its output directory. A failure in one
/// archive does not stop the others; every failure is printed and the batch
/// fails at the end. Archives are deleted only when all of their files were
/// written.
pub fn extract_batch(
    archives: &[PathBuf],
    destination: impl Fn(&Path) -> PathBuf,
    options: &BatchOptions<'_>,
) -> Result<()> {
    let mut failed = 0usize;

    for archive in archives {
        let dest = destination(archive);
        match extract_one(archive, &dest, options) {
            Ok(()) => {
                if options.delete_archives {
                    fs::remove_file(archive)?;
                    info!(archive = %archive.display(), "deleted archive");
                    options
                        .formatter
                        .format_success(&format!("Deleted {}", archive.display()));
                }
            }
            Err(err) => {
                warn!(archive = %archive.display(), "archive failed");
                options.formatter.format_error(&err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} archives failed", archives.len());
    }
    Ok(())
}

fn extract_one(archive: &Path, dest: &Path, options: &BatchOptions<'_>) -> Result<()> {
    let report = run_with_progress(archive, options.show_progress, |progress| {
        add_archive_context(
            extract_archive_with_progress(archive, dest, &options.config, progress),
            archive,
        )
    })?;

    options.formatter.format_extraction_result(archive, &report)?;
    report_failures(&report, archive)
}

/// Runs `op` with a progress bar when the terminal shows one.
pub fn run_with_progress<F>(archive: &Path, show: bool, op: F) -> Result<ExtractionReport>
where
    F: FnOnce(&mut dyn bsarc_core::ProgressCallback) -> Result<ExtractionReport>,
{
    if show && CliProgress::should_show() {
        let label = archive
            .file_name()
            .map_or_else(|| archive.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mut progress = CliProgress::new(&label);
        op(&mut progress)
    } else {
        op(&mut NoopProgress)
    }
}

/// Whether `dir` is missing or has no entries.
pub fn is_empty_dir(dir: &Path) -> Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err.into()),
    }
}
