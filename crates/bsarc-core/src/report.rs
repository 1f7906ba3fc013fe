//! Extraction reporting and progress callbacks.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::ExtractionError;
use crate::error::ErrorKind;
use crate::formats::ArchiveKind;

/// One file that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Index of the file record in table order.
    pub index: usize,
    /// Archive-relative path of the file.
    pub path: PathBuf,
    /// Coarse error classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl FileFailure {
    /// Builds a failure record from an error.
    #[must_use]
    pub fn new(index: usize, path: &Path, error: &ExtractionError) -> Self {
        Self {
            index,
            path: path.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Outcome of extracting (or verifying) one archive.
///
/// Created fresh for every call. Per-file failures do not abort the
/// archive; they are collected here in record order.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Container family of the archive, once it was identified.
    pub kind: Option<ArchiveKind>,

    /// Number of files the engine attempted.
    pub files_total: usize,

    /// Number of files written (or decoded, when verifying) successfully.
    pub files_extracted: usize,

    /// Total decoded bytes written.
    pub bytes_written: u64,

    /// Duration of the operation.
    pub duration: Duration,

    /// Failed files, sorted by record index.
    pub failures: Vec<FileFailure>,
}

impl ExtractionReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed file.
    pub fn add_failure(&mut self, failure: FileFailure) {
        self.failures.push(failure);
    }

    /// `true` iff no file failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failure with the lowest record index.
    #[must_use]
    pub fn first_failure(&self) -> Option<&FileFailure> {
        self.failures.iter().min_by_key(|failure| failure.index)
    }

    /// Number of failed files.
    #[must_use]
    pub fn files_failed(&self) -> usize {
        self.failures.len()
    }

    /// One-line summary suitable for logs or a C error buffer.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.first_failure() {
            None => format!(
                "extracted {} of {} files",
                self.files_extracted, self.files_total
            ),
            Some(first) => format!(
                "{} of {} files failed; first: {first}",
                self.files_failed(),
                self.files_total
            ),
        }
    }
}

/// Callback trait for progress reporting during extraction.
///
/// The caller passes an implementation into the engine explicitly; the
/// engine keeps no global subscribers. Calls are serialized even when files
/// are written in parallel, so implementations need `Send` but not `Sync`.
///
/// # Examples
///
/// ```
/// use bsarc_core::ProgressCallback;
/// use std::path::Path;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_entry_start(&mut self, path: &Path, total: usize, current: usize) {
///         println!("{current}/{total}: {}", path.display());
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _path: &Path) {}
///
///     fn on_entry_failed(&mut self, path: &Path, message: &str) {
///         eprintln!("{}: {message}", path.display());
///     }
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called when starting to process a file.
    ///
    /// # Arguments
    ///
    /// * `path` - Archive-relative path of the file
    /// * `total` - Total number of files in the archive
    /// * `current` - Current file number (1-indexed, completion order)
    fn on_entry_start(&mut self, path: &Path, total: usize, current: usize);

    /// Called with the number of decoded bytes written for a file.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called when a file was written successfully.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called when a file failed and was skipped.
    fn on_entry_failed(&mut self, path: &Path, message: &str);

    /// Called once the whole archive has been processed.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_entry_failed(&mut self, _path: &Path, _message: &str) {}

    fn on_complete(&mut self) {}
}
