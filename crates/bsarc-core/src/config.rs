//! Extraction configuration.

/// Limits and policies applied to one extraction call.
///
/// Size limits guard against corrupt or hostile archives declaring huge
/// uncompressed sizes; they are checked before any output is allocated.
///
/// # Examples
///
/// ```
/// use bsarc_core::ExtractionConfig;
///
/// // Use defaults
/// let config = ExtractionConfig::default();
///
/// // Caller has confirmed that existing files may be replaced
/// let custom = ExtractionConfig {
///     overwrite_existing: true,
///     parallel: false,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Maximum size of a single extracted file in bytes.
    pub max_file_size: u64,

    /// Maximum total bytes written for one archive.
    pub max_total_size: u64,

    /// Maximum number of file records an archive may declare.
    pub max_file_count: usize,

    /// Replace files that already exist at the destination.
    ///
    /// When `false`, output files are opened with `create_new` and an
    /// existing file is reported as a per-file I/O failure.
    pub overwrite_existing: bool,

    /// Decode and write files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ExtractionConfig {
    /// Default values:
    /// - `max_file_size`: 4 GiB (the largest size any record can declare)
    /// - `max_total_size`: 64 GiB
    /// - `max_file_count`: 1,000,000
    /// - `overwrite_existing`: false
    /// - `parallel`: true
    fn default() -> Self {
        Self {
            max_file_size: 4 * 1024 * 1024 * 1024,
            max_total_size: 64 * 1024 * 1024 * 1024,
            max_file_count: 1_000_000,
            overwrite_existing: false,
            parallel: true,
        }
    }
}

impl ExtractionConfig {
    /// Configuration for callers that already confirmed the destination.
    ///
    /// Existing files are overwritten; all other limits keep their defaults.
    #[must_use]
    pub fn confirmed() -> Self {
        Self {
            overwrite_existing: true,
            ..Default::default()
        }
    }

    /// Sets the overwrite policy.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// Enables or disables the parallel write loop.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
