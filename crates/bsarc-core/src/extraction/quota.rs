//! Extraction quota tracking and validation.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::ExtractionConfig;
use crate::ExtractionError;
use crate::Result;
use crate::error::QuotaResource;

/// Tracks decoded bytes across all files of one extraction.
///
/// Shared by reference between worker threads. Each file reserves its
/// declared size before any byte is decoded, so the total limit holds no
/// matter how files are scheduled.
#[derive(Debug)]
pub struct QuotaTracker {
    max_file_size: u64,
    max_total_size: u64,
    reserved: AtomicU64,
}

impl QuotaTracker {
    /// Creates a tracker enforcing the limits in `config`.
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_total_size: config.max_total_size,
            reserved: AtomicU64::new(0),
        }
    }

    /// Creates a tracker without limits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_file_size: u64::MAX,
            max_total_size: u64::MAX,
            reserved: AtomicU64::new(0),
        }
    }

    /// Checks the file count declared by an archive.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::QuotaExceeded`] if `count` exceeds the limit.
    pub fn check_file_count(count: usize, config: &ExtractionConfig) -> Result<()> {
        if count > config.max_file_count {
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::FileCount {
                    current: count,
                    max: config.max_file_count,
                },
            });
        }
        Ok(())
    }

    /// Reserves `size` bytes for one file.
    ///
    /// A refused reservation is not counted.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::QuotaExceeded`] if the file alone is larger
    /// than the per-file limit or the running total would pass the total
    /// limit.
    pub fn reserve(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::FileSize {
                    size,
                    max: self.max_file_size,
                },
            });
        }

        let current = self
            .reserved
            .fetch_add(size, Ordering::Relaxed)
            .saturating_add(size);
        if current > self.max_total_size {
            self.reserved.fetch_sub(size, Ordering::Relaxed);
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::TotalSize {
                    current,
                    max: self.max_total_size,
                },
            });
        }

        Ok(())
    }

    /// Bytes reserved so far.
    #[must_use]
    pub fn reserved(&self) -> u64 {
        self.reserved.load(Ordering::Relaxed)
    }
}
