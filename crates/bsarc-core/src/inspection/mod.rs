//! Archive inspection without extraction.
//!
//! # Examples
//!
//! ```no_run
//! use bsarc_core::ExtractionConfig;
//! use bsarc_core::list_archive;
//! use bsarc_core::verify_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractionConfig::default();
//!
//! let manifest = list_archive("Skyrim - Misc.bsa", &config)?;
//! println!("Archive contains {} files", manifest.total_entries);
//!
//! let report = verify_archive("Skyrim - Misc.bsa", &config)?;
//! if report.success() {
//!     println!("Every file decodes");
//! }
//! # Ok(())
//! # }
//! ```

pub mod list;
pub mod manifest;
pub mod verify;

pub use list::list_archive;
pub use manifest::ArchiveEntry;
pub use manifest::ArchiveManifest;
pub use verify::verify_archive;
pub use verify::verify_archive_with_progress;
