//! Extraction engine for Bethesda game archives.
//!
//! `bsarc-core` reads the three archive families used by Bethesda games and
//! writes their contents to disk:
//!
//! - TES3 `.bsa` (Morrowind)
//! - TES4 `.bsa` versions 103, 104 and 105 (Oblivion, Fallout 3, New Vegas,
//!   Skyrim, Skyrim Special Edition)
//! - `.ba2` general and texture archives (Fallout 4, Starfield)
//!
//! Every stored name is validated before anything is written, so a hostile
//! archive cannot place files outside the destination. Compressed files are
//! decoded with zlib or LZ4 and checked against their declared sizes. A file
//! that fails is reported and skipped; the rest of the archive is still
//! extracted.
//!
//! # Examples
//!
//! ```no_run
//! use bsarc_core::ExtractionConfig;
//! use bsarc_core::extract_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractionConfig::default();
//! let report = extract_archive("Skyrim - Meshes0.bsa", "/output/dir", &config)?;
//! println!("Extracted {} files", report.files_extracted);
//! for failure in &report.failures {
//!     eprintln!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod inspection;
pub mod io;
pub mod names;
pub mod report;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use api::extract_archive;
pub use api::extract_archive_with_progress;
pub use archive::ArchiveHandle;
pub use config::ExtractionConfig;
pub use error::ExtractionError;
pub use error::Result;
pub use formats::ArchiveKind;
pub use inspection::ArchiveEntry;
pub use inspection::ArchiveManifest;
pub use inspection::list_archive;
pub use inspection::verify_archive;
pub use inspection::verify_archive_with_progress;
pub use report::ExtractionReport;
pub use report::FileFailure;
pub use report::NoopProgress;
pub use report::ProgressCallback;

// Re-export types module for easier access
pub use types::DestDir;
pub use types::EntryPath;
