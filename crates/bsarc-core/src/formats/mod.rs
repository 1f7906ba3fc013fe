//! Container readers for the Bethesda archive families.
//!
//! Each reader walks the header and record tables of one family and produces
//! a [`ParsedIndex`]. Readers never decode file data; they only check that
//! every declared range lies inside the file.

pub mod ba2;
pub mod dds;
pub mod detect;
pub mod index;
pub mod tes3;
pub mod tes4;
pub mod traits;

use std::fmt;

pub use detect::ArchiveExtension;
pub use detect::detect_kind;
pub use index::ArchiveHeader;
pub use index::Ba2Type;
pub use index::DataLayout;
pub use index::FileRecord;
pub use index::FolderRecord;
pub use index::ParsedIndex;
pub use traits::ArchiveFormat;

/// Supported container families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Morrowind BSA.
    Tes3,
    /// Oblivion through Skyrim SE BSA (versions 103, 104, 105).
    Tes4,
    /// Fallout 4 / Starfield BA2.
    Ba2,
}

impl ArchiveKind {
    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tes3 => "tes3",
            Self::Tes4 => "tes4",
            Self::Ba2 => "ba2",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
