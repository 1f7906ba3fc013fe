//! Archive format detection.

use std::io::Read;
use std::io::Seek;
use std::path::Path;

use super::ArchiveKind;
use crate::Result;
use crate::error::FormatError;
use crate::io::ByteReader;

/// TES3 files start with the version word `0x00000100`.
pub const TES3_MAGIC: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// TES4 signature.
pub const TES4_MAGIC: [u8; 4] = *b"BSA\0";

/// BA2 signature.
pub const BA2_MAGIC: [u8; 4] = *b"BTDX";

/// Identifies the family from the first four bytes, leaving the reader
/// positioned right after them.
///
/// # Errors
///
/// - [`FormatError::Truncated`] if the file is shorter than four bytes
/// - [`FormatError::BadMagic`] for anything else
pub fn detect_kind<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<ArchiveKind> {
    reader.seek_to("signature", 0)?;
    let magic = reader.read_array::<4>("signature")?;
    match magic {
        TES3_MAGIC => Ok(ArchiveKind::Tes3),
        TES4_MAGIC => Ok(ArchiveKind::Tes4),
        BA2_MAGIC => Ok(ArchiveKind::Ba2),
        found => Err(FormatError::BadMagic { found }.into()),
    }
}

/// File extension used by a game's archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveExtension {
    /// `.bsa`
    Bsa,
    /// `.ba2`
    Ba2,
}

impl ArchiveExtension {
    /// Extension without the dot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bsa => "bsa",
            Self::Ba2 => "ba2",
        }
    }

    /// Looks up the archive extension for a game by its display name.
    ///
    /// Matching ignores ASCII case and surrounding whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use bsarc_core::formats::ArchiveExtension;
    ///
    /// assert_eq!(ArchiveExtension::for_game("Skyrim Special Edition"), Some(ArchiveExtension::Bsa));
    /// assert_eq!(ArchiveExtension::for_game("fallout 4"), Some(ArchiveExtension::Ba2));
    /// assert_eq!(ArchiveExtension::for_game("Daggerfall"), None);
    /// ```
    #[must_use]
    pub fn for_game(game: &str) -> Option<Self> {
        const GAMES: &[(&str, ArchiveExtension)] = &[
            ("morrowind", ArchiveExtension::Bsa),
            ("oblivion", ArchiveExtension::Bsa),
            ("fallout 3", ArchiveExtension::Bsa),
            ("new vegas", ArchiveExtension::Bsa),
            ("fallout new vegas", ArchiveExtension::Bsa),
            ("skyrim", ArchiveExtension::Bsa),
            ("skyrim special edition", ArchiveExtension::Bsa),
            ("skyrim vr", ArchiveExtension::Bsa),
            ("enderal", ArchiveExtension::Bsa),
            ("enderal special edition", ArchiveExtension::Bsa),
            ("ttw", ArchiveExtension::Bsa),
            ("fallout 4", ArchiveExtension::Ba2),
            ("fallout 4 vr", ArchiveExtension::Ba2),
        ];

        let game = game.trim();
        GAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(game))
            .map(|&(_, ext)| ext)
    }

    /// Whether `path` carries this extension (case-insensitive).
    #[must_use]
    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.as_str()))
    }

    /// Extension of `path`, if it is an archive extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        [Self::Bsa, Self::Ba2].into_iter().find(|ext| ext.matches(path))
    }
}
