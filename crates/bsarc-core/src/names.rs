//! Name resolution.
//!
//! Each family stores names differently:
//!
//! - TES3: a NUL-terminated string block addressed by per-file offsets
//! - TES4: `bzstring` folder names inline with the folder blocks, plus a
//!   trailing block of NUL-terminated file names in record order
//! - BA2: an optional table of `u16`-length-prefixed full paths
//!
//! Names are decoded as Windows-1252, the code page the games write, so
//! every byte maps to a character and decoding never fails. Resolved names
//! are validated into [`EntryPath`]s before anything is written.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::error::FormatError;
use crate::formats::ParsedIndex;
use crate::types::EntryPath;

/// Stored file names, as read from the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NameTable {
    /// A string block addressed by one offset per file (TES3).
    Offsets {
        /// Raw string block.
        block: Vec<u8>,
        /// Offset of each file's name inside `block`.
        offsets: Vec<u32>,
    },
    /// NUL-terminated names in record order (TES4).
    Sequential {
        /// Raw string block.
        block: Vec<u8>,
    },
    /// `u16`-length-prefixed names in record order (BA2).
    LengthPrefixed {
        /// Raw table bytes.
        block: Vec<u8>,
    },
    /// The archive carries no file names.
    #[default]
    Absent,
}

impl NameTable {
    /// Splits the table into one raw name per file.
    ///
    /// Returns `Ok(None)` for [`NameTable::Absent`].
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::NameTableCorrupt`] when an offset or length
    /// points outside the block, a name is unterminated, or the table holds
    /// fewer than `count` names.
    pub fn split(&self, count: usize) -> Result<Option<Vec<&[u8]>>, FormatError> {
        let names = match self {
            Self::Absent => return Ok(None),
            Self::Offsets { block, offsets } => {
                if offsets.len() < count {
                    return Err(corrupt(format!(
                        "{} name offsets for {count} files",
                        offsets.len()
                    )));
                }
                offsets[..count]
                    .iter()
                    .enumerate()
                    .map(|(i, &offset)| cstr_at(block, offset as usize, i))
                    .collect::<Result<Vec<_>, _>>()?
            }
            Self::Sequential { block } => {
                let mut names = Vec::with_capacity(count);
                let mut cursor = 0;
                for i in 0..count {
                    let name = cstr_at(block, cursor, i)?;
                    cursor += name.len() + 1;
                    names.push(name);
                }
                names
            }
            Self::LengthPrefixed { block } => {
                let mut names = Vec::with_capacity(count);
                let mut cursor = 0usize;
                for i in 0..count {
                    let len_bytes = block
                        .get(cursor..cursor + 2)
                        .ok_or_else(|| corrupt(format!("name {i} length past end of table")))?;
                    let len = usize::from(u16::from_le_bytes([len_bytes[0], len_bytes[1]]));
                    cursor += 2;
                    let name = block
                        .get(cursor..cursor + len)
                        .ok_or_else(|| corrupt(format!("name {i} runs past end of table")))?;
                    cursor += len;
                    names.push(name);
                }
                names
            }
        };
        Ok(Some(names))
    }
}

/// Decodes raw name bytes as Windows-1252.
#[must_use]
pub fn decode_name(raw: &[u8]) -> Cow<'_, str> {
    WINDOWS_1252.decode_without_bom_handling(raw).0
}

/// Fills in the `path` of every folder and file in `index`.
///
/// Files of a TES4 folder are placed below the folder path. When the archive
/// carries no names, the hash-based fallback name is used instead.
///
/// # Errors
///
/// - [`FormatError::NameTableCorrupt`] if the name table is malformed or a
///   file resolves to an empty path
/// - [`FormatError::PathEscape`] if any name would leave the destination
pub fn resolve(index: &mut ParsedIndex) -> Result<(), FormatError> {
    for folder in &mut index.folders {
        folder.path = match &folder.name {
            Some(raw) => EntryPath::parse(&decode_name(raw))?,
            None => EntryPath::parse(&format!("{:016x}", folder.hash))?,
        };
    }

    let names = index.names.split(index.files.len())?;
    if names.is_none() {
        debug!("archive has no file names; using hash names");
    }

    for (i, file) in index.files.iter_mut().enumerate() {
        let raw = match &names {
            Some(names) => decode_name(names[i]),
            None => Cow::Borrowed(file.fallback_name.as_str()),
        };
        let leaf = EntryPath::parse(&raw)?;
        let path = match file.folder {
            Some(folder) => {
                let parent = index.folders.get(folder).ok_or_else(|| {
                    corrupt(format!("file {i} refers to missing folder {folder}"))
                })?;
                parent.path.join(&leaf)
            }
            None => leaf,
        };
        if path.is_empty() {
            return Err(corrupt(format!("file {i} has an empty name")));
        }
        file.path = path;
    }

    Ok(())
}

fn cstr_at(block: &[u8], start: usize, index: usize) -> Result<&[u8], FormatError> {
    let tail = block
        .get(start..)
        .filter(|tail| !tail.is_empty())
        .ok_or_else(|| corrupt(format!("name {index} offset {start} outside block")))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt(format!("name {index} is not terminated")))?;
    Ok(&tail[..end])
}

fn corrupt(reason: String) -> FormatError {
    FormatError::NameTableCorrupt { reason }
}
