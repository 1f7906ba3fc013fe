//! Oblivion through Skyrim SE (TES4) BSA reader.
//!
//! Layout after the `BSA\0` signature:
//!
//! ```text
//! u32 version            103 (Oblivion), 104 (FO3/NV/Skyrim), 105 (Skyrim SE)
//! u32 header_size        36
//! u32 archive_flags
//! u32 folder_count
//! u32 file_count
//! u32 total_folder_name_length
//! u32 total_file_name_length
//! u16 file_flags, u16 padding
//! folder_count x folder record       16 bytes, 24 for version 105
//! folder_count x {                   at offset - total_file_name_length
//!     bzstring name                  when archive_flags & 0x1
//!     file_count x { u64 hash, u32 size, u32 offset }
//! }
//! file name block                    when archive_flags & 0x2
//! ```
//!
//! Bit 30 of a file's size field inverts the archive-wide compression flag
//! for that file. A file's data starts with a `u8`-prefixed copy of its path
//! when names are embedded, followed by a `u32` original size when the file
//! is compressed.

use std::io::Read;
use std::io::Seek;

use tracing::debug;
use tracing::warn;

use super::ArchiveFormat;
use super::ArchiveHeader;
use super::ArchiveKind;
use super::DataLayout;
use super::FileRecord;
use super::FolderRecord;
use super::ParsedIndex;
use crate::Result;
use crate::codec::Codec;
use crate::codec::DataBlock;
use crate::error::FormatError;
use crate::io::ByteReader;
use crate::names::NameTable;
use crate::types::EntryPath;

/// Folder names are stored.
pub const FLAG_DIRECTORY_NAMES: u32 = 0x1;
/// The file name block is stored.
pub const FLAG_FILE_NAMES: u32 = 0x2;
/// Files are compressed unless their size field says otherwise.
pub const FLAG_COMPRESSED: u32 = 0x4;
/// Xbox archive.
pub const FLAG_XBOX: u32 = 0x40;
/// Each file's data starts with its full path.
pub const FLAG_EMBEDDED_NAMES: u32 = 0x100;
/// Xbox archives compressed with XMem instead of zlib.
pub const FLAG_XMEM: u32 = 0x200;

/// Size-field bit that inverts [`FLAG_COMPRESSED`] for one file.
pub const SIZE_COMPRESSION_TOGGLE: u32 = 0x4000_0000;
const SIZE_MASK: u32 = 0x3FFF_FFFF;

/// Versions this reader accepts.
pub const SUPPORTED_VERSIONS: [u32; 3] = [103, 104, 105];

/// Reader for TES4-family archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tes4Format;

impl ArchiveFormat for Tes4Format {
    const KIND: ArchiveKind = ArchiveKind::Tes4;

    fn read_index<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<ParsedIndex> {
        let version = reader.read_u32("tes4 header")?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(FormatError::UnsupportedVersion { version }.into());
        }

        let header_size = reader.read_u32("tes4 header")?;
        let archive_flags = reader.read_u32("tes4 header")?;
        let folder_count = reader.read_u32("tes4 header")?;
        let file_count = reader.read_u32("tes4 header")?;
        let _total_folder_name_len = reader.read_u32("tes4 header")?;
        let total_file_name_len = reader.read_u32("tes4 header")?;
        let _file_flags = reader.read_u32("tes4 header")?;

        reader.seek_to("tes4 folder records", u64::from(header_size))?;

        let record_size = if version == 105 { 24 } else { 16 };
        reader.ensure_table("tes4 folder records", u64::from(folder_count), record_size)?;

        let mut folders = Vec::with_capacity(folder_count as usize);
        for _ in 0..folder_count {
            let hash = reader.read_u64("tes4 folder records")?;
            let count = reader.read_u32("tes4 folder records")?;
            let offset = if version == 105 {
                reader.skip("tes4 folder records", 4)?;
                reader.read_u64("tes4 folder records")?
            } else {
                u64::from(reader.read_u32("tes4 folder records")?)
            };
            folders.push(FolderRecord {
                hash,
                file_count: count,
                offset,
                name: None,
                path: EntryPath::default(),
            });
        }

        let declared: u64 = folders.iter().map(|f| u64::from(f.file_count)).sum();
        if declared != u64::from(file_count) {
            return Err(FormatError::InvalidHeader {
                reason: format!("folders hold {declared} files but header declares {file_count}"),
            }
            .into());
        }

        let default_compressed = archive_flags & FLAG_COMPRESSED != 0;
        let embedded_name = version >= 104 && archive_flags & FLAG_EMBEDDED_NAMES != 0;
        let mut files = Vec::with_capacity(file_count as usize);

        for (folder_index, folder) in folders.iter_mut().enumerate() {
            let start = folder
                .offset
                .checked_sub(u64::from(total_file_name_len))
                .ok_or_else(|| FormatError::InvalidHeader {
                    reason: format!(
                        "folder {folder_index} offset {} is smaller than the file name block",
                        folder.offset
                    ),
                })?;
            reader.seek_to("tes4 folder block", start)?;

            if archive_flags & FLAG_DIRECTORY_NAMES != 0 {
                let len = reader.read_u8("tes4 folder name")?;
                let mut name = reader.read_bytes("tes4 folder name", usize::from(len))?;
                while name.last() == Some(&0) {
                    name.pop();
                }
                folder.name = Some(name);
            }

            reader.ensure_table("tes4 file records", u64::from(folder.file_count), 16)?;
            for _ in 0..folder.file_count {
                let hash = reader.read_u64("tes4 file records")?;
                let size_field = reader.read_u32("tes4 file records")?;
                let offset = u64::from(reader.read_u32("tes4 file records")?);

                let compressed = default_compressed ^ (size_field & SIZE_COMPRESSION_TOGGLE != 0);
                let stored = size_field & SIZE_MASK;
                reader.ensure_range("tes4 file data", offset, u64::from(stored))?;

                let block = if compressed {
                    DataBlock {
                        offset,
                        compressed_size: stored,
                        uncompressed_size: 0,
                    }
                } else {
                    DataBlock::raw(offset, stored)
                };

                files.push(FileRecord {
                    hash,
                    folder: Some(folder_index),
                    blocks: vec![block],
                    layout: DataLayout::Tes4 {
                        embedded_name,
                        compressed,
                    },
                    path: EntryPath::default(),
                    fallback_name: format!("{hash:016x}"),
                });
            }
        }

        let names = if archive_flags & FLAG_FILE_NAMES == 0 {
            NameTable::Absent
        } else {
            let block = reader.read_bytes("tes4 file name block", total_file_name_len as usize)?;
            NameTable::Sequential { block }
        };

        let codec = if archive_flags & FLAG_XBOX != 0 && archive_flags & FLAG_XMEM != 0 {
            warn!("archive uses XMem compression, compressed files will fail");
            Codec::XMem
        } else if version == 105 {
            Codec::Lz4Frame
        } else {
            Codec::Zlib
        };

        debug!(
            version,
            flags = archive_flags,
            folders = folders.len(),
            files = files.len(),
            "read tes4 index"
        );

        Ok(ParsedIndex {
            header: ArchiveHeader {
                kind: Self::KIND,
                version,
                codec,
                archive_flags,
                ba2_type: None,
            },
            folders,
            files,
            names,
        })
    }
}
