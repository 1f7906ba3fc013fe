//! Morrowind (TES3) BSA reader.
//!
//! Layout after the version word:
//!
//! ```text
//! u32 hash_offset      relative to the end of the 12-byte header
//! u32 file_count
//! file_count x { u32 size, u32 offset }   offset relative to data start
//! file_count x u32 name_offset            relative to the name block
//! name block (NUL-terminated strings)
//! file_count x u64 hash                   at 12 + hash_offset
//! data                                    at 12 + hash_offset + 8 * file_count
//! ```
//!
//! TES3 archives never compress data.

use std::io::Read;
use std::io::Seek;

use tracing::debug;

use super::ArchiveFormat;
use super::ArchiveHeader;
use super::ArchiveKind;
use super::DataLayout;
use super::FileRecord;
use super::ParsedIndex;
use crate::Result;
use crate::codec::Codec;
use crate::codec::DataBlock;
use crate::error::FormatError;
use crate::io::ByteReader;
use crate::names::NameTable;
use crate::types::EntryPath;

/// Version word, which doubles as the signature.
pub const VERSION: u32 = 0x100;

const HEADER_LEN: u64 = 12;

/// Reader for Morrowind archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tes3Format;

impl ArchiveFormat for Tes3Format {
    const KIND: ArchiveKind = ArchiveKind::Tes3;

    fn read_index<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<ParsedIndex> {
        let hash_offset = u64::from(reader.read_u32("tes3 header")?);
        let file_count = reader.read_u32("tes3 header")?;
        let count = u64::from(file_count);

        // size/offset pairs, name offsets and hashes
        reader.ensure_table("tes3 file records", count, 8 + 4 + 8)?;

        let mut sizes = Vec::with_capacity(file_count as usize);
        for _ in 0..file_count {
            let size = reader.read_u32("tes3 file records")?;
            let offset = reader.read_u32("tes3 file records")?;
            sizes.push((size, offset));
        }

        let mut offsets = Vec::with_capacity(file_count as usize);
        for _ in 0..file_count {
            offsets.push(reader.read_u32("tes3 name offsets")?);
        }

        let hash_table = HEADER_LEN + hash_offset;
        let name_len = hash_table.checked_sub(reader.position()).ok_or_else(|| {
            FormatError::InvalidHeader {
                reason: format!("hash table offset {hash_offset} overlaps the record tables"),
            }
        })?;
        let block = reader.read_bytes("tes3 name block", usize::try_from(name_len).unwrap_or(usize::MAX))?;

        reader.ensure_table("tes3 hash table", count, 8)?;
        let mut hashes = Vec::with_capacity(file_count as usize);
        for _ in 0..file_count {
            hashes.push(reader.read_u64("tes3 hash table")?);
        }

        let data_start = reader.position();
        let mut files = Vec::with_capacity(file_count as usize);
        for (index, (&(size, offset), hash)) in sizes.iter().zip(hashes).enumerate() {
            let start = data_start + u64::from(offset);
            reader
                .ensure_range("tes3 file data", start, u64::from(size))
                .inspect_err(|_| debug!(index, start, size, "file data out of bounds"))?;
            files.push(FileRecord {
                hash,
                folder: None,
                blocks: vec![DataBlock::raw(start, size)],
                layout: DataLayout::Plain,
                path: EntryPath::default(),
                fallback_name: format!("{hash:016x}"),
            });
        }

        debug!(files = files.len(), names = block.len(), "read tes3 index");

        Ok(ParsedIndex {
            header: ArchiveHeader {
                kind: Self::KIND,
                version: VERSION,
                codec: Codec::Zlib,
                archive_flags: 0,
                ba2_type: None,
            },
            folders: Vec::new(),
            files,
            names: NameTable::Offsets { block, offsets },
        })
    }
}
