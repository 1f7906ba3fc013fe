//! Fallout 4 / Starfield (BA2) reader.
//!
//! Layout after the `BTDX` signature:
//!
//! ```text
//! u32 version            1, 7, 8 (Fallout 4), 2, 3 (Starfield)
//! [u8; 4] type           GNRL or DX10
//! u32 file_count
//! u64 name_table_offset  0 when the archive has no name table
//! u64 unknown            versions 2 and 3
//! u32 compression        version 3: 3 selects LZ4 block, anything else zlib
//! file records
//! ```
//!
//! `GNRL` records are 36 bytes with one data block each. `DX10` records are
//! a 24-byte texture header followed by `chunk_count` 24-byte chunk records.
//! The name table holds one `u16`-length-prefixed path per file.

use std::io::Read;
use std::io::Seek;

use tracing::debug;

use super::ArchiveFormat;
use super::ArchiveHeader;
use super::ArchiveKind;
use super::Ba2Type;
use super::DataLayout;
use super::FileRecord;
use super::ParsedIndex;
use super::dds::TextureInfo;
use crate::Result;
use crate::codec::Codec;
use crate::codec::DataBlock;
use crate::error::FormatError;
use crate::io::ByteReader;
use crate::names::NameTable;
use crate::types::EntryPath;

/// Versions this reader accepts.
pub const SUPPORTED_VERSIONS: [u32; 5] = [1, 2, 3, 7, 8];

/// Trailing marker of every record.
pub const RECORD_SENTINEL: u32 = 0xBAAD_F00D;

/// Version 3 compression value selecting raw LZ4 blocks.
pub const COMPRESSION_LZ4: u32 = 3;

const GENERAL_RECORD_LEN: u64 = 36;
const TEXTURE_RECORD_LEN: u64 = 24;
const CHUNK_RECORD_LEN: u64 = 24;

/// Reader for BA2 archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ba2Format;

impl ArchiveFormat for Ba2Format {
    const KIND: ArchiveKind = ArchiveKind::Ba2;

    fn read_index<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<ParsedIndex> {
        let version = reader.read_u32("ba2 header")?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(FormatError::UnsupportedVersion { version }.into());
        }

        let tag = reader.read_array::<4>("ba2 header")?;
        let ba2_type = match &tag {
            b"GNRL" => Ba2Type::General,
            b"DX10" => Ba2Type::Texture,
            other => {
                return Err(FormatError::UnsupportedType {
                    tag: String::from_utf8_lossy(other).into_owned(),
                }
                .into());
            }
        };

        let file_count = reader.read_u32("ba2 header")?;
        let name_table_offset = reader.read_u64("ba2 header")?;

        if matches!(version, 2 | 3) {
            reader.skip("ba2 header", 8)?;
        }
        let codec = if version == 3 && reader.read_u32("ba2 header")? == COMPRESSION_LZ4 {
            Codec::Lz4Block
        } else {
            Codec::Zlib
        };

        let files = match ba2_type {
            Ba2Type::General => read_general(reader, file_count)?,
            Ba2Type::Texture => read_textures(reader, file_count)?,
        };

        let names = if name_table_offset == 0 {
            NameTable::Absent
        } else {
            reader.seek_to("ba2 name table", name_table_offset)?;
            NameTable::LengthPrefixed {
                block: reader.read_to_end("ba2 name table")?,
            }
        };

        debug!(version, ?ba2_type, %codec, files = files.len(), "read ba2 index");

        Ok(ParsedIndex {
            header: ArchiveHeader {
                kind: Self::KIND,
                version,
                codec,
                archive_flags: 0,
                ba2_type: Some(ba2_type),
            },
            folders: Vec::new(),
            files,
            names,
        })
    }
}

struct RecordHead {
    name_hash: u32,
    extension: [u8; 4],
    dir_hash: u32,
}

impl RecordHead {
    fn read<R: Read + Seek>(reader: &mut ByteReader<R>, context: &'static str) -> Result<Self> {
        Ok(Self {
            name_hash: reader.read_u32(context)?,
            extension: reader.read_array::<4>(context)?,
            dir_hash: reader.read_u32(context)?,
        })
    }

    fn hash(&self) -> u64 {
        (u64::from(self.dir_hash) << 32) | u64::from(self.name_hash)
    }

    fn fallback_name(&self) -> String {
        let ext: String = self
            .extension
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect();
        if ext.is_empty() {
            format!("{:08x}/{:08x}", self.dir_hash, self.name_hash)
        } else {
            format!("{:08x}/{:08x}.{ext}", self.dir_hash, self.name_hash)
        }
    }
}

fn check_sentinel(index: usize, value: u32) -> Result<()> {
    if value == RECORD_SENTINEL {
        Ok(())
    } else {
        Err(FormatError::InvalidRecord {
            index,
            reason: format!("record sentinel is {value:#010x}"),
        }
        .into())
    }
}

fn read_general<R: Read + Seek>(reader: &mut ByteReader<R>, file_count: u32) -> Result<Vec<FileRecord>> {
    reader.ensure_table("ba2 file records", u64::from(file_count), GENERAL_RECORD_LEN)?;

    let mut files = Vec::with_capacity(file_count as usize);
    for index in 0..file_count as usize {
        let head = RecordHead::read(reader, "ba2 file records")?;
        let _flags = reader.read_u32("ba2 file records")?;
        let offset = reader.read_u64("ba2 file records")?;
        let compressed_size = reader.read_u32("ba2 file records")?;
        let uncompressed_size = reader.read_u32("ba2 file records")?;
        check_sentinel(index, reader.read_u32("ba2 file records")?)?;

        let block = DataBlock {
            offset,
            compressed_size,
            uncompressed_size,
        };
        reader.ensure_range("ba2 file data", offset, u64::from(block.stored_size()))?;

        files.push(FileRecord {
            hash: head.hash(),
            folder: None,
            blocks: vec![block],
            layout: DataLayout::Plain,
            path: EntryPath::default(),
            fallback_name: head.fallback_name(),
        });
    }
    Ok(files)
}

fn read_textures<R: Read + Seek>(reader: &mut ByteReader<R>, file_count: u32) -> Result<Vec<FileRecord>> {
    // Lower bound: every texture has at least one chunk.
    reader.ensure_table(
        "ba2 texture records",
        u64::from(file_count),
        TEXTURE_RECORD_LEN + CHUNK_RECORD_LEN,
    )?;

    let mut files = Vec::with_capacity(file_count as usize);
    for index in 0..file_count as usize {
        let head = RecordHead::read(reader, "ba2 texture records")?;
        let _unknown = reader.read_u8("ba2 texture records")?;
        let chunk_count = reader.read_u8("ba2 texture records")?;
        let _chunk_header_len = reader.read_u16("ba2 texture records")?;
        let height = reader.read_u16("ba2 texture records")?;
        let width = reader.read_u16("ba2 texture records")?;
        let mip_count = reader.read_u8("ba2 texture records")?;
        let dxgi_format = reader.read_u8("ba2 texture records")?;
        let flags = reader.read_u8("ba2 texture records")?;
        let _tile_mode = reader.read_u8("ba2 texture records")?;

        if chunk_count == 0 {
            return Err(FormatError::InvalidRecord {
                index,
                reason: "texture has no chunks".into(),
            }
            .into());
        }

        reader.ensure_table("ba2 texture chunks", u64::from(chunk_count), CHUNK_RECORD_LEN)?;
        let mut blocks = Vec::with_capacity(usize::from(chunk_count));
        for _ in 0..chunk_count {
            let offset = reader.read_u64("ba2 texture chunks")?;
            let compressed_size = reader.read_u32("ba2 texture chunks")?;
            let uncompressed_size = reader.read_u32("ba2 texture chunks")?;
            let _first_mip = reader.read_u16("ba2 texture chunks")?;
            let _last_mip = reader.read_u16("ba2 texture chunks")?;
            check_sentinel(index, reader.read_u32("ba2 texture chunks")?)?;

            let block = DataBlock {
                offset,
                compressed_size,
                uncompressed_size,
            };
            reader.ensure_range("ba2 texture data", offset, u64::from(block.stored_size()))?;
            blocks.push(block);
        }

        files.push(FileRecord {
            hash: head.hash(),
            folder: None,
            blocks,
            layout: DataLayout::Texture(TextureInfo {
                width,
                height,
                mip_count,
                dxgi_format,
                cubemap: flags & 0x1 != 0,
            }),
            path: EntryPath::default(),
            fallback_name: head.fallback_name(),
        });
    }
    Ok(files)
}
