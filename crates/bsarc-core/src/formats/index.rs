//! In-memory index produced by the container readers.

use super::ArchiveKind;
use super::dds::TextureInfo;
use crate::codec::Codec;
use crate::codec::DataBlock;
use crate::names::NameTable;
use crate::types::EntryPath;

/// BA2 content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ba2Type {
    /// `GNRL`: arbitrary files, one block each.
    General,
    /// `DX10`: textures split into mip chunks.
    Texture,
}

/// Fields of the archive header the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Container family.
    pub kind: ArchiveKind,
    /// Declared version number (`0x100` for TES3).
    pub version: u32,
    /// Codec used for every compressed block.
    pub codec: Codec,
    /// TES4 archive flags; zero for the other families.
    pub archive_flags: u32,
    /// BA2 content type.
    pub ba2_type: Option<Ba2Type>,
}

/// A TES4 directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    /// Stored 64-bit name hash.
    pub hash: u64,
    /// Number of file records in the folder.
    pub file_count: u32,
    /// Stored offset of the folder's file records. Like the game, this
    /// counts the file name block, so the records actually start
    /// `total_file_name_length` bytes earlier.
    pub offset: u64,
    /// Raw name bytes as stored, without length prefix or terminator.
    pub name: Option<Vec<u8>>,
    /// Resolved path; empty until names are resolved.
    pub path: EntryPath,
}

/// How the stored bytes of a file map to its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// The blocks hold the file contents directly.
    Plain,
    /// TES4 data: an optional embedded name and, when compressed, a `u32`
    /// original size precede the stream. The single block spans all of it.
    Tes4 {
        /// A `u8`-length-prefixed name precedes the data.
        embedded_name: bool,
        /// The data is compressed and starts with its original size.
        compressed: bool,
    },
    /// BA2 texture: a DDS header is synthesized, then every chunk follows.
    Texture(TextureInfo),
}

/// One file in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Stored name hash. BA2 packs the directory hash into the high half.
    pub hash: u64,
    /// Owning folder, for TES4.
    pub folder: Option<usize>,
    /// Stored data, in output order.
    pub blocks: Vec<DataBlock>,
    /// Interpretation of the blocks.
    pub layout: DataLayout,
    /// Resolved path; empty until names are resolved.
    pub path: EntryPath,
    /// Name used when the archive carries no names.
    pub(crate) fallback_name: String,
}

impl FileRecord {
    /// Bytes occupied in the archive.
    #[must_use]
    pub fn stored_size(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.stored_size())).sum()
    }

    /// Decoded size when it is known without touching the data.
    ///
    /// TES4 files only declare their size inside the data (compressed files)
    /// or after an embedded name, so `None` is returned for those.
    #[must_use]
    pub fn declared_size(&self) -> Option<u64> {
        let blocks: u64 = self
            .blocks
            .iter()
            .map(|b| u64::from(b.uncompressed_size))
            .sum();
        match &self.layout {
            DataLayout::Plain => Some(blocks),
            DataLayout::Tes4 {
                embedded_name: false,
                compressed: false,
            } => Some(blocks),
            DataLayout::Tes4 { .. } => None,
            DataLayout::Texture(info) => Some(info.header_len() as u64 + blocks),
        }
    }

    /// Whether any block is compressed.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        match self.layout {
            DataLayout::Tes4 { compressed, .. } => compressed,
            _ => self.blocks.iter().any(DataBlock::is_compressed),
        }
    }
}

/// Everything read from an archive's tables.
#[derive(Debug, Clone)]
pub struct ParsedIndex {
    /// Header fields.
    pub header: ArchiveHeader,
    /// TES4 folders; empty for other families.
    pub folders: Vec<FolderRecord>,
    /// Files in table order.
    pub files: Vec<FileRecord>,
    /// Stored file names, not yet resolved.
    pub names: NameTable,
}
