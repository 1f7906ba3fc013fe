//! Archive manifest types.

use std::path::PathBuf;

use crate::ArchiveHandle;
use crate::codec::Codec;
use crate::formats::ArchiveKind;

/// One file as listed from the archive tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Resolved archive-relative path.
    pub path: PathBuf,

    /// Decoded size, when the tables declare it.
    ///
    /// TES4 files that are compressed or carry embedded names only reveal
    /// their size inside the data, so this is `None` for them.
    pub size: Option<u64>,

    /// Bytes occupied in the archive.
    pub stored_size: u64,

    /// Whether any of the file's data is compressed.
    pub compressed: bool,

    /// Stored name hash.
    pub hash: u64,
}

/// Listing of an archive's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveManifest {
    /// Container family.
    pub kind: ArchiveKind,
    /// Declared version.
    pub version: u32,
    /// Codec of compressed files.
    pub codec: Codec,
    /// Number of files.
    pub total_entries: usize,
    /// Sum of all declared sizes.
    pub total_size: u64,
    /// Sum of stored sizes.
    pub total_stored_size: u64,
    /// Files in table order.
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveManifest {
    /// Builds the manifest of an opened archive.
    #[must_use]
    pub fn from_handle(handle: &ArchiveHandle) -> Self {
        let entries: Vec<ArchiveEntry> = handle
            .files()
            .iter()
            .map(|file| ArchiveEntry {
                path: file.path.to_path_buf(),
                size: file.declared_size(),
                stored_size: file.stored_size(),
                compressed: file.is_compressed(),
                hash: file.hash,
            })
            .collect();

        Self {
            kind: handle.kind(),
            version: handle.header().version,
            codec: handle.codec(),
            total_entries: entries.len(),
            total_size: entries.iter().filter_map(|e| e.size).sum(),
            total_stored_size: entries.iter().map(|e| e.stored_size).sum(),
            entries,
        }
    }

    /// Number of files whose size is only known after decoding.
    #[must_use]
    pub fn unknown_sizes(&self) -> usize {
        self.entries.iter().filter(|e| e.size.is_none()).count()
    }
}
