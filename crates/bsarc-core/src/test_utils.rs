//! Test utilities for building archives in memory.
//!
//! The builders write byte-exact TES3, TES4 and BA2 containers so that
//! readers, the extraction engine and the command line can be tested without
//! shipping game data. They can also produce deliberately broken files:
//! wrong declared sizes, garbage compressed streams and hostile names.
//!
//! # Panics
//!
//! All functions in this module may panic on compression errors since they
//! are designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lzzzz::lz4;
use lzzzz::lz4f;

/// zlib-compresses `data`.
#[must_use]
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Compresses `data` into a single LZ4 frame.
#[must_use]
pub fn lz4_frame(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    lz4f::compress_to_vec(data, &mut out, &lz4f::Preferences::default()).unwrap();
    out
}

/// Compresses `data` into a raw LZ4 block.
#[must_use]
pub fn lz4_block(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    lz4::compress_to_vec(data, &mut out, lz4::ACC_LEVEL_DEFAULT).unwrap();
    out
}

/// Bytes that no supported codec accepts.
#[must_use]
pub fn garbage(len: usize) -> Vec<u8> {
    vec![0xFF; len]
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn len32(len: usize) -> u32 {
    u32::try_from(len).unwrap()
}

/// Builder for Morrowind archives.
///
/// # Examples
///
/// ```
/// use bsarc_core::test_utils::Tes3Builder;
///
/// let bytes = Tes3Builder::new().file(r"meshes\a.nif", b"data").build();
/// assert_eq!(&bytes[..4], &[0, 1, 0, 0]);
/// ```
#[derive(Debug, Default)]
pub struct Tes3Builder {
    files: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Tes3Builder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file.
    #[must_use]
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.raw_name_file(name.as_bytes(), data)
    }

    /// Adds a file with a name given as raw bytes.
    #[must_use]
    pub fn raw_name_file(mut self, name: &[u8], data: &[u8]) -> Self {
        self.files.push((name.to_vec(), data.to_vec()));
        self
    }

    /// Serializes the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let count = self.files.len();
        let mut names = Vec::new();
        let mut name_offsets = Vec::with_capacity(count);
        for (name, _) in &self.files {
            name_offsets.push(len32(names.len()));
            names.extend_from_slice(name);
            names.push(0);
        }

        let hash_offset = len32(count * 12 + names.len());
        let mut out = Vec::new();
        push_u32(&mut out, 0x100);
        push_u32(&mut out, hash_offset);
        push_u32(&mut out, len32(count));

        let mut data_offset = 0u32;
        for (_, data) in &self.files {
            push_u32(&mut out, len32(data.len()));
            push_u32(&mut out, data_offset);
            data_offset += len32(data.len());
        }
        for offset in name_offsets {
            push_u32(&mut out, offset);
        }
        out.extend_from_slice(&names);
        for index in 0..count {
            push_u64(&mut out, 0x7E53_0000_0000 + index as u64);
        }
        for (_, data) in &self.files {
            out.extend_from_slice(data);
        }
        out
    }
}

#[derive(Debug)]
enum Payload {
    Data(Vec<u8>),
    Garbage(usize),
}

#[derive(Debug)]
struct Tes4Entry {
    name: Vec<u8>,
    payload: Payload,
    /// `None` follows the archive default.
    packed: Option<bool>,
    /// Overrides the stored original size of packed files.
    declared: Option<u32>,
}

/// Builder for TES4-family archives (versions 103, 104, 105).
///
/// Folders are created in the order their first file is added.
///
/// # Examples
///
/// ```
/// use bsarc_core::test_utils::Tes4Builder;
///
/// let bytes = Tes4Builder::new(105)
///     .compressed(true)
///     .file("textures", "sky.dds", b"pixels")
///     .build();
/// assert_eq!(&bytes[..4], b"BSA\0");
/// ```
#[derive(Debug)]
pub struct Tes4Builder {
    version: u32,
    compressed: bool,
    embedded_names: bool,
    file_names: bool,
    folders: Vec<(Vec<u8>, Vec<Tes4Entry>)>,
}

impl Tes4Builder {
    /// Creates an empty archive of `version`.
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version,
            compressed: false,
            embedded_names: false,
            file_names: true,
            folders: Vec::new(),
        }
    }

    /// Sets the archive-wide compression default.
    #[must_use]
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Prefixes every file's data with its full path.
    #[must_use]
    pub fn embedded_names(mut self, embedded: bool) -> Self {
        self.embedded_names = embedded;
        self
    }

    /// Omits the file name block.
    #[must_use]
    pub fn without_file_names(mut self) -> Self {
        self.file_names = false;
        self
    }

    fn push(mut self, folder: &[u8], entry: Tes4Entry) -> Self {
        match self.folders.iter_mut().find(|(name, _)| name == folder) {
            Some((_, entries)) => entries.push(entry),
            None => self.folders.push((folder.to_vec(), vec![entry])),
        }
        self
    }

    /// Adds a file stored according to the archive default.
    #[must_use]
    pub fn file(self, folder: &str, name: &str, data: &[u8]) -> Self {
        self.push(
            folder.as_bytes(),
            Tes4Entry {
                name: name.as_bytes().to_vec(),
                payload: Payload::Data(data.to_vec()),
                packed: None,
                declared: None,
            },
        )
    }

    /// Adds a file stored uncompressed regardless of the default.
    #[must_use]
    pub fn raw_file(self, folder: &str, name: &str, data: &[u8]) -> Self {
        self.push(
            folder.as_bytes(),
            Tes4Entry {
                name: name.as_bytes().to_vec(),
                payload: Payload::Data(data.to_vec()),
                packed: Some(false),
                declared: None,
            },
        )
    }

    /// Adds a compressed file whose stored original size is `declared`.
    #[must_use]
    pub fn mismatched_file(self, folder: &str, name: &str, data: &[u8], declared: u32) -> Self {
        self.push(
            folder.as_bytes(),
            Tes4Entry {
                name: name.as_bytes().to_vec(),
                payload: Payload::Data(data.to_vec()),
                packed: Some(true),
                declared: Some(declared),
            },
        )
    }

    /// Adds a compressed file whose stream is garbage.
    #[must_use]
    pub fn garbage_file(self, folder: &str, name: &str, declared: u32) -> Self {
        self.push(
            folder.as_bytes(),
            Tes4Entry {
                name: name.as_bytes().to_vec(),
                payload: Payload::Garbage(32),
                packed: Some(true),
                declared: Some(declared),
            },
        )
    }

    /// Adds a file with raw folder and file name bytes.
    #[must_use]
    pub fn raw_name_file(self, folder: &[u8], name: &[u8], data: &[u8]) -> Self {
        self.push(
            folder,
            Tes4Entry {
                name: name.to_vec(),
                payload: Payload::Data(data.to_vec()),
                packed: None,
                declared: None,
            },
        )
    }

    fn encode(&self, folder: &[u8], entry: &Tes4Entry) -> (Vec<u8>, bool) {
        let packed = entry.packed.unwrap_or(self.compressed);
        let mut stored = Vec::new();

        if self.embedded_names {
            let mut path = folder.to_vec();
            path.push(b'\\');
            path.extend_from_slice(&entry.name);
            stored.push(u8::try_from(path.len()).unwrap());
            stored.extend_from_slice(&path);
        }

        match (&entry.payload, packed) {
            (Payload::Data(data), false) => stored.extend_from_slice(data),
            (Payload::Data(data), true) => {
                push_u32(&mut stored, entry.declared.unwrap_or_else(|| len32(data.len())));
                if self.version == 105 {
                    stored.extend_from_slice(&lz4_frame(data));
                } else {
                    stored.extend_from_slice(&zlib(data));
                }
            }
            (Payload::Garbage(len), _) => {
                push_u32(&mut stored, entry.declared.unwrap_or(0));
                stored.extend_from_slice(&garbage(*len));
            }
        }

        (stored, packed != self.compressed)
    }

    /// Serializes the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let folder_record_len = if self.version == 105 { 24 } else { 16 };
        let folder_count = self.folders.len();
        let file_count: usize = self.folders.iter().map(|(_, e)| e.len()).sum();

        let mut flags = 0x1;
        if self.file_names {
            flags |= 0x2;
        }
        if self.compressed {
            flags |= 0x4;
        }
        if self.embedded_names {
            flags |= 0x100;
        }

        let total_folder_name_len: usize = self.folders.iter().map(|(n, _)| n.len() + 1).sum();
        let total_file_name_len: usize = self
            .folders
            .iter()
            .flat_map(|(_, entries)| entries.iter().map(|e| e.name.len() + 1))
            .sum();

        let folder_blocks_start = 36 + folder_count * folder_record_len;
        let folder_blocks_len: usize = self
            .folders
            .iter()
            .map(|(name, entries)| 1 + name.len() + 1 + entries.len() * 16)
            .sum();
        let names_len = if self.file_names { total_file_name_len } else { 0 };
        let mut data_offset = folder_blocks_start + folder_blocks_len + names_len;

        let mut out = Vec::new();
        out.extend_from_slice(b"BSA\0");
        push_u32(&mut out, self.version);
        push_u32(&mut out, 36);
        push_u32(&mut out, flags);
        push_u32(&mut out, len32(folder_count));
        push_u32(&mut out, len32(file_count));
        push_u32(&mut out, len32(total_folder_name_len));
        push_u32(&mut out, len32(total_file_name_len));
        push_u32(&mut out, 0);

        let mut block_offset = folder_blocks_start;
        for (index, (name, entries)) in self.folders.iter().enumerate() {
            push_u64(&mut out, 0xF0_0000 + index as u64);
            push_u32(&mut out, len32(entries.len()));
            let offset = (block_offset + total_file_name_len) as u64;
            if self.version == 105 {
                push_u32(&mut out, 0);
                push_u64(&mut out, offset);
            } else {
                push_u32(&mut out, len32(offset as usize));
            }
            block_offset += 1 + name.len() + 1 + entries.len() * 16;
        }

        let mut data = Vec::new();
        let mut hash = 0u64;
        for (folder, entries) in &self.folders {
            out.push(u8::try_from(folder.len() + 1).unwrap());
            out.extend_from_slice(folder);
            out.push(0);
            for entry in entries {
                let (stored, toggle) = self.encode(folder, entry);
                let mut size = len32(stored.len());
                if toggle {
                    size |= 0x4000_0000;
                }
                hash += 1;
                push_u64(&mut out, hash);
                push_u32(&mut out, size);
                push_u32(&mut out, len32(data_offset));
                data_offset += stored.len();
                data.extend_from_slice(&stored);
            }
        }

        if self.file_names {
            for (_, entries) in &self.folders {
                for entry in entries {
                    out.extend_from_slice(&entry.name);
                    out.push(0);
                }
            }
        }

        out.extend_from_slice(&data);
        out
    }
}

/// Texture parameters for [`Ba2Builder::texture`].
#[derive(Debug, Clone, Copy)]
pub struct Ba2Texture {
    width: u16,
    height: u16,
    dxgi_format: u8,
    cubemap: bool,
    compressed: bool,
}

impl Ba2Texture {
    /// A plain 2D texture.
    #[must_use]
    pub fn new(width: u16, height: u16, dxgi_format: u8) -> Self {
        Self {
            width,
            height,
            dxgi_format,
            cubemap: false,
            compressed: false,
        }
    }

    /// Marks the texture as a cube map.
    #[must_use]
    pub fn cubemap(mut self) -> Self {
        self.cubemap = true;
        self
    }

    /// Stores the chunks compressed.
    #[must_use]
    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }
}

#[derive(Debug)]
struct Ba2Chunk {
    stored: Vec<u8>,
    packed: bool,
    unpacked_len: u32,
}

#[derive(Debug)]
enum Ba2Entry {
    General { name: Vec<u8>, chunk: Ba2Chunk },
    Texture { name: Vec<u8>, texture: Ba2Texture, chunks: Vec<Ba2Chunk> },
}

/// Builder for BA2 archives.
///
/// # Examples
///
/// ```
/// use bsarc_core::test_utils::Ba2Builder;
///
/// let bytes = Ba2Builder::general(1).file(r"Meshes\a.nif", b"data").build();
/// assert_eq!(&bytes[..4], b"BTDX");
/// ```
#[derive(Debug)]
pub struct Ba2Builder {
    version: u32,
    textures: bool,
    names: bool,
    entries: Vec<Ba2Entry>,
}

impl Ba2Builder {
    /// A `GNRL` archive of `version`.
    #[must_use]
    pub fn general(version: u32) -> Self {
        Self {
            version,
            textures: false,
            names: true,
            entries: Vec::new(),
        }
    }

    /// A `DX10` archive of `version`.
    #[must_use]
    pub fn textures(version: u32) -> Self {
        Self {
            textures: true,
            ..Self::general(version)
        }
    }

    /// Omits the name table.
    #[must_use]
    pub fn without_names(mut self) -> Self {
        self.names = false;
        self
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        if self.version == 3 {
            lz4_block(data)
        } else {
            zlib(data)
        }
    }

    fn chunk(&self, data: &[u8], packed: bool) -> Ba2Chunk {
        Ba2Chunk {
            stored: if packed { self.compress(data) } else { data.to_vec() },
            packed,
            unpacked_len: len32(data.len()),
        }
    }

    fn general_entry(mut self, name: &[u8], chunk: Ba2Chunk) -> Self {
        self.entries.push(Ba2Entry::General {
            name: name.to_vec(),
            chunk,
        });
        self
    }

    /// Adds an uncompressed general file.
    #[must_use]
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        let chunk = self.chunk(data, false);
        self.general_entry(name.as_bytes(), chunk)
    }

    /// Adds a compressed general file.
    #[must_use]
    pub fn compressed_file(self, name: &str, data: &[u8]) -> Self {
        let chunk = self.chunk(data, true);
        self.general_entry(name.as_bytes(), chunk)
    }

    /// Adds a compressed general file that declares `declared` bytes.
    #[must_use]
    pub fn mismatched_file(self, name: &str, data: &[u8], declared: u32) -> Self {
        let mut chunk = self.chunk(data, true);
        chunk.unpacked_len = declared;
        self.general_entry(name.as_bytes(), chunk)
    }

    /// Adds a compressed general file whose stream is garbage.
    #[must_use]
    pub fn garbage_file(self, name: &str, declared: u32) -> Self {
        let chunk = Ba2Chunk {
            stored: garbage(32),
            packed: true,
            unpacked_len: declared,
        };
        self.general_entry(name.as_bytes(), chunk)
    }

    /// Adds an uncompressed general file with a raw name.
    #[must_use]
    pub fn raw_name_file(self, name: &[u8], data: &[u8]) -> Self {
        let chunk = self.chunk(data, false);
        self.general_entry(name, chunk)
    }

    /// Adds a texture made of `chunks`, in mip order.
    #[must_use]
    pub fn texture(mut self, name: &str, texture: Ba2Texture, chunks: &[&[u8]]) -> Self {
        let chunks = chunks
            .iter()
            .map(|data| self.chunk(data, texture.compressed))
            .collect();
        self.entries.push(Ba2Entry::Texture {
            name: name.as_bytes().to_vec(),
            texture,
            chunks,
        });
        self
    }

    /// Serializes the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut header_len = 24;
        if matches!(self.version, 2 | 3) {
            header_len += 8;
        }
        if self.version == 3 {
            header_len += 4;
        }

        let records_len: usize = self
            .entries
            .iter()
            .map(|entry| match entry {
                Ba2Entry::General { .. } => 36,
                Ba2Entry::Texture { chunks, .. } => 24 + 24 * chunks.len(),
            })
            .sum();

        let mut data_offset = (header_len + records_len) as u64;
        let mut records = Vec::new();
        let mut data = Vec::new();
        let mut names = Vec::new();

        let mut write_chunk = |records: &mut Vec<u8>, chunk: &Ba2Chunk| {
            push_u64(records, data_offset);
            push_u32(records, if chunk.packed { len32(chunk.stored.len()) } else { 0 });
            push_u32(records, chunk.unpacked_len);
            data_offset += chunk.stored.len() as u64;
            data.extend_from_slice(&chunk.stored);
        };

        for (index, entry) in self.entries.iter().enumerate() {
            let name = match entry {
                Ba2Entry::General { name, .. } | Ba2Entry::Texture { name, .. } => name,
            };
            push_u16(&mut names, u16::try_from(name.len()).unwrap());
            names.extend_from_slice(name);

            push_u32(&mut records, 0x1000 + index as u32);
            records.extend_from_slice(&extension(name));
            push_u32(&mut records, 0xD1D1);

            match entry {
                Ba2Entry::General { chunk, .. } => {
                    push_u32(&mut records, 0x0010_0100);
                    write_chunk(&mut records, chunk);
                    push_u32(&mut records, 0xBAAD_F00D);
                }
                Ba2Entry::Texture { texture, chunks, .. } => {
                    records.push(0);
                    records.push(u8::try_from(chunks.len()).unwrap());
                    push_u16(&mut records, 24);
                    push_u16(&mut records, texture.height);
                    push_u16(&mut records, texture.width);
                    records.push(u8::try_from(chunks.len()).unwrap());
                    records.push(texture.dxgi_format);
                    records.push(u8::from(texture.cubemap));
                    records.push(8);
                    for (mip, chunk) in chunks.iter().enumerate() {
                        write_chunk(&mut records, chunk);
                        push_u16(&mut records, mip as u16);
                        push_u16(&mut records, mip as u16);
                        push_u32(&mut records, 0xBAAD_F00D);
                    }
                }
            }
        }

        let name_table_offset = if self.names { data_offset } else { 0 };

        let mut out = Vec::new();
        out.extend_from_slice(b"BTDX");
        push_u32(&mut out, self.version);
        out.extend_from_slice(if self.textures { b"DX10" } else { b"GNRL" });
        push_u32(&mut out, len32(self.entries.len()));
        push_u64(&mut out, name_table_offset);
        if matches!(self.version, 2 | 3) {
            push_u64(&mut out, 0);
        }
        if self.version == 3 {
            push_u32(&mut out, 3);
        }

        out.extend_from_slice(&records);
        out.extend_from_slice(&data);
        if self.names {
            out.extend_from_slice(&names);
        }
        out
    }
}

fn extension(name: &[u8]) -> [u8; 4] {
    let mut ext = [0u8; 4];
    if let Some(dot) = name.iter().rposition(|&b| b == b'.') {
        for (slot, &b) in ext.iter_mut().zip(&name[dot + 1..]) {
            *slot = b.to_ascii_lowercase();
        }
    }
    ext
}
