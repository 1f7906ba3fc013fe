//! Opened archives.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;

use crate::ExtractionConfig;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::codec::Codec;
use crate::codec::DataBlock;
use crate::codec::decode_block;
use crate::error::FormatError;
use crate::extraction;
use crate::extraction::QuotaTracker;
use crate::formats::ArchiveFormat;
use crate::formats::ArchiveHeader;
use crate::formats::ArchiveKind;
use crate::formats::DataLayout;
use crate::formats::FileRecord;
use crate::formats::FolderRecord;
use crate::formats::ba2::Ba2Format;
use crate::formats::detect_kind;
use crate::formats::tes3::Tes3Format;
use crate::formats::tes4::Tes4Format;
use crate::inspection::ArchiveManifest;
use crate::io::ByteReader;
use crate::names;

/// Read buffer size for archive sources.
pub(crate) const SOURCE_BUFFER_SIZE: usize = 64 * 1024;

/// An archive whose tables have been read and whose names are resolved.
///
/// Opening reads only the header, record tables and name tables. File data
/// is read when a file is decoded, through a source handle owned by the
/// caller, so one handle can be shared by many worker threads.
///
/// # Examples
///
/// ```no_run
/// use bsarc_core::{ArchiveHandle, ExtractionConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let archive = ArchiveHandle::open("Skyrim - Meshes0.bsa", &config)?;
/// for file in archive.files() {
///     println!("{}", file.path);
/// }
/// let report = archive.extract("/tmp/meshes", &config)?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveHandle {
    path: PathBuf,
    header: ArchiveHeader,
    folders: Vec<FolderRecord>,
    files: Vec<FileRecord>,
}

impl ArchiveHandle {
    /// Opens an archive, reads its index and resolves every name.
    ///
    /// Nothing is written. Any name that would escape the destination fails
    /// the whole archive here, before extraction starts.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::Io`](crate::ExtractionError::Io) if the file
    ///   cannot be read
    /// - [`FormatError`] for an unknown signature, unsupported version or
    ///   type, truncated tables, corrupt names or escaping paths
    /// - [`ExtractionError::QuotaExceeded`](crate::ExtractionError::QuotaExceeded)
    ///   if the archive declares more files than allowed
    pub fn open(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = ByteReader::new(BufReader::with_capacity(SOURCE_BUFFER_SIZE, file))?;

        let mut index = match detect_kind(&mut reader)? {
            ArchiveKind::Tes3 => Tes3Format::read_index(&mut reader)?,
            ArchiveKind::Tes4 => Tes4Format::read_index(&mut reader)?,
            ArchiveKind::Ba2 => Ba2Format::read_index(&mut reader)?,
        };

        QuotaTracker::check_file_count(index.files.len(), config)?;
        names::resolve(&mut index)?;

        info!(
            archive = %path.display(),
            kind = %index.header.kind,
            version = index.header.version,
            files = index.files.len(),
            "opened archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            header: index.header,
            folders: index.folders,
            files: index.files,
        })
    }

    /// Path the archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header fields.
    #[must_use]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Container family.
    #[must_use]
    pub fn kind(&self) -> ArchiveKind {
        self.header.kind
    }

    /// Codec used by compressed files.
    #[must_use]
    pub fn codec(&self) -> Codec {
        self.header.codec
    }

    /// TES4 folders, in table order.
    #[must_use]
    pub fn folders(&self) -> &[FolderRecord] {
        &self.folders
    }

    /// Files, in table order.
    #[must_use]
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the archive holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Opens a new read handle on the archive file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open_source(&self) -> Result<BufReader<File>> {
        Ok(BufReader::with_capacity(
            SOURCE_BUFFER_SIZE,
            File::open(&self.path)?,
        ))
    }

    /// Decodes file `index` from `source` into `writer`.
    ///
    /// The file's size is reserved against `quota` before any byte is
    /// decoded. Returns the number of bytes written, including a synthesized
    /// DDS header for BA2 textures.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::QuotaExceeded`](crate::ExtractionError::QuotaExceeded)
    ///   if the file is too large
    /// - [`CodecError`](crate::error::CodecError) if a block fails to decode
    ///   or decodes to the wrong size
    /// - [`FormatError::InvalidRecord`] if a TES4 data prefix does not fit
    /// - I/O errors from `source` or `writer`
    pub fn decode_file<S, W>(
        &self,
        index: usize,
        source: &mut S,
        writer: &mut W,
        buf: &mut [u8],
        quota: &QuotaTracker,
    ) -> Result<u64>
    where
        S: Read + Seek,
        W: Write + ?Sized,
    {
        let record = self.files.get(index).ok_or_else(|| FormatError::InvalidRecord {
            index,
            reason: format!("archive has {} files", self.files.len()),
        })?;
        let codec = self.header.codec;

        match &record.layout {
            DataLayout::Plain => {
                quota.reserve(record.declared_size().unwrap_or_default())?;
                decode_blocks(codec, &record.blocks, source, writer, buf)
            }
            DataLayout::Tes4 {
                embedded_name,
                compressed,
            } => {
                let stored = record.blocks.first().ok_or_else(|| FormatError::InvalidRecord {
                    index,
                    reason: "file has no data block".into(),
                })?;
                let block = tes4_data_block(index, stored, *embedded_name, *compressed, source)?;
                quota.reserve(u64::from(block.uncompressed_size))?;
                decode_blocks(codec, std::slice::from_ref(&block), source, writer, buf)
            }
            DataLayout::Texture(info) => {
                quota.reserve(record.declared_size().unwrap_or_default())?;
                info.write_header(writer)?;
                let body = decode_blocks(codec, &record.blocks, source, writer, buf)?;
                Ok(info.header_len() as u64 + body)
            }
        }
    }

    /// Writes every file under `destination`.
    ///
    /// Per-file failures are collected in the report; the call only fails
    /// when the destination root cannot be created.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Destination`](crate::ExtractionError::Destination)
    /// if the root cannot be created.
    pub fn extract(&self, destination: impl AsRef<Path>, config: &ExtractionConfig) -> Result<ExtractionReport> {
        self.extract_with_progress(destination, config, &mut crate::NoopProgress)
    }

    /// Like [`extract`](Self::extract), reporting progress to `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Destination`](crate::ExtractionError::Destination)
    /// if the root cannot be created.
    pub fn extract_with_progress(
        &self,
        destination: impl AsRef<Path>,
        config: &ExtractionConfig,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let dest = crate::types::DestDir::create(destination)?;
        Ok(extraction::extract(self, &dest, config, progress))
    }

    /// Decodes every file without writing anything.
    #[must_use]
    pub fn verify(&self, config: &ExtractionConfig) -> ExtractionReport {
        extraction::verify(self, config, &mut crate::NoopProgress)
    }

    /// Lists the files with their sizes.
    #[must_use]
    pub fn manifest(&self) -> ArchiveManifest {
        ArchiveManifest::from_handle(self)
    }
}

fn decode_blocks<S, W>(codec: Codec, blocks: &[DataBlock], source: &mut S, writer: &mut W, buf: &mut [u8]) -> Result<u64>
where
    S: Read + Seek,
    W: Write + ?Sized,
{
    let mut total = 0;
    for block in blocks {
        source.seek(SeekFrom::Start(block.offset))?;
        total += decode_block(codec, block, &mut *source, writer, buf)?;
    }
    Ok(total)
}

/// Skips the embedded name and size prefix of TES4 data and returns the
/// block holding the file contents.
fn tes4_data_block<S: Read + Seek>(
    index: usize,
    stored: &DataBlock,
    embedded_name: bool,
    compressed: bool,
    source: &mut S,
) -> Result<DataBlock> {
    source.seek(SeekFrom::Start(stored.offset))?;
    let mut prefix_len = 0u32;

    if embedded_name {
        let mut len = [0u8; 1];
        source.read_exact(&mut len)?;
        source.seek(SeekFrom::Current(i64::from(len[0])))?;
        prefix_len += 1 + u32::from(len[0]);
    }

    let original_size = if compressed {
        let mut size = [0u8; 4];
        source.read_exact(&mut size)?;
        prefix_len += 4;
        Some(u32::from_le_bytes(size))
    } else {
        None
    };

    let remaining = stored
        .stored_size()
        .checked_sub(prefix_len)
        .ok_or_else(|| FormatError::InvalidRecord {
            index,
            reason: format!(
                "stored size {} is smaller than its {prefix_len}-byte prefix",
                stored.stored_size()
            ),
        })?;
    let offset = stored.offset + u64::from(prefix_len);

    Ok(match original_size {
        // An empty stream would read as a raw block of `original_size`
        // bytes, running into whatever follows the record.
        Some(0) if remaining == 0 => DataBlock::raw(offset, 0),
        Some(uncompressed_size) if remaining == 0 => {
            return Err(FormatError::InvalidRecord {
                index,
                reason: format!("compressed data of {uncompressed_size} bytes has an empty stream"),
            }
            .into());
        }
        Some(uncompressed_size) => DataBlock {
            offset,
            compressed_size: remaining,
            uncompressed_size,
        },
        None => DataBlock::raw(offset, remaining),
    })
}
