//! Block decompression.
//!
//! Each archive family declares one codec for all of its compressed blocks:
//!
//! | family              | codec          |
//! |---------------------|----------------|
//! | TES4 BSA 103 / 104  | zlib           |
//! | TES4 BSA 105 (SSE)  | LZ4 frame      |
//! | BA2 v1, v2, v7, v8  | zlib           |
//! | BA2 v3              | LZ4 block (when the header says so) |
//!
//! zlib and LZ4 frame blocks are decoded as streams through a fixed buffer;
//! LZ4 blocks carry no framing and are decoded in one shot into a buffer of
//! the declared size. Either way a block stored with `compressed_size == 0`
//! is copied through untouched.

use std::fmt;
use std::io::Read;
use std::io::Write;

use flate2::read::ZlibDecoder;
use lzzzz::lz4;
use lzzzz::lz4f;

use crate::ExtractionError;
use crate::Result;
use crate::error::CodecError;

/// Size of the scratch buffer used for streaming decode.
pub const DECODE_BUFFER_SIZE: usize = 64 * 1024;

/// Most memory reserved up front for a decoded block; beyond this the output
/// grows only as bytes are actually produced.
const MAX_PREALLOC: usize = 1024 * 1024;

/// An LZ4 block cannot expand more than this many times its stored length.
const LZ4_MAX_RATIO: usize = 255;

/// Compression codec declared by an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// zlib-wrapped deflate.
    Zlib,
    /// LZ4 frame format.
    Lz4Frame,
    /// Raw LZ4 block without framing.
    Lz4Block,
    /// Xbox 360 XMem; recognised but not implemented.
    XMem,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zlib => "zlib",
            Self::Lz4Frame => "lz4 frame",
            Self::Lz4Block => "lz4 block",
            Self::XMem => "xmem",
        })
    }
}

/// A contiguous run of stored bytes that decodes to one piece of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock {
    /// Absolute offset of the stored bytes.
    pub offset: u64,
    /// Stored (compressed) length, or 0 when the block is stored raw.
    pub compressed_size: u32,
    /// Declared decoded length.
    pub uncompressed_size: u32,
}

impl DataBlock {
    /// A block stored without compression.
    #[must_use]
    pub const fn raw(offset: u64, size: u32) -> Self {
        Self {
            offset,
            compressed_size: 0,
            uncompressed_size: size,
        }
    }

    /// Whether a codec has to run for this block.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        self.compressed_size != 0
    }

    /// Number of bytes occupied in the archive.
    #[must_use]
    pub const fn stored_size(&self) -> u32 {
        if self.is_compressed() {
            self.compressed_size
        } else {
            self.uncompressed_size
        }
    }
}

/// Decodes a whole block held in memory.
///
/// `raw` must be exactly the stored bytes of `block`.
///
/// # Errors
///
/// - [`CodecError::SizeMismatch`] if the output length differs from the
///   declared uncompressed size
/// - [`CodecError::CorruptStream`] if the codec rejects the input
/// - [`CodecError::Unsupported`] for XMem blocks
///
/// # Examples
///
/// ```
/// use bsarc_core::codec::{decompress, Codec, DataBlock};
///
/// let block = DataBlock::raw(0, 5);
/// assert_eq!(decompress(Codec::Zlib, &block, b"hello")?, b"hello");
/// # Ok::<(), bsarc_core::error::CodecError>(())
/// ```
pub fn decompress(codec: Codec, block: &DataBlock, raw: &[u8]) -> std::result::Result<Vec<u8>, CodecError> {
    let expected = u64::from(block.uncompressed_size);

    if !block.is_compressed() {
        if raw.len() as u64 != expected {
            return Err(CodecError::SizeMismatch {
                expected,
                actual: raw.len() as u64,
            });
        }
        return Ok(raw.to_vec());
    }

    let mut out = Vec::with_capacity((block.uncompressed_size as usize).min(MAX_PREALLOC));
    let mut buf = vec![0u8; DECODE_BUFFER_SIZE];
    match decode_block(codec, block, raw, &mut out, &mut buf) {
        Ok(_) => Ok(out),
        Err(ExtractionError::Codec(err)) => Err(err),
        // Writing into a Vec cannot fail; reads from a slice cannot either.
        Err(other) => Err(CodecError::CorruptStream {
            codec,
            reason: other.to_string(),
        }),
    }
}

/// Decodes one block from `reader` into `writer`.
///
/// `reader` must be positioned at the first stored byte of the block; at
/// most `block.stored_size()` bytes are consumed. Output is written as it is
/// decoded and decoding stops as soon as it overruns the declared size.
///
/// Returns the number of bytes written.
pub fn decode_block<R, W>(
    codec: Codec,
    block: &DataBlock,
    reader: R,
    writer: &mut W,
    buf: &mut [u8],
) -> Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let expected = u64::from(block.uncompressed_size);
    let source = reader.take(u64::from(block.stored_size()));

    if !block.is_compressed() {
        return pump(source, writer, expected, buf, ExtractionError::Io);
    }

    match codec {
        Codec::Zlib => pump(ZlibDecoder::new(source), writer, expected, buf, |e| {
            corrupt(codec, &e)
        }),
        Codec::Lz4Frame => {
            let decoder = lz4f::ReadDecompressor::new(source).map_err(|e| corrupt(codec, &e))?;
            pump(decoder, writer, expected, buf, |e| corrupt(codec, &e))
        }
        Codec::Lz4Block => {
            let mut stored = Vec::with_capacity((block.compressed_size as usize).min(MAX_PREALLOC));
            let mut source = source;
            source.read_to_end(&mut stored)?;
            let decoded = decompress_lz4_block(&stored, block.uncompressed_size as usize)?;
            writer.write_all(&decoded)?;
            Ok(decoded.len() as u64)
        }
        Codec::XMem => Err(CodecError::Unsupported { name: "xmem" }.into()),
    }
}

fn decompress_lz4_block(stored: &[u8], expected: usize) -> std::result::Result<Vec<u8>, CodecError> {
    // A declared size the stored bytes cannot reach fails below either way,
    // as a short decode or an output overrun.
    let reachable = stored.len().saturating_mul(LZ4_MAX_RATIO).saturating_add(LZ4_MAX_RATIO);
    let mut out = vec![0u8; expected.min(reachable)];
    let written = lz4::decompress(stored, &mut out).map_err(|e| corrupt_codec(Codec::Lz4Block, &e))?;
    if written != expected {
        return Err(CodecError::SizeMismatch {
            expected: expected as u64,
            actual: written as u64,
        });
    }
    Ok(out)
}

/// Copies decoded bytes while enforcing the declared size.
fn pump<R, W, F>(mut decoder: R, writer: &mut W, expected: u64, buf: &mut [u8], on_read_error: F) -> Result<u64>
where
    R: Read,
    W: Write + ?Sized,
    F: Fn(std::io::Error) -> ExtractionError,
{
    let mut total: u64 = 0;
    loop {
        let n = match decoder.read(buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(on_read_error(e)),
        };
        total += n as u64;
        if total > expected {
            return Err(CodecError::SizeMismatch {
                expected,
                actual: total,
            }
            .into());
        }
        writer.write_all(&buf[..n])?;
    }

    if total != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: total,
        }
        .into());
    }
    Ok(total)
}

fn corrupt_codec(codec: Codec, err: &dyn fmt::Display) -> CodecError {
    CodecError::CorruptStream {
        codec,
        reason: err.to_string(),
    }
}

fn corrupt(codec: Codec, err: &dyn fmt::Display) -> ExtractionError {
    corrupt_codec(codec, err).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{lz4_block, lz4_frame, zlib};

    fn sample() -> Vec<u8> {
        b"Bethesda archives store meshes, textures and sounds. "
            .iter()
            .copied()
            .cycle()
            .take(10_000)
            .collect()
    }

    fn compressed_block(stored: &[u8], size: usize) -> DataBlock {
        DataBlock {
            offset: 0,
            compressed_size: stored.len() as u32,
            uncompressed_size: size as u32,
        }
    }

    #[test]
    fn test_raw_block_passes_through() {
        let data = b"\x00\x01\x02raw bytes\xff";
        let block = DataBlock::raw(0, data.len() as u32);
        for codec in [Codec::Zlib, Codec::Lz4Frame, Codec::Lz4Block, Codec::XMem] {
            assert_eq!(decompress(codec, &block, data).unwrap(), data);
        }
    }

    #[test]
    fn test_raw_block_length_checked() {
        let block = DataBlock::raw(0, 10);
        let err = decompress(Codec::Zlib, &block, b"short").unwrap_err();
        assert_eq!(
            err,
            CodecError::SizeMismatch {
                expected: 10,
                actual: 5
            }
        );
    }

    #[test]
    fn test_zlib_round_trip() {
        let data = sample();
        let stored = zlib(&data);
        let block = compressed_block(&stored, data.len());
        assert_eq!(decompress(Codec::Zlib, &block, &stored).unwrap(), data);
    }

    #[test]
    fn test_lz4_frame_round_trip() {
        let data = sample();
        let stored = lz4_frame(&data);
        let block = compressed_block(&stored, data.len());
        assert_eq!(decompress(Codec::Lz4Frame, &block, &stored).unwrap(), data);
    }

    #[test]
    fn test_lz4_block_round_trip() {
        let data = sample();
        let stored = lz4_block(&data);
        let block = compressed_block(&stored, data.len());
        assert_eq!(decompress(Codec::Lz4Block, &block, &stored).unwrap(), data);
    }

    #[test]
    fn test_declared_size_too_small() {
        let data = sample();
        let stored = zlib(&data);
        let block = compressed_block(&stored, data.len() - 1);
        let err = decompress(Codec::Zlib, &block, &stored).unwrap_err();
        assert!(matches!(err, CodecError::SizeMismatch { expected, .. } if expected == data.len() as u64 - 1));
    }

    #[test]
    fn test_declared_size_too_large() {
        let data = sample();
        let stored = lz4_frame(&data);
        let block = compressed_block(&stored, data.len() + 7);
        let err = decompress(Codec::Lz4Frame, &block, &stored).unwrap_err();
        assert_eq!(
            err,
            CodecError::SizeMismatch {
                expected: data.len() as u64 + 7,
                actual: data.len() as u64
            }
        );
    }

    #[test]
    fn test_huge_declared_size_is_not_preallocated() {
        let data = b"tiny";
        for (codec, stored) in [
            (Codec::Zlib, zlib(data)),
            (Codec::Lz4Frame, lz4_frame(data)),
            (Codec::Lz4Block, lz4_block(data)),
        ] {
            let block = compressed_block(&stored, u32::MAX as usize);
            let err = decompress(codec, &block, &stored).unwrap_err();
            assert!(
                matches!(err, CodecError::SizeMismatch { expected, actual: 4 } if expected == u64::from(u32::MAX)),
                "{codec}: {err:?}"
            );
        }
    }

    #[test]
    fn test_garbage_is_corrupt_stream() {
        let garbage = [0xFFu8; 64];
        let block = compressed_block(&garbage, 1000);
        let err = decompress(Codec::Zlib, &block, &garbage).unwrap_err();
        assert!(matches!(err, CodecError::CorruptStream { codec: Codec::Zlib, .. }));

        let err = decompress(Codec::Lz4Frame, &block, &garbage).unwrap_err();
        assert!(matches!(err, CodecError::CorruptStream { codec: Codec::Lz4Frame, .. }));
    }

    #[test]
    fn test_xmem_unsupported() {
        let block = compressed_block(&[1, 2, 3], 10);
        let err = decompress(Codec::XMem, &block, &[1, 2, 3]).unwrap_err();
        assert_eq!(err, CodecError::Unsupported { name: "xmem" });
    }

    #[test]
    fn test_decode_block_streams_into_writer() {
        let data = sample();
        let stored = zlib(&data);
        let block = compressed_block(&stored, data.len());
        let mut out = Vec::new();
        let mut buf = vec![0u8; 128];
        // Trailing bytes after the block are left alone.
        let mut source = stored.clone();
        source.extend_from_slice(b"next block");
        let written = decode_block(Codec::Zlib, &block, source.as_slice(), &mut out, &mut buf).unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(out, data);
    }

    #[test]
    fn test_stored_size() {
        let raw = DataBlock::raw(10, 20);
        assert_eq!(raw.stored_size(), 20);
        assert!(!raw.is_compressed());
        let packed = DataBlock {
            offset: 0,
            compressed_size: 5,
            uncompressed_size: 20,
        };
        assert_eq!(packed.stored_size(), 5);
        assert!(packed.is_compressed());
    }
}
