//! Bounds-checked little-endian reader for archive tables.
//!
//! Every read is checked against the known file length before any bytes are
//! consumed or any buffer is allocated, so a corrupt count or offset surfaces
//! as [`FormatError::Truncated`] instead of a huge allocation or a short read.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::Result;
use crate::error::FormatError;

/// Positioned reader over a seekable source of known length.
///
/// # Examples
///
/// ```
/// use bsarc_core::io::ByteReader;
/// use std::io::Cursor;
///
/// let mut reader = ByteReader::new(Cursor::new(vec![1, 0, 0, 0, 2, 0]))?;
/// assert_eq!(reader.read_u32("value")?, 1);
/// assert_eq!(reader.read_u16("value")?, 2);
/// assert!(reader.read_u8("value").is_err());
/// # Ok::<(), bsarc_core::ExtractionError>(())
/// ```
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> ByteReader<R> {
    /// Wraps `inner`, measuring its length and rewinding to the start.
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    /// Total length of the source in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the source is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current absolute position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left between the position and the end of the source.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Fails unless `needed` bytes remain at the current position.
    pub fn ensure(&self, context: &'static str, needed: u64) -> Result<()> {
        if needed > self.remaining() {
            return Err(FormatError::Truncated {
                context,
                offset: self.pos,
                needed,
                len: self.len,
            }
            .into());
        }
        Ok(())
    }

    /// Fails unless `count` records of `record_size` bytes fit in the
    /// remaining length. Call this before trusting a declared count.
    pub fn ensure_table(&self, context: &'static str, count: u64, record_size: u64) -> Result<()> {
        let needed = count.checked_mul(record_size).unwrap_or(u64::MAX);
        self.ensure(context, needed)
    }

    /// Fails unless the range `[offset, offset + size)` lies inside the source.
    pub fn ensure_range(&self, context: &'static str, offset: u64, size: u64) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(FormatError::Truncated {
                context,
                offset,
                needed: size,
                len: self.len,
            }
            .into()),
        }
    }

    /// Moves to an absolute offset inside the source.
    pub fn seek_to(&mut self, context: &'static str, offset: u64) -> Result<()> {
        self.ensure_range(context, offset, 0)?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Skips `count` bytes.
    pub fn skip(&mut self, context: &'static str, count: u64) -> Result<()> {
        self.ensure(context, count)?;
        let target = self.pos + count;
        self.seek_to(context, target)
    }

    /// Reads exactly `count` bytes into a new buffer.
    pub fn read_bytes(&mut self, context: &'static str, count: usize) -> Result<Vec<u8>> {
        self.ensure(context, count as u64)?;
        let mut buf = vec![0u8; count];
        self.inner.read_exact(&mut buf)?;
        self.pos += count as u64;
        Ok(buf)
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        self.ensure(context, N as u64)?;
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.pos += N as u64;
        Ok(buf)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.read_array::<1>(context)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(context)?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self, context: &'static str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array(context)?))
    }

    /// Reads everything from the current position to the end.
    pub fn read_to_end(&mut self, context: &'static str) -> Result<Vec<u8>> {
        let count = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        self.read_bytes(context, count)
    }
}
