//! Common trait for the container readers.

use std::io::Read;
use std::io::Seek;

use super::ArchiveKind;
use super::ParsedIndex;
use crate::Result;
use crate::io::ByteReader;

/// A reader for one archive family.
///
/// Implementations are stateless; [`read_index`](ArchiveFormat::read_index)
/// is called with the reader positioned right after the four-byte signature.
pub trait ArchiveFormat {
    /// Family handled by this reader.
    const KIND: ArchiveKind;

    /// Reads the header and all record tables.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`](crate::error::FormatError) for any structural
    /// problem, or an I/O error from the underlying source.
    fn read_index<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<ParsedIndex>;
}
