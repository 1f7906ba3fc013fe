//! Error types for archive parsing, decoding and extraction.

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::Codec;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Malformed or unsupported archive container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The file does not start with a known BSA/BA2 signature.
    #[error("unrecognized archive signature {found:02x?}")]
    BadMagic {
        /// The first four bytes of the file.
        found: [u8; 4],
    },

    /// The file is shorter than its header or tables declare.
    #[error("archive truncated while reading {context}: need {needed} bytes at offset {offset}, file is {len} bytes")]
    Truncated {
        /// Which structure was being read.
        context: &'static str,
        /// Absolute offset of the read.
        offset: u64,
        /// Bytes required.
        needed: u64,
        /// Total file length.
        len: u64,
    },

    /// The header declares a version this engine cannot read.
    #[error("unsupported archive version {version}")]
    UnsupportedVersion {
        /// Declared version number.
        version: u32,
    },

    /// BA2 archive of a type other than `GNRL` or `DX10`.
    #[error("unsupported BA2 archive type {tag:?}")]
    UnsupportedType {
        /// The four-character type tag.
        tag: String,
    },

    /// Header fields contradict each other.
    #[error("invalid archive header: {reason}")]
    InvalidHeader {
        /// What was wrong.
        reason: String,
    },

    /// A record failed a structural check (sentinel, chunk count, bounds).
    #[error("invalid record {index}: {reason}")]
    InvalidRecord {
        /// Record index in table order.
        index: usize,
        /// What was wrong.
        reason: String,
    },

    /// A name offset or length points outside the string block.
    #[error("name table corrupt: {reason}")]
    NameTableCorrupt {
        /// What was wrong.
        reason: String,
    },

    /// A resolved name would write outside the destination root.
    #[error("archive entry escapes destination: {path}")]
    PathEscape {
        /// The offending name as stored in the archive.
        path: String,
    },
}

/// Decompression failure for a single data block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Decoded length differs from the declared uncompressed size.
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Declared uncompressed size.
        expected: u64,
        /// Bytes actually produced (may stop early once over the limit).
        actual: u64,
    },

    /// The codec rejected the stream.
    #[error("corrupt {codec} stream: {reason}")]
    CorruptStream {
        /// Codec that failed.
        codec: Codec,
        /// Codec-reported reason.
        reason: String,
    },

    /// The archive uses a codec this engine does not implement.
    #[error("unsupported codec: {name}")]
    Unsupported {
        /// Codec name.
        name: &'static str,
    },
}

/// Represents a specific quota resource that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResource {
    /// File count quota exceeded.
    FileCount {
        /// Declared file count.
        current: usize,
        /// Maximum allowed file count.
        max: usize,
    },
    /// Total size quota exceeded.
    TotalSize {
        /// Bytes written so far including this file.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single file size quota exceeded.
    FileSize {
        /// File size in bytes.
        size: u64,
        /// Maximum allowed file size in bytes.
        max: u64,
    },
}

impl std::fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileCount { current, max } => {
                write!(f, "quota exceeded: file count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "quota exceeded: total size ({current} > {max})")
            }
            Self::FileSize { size, max } => {
                write!(f, "quota exceeded: single file size ({size} > {max})")
            }
        }
    }
}

/// Errors that can occur while opening or extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Malformed or unsupported container.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Decompression failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Extraction quota exceeded.
    #[error("{resource}")]
    QuotaExceeded {
        /// Description of the exceeded resource.
        resource: QuotaResource,
    },

    /// The destination root cannot be created or used.
    #[error("destination {path} unavailable: {source}")]
    Destination {
        /// The destination root.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

/// Coarse classification of an error, used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`ExtractionError::Format`]
    Format,
    /// [`ExtractionError::Codec`]
    Codec,
    /// [`ExtractionError::Io`] and [`ExtractionError::Destination`]
    Io,
    /// [`ExtractionError::QuotaExceeded`]
    Quota,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Format => "format",
            Self::Codec => "codec",
            Self::Io => "io",
            Self::Quota => "quota",
        })
    }
}

impl ExtractionError {
    /// Returns the coarse kind of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use bsarc_core::error::{CodecError, ErrorKind};
    /// use bsarc_core::ExtractionError;
    ///
    /// let err = ExtractionError::from(CodecError::SizeMismatch { expected: 4, actual: 3 });
    /// assert_eq!(err.kind(), ErrorKind::Codec);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::Format,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Io(_) | Self::Destination { .. } => ErrorKind::Io,
            Self::QuotaExceeded { .. } => ErrorKind::Quota,
        }
    }

    /// Returns the format error, if this is one.
    #[must_use]
    pub const fn as_format(&self) -> Option<&FormatError> {
        match self {
            Self::Format(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the codec error, if this is one.
    #[must_use]
    pub const fn as_codec(&self) -> Option<&CodecError> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the quota resource that was exceeded, if applicable.
    #[must_use]
    pub const fn quota_resource(&self) -> Option<&QuotaResource> {
        match self {
            Self::QuotaExceeded { resource } => Some(resource),
            _ => None,
        }
    }

    /// Whether this error concerns the whole archive rather than one file.
    ///
    /// Format errors, an unusable destination and the file-count limit stop
    /// an archive before anything is written. Codec, I/O and size-limit
    /// errors only affect the file being decoded.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Format(_) | Self::Destination { .. } => true,
            Self::QuotaExceeded { resource } => matches!(resource, QuotaResource::FileCount { .. }),
            Self::Codec(_) | Self::Io(_) => false,
        }
    }
}
