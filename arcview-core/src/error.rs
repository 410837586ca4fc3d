//! Error types for ArcView operations.
//!
//! A single error enum covers the whole handler contract. Open-time variants
//! (`FormatMismatch`, `Truncated`, `Corrupt`) end work on one archive,
//! `EntryDecodeFailed` ends work on one entry, and `Cancelled` is raised when
//! the observer asks to stop.

use std::io;
use thiserror::Error;

/// Why a single entry could not be decoded or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    /// The stream ended before the entry's payload did.
    #[error("unexpected end of data ({missing} bytes missing)")]
    UnexpectedEnd {
        /// Number of payload bytes that were never read.
        missing: u64,
    },
    /// The payload does not match the checksum stored in the archive.
    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the archive.
        expected: u32,
        /// Checksum computed over the payload.
        computed: u32,
    },
    /// The entry uses a storage method this handler cannot decode.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    /// The underlying stream reported an error.
    #[error("read error: {1}")]
    Io(io::ErrorKind, String),
    /// The sink rejected the data.
    #[error("output error: {0}")]
    Output(String),
}

/// The main error type for ArcView operations.
#[derive(Debug, Error)]
pub enum ArcError {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No signature for this format within the allowed scan bound.
    #[error("Not a {format} archive (scanned {scanned} start positions)")]
    FormatMismatch {
        /// Name of the handler that rejected the stream.
        format: &'static str,
        /// Number of candidate start positions examined.
        scanned: u64,
    },

    /// A signature was found but the headers end early.
    #[error("Truncated archive at offset {offset}: {needed} more bytes needed")]
    Truncated {
        /// Offset where the missing data should begin.
        offset: u64,
        /// Number of bytes that were expected but not available.
        needed: u64,
    },

    /// A signature was found but the headers fail consistency checks.
    #[error("Corrupted archive at offset {offset}: {message}")]
    Corrupt {
        /// Byte offset where the problem was detected.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// One entry could not be extracted or tested.
    #[error("Entry {index} failed: {reason}")]
    EntryDecodeFailed {
        /// Index of the failing entry.
        index: u32,
        /// What went wrong.
        reason: DecodeFailure,
    },

    /// The observer or the host asked to stop.
    #[error("Operation cancelled")]
    Cancelled,

    /// The handler is not in the opened state.
    #[error("Archive is not open")]
    NotOpen,

    /// An entry index is outside the entry table.
    #[error("Entry index {index} out of range (archive has {count} entries)")]
    IndexOutOfRange {
        /// Requested index.
        index: u32,
        /// Number of entries in the table.
        count: u32,
    },

    /// Path traversal attack detected (e.g., "../" in filename).
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The suspicious path.
        path: String,
    },

    /// No handler is registered under the requested name.
    #[error("Unknown archive format: {name}")]
    UnknownFormat {
        /// The requested format name.
        name: String,
    },

    /// A value cannot be represented in the target format.
    #[error("Unsupported: {message}")]
    Unsupported {
        /// Description of the limitation.
        message: String,
    },
}

/// Result type alias for ArcView operations.
pub type Result<T> = std::result::Result<T, ArcError>;

impl ArcError {
    /// Create a format mismatch error.
    pub fn format_mismatch(format: &'static str, scanned: u64) -> Self {
        Self::FormatMismatch { format, scanned }
    }

    /// Create a truncated archive error.
    pub fn truncated(offset: u64, needed: u64) -> Self {
        Self::Truncated { offset, needed }
    }

    /// Create a corrupted archive error.
    pub fn corrupt(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupt {
            offset,
            message: message.into(),
        }
    }

    /// Create a per-entry decode failure.
    pub fn entry_failed(index: u32, reason: DecodeFailure) -> Self {
        Self::EntryDecodeFailed { index, reason }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(index: u32, count: u32) -> Self {
        Self::IndexOutOfRange { index, count }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Create an unknown format error.
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat { name: name.into() }
    }

    /// Create an unsupported value error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// True when the stream simply is not in this handler's format.
    ///
    /// Callers use this to move on to the next candidate handler.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Self::FormatMismatch { .. })
    }

    /// True when the host asked to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the error is scoped to a single entry.
    pub fn is_entry_failure(&self) -> bool {
        matches!(self, Self::EntryDecodeFailed { .. })
    }

    /// The decode failure carried by an entry error, if any.
    pub fn decode_failure(&self) -> Option<&DecodeFailure> {
        match self {
            Self::EntryDecodeFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeFailure {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind(), err.to_string())
    }
}
