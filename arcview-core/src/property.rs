//! Typed property access for entries and archives.
//!
//! Hosts ask for metadata by [`PropertyKind`] and get back a
//! [`PropertyValue`]. A kind the format does not carry yields
//! [`PropertyValue::Empty`]; absence is a valid answer, not an error.

use crate::entry::EntryRecord;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-entry metadata kinds.
///
/// Numeric ids are stable; unknown ids round-trip through [`PropertyKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Stored path.
    Path,
    /// Uncompressed size.
    Size,
    /// Size in the archive.
    PackedSize,
    /// Normalized mode bits.
    Mode,
    /// Windows-style attribute word (Unix mode in the high 16 bits).
    Attributes,
    /// Modification time.
    Mtime,
    /// Access time.
    Atime,
    /// Change/creation time.
    Ctime,
    /// Whether the entry is a directory.
    IsDirectory,
    /// Whether the entry is a delete marker.
    IsAnti,
    /// Whether the payload is encrypted.
    Encrypted,
    /// Stored checksum.
    Crc,
    /// Entry comment.
    Comment,
    /// Symlink target.
    SymLink,
    /// Owner user id.
    Uid,
    /// Owner group id.
    Gid,
    /// Inode number.
    Inode,
    /// Hard link count.
    Links,
    /// Header offset in the stream.
    Offset,
    /// A kind this build does not know.
    Other(u32),
}

impl PropertyKind {
    /// All known kinds, in id order.
    pub const ALL: [PropertyKind; 19] = [
        Self::Path,
        Self::Size,
        Self::PackedSize,
        Self::Mode,
        Self::Attributes,
        Self::Mtime,
        Self::Atime,
        Self::Ctime,
        Self::IsDirectory,
        Self::IsAnti,
        Self::Encrypted,
        Self::Crc,
        Self::Comment,
        Self::SymLink,
        Self::Uid,
        Self::Gid,
        Self::Inode,
        Self::Links,
        Self::Offset,
    ];

    /// Stable numeric id.
    pub fn id(self) -> u32 {
        match self {
            Self::Path => 3,
            Self::IsDirectory => 6,
            Self::Size => 7,
            Self::PackedSize => 8,
            Self::Attributes => 9,
            Self::Ctime => 10,
            Self::Atime => 11,
            Self::Mtime => 12,
            Self::Encrypted => 15,
            Self::Crc => 19,
            Self::IsAnti => 21,
            Self::Comment => 28,
            Self::Mode => 53,
            Self::SymLink => 54,
            Self::Uid => 56,
            Self::Gid => 58,
            Self::Inode => 61,
            Self::Links => 62,
            Self::Offset => 64,
            Self::Other(id) => id,
        }
    }

    /// Map a numeric id back to a kind.
    pub fn from_id(id: u32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.id() == id)
            .unwrap_or(Self::Other(id))
    }

    /// Human readable column name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Path => "Path",
            Self::Size => "Size",
            Self::PackedSize => "Packed Size",
            Self::Mode => "Mode",
            Self::Attributes => "Attributes",
            Self::Mtime => "Modified",
            Self::Atime => "Accessed",
            Self::Ctime => "Created",
            Self::IsDirectory => "Folder",
            Self::IsAnti => "Anti",
            Self::Encrypted => "Encrypted",
            Self::Crc => "CRC",
            Self::Comment => "Comment",
            Self::SymLink => "Symbolic Link",
            Self::Uid => "User ID",
            Self::Gid => "Group ID",
            Self::Inode => "iNode",
            Self::Links => "Links",
            Self::Offset => "Offset",
            Self::Other(_) => "Unknown",
        }
    }
}

/// Archive-level metadata kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchivePropertyKind {
    /// Handler name.
    Format,
    /// Format variant.
    Subtype,
    /// Bytes from the archive start to the end of its trailer.
    PhysicalSize,
    /// Offset where the archive starts (stub length).
    Offset,
    /// Bytes taken by headers and padding.
    HeadersSize,
    /// Whether the stream ended before the archive did.
    UnexpectedEnd,
    /// Number of entries.
    EntryCount,
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropertyValue {
    /// The property is not present.
    #[default]
    Empty,
    /// Boolean flag.
    Bool(bool),
    /// 32-bit integer.
    U32(u32),
    /// 64-bit integer.
    U64(u64),
    /// Text.
    String(String),
    /// Timestamp.
    Time(SystemTime),
}

impl PropertyValue {
    /// True for [`PropertyValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, widening `U32`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U32(v) => Some(u64::from(*v)),
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Time value.
    pub fn as_time(&self) -> Option<SystemTime> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Empty)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<SystemTime> for PropertyValue {
    fn from(value: SystemTime) -> Self {
        Self::Time(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "+" } else { "-" }),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Time(t) => match t.duration_since(UNIX_EPOCH) {
                Ok(d) => write!(f, "{}", d.as_secs()),
                Err(_) => f.write_str("-"),
            },
        }
    }
}

impl EntryRecord {
    /// Answer the format-independent properties of this record.
    ///
    /// Handlers call this for everything they do not special-case.
    pub fn property(&self, kind: PropertyKind) -> PropertyValue {
        match kind {
            PropertyKind::Path => self.name().into(),
            PropertyKind::Size => self.size().into(),
            PropertyKind::PackedSize => self.packed_size().into(),
            PropertyKind::Mode => self.mode().bits().into(),
            PropertyKind::Attributes => {
                let dos_dir = if self.is_dir() { 0x10 } else { 0 };
                // FILE_ATTRIBUTE_UNIX_EXTENSION carries the mode in the high word.
                (0x8000 | dos_dir | (self.mode().bits() << 16)).into()
            }
            PropertyKind::Mtime => self.mtime().into(),
            PropertyKind::Atime => self.atime().into(),
            PropertyKind::Ctime => self.ctime().into(),
            PropertyKind::IsDirectory => self.is_dir().into(),
            PropertyKind::IsAnti => false.into(),
            PropertyKind::Encrypted => false.into(),
            PropertyKind::Crc => self.checksum().into(),
            PropertyKind::Comment => self.comment().map(str::to_string).into(),
            PropertyKind::SymLink => self.link_target().map(str::to_string).into(),
            PropertyKind::Uid => self.uid().into(),
            PropertyKind::Gid => self.gid().into(),
            PropertyKind::Inode => self.inode().into(),
            PropertyKind::Links => self.nlink().into(),
            PropertyKind::Offset => self.header_offset().into(),
            PropertyKind::Other(_) => PropertyValue::Empty,
        }
    }
}
