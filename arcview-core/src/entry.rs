//! Archive entry metadata.
//!
//! This module defines [`EntryRecord`], the immutable description of one item
//! inside an archive, together with the normalized [`FileMode`] bit-set every
//! format handler maps its native type/permission encoding onto.

use std::fmt;
use std::path::{Component, Path};
use std::time::SystemTime;

/// Unix-style `st_mode` bits, the common encoding for entry type and permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileMode(u32);

impl FileMode {
    /// Mask selecting the file type bits.
    pub const TYPE_MASK: u32 = 0o170000;
    /// Socket.
    pub const SOCKET: u32 = 0o140000;
    /// Symbolic link.
    pub const SYMLINK: u32 = 0o120000;
    /// Regular file.
    pub const REGULAR: u32 = 0o100000;
    /// Block device.
    pub const BLOCK_DEVICE: u32 = 0o060000;
    /// Directory.
    pub const DIRECTORY: u32 = 0o040000;
    /// Character device.
    pub const CHAR_DEVICE: u32 = 0o020000;
    /// Named pipe.
    pub const FIFO: u32 = 0o010000;

    /// Wrap raw mode bits.
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Mode for a regular file with the given permissions.
    pub const fn regular(permissions: u32) -> Self {
        Self(Self::REGULAR | (permissions & 0o7777))
    }

    /// Mode for a directory with the given permissions.
    pub const fn directory(permissions: u32) -> Self {
        Self(Self::DIRECTORY | (permissions & 0o7777))
    }

    /// Mode for a symbolic link.
    pub const fn symlink() -> Self {
        Self(Self::SYMLINK | 0o777)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Permission bits (including setuid/setgid/sticky).
    pub const fn permissions(self) -> u32 {
        self.0 & 0o7777
    }

    /// Entry kind encoded in the type bits.
    pub fn kind(self) -> EntryKind {
        match self.0 & Self::TYPE_MASK {
            Self::REGULAR => EntryKind::File,
            Self::DIRECTORY => EntryKind::Directory,
            Self::SYMLINK => EntryKind::Symlink,
            Self::CHAR_DEVICE => EntryKind::CharDevice,
            Self::BLOCK_DEVICE => EntryKind::BlockDevice,
            Self::FIFO => EntryKind::Fifo,
            Self::SOCKET => EntryKind::Socket,
            _ => EntryKind::Unknown,
        }
    }
}

impl fmt::Display for FileMode {
    /// `ls -l` style rendering, e.g. `drwxr-xr-x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_char = match self.kind() {
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::CharDevice => 'c',
            EntryKind::BlockDevice => 'b',
            EntryKind::Fifo => 'p',
            EntryKind::Socket => 's',
            _ => '-',
        };
        let mut s = String::with_capacity(10);
        s.push(type_char);
        for shift in [6u32, 3, 0] {
            let bits = (self.0 >> shift) & 0o7;
            s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&s)
    }
}

/// Entry type (file, directory, symlink, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    /// Regular file.
    #[default]
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Hard link to an earlier entry.
    Hardlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix socket.
    Socket,
    /// Unknown type.
    Unknown,
}

impl EntryKind {
    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }

    /// Whether extracted content of this kind is a byte payload.
    pub fn has_payload(&self) -> bool {
        matches!(self, Self::File | Self::Hardlink)
    }
}

/// An entry in an archive.
///
/// Records are immutable once built: the consuming `with_*` builders are used
/// while a handler parses headers, and later corrections replace the whole
/// record in a new [`EntryTable`](crate::table::EntryTable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    name: String,
    kind: EntryKind,
    size: Option<u64>,
    packed_size: u64,
    mode: FileMode,
    mtime: Option<SystemTime>,
    atime: Option<SystemTime>,
    ctime: Option<SystemTime>,
    link_target: Option<String>,
    header_offset: u64,
    data_offset: u64,
    uid: Option<u32>,
    gid: Option<u32>,
    inode: Option<u64>,
    nlink: Option<u32>,
    device: Option<u32>,
    rdev: Option<u32>,
    checksum: Option<u32>,
    comment: Option<String>,
}

impl EntryRecord {
    /// Create a record whose kind is derived from `mode`.
    pub fn new(name: impl Into<String>, mode: FileMode, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            kind: mode.kind(),
            size,
            packed_size: size.unwrap_or(0),
            mode,
            mtime: None,
            atime: None,
            ctime: None,
            link_target: None,
            header_offset: 0,
            data_offset: 0,
            uid: None,
            gid: None,
            inode: None,
            nlink: None,
            device: None,
            rdev: None,
            checksum: None,
            comment: None,
        }
    }

    /// Create a regular file record.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, FileMode::regular(0o644), Some(size))
    }

    /// Create a directory record.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileMode::directory(0o755), Some(0))
    }

    /// Create a symbolic link record.
    pub fn symlink(name: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        let len = target.len() as u64;
        Self::new(name, FileMode::symlink(), Some(len)).with_link_target(target)
    }

    /// The name/path as stored in the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry kind.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Uncompressed size, `None` when the format defers it.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Bytes the payload occupies in the archive.
    pub fn packed_size(&self) -> u64 {
        self.packed_size
    }

    /// Normalized mode bits.
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Last modification time.
    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Last access time.
    pub fn atime(&self) -> Option<SystemTime> {
        self.atime
    }

    /// Status change / creation time.
    pub fn ctime(&self) -> Option<SystemTime> {
        self.ctime
    }

    /// Symlink target; only present for symbolic links.
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }

    /// Offset of the entry header in the source stream.
    pub fn header_offset(&self) -> u64 {
        self.header_offset
    }

    /// Offset of the entry payload in the source stream.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Owner user id.
    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// Owner group id.
    pub fn gid(&self) -> Option<u32> {
        self.gid
    }

    /// Inode number recorded by the archiver.
    pub fn inode(&self) -> Option<u64> {
        self.inode
    }

    /// Hard link count.
    pub fn nlink(&self) -> Option<u32> {
        self.nlink
    }

    /// Device the file lived on.
    pub fn device(&self) -> Option<u32> {
        self.device
    }

    /// Device number for character/block device entries.
    pub fn rdev(&self) -> Option<u32> {
        self.rdev
    }

    /// Format-native payload checksum.
    pub fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    /// Entry comment.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }

    /// Builder method to override the entry kind.
    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder method to set the size (e.g. once discovered after decoding).
    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    /// Builder method to set the packed size.
    pub fn with_packed_size(mut self, size: u64) -> Self {
        self.packed_size = size;
        self
    }

    /// Builder method to set modification time.
    pub fn with_mtime(mut self, time: SystemTime) -> Self {
        self.mtime = Some(time);
        self
    }

    /// Builder method to set access time.
    pub fn with_atime(mut self, time: SystemTime) -> Self {
        self.atime = Some(time);
        self
    }

    /// Builder method to set change time.
    pub fn with_ctime(mut self, time: SystemTime) -> Self {
        self.ctime = Some(time);
        self
    }

    /// Builder method to set the symlink target.
    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    /// Builder method to set header and payload offsets.
    pub fn with_offsets(mut self, header_offset: u64, data_offset: u64) -> Self {
        self.header_offset = header_offset;
        self.data_offset = data_offset;
        self
    }

    /// Builder method to set ownership.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Builder method to set inode and link count.
    pub fn with_inode(mut self, inode: u64, nlink: u32) -> Self {
        self.inode = Some(inode);
        self.nlink = Some(nlink);
        self
    }

    /// Builder method to set device numbers.
    pub fn with_devices(mut self, device: u32, rdev: u32) -> Self {
        self.device = Some(device);
        self.rdev = Some(rdev);
        self
    }

    /// Builder method to set the format-native checksum.
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Builder method to set comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Validate the entry path for security.
    ///
    /// Returns an error if the path contains potentially dangerous components
    /// like ".." (parent directory traversal) or absolute paths.
    pub fn validate_path(&self) -> crate::error::Result<()> {
        use crate::error::ArcError;

        let path = Path::new(&self.name);

        if path.is_absolute() || self.name.starts_with('/') {
            return Err(ArcError::path_traversal(&self.name));
        }

        for component in path.components() {
            match component {
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(ArcError::path_traversal(&self.name));
                }
                Component::Normal(s) => {
                    if s.to_string_lossy().contains('\0') {
                        return Err(ArcError::path_traversal(&self.name));
                    }
                }
                Component::CurDir => {}
            }
        }

        Ok(())
    }

    /// Get a sanitized path that's safe for extraction.
    ///
    /// This removes dangerous components like ".." and converts absolute
    /// paths to relative ones.
    pub fn sanitized_name(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        for component in Path::new(&self.name).components() {
            if let Component::Normal(s) = component {
                parts.push(s.to_string_lossy().replace('\0', "_"));
            }
        }

        parts.join("/")
    }

    /// Name without a trailing directory separator.
    pub fn trimmed_name(&self) -> &str {
        let trimmed = self.name.trim_end_matches('/');
        if trimmed.is_empty() { &self.name } else { trimmed }
    }
}

impl fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string());
        write!(f, "{} {:>10} {}", self.mode, size, self.name)?;
        if let Some(target) = &self.link_target {
            write!(f, " -> {}", target)?;
        }
        Ok(())
    }
}
