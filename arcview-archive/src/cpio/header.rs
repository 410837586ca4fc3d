//! cpio header variants and their encodings.

use arcview_core::error::{ArcError, Result};

/// Name of the end-of-archive marker entry.
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// Magic of the old binary format (written in the archiver's byte order).
pub const BINARY_MAGIC: u16 = 0o070707;

/// Magic of the portable ASCII (odc) format.
pub const ODC_MAGIC: &[u8; 6] = b"070707";

/// Magic of the SVR4 "newc" format.
pub const NEWC_MAGIC: &[u8; 6] = b"070701";

/// Magic of the SVR4 format with payload checksums.
pub const CRC_MAGIC: &[u8; 6] = b"070702";

/// Largest header of any variant.
pub const MAX_HEADER_SIZE: usize = 110;

/// Largest accepted name field, terminating NUL included.
pub const MAX_NAME_SIZE: u32 = 1 << 16;

/// cpio header variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpioFormat {
    /// Old binary format, little-endian words.
    BinaryLe,
    /// Old binary format, big-endian words.
    BinaryBe,
    /// POSIX.1 portable format, octal fields.
    Odc,
    /// SVR4 format, hex fields.
    Newc,
    /// SVR4 format with a byte-sum checksum.
    NewcCrc,
}

impl CpioFormat {
    /// Recognize a variant from the first bytes of a header.
    pub fn from_magic(buf: &[u8]) -> Option<Self> {
        if buf.len() >= 6 {
            match &buf[..6] {
                m if m == ODC_MAGIC => return Some(Self::Odc),
                m if m == NEWC_MAGIC => return Some(Self::Newc),
                m if m == CRC_MAGIC => return Some(Self::NewcCrc),
                _ => {}
            }
        }
        if buf.len() >= 2 {
            if u16::from_le_bytes([buf[0], buf[1]]) == BINARY_MAGIC {
                return Some(Self::BinaryLe);
            }
            if u16::from_be_bytes([buf[0], buf[1]]) == BINARY_MAGIC {
                return Some(Self::BinaryBe);
            }
        }
        None
    }

    /// Parse a variant name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bin" | "bin-le" => Some(Self::BinaryLe),
            "bin-be" => Some(Self::BinaryBe),
            "odc" => Some(Self::Odc),
            "newc" => Some(Self::Newc),
            "crc" => Some(Self::NewcCrc),
            _ => None,
        }
    }

    /// Fixed header length.
    pub fn header_size(self) -> usize {
        match self {
            Self::BinaryLe | Self::BinaryBe => 26,
            Self::Odc => 76,
            Self::Newc | Self::NewcCrc => 110,
        }
    }

    /// Alignment of names and payloads, relative to the archive start.
    pub fn alignment(self) -> u64 {
        match self {
            Self::BinaryLe | Self::BinaryBe => 2,
            Self::Odc => 1,
            Self::Newc | Self::NewcCrc => 4,
        }
    }

    /// Whether entries carry a payload checksum.
    pub fn has_checksum(self) -> bool {
        matches!(self, Self::NewcCrc)
    }

    /// Whether the header is ASCII text rather than packed binary.
    pub fn is_ascii(self) -> bool {
        !matches!(self, Self::BinaryLe | Self::BinaryBe)
    }

    /// Short variant name.
    pub fn name(self) -> &'static str {
        match self {
            Self::BinaryLe => "bin-le",
            Self::BinaryBe => "bin-be",
            Self::Odc => "odc",
            Self::Newc => "newc",
            Self::NewcCrc => "crc",
        }
    }
}

impl std::fmt::Display for CpioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bytes needed to bring `offset` up to a multiple of `align`.
pub fn padding(offset: u64, align: u64) -> u64 {
    (align - offset % align) % align
}

/// A decoded cpio header (without the name that follows it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioHeader {
    /// Variant the header was read from or will be written as.
    pub format: CpioFormat,
    /// Device of the original file.
    pub dev: u32,
    /// Inode of the original file.
    pub inode: u64,
    /// `st_mode` bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Link count.
    pub nlink: u32,
    /// Device number for device nodes.
    pub rdev: u32,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    /// Length of the name field including its NUL.
    pub name_size: u32,
    /// Payload length.
    pub file_size: u64,
    /// Payload byte sum (`NewcCrc` only).
    pub check: u32,
}

impl CpioHeader {
    /// Header for a new entry.
    pub fn new(format: CpioFormat, name: &str, mode: u32, file_size: u64) -> Self {
        Self {
            format,
            dev: 0,
            inode: 0,
            mode,
            uid: 0,
            gid: 0,
            nlink: 1,
            rdev: 0,
            mtime: 0,
            name_size: name.len() as u32 + 1,
            file_size,
            check: 0,
        }
    }

    /// Decode a header; `buf` must hold `format.header_size()` bytes.
    ///
    /// The error string names the offending field.
    pub fn parse(format: CpioFormat, buf: &[u8]) -> std::result::Result<Self, String> {
        if buf.len() < format.header_size() {
            return Err(format!(
                "header needs {} bytes, have {}",
                format.header_size(),
                buf.len()
            ));
        }
        if CpioFormat::from_magic(buf) != Some(format) {
            return Err(format!("missing {} magic", format));
        }

        match format {
            CpioFormat::BinaryLe | CpioFormat::BinaryBe => Ok(Self::parse_binary(format, buf)),
            CpioFormat::Odc => Self::parse_odc(buf),
            CpioFormat::Newc | CpioFormat::NewcCrc => Self::parse_newc(format, buf),
        }
    }

    fn parse_binary(format: CpioFormat, buf: &[u8]) -> Self {
        let word = |i: usize| -> u32 {
            let bytes = [buf[i * 2], buf[i * 2 + 1]];
            u32::from(if format == CpioFormat::BinaryLe {
                u16::from_le_bytes(bytes)
            } else {
                u16::from_be_bytes(bytes)
            })
        };
        // 32-bit values are stored most significant word first.
        let long = |i: usize| -> u32 { (word(i) << 16) | word(i + 1) };

        Self {
            format,
            dev: word(1),
            inode: u64::from(word(2)),
            mode: word(3),
            uid: word(4),
            gid: word(5),
            nlink: word(6),
            rdev: word(7),
            mtime: u64::from(long(8)),
            name_size: word(10),
            file_size: u64::from(long(11)),
            check: 0,
        }
    }

    fn parse_odc(buf: &[u8]) -> std::result::Result<Self, String> {
        let field = |start: usize, len: usize, name: &str| -> std::result::Result<u64, String> {
            parse_number(&buf[start..start + len], 8)
                .ok_or_else(|| format!("invalid octal in {} field", name))
        };

        Ok(Self {
            format: CpioFormat::Odc,
            dev: field(6, 6, "dev")? as u32,
            inode: field(12, 6, "ino")?,
            mode: field(18, 6, "mode")? as u32,
            uid: field(24, 6, "uid")? as u32,
            gid: field(30, 6, "gid")? as u32,
            nlink: field(36, 6, "nlink")? as u32,
            rdev: field(42, 6, "rdev")? as u32,
            mtime: field(48, 11, "mtime")?,
            name_size: field(59, 6, "namesize")? as u32,
            file_size: field(65, 11, "filesize")?,
            check: 0,
        })
    }

    fn parse_newc(format: CpioFormat, buf: &[u8]) -> std::result::Result<Self, String> {
        const NAMES: [&str; 13] = [
            "ino", "mode", "uid", "gid", "nlink", "mtime", "filesize", "devmajor", "devminor",
            "rdevmajor", "rdevminor", "namesize", "check",
        ];
        let mut v = [0u32; 13];
        for (i, slot) in v.iter_mut().enumerate() {
            let start = 6 + i * 8;
            *slot = parse_number(&buf[start..start + 8], 16)
                .ok_or_else(|| format!("invalid hex in {} field", NAMES[i]))?
                as u32;
        }

        Ok(Self {
            format,
            inode: u64::from(v[0]),
            mode: v[1],
            uid: v[2],
            gid: v[3],
            nlink: v[4],
            mtime: u64::from(v[5]),
            file_size: u64::from(v[6]),
            dev: (v[7] << 8) | (v[8] & 0xFF),
            rdev: (v[9] << 8) | (v[10] & 0xFF),
            name_size: v[11],
            check: v[12],
        })
    }

    /// Encode the header bytes (name not included).
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self.format {
            CpioFormat::BinaryLe | CpioFormat::BinaryBe => self.encode_binary(),
            CpioFormat::Odc => self.encode_odc(),
            CpioFormat::Newc | CpioFormat::NewcCrc => self.encode_newc(),
        }
    }

    fn encode_binary(&self) -> Result<Vec<u8>> {
        let small = |value: u64, name: &str| -> Result<u16> {
            u16::try_from(value)
                .map_err(|_| ArcError::unsupported(format!("{} {} exceeds binary cpio", name, value)))
        };
        let large = |value: u64, name: &str| -> Result<[u16; 2]> {
            let v = u32::try_from(value).map_err(|_| {
                ArcError::unsupported(format!("{} {} exceeds binary cpio", name, value))
            })?;
            Ok([(v >> 16) as u16, v as u16])
        };

        let mtime = large(self.mtime, "mtime")?;
        let size = large(self.file_size, "file size")?;
        let words = [
            BINARY_MAGIC,
            small(u64::from(self.dev), "dev")?,
            small(self.inode, "inode")?,
            small(u64::from(self.mode), "mode")?,
            small(u64::from(self.uid), "uid")?,
            small(u64::from(self.gid), "gid")?,
            small(u64::from(self.nlink), "nlink")?,
            small(u64::from(self.rdev), "rdev")?,
            mtime[0],
            mtime[1],
            small(u64::from(self.name_size), "name size")?,
            size[0],
            size[1],
        ];

        let mut out = Vec::with_capacity(26);
        for word in words {
            let bytes = if self.format == CpioFormat::BinaryLe {
                word.to_le_bytes()
            } else {
                word.to_be_bytes()
            };
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    fn encode_odc(&self) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(76);
        out.push_str("070707");
        let fields: [(u64, usize, &str); 10] = [
            (u64::from(self.dev), 6, "dev"),
            (self.inode, 6, "inode"),
            (u64::from(self.mode), 6, "mode"),
            (u64::from(self.uid), 6, "uid"),
            (u64::from(self.gid), 6, "gid"),
            (u64::from(self.nlink), 6, "nlink"),
            (u64::from(self.rdev), 6, "rdev"),
            (self.mtime, 11, "mtime"),
            (u64::from(self.name_size), 6, "name size"),
            (self.file_size, 11, "file size"),
        ];
        for (value, width, name) in fields {
            let text = format!("{:0width$o}", value, width = width);
            if text.len() > width {
                return Err(ArcError::unsupported(format!(
                    "{} {} exceeds odc cpio",
                    name, value
                )));
            }
            out.push_str(&text);
        }
        Ok(out.into_bytes())
    }

    fn encode_newc(&self) -> Result<Vec<u8>> {
        let wide = |value: u64, name: &str| -> Result<u32> {
            u32::try_from(value)
                .map_err(|_| ArcError::unsupported(format!("{} {} exceeds newc cpio", name, value)))
        };

        let magic = if self.format == CpioFormat::NewcCrc {
            CRC_MAGIC
        } else {
            NEWC_MAGIC
        };
        let check = if self.format == CpioFormat::NewcCrc {
            self.check
        } else {
            0
        };
        let fields = [
            wide(self.inode, "inode")?,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            wide(self.mtime, "mtime")?,
            wide(self.file_size, "file size")?,
            self.dev >> 8,
            self.dev & 0xFF,
            self.rdev >> 8,
            self.rdev & 0xFF,
            self.name_size,
            check,
        ];

        let mut out = Vec::with_capacity(110);
        out.extend_from_slice(magic);
        for value in fields {
            out.extend_from_slice(format!("{:08X}", value).as_bytes());
        }
        Ok(out)
    }

    /// Padding between the end of the name and the payload.
    ///
    /// `header_offset` is relative to the archive start.
    pub fn name_padding(&self, header_offset: u64) -> u64 {
        let end = header_offset + self.format.header_size() as u64 + u64::from(self.name_size);
        padding(end, self.format.alignment())
    }

    /// Padding after a payload ending at `data_end` (archive-relative).
    pub fn data_padding(&self, data_end: u64) -> u64 {
        padding(data_end, self.format.alignment())
    }
}

/// Parse a fixed-width ASCII number; every byte must be a digit of `radix`.
fn parse_number(field: &[u8], radix: u32) -> Option<u64> {
    if field.is_empty() {
        return None;
    }
    field.iter().try_fold(0u64, |acc, &b| {
        let digit = char::from(b).to_digit(radix)?;
        acc.checked_mul(u64::from(radix))?.checked_add(u64::from(digit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_magic() {
        assert_eq!(CpioFormat::from_magic(b"070707..."), Some(CpioFormat::Odc));
        assert_eq!(CpioFormat::from_magic(b"070701..."), Some(CpioFormat::Newc));
        assert_eq!(CpioFormat::from_magic(b"070702..."), Some(CpioFormat::NewcCrc));
        assert_eq!(CpioFormat::from_magic(&[0xC7, 0x71]), Some(CpioFormat::BinaryLe));
        assert_eq!(CpioFormat::from_magic(&[0x71, 0xC7]), Some(CpioFormat::BinaryBe));
        assert_eq!(CpioFormat::from_magic(b"070703"), None);
        assert_eq!(CpioFormat::from_magic(b"PK"), None);
        assert_eq!(CpioFormat::from_magic(&[0x71]), None);
        assert!(CpioFormat::Odc.is_ascii());
        assert!(!CpioFormat::BinaryBe.is_ascii());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(b"000644", 8), Some(0o644));
        assert_eq!(parse_number(b"000081A4", 16), Some(0x81A4));
        assert_eq!(parse_number(b"000081a4", 16), Some(0x81A4));
        assert_eq!(parse_number(b"+0000001", 16), None);
        assert_eq!(parse_number(b"00 00644", 8), None);
        assert_eq!(parse_number(b"000009", 8), None);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0, 4), 0);
        assert_eq!(padding(113, 4), 3);
        assert_eq!(padding(116, 4), 0);
        assert_eq!(padding(27, 2), 1);
        assert_eq!(padding(99, 1), 0);
    }

    #[test]
    fn test_newc_encode_parse() {
        let mut header = CpioHeader::new(CpioFormat::NewcCrc, "hello.txt", 0o100644, 13);
        header.inode = 7;
        header.mtime = 1_700_000_000;
        header.uid = 1000;
        header.gid = 100;
        header.check = 0x4D2;

        let bytes = header.encode().unwrap();
        assert_eq!(bytes.len(), 110);
        assert_eq!(&bytes[..6], b"070702");

        let parsed = CpioHeader::parse(CpioFormat::NewcCrc, &bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.name_size, 10);
    }

    #[test]
    fn test_newc_drops_check_without_crc() {
        let mut header = CpioHeader::new(CpioFormat::Newc, "a", 0o100644, 1);
        header.check = 99;
        let bytes = header.encode().unwrap();
        assert_eq!(&bytes[102..110], b"00000000");
    }

    #[test]
    fn test_odc_encode_parse() {
        let mut header = CpioHeader::new(CpioFormat::Odc, "dir", 0o040755, 0);
        header.mtime = 0o14723456700;
        header.nlink = 2;

        let bytes = header.encode().unwrap();
        assert_eq!(bytes.len(), 76);
        let parsed = CpioHeader::parse(CpioFormat::Odc, &bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_odc_field_overflow() {
        let mut header = CpioHeader::new(CpioFormat::Odc, "big", 0o100644, 0);
        header.inode = 0o7777777;
        assert!(matches!(
            header.encode(),
            Err(ArcError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_binary_encode_parse_both_orders() {
        for format in [CpioFormat::BinaryLe, CpioFormat::BinaryBe] {
            let mut header = CpioHeader::new(format, "bin.dat", 0o100600, 70_000);
            header.mtime = 1_600_000_000;
            header.inode = 12;

            let bytes = header.encode().unwrap();
            assert_eq!(bytes.len(), 26);
            assert_eq!(CpioFormat::from_magic(&bytes), Some(format));
            assert_eq!(CpioHeader::parse(format, &bytes).unwrap(), header);
        }
    }

    #[test]
    fn test_parse_rejects_bad_digits() {
        let header = CpioHeader::new(CpioFormat::Newc, "x", 0o100644, 1);
        let mut bytes = header.encode().unwrap();
        bytes[14] = b'G';
        let err = CpioHeader::parse(CpioFormat::Newc, &bytes).unwrap_err();
        assert!(err.contains("mode"));
    }

    #[test]
    fn test_name_and_data_padding() {
        let header = CpioHeader::new(CpioFormat::Newc, "hello.txt", 0o100644, 13);
        // 110 + 10 = 120, already aligned
        assert_eq!(header.name_padding(0), 0);
        // 110 + 10 + 2 = 122 -> 2 bytes of padding
        assert_eq!(header.name_padding(2), 2);
        assert_eq!(header.data_padding(133), 3);

        let header = CpioHeader::new(CpioFormat::BinaryLe, "ab", 0o100644, 3);
        // 26 + 3 = 29 -> 1 byte
        assert_eq!(header.name_padding(0), 1);
    }
}
