//! cpio archive writer.

use super::header::{CpioFormat, CpioHeader, MAX_NAME_SIZE, TRAILER_NAME};
use arcview_core::entry::FileMode;
use arcview_core::error::{ArcError, Result};
use std::io::Write;

/// cpio archive writer.
///
/// Entries are written in call order. Inode numbers are assigned
/// sequentially from 1; [`finish`](Self::finish) appends the trailer.
pub struct CpioWriter<W: Write> {
    writer: W,
    format: CpioFormat,
    offset: u64,
    next_inode: u64,
    mtime: u64,
    finished: bool,
}

impl<W: Write> CpioWriter<W> {
    /// Create a new writer for the given variant.
    pub fn new(writer: W, format: CpioFormat) -> Self {
        Self {
            writer,
            format,
            offset: 0,
            next_inode: 1,
            mtime: 0,
            finished: false,
        }
    }

    /// Variant being written.
    pub fn format(&self) -> CpioFormat {
        self.format
    }

    /// Modification time (seconds since the epoch) for subsequent entries.
    pub fn set_mtime(&mut self, mtime: u64) {
        self.mtime = mtime;
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    /// Add a file to the archive.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.add_file_with_mode(name, data, 0o644)
    }

    /// Add a file with specific permission bits.
    pub fn add_file_with_mode(&mut self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        let mode = FileMode::regular(mode & 0o7777);
        self.write_entry(name, mode.bits(), 1, data)
    }

    /// Add a directory to the archive.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        self.add_directory_with_mode(name, 0o755)
    }

    /// Add a directory with specific permission bits.
    ///
    /// cpio stores directory names without a trailing slash.
    pub fn add_directory_with_mode(&mut self, name: &str, mode: u32) -> Result<()> {
        let name = name.trim_end_matches('/');
        let mode = FileMode::directory(mode & 0o7777);
        self.write_entry(name, mode.bits(), 2, &[])
    }

    /// Add a symbolic link; the target is stored as the payload.
    pub fn add_symlink(&mut self, name: &str, target: &str) -> Result<()> {
        self.write_entry(name, FileMode::symlink().bits(), 1, target.as_bytes())
    }

    fn write_entry(&mut self, name: &str, mode: u32, nlink: u32, data: &[u8]) -> Result<()> {
        if self.finished {
            return Err(ArcError::unsupported("archive already finished"));
        }
        if name.is_empty() || name == TRAILER_NAME {
            return Err(ArcError::unsupported(format!("invalid entry name {:?}", name)));
        }

        let inode = self.next_inode;
        self.write_record(name, mode, nlink, inode, data)?;
        self.next_inode += 1;
        Ok(())
    }

    fn write_record(
        &mut self,
        name: &str,
        mode: u32,
        nlink: u32,
        inode: u64,
        data: &[u8],
    ) -> Result<()> {
        if name.contains('\0') || name.len() as u64 + 1 > u64::from(MAX_NAME_SIZE) {
            return Err(ArcError::unsupported(format!(
                "name {:?} cannot be stored in cpio",
                name
            )));
        }

        let mut header = CpioHeader::new(self.format, name, mode, data.len() as u64);
        header.inode = inode;
        header.nlink = nlink;
        header.mtime = self.mtime;
        if self.format.has_checksum() {
            header.check = data
                .iter()
                .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)));
        }

        let encoded = header.encode()?;
        let name_padding = header.name_padding(self.offset);
        self.write_bytes(&encoded)?;
        self.write_bytes(name.as_bytes())?;
        self.write_bytes(&[0])?;
        self.write_zeros(name_padding)?;

        self.write_bytes(data)?;
        let data_padding = header.data_padding(self.offset);
        self.write_zeros(data_padding)?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn write_zeros(&mut self, count: u64) -> Result<()> {
        if count > 0 {
            self.write_bytes(&vec![0u8; count as usize])?;
        }
        Ok(())
    }

    /// Finish the archive by writing the trailer entry.
    pub fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.write_record(TRAILER_NAME, 0, 1, 0, &[])?;
            self.writer.flush()?;
            self.finished = true;
        }
        Ok(())
    }

    /// Consume the writer and return the inner writer.
    /// Finishes the archive first.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_single_file_layout() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
        writer.add_file("test.txt", b"Hello").unwrap();
        let data = writer.into_inner().unwrap();

        assert_eq!(&data[..6], b"070701");
        // 110 + "test.txt\0" = 119, padded to 120
        assert_eq!(&data[110..119], b"test.txt\0");
        assert_eq!(&data[120..125], b"Hello");
        // payload padded to 128, then the trailer
        assert_eq!(&data[128..134], b"070701");
        assert_eq!(&data[238..248], b"TRAILER!!!");
        assert_eq!(data.len() % 4, 0);
    }

    #[test]
    fn test_writer_checksum_field() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::NewcCrc);
        writer.add_file("a", &[1, 2, 3, 250]).unwrap();
        let data = writer.into_inner().unwrap();

        let header = CpioHeader::parse(CpioFormat::NewcCrc, &data[..110]).unwrap();
        assert_eq!(header.check, 256);
        assert_eq!(header.file_size, 4);
    }

    #[test]
    fn test_writer_sequential_inodes() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Odc);
        writer.add_directory("dir/").unwrap();
        writer.add_file("dir/a", b"a").unwrap();
        let data = writer.into_inner().unwrap();

        let first = CpioHeader::parse(CpioFormat::Odc, &data[..76]).unwrap();
        assert_eq!(first.inode, 1);
        assert_eq!(first.nlink, 2);
        assert_eq!(first.mode, 0o040755);
        assert_eq!(&data[76..80], b"dir\0");

        let second = CpioHeader::parse(CpioFormat::Odc, &data[80..156]).unwrap();
        assert_eq!(second.inode, 2);
        assert_eq!(second.mode, 0o100644);
    }

    #[test]
    fn test_writer_rejects_after_finish() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
        writer.finish().unwrap();
        assert!(writer.add_file("late", b"x").is_err());
    }

    #[test]
    fn test_writer_rejects_bad_names() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
        assert!(writer.add_file("", b"x").is_err());
        assert!(writer.add_file("nul\0name", b"x").is_err());
        assert!(writer.add_file(TRAILER_NAME, b"x").is_err());
        assert_eq!(writer.bytes_written(), 0);
    }

    #[test]
    fn test_writer_binary_overflow() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::BinaryLe);
        writer.set_mtime(u64::from(u32::MAX) + 1);
        assert!(matches!(
            writer.add_file("a", b"x"),
            Err(ArcError::Unsupported { .. })
        ));
    }
}
