//! cpio archive format support.
//!
//! This module provides listing, testing and extraction of cpio archives in
//! all common variants:
//! - Old binary format, either byte order
//! - POSIX.1 portable ASCII format (odc)
//! - SVR4 "newc" format, with or without payload checksums
//!
//! Opening an archive walks the headers only; payloads are skipped with
//! seeks and read again on extraction.

mod header;
mod writer;

pub use header::{CpioFormat, CpioHeader, TRAILER_NAME};
pub use writer::CpioWriter;

use arcview_core::entry::{EntryKind, EntryRecord, FileMode};
use arcview_core::error::{ArcError, DecodeFailure, Result};
use arcview_core::extract::{CHUNK_SIZE, CopyStatus, PayloadDigest, copy_payload, run_extraction};
use arcview_core::handler::{
    ExtractObserver, ExtractReport, FormatHandler, HandlerFactory, HandlerState, OpenOptions,
    OpenOutcome, Selection,
};
use arcview_core::property::{ArchivePropertyKind, PropertyKind, PropertyValue};
use arcview_core::stream::{EntrySink, InStream, SinkProvider, stream_len};
use arcview_core::table::EntryTable;
use header::{MAX_HEADER_SIZE, MAX_NAME_SIZE, padding};
use log::{debug, warn};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::time::{Duration, UNIX_EPOCH};

/// Handler name.
pub const FORMAT_NAME: &str = "cpio";

/// Longest symlink target read while listing.
const MAX_LINK_TARGET: u64 = 64 * 1024;

/// Where a signature scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    /// A header that parses, at this offset.
    Found(u64, CpioFormat),
    /// A magic whose header runs past the end of the stream.
    Short { offset: u64, needed: u64 },
    /// Nothing within the bound.
    Missing { scanned: u64 },
}

/// Directory of an open archive.
#[derive(Debug, Clone)]
struct ParsedArchive {
    table: EntryTable,
    format: CpioFormat,
    start_offset: u64,
    physical_size: u64,
    headers_size: u64,
    unexpected_end: bool,
}

/// cpio format handler.
///
/// Borrows its stream from [`open`](FormatHandler::open) until
/// [`close`](FormatHandler::close).
#[derive(Default)]
pub struct CpioHandler<'s> {
    stream: Option<&'s mut dyn InStream>,
    state: HandlerState,
    archive: Option<ParsedArchive>,
}

impl<'s> CpioHandler<'s> {
    /// Create a closed handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Variant of the open archive.
    pub fn variant(&self) -> Option<CpioFormat> {
        self.archive.as_ref().map(|a| a.format)
    }

    fn parsed(&self) -> Result<&ParsedArchive> {
        self.archive.as_ref().ok_or(ArcError::NotOpen)
    }
}

impl<'s> FormatHandler<'s> for CpioHandler<'s> {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn state(&self) -> HandlerState {
        self.state
    }

    fn open(&mut self, stream: &'s mut dyn InStream, options: &OpenOptions) -> Result<OpenOutcome> {
        self.close();
        self.state = HandlerState::Opening;

        let parsed = match parse_archive(&mut *stream, options) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.state = HandlerState::Closed;
                return Err(e);
            }
        };

        let outcome = OpenOutcome {
            format: FORMAT_NAME,
            subtype: parsed.format.name().to_string(),
            start_offset: parsed.start_offset,
            entry_count: parsed.table.count(),
            physical_size: parsed.physical_size,
            unexpected_end: parsed.unexpected_end,
        };
        debug!(
            "cpio: opened {} archive at offset {} with {} entries",
            parsed.format, parsed.start_offset, outcome.entry_count
        );

        self.stream = Some(stream);
        self.archive = Some(parsed);
        self.state = HandlerState::Opened;
        Ok(outcome)
    }

    fn close(&mut self) {
        self.stream = None;
        self.archive = None;
        self.state = HandlerState::Closed;
    }

    fn table(&self) -> Result<EntryTable> {
        Ok(self.parsed()?.table.clone())
    }

    fn property(&self, index: u32, kind: PropertyKind) -> Result<PropertyValue> {
        Ok(self.parsed()?.table.get(index)?.property(kind))
    }

    fn archive_property(&self, kind: ArchivePropertyKind) -> Result<PropertyValue> {
        let archive = self.parsed()?;
        Ok(match kind {
            ArchivePropertyKind::Format => FORMAT_NAME.into(),
            ArchivePropertyKind::Subtype => archive.format.name().into(),
            ArchivePropertyKind::PhysicalSize => archive.physical_size.into(),
            ArchivePropertyKind::Offset => archive.start_offset.into(),
            ArchivePropertyKind::HeadersSize => archive.headers_size.into(),
            ArchivePropertyKind::UnexpectedEnd => archive.unexpected_end.into(),
            ArchivePropertyKind::EntryCount => archive.table.count().into(),
        })
    }

    fn extract(
        &mut self,
        selection: &Selection,
        test_mode: bool,
        sinks: &mut dyn SinkProvider,
        observer: &mut dyn ExtractObserver,
    ) -> Result<ExtractReport> {
        let archive = self.parsed()?;
        let table = archive.table.clone();
        let format = archive.format;
        let indices = selection.resolve(&table)?;
        let stream = self.stream.as_deref_mut().ok_or(ArcError::NotOpen)?;

        let report = run_extraction(
            &table,
            &indices,
            test_mode,
            sinks,
            observer,
            |index, record, sink, observer| {
                let result = read_payload(&mut *stream, format, record, sink, observer);
                if let Err(failure) = &result {
                    warn!("cpio: entry {} ({}) failed: {}", index, record.name(), failure);
                }
                result
            },
        );
        Ok(report)
    }
}

/// Stream one entry's payload into its sink and verify it.
fn read_payload(
    stream: &mut (dyn InStream + '_),
    format: CpioFormat,
    record: &EntryRecord,
    sink: Option<&mut (dyn EntrySink + '_)>,
    observer: &mut (dyn ExtractObserver + '_),
) -> std::result::Result<CopyStatus, DecodeFailure> {
    let size = record.size().unwrap_or(0);
    stream.seek(SeekFrom::Start(record.data_offset()))?;

    // A symlink's payload is its target; it is verified but never written.
    let sink = if record.is_symlink() { None } else { sink };
    let mut limited = Read::take(&mut *stream, size);
    let status = copy_payload(&mut limited, size, sink, observer)?;

    let digest = match status {
        CopyStatus::Done(digest) => digest,
        CopyStatus::Cancelled => return Ok(CopyStatus::Cancelled),
    };

    if format.has_checksum() {
        if let Some(expected) = record.checksum() {
            if expected != digest.byte_sum {
                return Err(DecodeFailure::ChecksumMismatch {
                    expected,
                    computed: digest.byte_sum,
                });
            }
        }
    }

    if record.is_symlink() {
        Ok(CopyStatus::Done(PayloadDigest::default()))
    } else {
        Ok(CopyStatus::Done(digest))
    }
}

/// Fill `buf` as far as the stream allows.
fn read_full(stream: &mut (dyn InStream + '_), buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Decode the name field of a header.
///
/// The field must hold exactly one NUL, at its end, and every entry but the
/// trailer must carry a known file type.
fn entry_name(header: &CpioHeader, field: &[u8]) -> std::result::Result<String, String> {
    match field.split_last() {
        Some((0, name)) if !name.contains(&0) => {
            let name = String::from_utf8_lossy(name).into_owned();
            if name != TRAILER_NAME && FileMode::new(header.mode).kind() == EntryKind::Unknown {
                return Err(format!("unknown file type in mode {:o}", header.mode));
            }
            Ok(name)
        }
        _ => Err("name is not NUL-terminated".to_string()),
    }
}

/// Scan start positions `0..=max_start` for a header that parses.
fn find_signature(stream: &mut (dyn InStream + '_), max_start: u64) -> Result<Signature> {
    let len = stream_len(stream)?;
    let last = max_start.min(len.saturating_sub(1));
    let mut buf = vec![0u8; CHUNK_SIZE + MAX_HEADER_SIZE];
    let mut short = None;
    let mut base = 0u64;

    while len > 0 && base <= last {
        stream.seek(SeekFrom::Start(base))?;
        let filled = read_full(stream, &mut buf)?;
        let window_last = (last - base).min(CHUNK_SIZE as u64 - 1) as usize;

        for i in 0..=window_last.min(filled.saturating_sub(1)) {
            let window = &buf[i..filled];
            let Some(format) = CpioFormat::from_magic(window) else {
                continue;
            };
            let offset = base + i as u64;
            let header_size = format.header_size();

            if window.len() < header_size {
                if short.is_none() && format.is_ascii() && offset + header_size as u64 > len {
                    short = Some(Signature::Short {
                        offset,
                        needed: offset + header_size as u64 - len,
                    });
                }
                continue;
            }
            let header = match CpioHeader::parse(format, &window[..header_size]) {
                Ok(header) if header.name_size > 0 && header.name_size <= MAX_NAME_SIZE => header,
                Ok(header) => {
                    debug!("cpio: rejected candidate at {}: name size {}", offset, header.name_size);
                    continue;
                }
                Err(message) => {
                    debug!("cpio: rejected candidate at {}: {}", offset, message);
                    continue;
                }
            };

            let name_start = offset + header_size as u64;
            let name_end = name_start + u64::from(header.name_size);
            if name_end > len {
                if short.is_none() && format.is_ascii() {
                    short = Some(Signature::Short {
                        offset,
                        needed: name_end - len,
                    });
                }
                continue;
            }
            let mut name = vec![0u8; header.name_size as usize];
            stream.seek(SeekFrom::Start(name_start))?;
            stream.read_exact(&mut name)?;
            match entry_name(&header, &name) {
                Ok(_) => return Ok(Signature::Found(offset, format)),
                Err(message) => debug!("cpio: rejected candidate at {}: {}", offset, message),
            }
        }
        base += CHUNK_SIZE as u64;
    }

    Ok(short.unwrap_or(Signature::Missing {
        scanned: if len == 0 { 0 } else { last + 1 },
    }))
}

/// Resolve the scan into an archive start, or the open error.
fn locate(stream: &mut (dyn InStream + '_), options: &OpenOptions) -> Result<(u64, CpioFormat)> {
    match find_signature(stream, options.max_check_start_position)? {
        Signature::Found(offset, format) => Ok((offset, format)),
        Signature::Short { offset, needed } => Err(ArcError::truncated(offset, needed)),
        Signature::Missing { scanned } => Err(ArcError::format_mismatch(FORMAT_NAME, scanned)),
    }
}

/// Walk every header from the signature to the trailer.
fn parse_archive(stream: &mut (dyn InStream + '_), options: &OpenOptions) -> Result<ParsedArchive> {
    let (start, format) = locate(stream, options)?;
    let len = stream_len(stream)?;
    debug!("cpio: {} signature at offset {}", format, start);

    let header_size = format.header_size();
    let mut records = Vec::new();
    let mut offset = start;
    let mut headers_size = 0u64;
    let mut unexpected_end = false;
    let mut buf = [0u8; MAX_HEADER_SIZE];

    let end = loop {
        stream.seek(SeekFrom::Start(offset))?;
        let filled = read_full(stream, &mut buf[..header_size])?;
        if filled < header_size {
            if records.is_empty() {
                return Err(ArcError::truncated(offset, (header_size - filled) as u64));
            }
            warn!("cpio: stream ends at {} before the trailer", offset + filled as u64);
            unexpected_end = true;
            break offset + filled as u64;
        }

        let header = CpioHeader::parse(format, &buf[..header_size])
            .map_err(|message| ArcError::corrupt(offset, message))?;
        if header.name_size == 0 || header.name_size > MAX_NAME_SIZE {
            return Err(ArcError::corrupt(
                offset,
                format!("invalid name size {}", header.name_size),
            ));
        }

        let name_start = offset + header_size as u64;
        let name_end = name_start + u64::from(header.name_size);
        if name_end > len {
            return Err(ArcError::corrupt(
                offset,
                format!("name of {} bytes runs past end of stream", header.name_size),
            ));
        }
        let mut name_buf = vec![0u8; header.name_size as usize];
        stream.read_exact(&mut name_buf)?;
        let name =
            entry_name(&header, &name_buf).map_err(|message| ArcError::corrupt(offset, message))?;

        let data_offset = name_end + header.name_padding(offset - start);
        let data_end = data_offset + header.file_size;
        headers_size += data_offset - offset;

        if name == TRAILER_NAME {
            let tail = data_end + padding(data_end - start, format.alignment());
            break tail.min(len);
        }

        let truncated_payload = data_end > len;
        let record = build_record(&mut *stream, &header, name, offset, data_offset, len)?;
        records.push(record);

        if truncated_payload {
            warn!(
                "cpio: payload of entry {} runs past end of stream",
                records.len() - 1
            );
            unexpected_end = true;
            break len;
        }
        offset = data_end + header.data_padding(data_end - start);
    };

    Ok(ParsedArchive {
        table: EntryTable::new(records),
        format,
        start_offset: start,
        physical_size: end - start,
        headers_size,
        unexpected_end,
    })
}

fn build_record(
    stream: &mut (dyn InStream + '_),
    header: &CpioHeader,
    name: String,
    header_offset: u64,
    data_offset: u64,
    len: u64,
) -> Result<EntryRecord> {
    let mut record = EntryRecord::new(name, FileMode::new(header.mode), Some(header.file_size))
        .with_packed_size(header.file_size)
        .with_mtime(UNIX_EPOCH + Duration::from_secs(header.mtime))
        .with_offsets(header_offset, data_offset)
        .with_owner(header.uid, header.gid)
        .with_inode(header.inode, header.nlink)
        .with_devices(header.dev, header.rdev);

    if header.format.has_checksum() {
        record = record.with_checksum(header.check);
    }

    if record.is_symlink() {
        let fits = header.file_size <= MAX_LINK_TARGET && data_offset + header.file_size <= len;
        if fits {
            let mut target = vec![0u8; header.file_size as usize];
            stream.seek(SeekFrom::Start(data_offset))?;
            stream.read_exact(&mut target)?;
            record = record.with_link_target(String::from_utf8_lossy(&target).into_owned());
        } else {
            warn!("cpio: link target of {} not readable", record.name());
        }
    }

    Ok(record)
}

/// Factory registering the cpio handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpioFactory;

impl HandlerFactory for CpioFactory {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn probe(&self, stream: &mut dyn InStream, options: &OpenOptions) -> Result<Option<u64>> {
        match find_signature(stream, options.max_check_start_position)? {
            Signature::Found(offset, _) | Signature::Short { offset, .. } => Ok(Some(offset)),
            Signature::Missing { .. } => Ok(None),
        }
    }

    fn create<'s>(&self) -> Box<dyn FormatHandler<'s> + 's> {
        Box::new(CpioHandler::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcview_core::handler::NoopObserver;
    use arcview_core::stream::{MemorySinks, NoSinks};
    use std::io::Cursor;

    fn create_test_cpio(format: CpioFormat) -> Vec<u8> {
        let mut writer = CpioWriter::new(Vec::new(), format);
        writer.set_mtime(1_700_000_000);
        writer.add_directory("docs").unwrap();
        writer.add_file("docs/hello.txt", b"Hello, World!").unwrap();
        writer.add_file("empty", b"").unwrap();
        writer.add_symlink("link", "docs/hello.txt").unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_open_and_list() {
        let data = create_test_cpio(CpioFormat::Newc);
        let mut cursor = Cursor::new(data.clone());
        let mut handler = CpioHandler::new();

        let outcome = handler.open(&mut cursor, &OpenOptions::default()).unwrap();
        assert_eq!(outcome.format, "cpio");
        assert_eq!(outcome.subtype, "newc");
        assert_eq!(outcome.entry_count, 4);
        assert_eq!(outcome.start_offset, 0);
        assert_eq!(outcome.physical_size, data.len() as u64);
        assert!(!outcome.unexpected_end);
        assert_eq!(handler.state(), HandlerState::Opened);

        let table = handler.table().unwrap();
        assert!(table[0].is_dir());
        assert_eq!(table[1].name(), "docs/hello.txt");
        assert_eq!(table[1].size(), Some(13));
        assert_eq!(table[3].link_target(), Some("docs/hello.txt"));
        assert_eq!(
            table[1].mtime(),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_extract_all_variants() {
        for format in [
            CpioFormat::BinaryLe,
            CpioFormat::BinaryBe,
            CpioFormat::Odc,
            CpioFormat::Newc,
            CpioFormat::NewcCrc,
        ] {
            let mut cursor = Cursor::new(create_test_cpio(format));
            let mut handler = CpioHandler::new();
            handler.open(&mut cursor, &OpenOptions::default()).unwrap();
            assert_eq!(handler.variant(), Some(format));

            let mut sinks = MemorySinks::new();
            let report = handler
                .extract(&Selection::All, false, &mut sinks, &mut NoopObserver)
                .unwrap();
            assert_eq!(report.failure_count(), 0, "variant {}", format);
            assert_eq!(sinks.finished_data(1), Some(&b"Hello, World!"[..]));
            assert_eq!(sinks.finished_data(2), Some(&b""[..]));
            // symlink targets are not written
            assert_eq!(sinks.finished_data(3), Some(&b""[..]));
        }
    }

    #[test]
    fn test_not_cpio() {
        let mut cursor = Cursor::new(b"PK\x03\x04 definitely not cpio".to_vec());
        let mut handler = CpioHandler::new();
        let err = handler.open(&mut cursor, &OpenOptions::default()).unwrap_err();
        assert!(err.is_format_mismatch());
        assert_eq!(handler.state(), HandlerState::Closed);
    }

    #[test]
    fn test_empty_stream() {
        let mut cursor = Cursor::new(Vec::new());
        let mut handler = CpioHandler::new();
        let err = handler.open(&mut cursor, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, ArcError::FormatMismatch { scanned: 0, .. }));
    }

    #[test]
    fn test_header_cut_short() {
        let data = create_test_cpio(CpioFormat::Newc);
        let mut cursor = Cursor::new(data[..50].to_vec());
        let mut handler = CpioHandler::new();
        let err = handler.open(&mut cursor, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, ArcError::Truncated { offset: 0, needed: 60 }));
    }

    #[test]
    fn test_corrupt_second_header() {
        let mut data = create_test_cpio(CpioFormat::Newc);
        // first entry: "docs" -> 110 + 5 = 115, padded to 116, no payload
        data[116 + 20] = b'z';
        let mut cursor = Cursor::new(data);
        let mut handler = CpioHandler::new();
        let err = handler.open(&mut cursor, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, ArcError::Corrupt { offset: 116, .. }));
        assert!(handler.table().is_err());
    }

    #[test]
    fn test_name_past_end_is_truncated() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Odc);
        writer.add_file("a.txt", b"abc").unwrap();
        let mut data = writer.into_inner().unwrap();
        // odc name size field lives at 59..65
        data[59..65].copy_from_slice(b"177777");
        let mut cursor = Cursor::new(data);
        let err = CpioHandler::new()
            .open(&mut cursor, &OpenOptions::default())
            .unwrap_err();
        assert!(matches!(err, ArcError::Truncated { offset: 0, .. }));
    }

    #[test]
    fn test_name_without_terminator_is_corrupt() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
        writer.add_file("a.txt", b"abc").unwrap();
        writer.add_file("b.txt", b"def").unwrap();
        let mut data = writer.into_inner().unwrap();
        // second header at 120 (110 + 6 name, 3 data padded to 4); its NUL at 235
        assert_eq!(&data[230..236], b"b.txt\0");
        data[235] = b'!';
        let mut cursor = Cursor::new(data);
        let err = CpioHandler::new()
            .open(&mut cursor, &OpenOptions::default())
            .unwrap_err();
        assert!(matches!(err, ArcError::Corrupt { offset: 120, .. }));
    }

    #[test]
    fn test_random_data_is_not_cpio() {
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let data: Vec<u8> = (0..1 << 20)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                (state >> 33) as u8
            })
            .collect();

        let mut cursor = Cursor::new(data);
        let err = CpioHandler::new()
            .open(&mut cursor, &OpenOptions::with_max_check_start_position(1 << 20))
            .unwrap_err();
        assert!(err.is_format_mismatch(), "{}", err);
    }

    #[test]
    fn test_binary_magic_near_end_is_not_truncated() {
        let mut data = vec![0x71, 0xC7];
        data.extend_from_slice(b"not an archive....");
        assert_eq!(data.len(), 20);

        let mut cursor = Cursor::new(data);
        let err = CpioHandler::new()
            .open(&mut cursor, &OpenOptions::default())
            .unwrap_err();
        assert!(err.is_format_mismatch(), "{}", err);
        assert_eq!(CpioFactory.probe(&mut cursor, &OpenOptions::default()).unwrap(), None);
    }

    #[test]
    fn test_unknown_file_type_rejected() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Odc);
        writer.add_file("a.txt", b"abc").unwrap();
        let mut data = writer.into_inner().unwrap();
        // odc mode field lives at 18..24; 0o000644 has no type bits
        data[18..24].copy_from_slice(b"000644");
        let mut cursor = Cursor::new(data);
        let err = CpioHandler::new()
            .open(&mut cursor, &OpenOptions::default())
            .unwrap_err();
        assert!(err.is_format_mismatch(), "{}", err);
    }

    #[test]
    fn test_missing_trailer_sets_unexpected_end() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
        writer.add_file("a.txt", b"abcd").unwrap();
        let bytes_before_trailer = writer.bytes_written() as usize;
        let data = writer.into_inner().unwrap();

        let mut cursor = Cursor::new(data[..bytes_before_trailer].to_vec());
        let mut handler = CpioHandler::new();
        let outcome = handler.open(&mut cursor, &OpenOptions::default()).unwrap();
        assert!(outcome.unexpected_end);
        assert_eq!(outcome.entry_count, 1);
        assert_eq!(
            handler
                .archive_property(ArchivePropertyKind::UnexpectedEnd)
                .unwrap()
                .as_bool(),
            Some(true)
        );

        let report = handler
            .extract(&Selection::All, true, &mut NoSinks, &mut NoopObserver)
            .unwrap();
        assert_eq!(report.failure_count(), 0);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::NewcCrc);
        writer.add_file("a.txt", b"payload").unwrap();
        let mut data = writer.into_inner().unwrap();
        // 110 + 6 = 116, aligned; payload starts at 116
        data[116] ^= 0x01;

        let mut cursor = Cursor::new(data);
        let mut handler = CpioHandler::new();
        handler.open(&mut cursor, &OpenOptions::default()).unwrap();
        let report = handler
            .extract(&Selection::All, true, &mut NoSinks, &mut NoopObserver)
            .unwrap();

        let err = report.outcome(0).unwrap().result.as_ref().unwrap_err();
        assert!(matches!(
            err.decode_failure(),
            Some(DecodeFailure::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_properties() {
        let mut cursor = Cursor::new(create_test_cpio(CpioFormat::NewcCrc));
        let mut handler = CpioHandler::new();
        handler.open(&mut cursor, &OpenOptions::default()).unwrap();

        assert_eq!(
            handler.property(1, PropertyKind::Path).unwrap().as_str(),
            Some("docs/hello.txt")
        );
        assert_eq!(
            handler.property(0, PropertyKind::IsDirectory).unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            handler.property(3, PropertyKind::SymLink).unwrap().as_str(),
            Some("docs/hello.txt")
        );
        assert!(handler.property(1, PropertyKind::Crc).unwrap().as_u64().is_some());
        assert!(handler.property(1, PropertyKind::Comment).unwrap().is_empty());
        assert!(handler.property(1, PropertyKind::Other(9999)).unwrap().is_empty());
        assert!(matches!(
            handler.property(4, PropertyKind::Path),
            Err(ArcError::IndexOutOfRange { index: 4, count: 4 })
        ));

        assert_eq!(
            handler
                .archive_property(ArchivePropertyKind::Subtype)
                .unwrap()
                .as_str(),
            Some("crc")
        );
        assert_eq!(
            handler
                .archive_property(ArchivePropertyKind::EntryCount)
                .unwrap()
                .as_u64(),
            Some(4)
        );
    }

    #[test]
    fn test_reopen_replaces_archive() {
        let mut first = Cursor::new(create_test_cpio(CpioFormat::Newc));
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Odc);
        writer.add_file("only", b"1").unwrap();
        let mut second = Cursor::new(writer.into_inner().unwrap());

        let mut handler = CpioHandler::new();
        handler.open(&mut first, &OpenOptions::default()).unwrap();
        assert_eq!(handler.entry_count().unwrap(), 4);
        handler.open(&mut second, &OpenOptions::default()).unwrap();
        assert_eq!(handler.entry_count().unwrap(), 1);
        assert_eq!(handler.variant(), Some(CpioFormat::Odc));
    }

    #[test]
    fn test_factory_probe() {
        let mut data = vec![0xAAu8; 40];
        data.extend(create_test_cpio(CpioFormat::Newc));
        let mut cursor = Cursor::new(data);

        let factory = CpioFactory;
        assert_eq!(factory.probe(&mut cursor, &OpenOptions::default()).unwrap(), None);
        assert_eq!(
            factory
                .probe(&mut cursor, &OpenOptions::with_max_check_start_position(64))
                .unwrap(),
            Some(40)
        );

        let handler = factory.create();
        assert_eq!(handler.format_name(), "cpio");
        assert_eq!(handler.state(), HandlerState::Closed);
    }

    #[test]
    fn test_signature_beyond_first_window() {
        let stub = CHUNK_SIZE + 7;
        let mut data = vec![0xAAu8; stub];
        data.extend(create_test_cpio(CpioFormat::Odc));
        let mut cursor = Cursor::new(data);

        let mut handler = CpioHandler::new();
        let outcome = handler
            .open(&mut cursor, &OpenOptions::with_max_check_start_position(1 << 20))
            .unwrap();
        assert_eq!(outcome.start_offset, stub as u64);
        assert_eq!(outcome.entry_count, 4);
    }
}
