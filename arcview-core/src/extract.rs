//! Shared extraction machinery for random-access handlers.
//!
//! [`copy_payload`] streams one payload in fixed-size chunks to an optional
//! sink while checksumming it. [`run_extraction`] drives a whole selection:
//! it owns sink lifetimes, observer callbacks, cancellation and per-entry
//! outcome bookkeeping, and leaves only the format-specific decode step to
//! the handler.

use crate::entry::EntryRecord;
use crate::error::{ArcError, DecodeFailure};
use crate::handler::{
    EntryOutcome, ExtractObserver, ExtractReport, ExtractStatus, ExtractedEntry,
};
use crate::stream::{EntrySink, SinkProvider};
use crate::table::EntryTable;
use crc32fast::Hasher;
use std::io::{ErrorKind, Read};

/// Size of the chunks moved between stream and sink.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Checksums of a fully read payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadDigest {
    /// Bytes read.
    pub bytes: u64,
    /// CRC-32 of the payload.
    pub crc32: u32,
    /// Wrapping 32-bit sum of all bytes (the cpio "crc" checksum).
    pub byte_sum: u32,
}

/// How a payload copy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    /// The whole payload was read.
    Done(PayloadDigest),
    /// The observer cancelled between chunks.
    Cancelled,
}

/// Copy `len` bytes from `reader` to `sink`, checksumming as it goes.
///
/// With no sink the payload is only read and checksummed (test mode).
/// Cancellation is checked between chunks, never after the last one.
pub fn copy_payload(
    reader: &mut (dyn Read + '_),
    len: u64,
    mut sink: Option<&mut (dyn EntrySink + '_)>,
    observer: &mut (dyn ExtractObserver + '_),
) -> Result<CopyStatus, DecodeFailure> {
    let mut buffer = vec![0u8; CHUNK_SIZE.min(len as usize).max(1)];
    let mut hasher = Hasher::new();
    let mut byte_sum = 0u32;
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;
        let read = match reader.read(&mut buffer[..want]) {
            Ok(0) => return Err(DecodeFailure::UnexpectedEnd { missing: remaining }),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        let chunk = &buffer[..read];
        hasher.update(chunk);
        byte_sum = chunk
            .iter()
            .fold(byte_sum, |acc, &b| acc.wrapping_add(u32::from(b)));

        if let Some(sink) = sink.as_deref_mut() {
            sink.write(chunk)
                .map_err(|e| DecodeFailure::Output(e.to_string()))?;
        }

        remaining -= read as u64;
        if remaining > 0 && observer.should_cancel() {
            return Ok(CopyStatus::Cancelled);
        }
    }

    Ok(CopyStatus::Done(PayloadDigest {
        bytes: len,
        crc32: hasher.finalize(),
        byte_sum,
    }))
}

/// Run an extraction over `indices`, one outcome per processed index.
///
/// A provider returning [`ArcError::Cancelled`] stops the run like an
/// observer cancellation; no outcome is recorded for that entry.
///
/// `decode` materializes one entry: it receives the index, the record, the
/// sink (absent in test mode or when the provider skips the entry) and the
/// observer for chunk-level cancellation checks.
pub fn run_extraction<F>(
    table: &EntryTable,
    indices: &[u32],
    test_mode: bool,
    sinks: &mut (dyn SinkProvider + '_),
    observer: &mut (dyn ExtractObserver + '_),
    mut decode: F,
) -> ExtractReport
where
    F: FnMut(
        u32,
        &EntryRecord,
        Option<&mut (dyn EntrySink + '_)>,
        &mut (dyn ExtractObserver + '_),
    ) -> Result<CopyStatus, DecodeFailure>,
{
    let mut outcomes = Vec::with_capacity(indices.len());
    let mut status = ExtractStatus::Completed;

    for &index in indices {
        if observer.should_cancel() {
            status = ExtractStatus::Cancelled;
            break;
        }

        let record = &table[index];
        observer.on_entry_start(index, record);

        let mut sink = if test_mode {
            None
        } else {
            match sinks.create_sink(index, record) {
                Ok(sink) => sink,
                Err(e) if e.is_cancelled() => {
                    status = ExtractStatus::Cancelled;
                    break;
                }
                Err(e) => {
                    let outcome = EntryOutcome {
                        index,
                        result: Err(ArcError::entry_failed(
                            index,
                            DecodeFailure::Output(e.to_string()),
                        )),
                    };
                    observer.on_entry_done(&outcome);
                    outcomes.push(outcome);
                    continue;
                }
            }
        };

        let result = match decode(index, record, sink.as_deref_mut(), &mut *observer) {
            Ok(CopyStatus::Done(digest)) => {
                let finished = match sink.as_deref_mut() {
                    Some(sink) => sink.finish(),
                    None => Ok(()),
                };
                finished
                    .map(|()| ExtractedEntry {
                        bytes: digest.bytes,
                        crc32: digest.crc32,
                    })
                    .map_err(|e| {
                        ArcError::entry_failed(index, DecodeFailure::Output(e.to_string()))
                    })
            }
            Ok(CopyStatus::Cancelled) => {
                if let Some(sink) = sink.as_deref_mut() {
                    sink.abort();
                }
                status = ExtractStatus::Cancelled;
                break;
            }
            Err(failure) => {
                if let Some(sink) = sink.as_deref_mut() {
                    sink.abort();
                }
                Err(ArcError::entry_failed(index, failure))
            }
        };

        let outcome = EntryOutcome { index, result };
        observer.on_entry_done(&outcome);
        outcomes.push(outcome);
    }

    ExtractReport { outcomes, status }
}
