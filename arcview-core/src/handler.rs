//! The format handler contract.
//!
//! Every archive format backend implements [`FormatHandler`]: validate a
//! stream, parse its directory into an [`EntryTable`], answer property
//! queries, and extract selected entries with one outcome per entry.

use crate::entry::EntryRecord;
use crate::error::{ArcError, Result};
use crate::property::{ArchivePropertyKind, PropertyKind, PropertyValue};
use crate::stream::{InStream, SinkProvider};
use crate::table::EntryTable;

/// Lifecycle state of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerState {
    /// No archive is open.
    #[default]
    Closed,
    /// Headers are being parsed.
    Opening,
    /// The entry table is available.
    Opened,
}

/// Constraints for opening an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Highest stream offset at which a signature may start.
    ///
    /// `0` requires the archive to begin at the start of the stream; larger
    /// values let the handler skip a self-extractor stub.
    pub max_check_start_position: u64,
}

impl OpenOptions {
    /// Options allowing a signature anywhere up to `max` bytes in.
    pub fn with_max_check_start_position(max: u64) -> Self {
        Self {
            max_check_start_position: max,
        }
    }
}

/// What a successful open found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Handler name.
    pub format: &'static str,
    /// Format variant.
    pub subtype: String,
    /// Stream offset where the archive begins.
    pub start_offset: u64,
    /// Number of entries in the table.
    pub entry_count: u32,
    /// Bytes from `start_offset` to the end of the archive.
    pub physical_size: u64,
    /// The stream ended before the archive's end marker.
    pub unexpected_end: bool,
}

/// Which entries an extraction covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every entry, in table order.
    #[default]
    All,
    /// These indices, in this order.
    Indices(Vec<u32>),
}

impl Selection {
    /// Concrete index list for a table, checking bounds first.
    pub fn resolve(&self, table: &EntryTable) -> Result<Vec<u32>> {
        match self {
            Self::All => Ok((0..table.count()).collect()),
            Self::Indices(indices) => {
                table.check_indices(indices)?;
                Ok(indices.clone())
            }
        }
    }
}

/// A successfully extracted or tested entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Payload bytes processed.
    pub bytes: u64,
    /// CRC-32 of the payload.
    pub crc32: u32,
}

/// Result for one requested index.
#[derive(Debug)]
pub struct EntryOutcome {
    /// The requested index.
    pub index: u32,
    /// Success, or the entry's failure.
    pub result: Result<ExtractedEntry>,
}

impl EntryOutcome {
    /// True when the entry was processed without error.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// How an extraction call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStatus {
    /// Every requested index has an outcome.
    Completed,
    /// The observer stopped the run early.
    Cancelled,
}

/// Outcomes of one extraction call.
#[derive(Debug)]
pub struct ExtractReport {
    /// Outcomes in processing order.
    pub outcomes: Vec<EntryOutcome>,
    /// Whether the run finished or was cancelled.
    pub status: ExtractStatus,
}

impl ExtractReport {
    /// True if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == ExtractStatus::Cancelled
    }

    /// Outcomes that succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    /// Outcomes that failed.
    pub fn failed(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Number of failed entries.
    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Outcome for `index`, if it was processed.
    pub fn outcome(&self, index: u32) -> Option<&EntryOutcome> {
        self.outcomes.iter().find(|o| o.index == index)
    }
}

/// Progress, result and cancellation callbacks.
///
/// All methods have no-op defaults; `should_cancel` is polled before every
/// entry and between payload chunks.
pub trait ExtractObserver {
    /// A new archive is about to be processed.
    fn on_archive_start(&mut self, _name: &str, _entry_count: u32) {}

    /// An archive could not be opened.
    fn on_archive_open_failed(&mut self, _name: &str, _reason: &ArcError) {}

    /// An entry is about to be processed.
    fn on_entry_start(&mut self, _index: u32, _entry: &EntryRecord) {}

    /// An entry finished, successfully or not.
    fn on_entry_done(&mut self, _outcome: &EntryOutcome) {}

    /// Return `true` to stop as soon as possible.
    fn should_cancel(&mut self) -> bool {
        false
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExtractObserver for NoopObserver {}

/// An archive format backend.
///
/// A handler borrows its input stream for `'s`, from `open` until `close`.
/// Methods take `&mut self` where they touch the stream, so one instance is
/// driven by one thread at a time; independent instances share nothing.
pub trait FormatHandler<'s> {
    /// Short handler name, e.g. `"cpio"`.
    fn format_name(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> HandlerState;

    /// Parse the archive's directory. Closes any previously open archive.
    fn open(&mut self, stream: &'s mut dyn InStream, options: &OpenOptions)
    -> Result<OpenOutcome>;

    /// Release the table and the stream borrow. Safe to call repeatedly.
    fn close(&mut self);

    /// Number of entries; `NotOpen` when closed.
    fn entry_count(&self) -> Result<u32> {
        Ok(self.table()?.count())
    }

    /// Shared handle to the entry table.
    fn table(&self) -> Result<EntryTable>;

    /// One property of one entry. Kinds the format lacks are `Empty`.
    fn property(&self, index: u32, kind: PropertyKind) -> Result<PropertyValue>;

    /// One property of the archive as a whole.
    fn archive_property(&self, kind: ArchivePropertyKind) -> Result<PropertyValue>;

    /// Extract or test the selected entries.
    ///
    /// Failures of individual entries are reported in the returned report
    /// and never stop the remaining indices. The call itself fails only when
    /// the handler is closed or an index is out of range.
    fn extract(
        &mut self,
        selection: &Selection,
        test_mode: bool,
        sinks: &mut dyn SinkProvider,
        observer: &mut dyn ExtractObserver,
    ) -> Result<ExtractReport>;
}

/// Creates handlers and recognizes their signatures.
pub trait HandlerFactory: Send + Sync {
    /// Name of the handlers this factory creates.
    fn name(&self) -> &'static str;

    /// Offset of the first valid signature within the scan bound, if any.
    ///
    /// Reads from the current position; callers rewind afterwards.
    fn probe(&self, stream: &mut dyn InStream, options: &OpenOptions) -> Result<Option<u64>>;

    /// A fresh, closed handler.
    fn create<'s>(&self) -> Box<dyn FormatHandler<'s> + 's>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_resolve() {
        let table = EntryTable::new(vec![
            EntryRecord::file("a", 1),
            EntryRecord::file("b", 2),
            EntryRecord::file("c", 3),
        ]);

        assert_eq!(Selection::All.resolve(&table).unwrap(), vec![0, 1, 2]);
        assert_eq!(
            Selection::Indices(vec![2, 0]).resolve(&table).unwrap(),
            vec![2, 0]
        );
        assert!(matches!(
            Selection::Indices(vec![3]).resolve(&table),
            Err(ArcError::IndexOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_report_helpers() {
        let report = ExtractReport {
            outcomes: vec![
                EntryOutcome {
                    index: 0,
                    result: Ok(ExtractedEntry { bytes: 4, crc32: 1 }),
                },
                EntryOutcome {
                    index: 1,
                    result: Err(ArcError::NotOpen),
                },
            ],
            status: ExtractStatus::Completed,
        };

        assert!(!report.is_cancelled());
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(report.outcome(1).is_some());
        assert!(report.outcome(5).is_none());
    }

    #[test]
    fn test_default_open_options() {
        assert_eq!(OpenOptions::default().max_check_start_position, 0);
        assert_eq!(
            OpenOptions::with_max_check_start_position(4096).max_check_start_position,
            4096
        );
    }
}
