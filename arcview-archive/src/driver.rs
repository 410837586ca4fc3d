//! Batch extraction over several archives.
//!
//! The [`ExtractionDriver`] takes host-opened streams, opens each with the
//! [`HandlerRegistry`], translates the requested paths into entry indices,
//! runs the extraction and aggregates the results. A failing archive never
//! stops the batch; a cancellation does.

use crate::registry::HandlerRegistry;
use arcview_core::entry::EntryRecord;
use arcview_core::error::{ArcError, Result};
use arcview_core::handler::{ExtractObserver, ExtractReport, OpenOptions, Selection};
use arcview_core::stream::{EntrySink, InStream, NoSinks, SinkProvider};
use log::{info, warn};

/// Where the driver sends extracted entries.
///
/// Unlike a [`SinkProvider`], a destination sees the archive name, so one
/// destination can serve a whole batch.
pub trait Destination {
    /// Sink for one entry, or `None` when nothing should be written.
    fn create_sink(
        &mut self,
        archive: &str,
        index: u32,
        entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>>;
}

impl Destination for NoSinks {
    fn create_sink(
        &mut self,
        _archive: &str,
        _index: u32,
        _entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>> {
        Ok(None)
    }
}

/// Entries requested from one archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EntrySelection {
    /// Every entry.
    #[default]
    All,
    /// These table indices.
    Indices(Vec<u32>),
    /// Entries whose path equals, or lies below, one of these paths.
    Paths(Vec<String>),
}

/// One archive of a batch.
pub struct ArchiveJob<'j> {
    /// Display name, also used by destinations to place output.
    pub name: String,
    /// The opened archive stream, or why the host could not open it.
    pub stream: std::result::Result<Box<dyn InStream + 'j>, ArcError>,
    /// Entries to process.
    pub selection: EntrySelection,
}

impl<'j> ArchiveJob<'j> {
    /// Job covering every entry of `stream`.
    pub fn new(name: impl Into<String>, stream: impl InStream + 'j) -> Self {
        Self {
            name: name.into(),
            stream: Ok(Box::new(stream)),
            selection: EntrySelection::All,
        }
    }

    /// Job for an archive the host failed to open.
    ///
    /// The driver reports it as an open failure and carries on.
    pub fn unopened(name: impl Into<String>, error: impl Into<ArcError>) -> Self {
        Self {
            name: name.into(),
            stream: Err(error.into()),
            selection: EntrySelection::All,
        }
    }

    /// Restrict the job to a selection.
    pub fn with_selection(mut self, selection: EntrySelection) -> Self {
        self.selection = selection;
        self
    }
}

/// Batch-wide options.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Options passed to every handler's open.
    pub open: OpenOptions,
    /// Only try the handler with this name.
    pub forced_format: Option<String>,
    /// Process archives sorted by name, dropping duplicate names.
    pub sort_archives: bool,
}

impl DriverOptions {
    /// Set the open options.
    pub fn with_open_options(mut self, open: OpenOptions) -> Self {
        self.open = open;
        self
    }

    /// Force a handler by name.
    pub fn with_forced_format(mut self, name: impl Into<String>) -> Self {
        self.forced_format = Some(name.into());
        self
    }

    /// Sort archives by name before processing.
    pub fn with_sorted_archives(mut self, sort: bool) -> Self {
        self.sort_archives = sort;
        self
    }
}

/// What happened to one archive.
#[derive(Debug)]
pub enum ArchiveOutcome {
    /// No handler could open the archive.
    OpenFailed(ArcError),
    /// The archive opened but the extraction call itself was rejected.
    Rejected(ArcError),
    /// The extraction ran.
    Processed {
        /// Per-entry outcomes.
        report: ExtractReport,
        /// Requested paths that matched no entry.
        missing: Vec<String>,
    },
}

/// Result for one archive of a batch.
#[derive(Debug)]
pub struct ArchiveResult {
    /// Job name.
    pub name: String,
    /// Handler that opened the archive.
    pub format: Option<&'static str>,
    /// Outcome.
    pub outcome: ArchiveOutcome,
}

impl ArchiveResult {
    /// True when the archive could not be processed at all.
    pub fn is_failed(&self) -> bool {
        !matches!(self.outcome, ArchiveOutcome::Processed { .. })
    }

    /// The extraction report, if the archive was processed.
    pub fn report(&self) -> Option<&ExtractReport> {
        match &self.outcome {
            ArchiveOutcome::Processed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Entry failures plus unmatched paths.
    pub fn failed_entries(&self) -> usize {
        match &self.outcome {
            ArchiveOutcome::Processed { report, missing } => report.failure_count() + missing.len(),
            _ => 0,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.report().is_some_and(|r| r.is_cancelled())
    }
}

/// Overall batch verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every archive opened and every entry succeeded.
    Success,
    /// At least one archive or entry failed.
    Failure,
    /// The observer cancelled the batch.
    Cancelled,
}

/// Aggregated result of a batch.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// One result per processed archive, in processing order.
    pub archives: Vec<ArchiveResult>,
    /// The batch stopped on a cancellation.
    pub cancelled: bool,
}

impl BatchResult {
    /// Archives that could not be processed.
    pub fn failed_archives(&self) -> impl Iterator<Item = &ArchiveResult> {
        self.archives.iter().filter(|a| a.is_failed())
    }

    /// Number of failed entries across all archives.
    pub fn failed_entries(&self) -> usize {
        self.archives.iter().map(ArchiveResult::failed_entries).sum()
    }

    /// Number of entries processed successfully.
    pub fn succeeded_entries(&self) -> usize {
        self.archives
            .iter()
            .filter_map(ArchiveResult::report)
            .map(|r| r.succeeded().count())
            .sum()
    }

    /// True when nothing failed and nothing was cancelled.
    pub fn is_success(&self) -> bool {
        self.status() == BatchStatus::Success
    }

    /// Overall verdict.
    pub fn status(&self) -> BatchStatus {
        if self.cancelled {
            BatchStatus::Cancelled
        } else if self.failed_archives().next().is_some() || self.failed_entries() > 0 {
            BatchStatus::Failure
        } else {
            BatchStatus::Success
        }
    }
}

/// Adapts a batch destination to one archive.
struct ArchiveSinks<'a> {
    destination: &'a mut dyn Destination,
    archive: &'a str,
}

impl SinkProvider for ArchiveSinks<'_> {
    fn create_sink(
        &mut self,
        index: u32,
        entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>> {
        self.destination.create_sink(self.archive, index, entry)
    }
}

/// Runs extraction or testing over a batch of archives.
#[derive(Default)]
pub struct ExtractionDriver {
    registry: HandlerRegistry,
    options: DriverOptions,
}

impl ExtractionDriver {
    /// Driver with the built-in handlers.
    pub fn new(options: DriverOptions) -> Self {
        Self {
            registry: HandlerRegistry::new(),
            options,
        }
    }

    /// Use a custom registry.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Batch options.
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Process every job in turn.
    ///
    /// In test mode payloads are verified and no sinks are requested from
    /// `destination`.
    pub fn run(
        &self,
        mut jobs: Vec<ArchiveJob<'_>>,
        destination: &mut dyn Destination,
        test_mode: bool,
        observer: &mut dyn ExtractObserver,
    ) -> BatchResult {
        if self.options.sort_archives {
            jobs.sort_by(|a, b| a.name.cmp(&b.name));
            jobs.dedup_by(|a, b| a.name == b.name);
        }

        let mut result = BatchResult::default();
        for job in jobs {
            if observer.should_cancel() {
                result.cancelled = true;
                break;
            }

            let archive = self.process(job, &mut *destination, test_mode, &mut *observer);
            let cancelled = archive.is_cancelled();
            result.archives.push(archive);
            if cancelled {
                result.cancelled = true;
                break;
            }
        }

        info!(
            "processed {} archive(s): {} entries ok, {} failed{}",
            result.archives.len(),
            result.succeeded_entries(),
            result.failed_entries(),
            if result.cancelled { ", cancelled" } else { "" }
        );
        result
    }

    fn process(
        &self,
        job: ArchiveJob<'_>,
        destination: &mut dyn Destination,
        test_mode: bool,
        observer: &mut dyn ExtractObserver,
    ) -> ArchiveResult {
        let ArchiveJob {
            name,
            stream,
            selection,
        } = job;
        let forced = self.options.forced_format.as_deref();

        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("{}: cannot read archive: {}", name, e);
                observer.on_archive_open_failed(&name, &e);
                return ArchiveResult {
                    name,
                    format: None,
                    outcome: ArchiveOutcome::OpenFailed(e),
                };
            }
        };

        let mut handler = match self
            .registry
            .open(stream.as_mut(), &self.options.open, forced)
        {
            Ok(handler) => handler,
            Err(e) => {
                warn!("{}: cannot open archive: {}", name, e);
                observer.on_archive_open_failed(&name, &e);
                return ArchiveResult {
                    name,
                    format: None,
                    outcome: ArchiveOutcome::OpenFailed(e),
                };
            }
        };
        let format = Some(handler.format_name());

        let table = match handler.table() {
            Ok(table) => table,
            Err(e) => {
                observer.on_archive_open_failed(&name, &e);
                return ArchiveResult {
                    name,
                    format,
                    outcome: ArchiveOutcome::OpenFailed(e),
                };
            }
        };
        observer.on_archive_start(&name, table.count());

        let (selection, missing) = match &selection {
            EntrySelection::All => (Selection::All, Vec::new()),
            EntrySelection::Indices(indices) => (Selection::Indices(indices.clone()), Vec::new()),
            EntrySelection::Paths(paths) => {
                let resolution = table.resolve_paths(paths);
                (Selection::Indices(resolution.indices), resolution.missing)
            }
        };
        for path in &missing {
            warn!("{}: no entry matches {}", name, path);
        }

        let result = if test_mode {
            handler.extract(&selection, true, &mut NoSinks, observer)
        } else {
            let mut sinks = ArchiveSinks {
                destination,
                archive: &name,
            };
            handler.extract(&selection, false, &mut sinks, observer)
        };
        handler.close();

        let outcome = match result {
            Ok(report) => ArchiveOutcome::Processed { report, missing },
            Err(e) => {
                warn!("{}: extraction rejected: {}", name, e);
                ArchiveOutcome::Rejected(e)
            }
        };
        ArchiveResult {
            name,
            format,
            outcome,
        }
    }
}
