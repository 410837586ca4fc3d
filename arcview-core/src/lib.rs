//! # ArcView Core
//!
//! Core components for the ArcView archive library.
//!
//! This crate defines the container model every archive format backend is
//! built on:
//!
//! - [`entry`]: Immutable entry records and normalized mode bits
//! - [`table`]: Index-stable entry tables built once per open
//! - [`property`]: Typed property queries for entries and archives
//! - [`stream`]: Input stream, output sink and sink provider contracts
//! - [`handler`]: The `FormatHandler` contract, observers and extraction reports
//! - [`extract`]: Chunked payload copying and the shared extraction loop
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Host: CLI / UI                                          │
//! │     builds options, owns streams and sinks              │
//! ├─────────────────────────────────────────────────────────┤
//! │ Extraction Driver                                       │
//! │     batches archives, translates paths, aggregates      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Format Handler (cpio, ...)                              │
//! │     open / property / extract / close                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Container model (this crate)                            │
//! │     EntryRecord, EntryTable, PropertyValue, sinks       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use arcview_core::entry::EntryRecord;
//! use arcview_core::property::PropertyKind;
//! use arcview_core::table::EntryTable;
//!
//! let table = EntryTable::new(vec![
//!     EntryRecord::directory("docs/"),
//!     EntryRecord::file("docs/readme.txt", 42),
//! ]);
//!
//! let index = table.find("docs/readme.txt").unwrap();
//! let size = table[index].property(PropertyKind::Size);
//! assert_eq!(size.as_u64(), Some(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod entry;
pub mod error;
pub mod extract;
pub mod handler;
pub mod property;
pub mod stream;
pub mod table;

// Re-exports for convenience
pub use entry::{EntryKind, EntryRecord, FileMode};
pub use error::{ArcError, DecodeFailure, Result};
pub use extract::{CHUNK_SIZE, CopyStatus, PayloadDigest, copy_payload, run_extraction};
pub use handler::{
    EntryOutcome, ExtractObserver, ExtractReport, ExtractStatus, ExtractedEntry, FormatHandler,
    HandlerFactory, HandlerState, NoopObserver, OpenOptions, OpenOutcome, Selection,
};
pub use property::{ArchivePropertyKind, PropertyKind, PropertyValue};
pub use stream::{
    DiscardSink, EntrySink, InStream, MemoryOutput, MemorySinks, NoSinks, SinkProvider,
    WriteSink, stream_len,
};
pub use table::{EntryTable, PathResolution};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::entry::{EntryKind, EntryRecord, FileMode};
    pub use crate::error::{ArcError, Result};
    pub use crate::handler::{
        ExtractObserver, ExtractReport, FormatHandler, OpenOptions, Selection,
    };
    pub use crate::property::{PropertyKind, PropertyValue};
    pub use crate::stream::{EntrySink, InStream, SinkProvider};
    pub use crate::table::EntryTable;
}
