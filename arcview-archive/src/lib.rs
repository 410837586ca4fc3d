//! # ArcView Archive
//!
//! Archive format handlers and batch extraction for ArcView.
//!
//! This crate provides:
//!
//! - **cpio**: Handler and writer for binary, odc, newc and crc cpio archives
//! - **Registry**: Signature-based handler selection with an optional forced format
//! - **Driver**: Batch extraction and testing over many archives
//! - **Filesystem**: A directory destination with path and overwrite policies
//!
//! ## Example
//!
//! ```rust
//! use arcview_archive::cpio::{CpioFormat, CpioWriter};
//! use arcview_archive::{ArchiveJob, ExtractionDriver, DriverOptions};
//! use arcview_core::{NoSinks, NoopObserver};
//! use std::io::Cursor;
//!
//! let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
//! writer.add_file("hello.txt", b"Hello, World!").unwrap();
//! let data = writer.into_inner().unwrap();
//!
//! let driver = ExtractionDriver::new(DriverOptions::default());
//! let jobs = vec![ArchiveJob::new("hello.cpio", Cursor::new(data))];
//! let result = driver.run(jobs, &mut NoSinks, true, &mut NoopObserver);
//! assert!(result.is_success());
//! ```
//!
//! ## Format Detection
//!
//! Use [`HandlerRegistry::detect`] to find the handler for a stream, or
//! [`HandlerRegistry::open`] to detect and open in one step.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cpio;
pub mod driver;
pub mod fs;
pub mod registry;

// Re-exports
pub use cpio::{CpioFactory, CpioFormat, CpioHandler, CpioHeader, CpioWriter};
pub use driver::{
    ArchiveJob, ArchiveOutcome, ArchiveResult, BatchResult, BatchStatus, Destination,
    DriverOptions, EntrySelection, ExtractionDriver,
};
pub use fs::{
    DirectoryDestination, FileSink, OverwriteDecision, OverwriteMode, OverwritePrompt, PathMode,
};
pub use registry::HandlerRegistry;
