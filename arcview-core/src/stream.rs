//! Input streams and output sinks.
//!
//! The host owns every stream and sink; handlers only borrow them. Input is
//! any seekable reader, output is an [`EntrySink`] handed out one entry at a
//! time by a [`SinkProvider`].

use crate::entry::EntryRecord;
use crate::error::Result;
use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// A random-access byte source.
///
/// Implemented for every `Read + Seek` type, so files, cursors and buffered
/// readers can be passed straight to a handler.
pub trait InStream: Read + Seek {}

impl<T: Read + Seek + ?Sized> InStream for T {}

/// Total length of a stream, leaving the position unchanged.
pub fn stream_len(stream: &mut (dyn InStream + '_)) -> io::Result<u64> {
    let pos = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    if pos != len {
        stream.seek(SeekFrom::Start(pos))?;
    }
    Ok(len)
}

/// Destination for the bytes of one extracted entry.
pub trait EntrySink {
    /// Write the next chunk of payload.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Called once after the last chunk of a complete payload.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called instead of `finish` when the entry failed or was cancelled.
    fn abort(&mut self) {}
}

/// Hands out one sink per entry during extraction.
pub trait SinkProvider {
    /// Sink for the entry at `index`, or `None` to skip writing it.
    ///
    /// Skipped entries are still read and verified.
    fn create_sink(
        &mut self,
        index: u32,
        entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>>;
}

/// A sink that wraps any writer.
pub struct WriteSink<W: Write> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EntrySink for WriteSink<W> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.write_all(buf)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl EntrySink for DiscardSink {
    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Provider that never hands out a sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSinks;

impl SinkProvider for NoSinks {
    fn create_sink(
        &mut self,
        _index: u32,
        _entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>> {
        Ok(None)
    }
}

/// Bytes captured for one entry by [`MemorySinks`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryOutput {
    /// Payload received so far.
    pub data: Vec<u8>,
    /// `finish` was called.
    pub finished: bool,
    /// `abort` was called.
    pub aborted: bool,
}

/// Provider collecting every entry's payload in memory, keyed by index.
#[derive(Debug, Default)]
pub struct MemorySinks {
    outputs: BTreeMap<u32, MemoryOutput>,
}

impl MemorySinks {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Output captured for `index`.
    pub fn get(&self, index: u32) -> Option<&MemoryOutput> {
        self.outputs.get(&index)
    }

    /// Completed payload for `index`.
    pub fn finished_data(&self, index: u32) -> Option<&[u8]> {
        self.outputs
            .get(&index)
            .filter(|o| o.finished)
            .map(|o| o.data.as_slice())
    }

    /// Indices a sink was created for.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.outputs.keys().copied()
    }
}

impl SinkProvider for MemorySinks {
    fn create_sink(
        &mut self,
        index: u32,
        _entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>> {
        let output = self.outputs.entry(index).or_default();
        *output = MemoryOutput::default();
        Ok(Some(Box::new(MemorySink { output })))
    }
}

struct MemorySink<'a> {
    output: &'a mut MemoryOutput,
}

impl EntrySink for MemorySink<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.output.data.extend_from_slice(buf);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.output.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.output.aborted = true;
    }
}
