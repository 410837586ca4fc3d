//! Handler registry and format detection.
//!
//! The registry holds one [`HandlerFactory`] per supported format. Opening a
//! stream probes each factory in registration order (or only a forced one)
//! and hands the stream to the first handler whose signature matches.

use crate::cpio::CpioFactory;
use arcview_core::error::{ArcError, Result};
use arcview_core::handler::{FormatHandler, HandlerFactory, OpenOptions};
use arcview_core::stream::InStream;
use log::debug;
use std::io::Seek;

/// Name used in the mismatch error when no handler recognizes a stream.
const ANY_FORMAT: &str = "supported";

/// Registered format handlers.
pub struct HandlerRegistry {
    factories: Vec<Box<dyn HandlerFactory>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Registry with every built-in handler.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(CpioFactory);
        registry
    }

    /// Registry with no handlers.
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Add a factory. Later registrations are probed last.
    pub fn register(&mut self, factory: impl HandlerFactory + 'static) {
        self.factories.push(Box::new(factory));
    }

    /// Names of the registered handlers, in probe order.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Factory registered under `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&dyn HandlerFactory> {
        self.factories
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
            .map(|f| f.as_ref())
    }

    /// Name and archive offset of the first handler recognizing `stream`.
    ///
    /// The stream is rewound afterwards.
    pub fn detect(
        &self,
        stream: &mut dyn InStream,
        options: &OpenOptions,
    ) -> Result<Option<(&'static str, u64)>> {
        for factory in &self.factories {
            stream.rewind()?;
            let found = factory.probe(&mut *stream, options)?;
            if let Some(offset) = found {
                stream.rewind()?;
                return Ok(Some((factory.name(), offset)));
            }
        }
        stream.rewind()?;
        Ok(None)
    }

    /// Open `stream` with the matching handler.
    ///
    /// With `forced_format` only that handler is tried. A handler that does
    /// not recognize the stream passes it on to the next one; any other
    /// error is returned as is.
    pub fn open<'s>(
        &self,
        stream: &'s mut dyn InStream,
        options: &OpenOptions,
        forced_format: Option<&str>,
    ) -> Result<Box<dyn FormatHandler<'s> + 's>> {
        let candidates: Vec<&dyn HandlerFactory> = match forced_format {
            Some(name) => vec![self.get(name).ok_or_else(|| ArcError::unknown_format(name))?],
            None => self.factories.iter().map(|f| f.as_ref()).collect(),
        };

        let mut scanned = 0;
        for factory in &candidates {
            stream.rewind()?;
            match factory.probe(&mut *stream, options)? {
                Some(offset) => {
                    debug!("{} signature found at offset {}", factory.name(), offset);
                    stream.rewind()?;
                    let mut handler = factory.create();
                    handler.open(stream, options)?;
                    return Ok(handler);
                }
                None => scanned = options.max_check_start_position.saturating_add(1),
            }
        }

        let format = match (forced_format, candidates.first()) {
            (Some(_), Some(factory)) => factory.name(),
            _ => ANY_FORMAT,
        };
        Err(ArcError::format_mismatch(format, scanned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpio::{CpioFormat, CpioWriter};
    use std::io::Cursor;

    fn sample() -> Vec<u8> {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Newc);
        writer.add_file("a.txt", b"alpha").unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_builtin_names() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.names(), vec!["cpio"]);
        assert!(registry.get("CPIO").is_some());
        assert!(registry.get("zip").is_none());
        assert!(HandlerRegistry::empty().names().is_empty());
    }

    #[test]
    fn test_detect() {
        let registry = HandlerRegistry::new();
        let mut cursor = Cursor::new(sample());
        assert_eq!(
            registry.detect(&mut cursor, &OpenOptions::default()).unwrap(),
            Some(("cpio", 0))
        );
        assert_eq!(cursor.position(), 0);

        let mut cursor = Cursor::new(b"plain text".to_vec());
        assert_eq!(
            registry.detect(&mut cursor, &OpenOptions::default()).unwrap(),
            None
        );
    }

    #[test]
    fn test_open_detected() {
        let registry = HandlerRegistry::new();
        let mut cursor = Cursor::new(sample());
        let handler = registry
            .open(&mut cursor, &OpenOptions::default(), None)
            .unwrap();
        assert_eq!(handler.format_name(), "cpio");
        assert_eq!(handler.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_open_forced() {
        let registry = HandlerRegistry::new();
        let mut cursor = Cursor::new(sample());
        assert!(
            registry
                .open(&mut cursor, &OpenOptions::default(), Some("cpio"))
                .is_ok()
        );

        let mut cursor = Cursor::new(sample());
        let err = registry
            .open(&mut cursor, &OpenOptions::default(), Some("rar"))
            .err()
            .unwrap();
        assert!(matches!(err, ArcError::UnknownFormat { .. }));
    }

    #[test]
    fn test_open_mismatch() {
        let registry = HandlerRegistry::new();
        let mut cursor = Cursor::new(vec![0xFFu8; 300]);
        let err = registry
            .open(&mut cursor, &OpenOptions::default(), None)
            .err()
            .unwrap();
        assert!(err.is_format_mismatch());

        let err = HandlerRegistry::empty()
            .open(&mut cursor, &OpenOptions::default(), None)
            .err()
            .unwrap();
        assert!(err.is_format_mismatch());
    }
}
