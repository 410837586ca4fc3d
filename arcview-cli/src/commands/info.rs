//! Info command implementation.

use crate::utils::{Settings, open_reader};
use arcview_archive::HandlerRegistry;
use arcview_core::{ArchivePropertyKind, EntryKind};
use std::path::Path;

const ARCHIVE_PROPERTIES: [(&str, ArchivePropertyKind); 6] = [
    ("Type", ArchivePropertyKind::Subtype),
    ("Offset", ArchivePropertyKind::Offset),
    ("Physical size", ArchivePropertyKind::PhysicalSize),
    ("Headers size", ArchivePropertyKind::HeadersSize),
    ("Entries", ArchivePropertyKind::EntryCount),
    ("Unexpected end", ArchivePropertyKind::UnexpectedEnd),
];

pub fn cmd_info(archive: &Path, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = std::fs::metadata(archive)?;
    let mut reader = open_reader(archive)?;
    let registry = HandlerRegistry::new();
    let mut handler = registry.open(
        &mut reader,
        &settings.open_options(),
        settings.forced_format.as_deref(),
    )?;

    println!("Archive Information");
    println!("===================");
    println!("File: {}", archive.display());
    println!("Format: {}", handler.format_name());
    println!("Size: {} bytes", metadata.len());
    for (label, kind) in ARCHIVE_PROPERTIES {
        let value = handler.archive_property(kind)?;
        if !value.is_empty() {
            println!("{}: {}", label, value);
        }
    }

    let table = handler.table()?;
    let count = |kind: EntryKind| table.iter().filter(|e| e.kind() == kind).count();

    println!();
    println!("Contents:");
    println!("  Files: {}", count(EntryKind::File));
    println!("  Directories: {}", count(EntryKind::Directory));
    println!("  Symlinks: {}", count(EntryKind::Symlink));
    let other = table.len()
        - count(EntryKind::File)
        - count(EntryKind::Directory)
        - count(EntryKind::Symlink);
    if other > 0 {
        println!("  Other: {}", other);
    }
    println!("  Total size: {} bytes", table.total_size());

    handler.close();
    Ok(())
}
