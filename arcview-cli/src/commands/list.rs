//! List command implementation.

use crate::utils::{Settings, filter_entries, open_reader, print_entries, unix_mtime};
use arcview_archive::HandlerRegistry;
use arcview_core::{ArchivePropertyKind, EntryRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// JSON serializable entry data for archive listings.
#[derive(Debug, Serialize, Deserialize)]
struct EntryJson {
    index: u32,
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<u32>,
    is_dir: bool,
}

impl EntryJson {
    fn from_entry(index: u32, entry: &EntryRecord) -> Self {
        Self {
            index,
            name: entry.name().to_string(),
            kind: format!("{:?}", entry.kind()).to_lowercase(),
            size: entry.size(),
            mode: format!("{:o}", entry.mode().bits()),
            mtime: unix_mtime(entry),
            link_target: entry.link_target().map(str::to_string),
            checksum: entry.checksum(),
            is_dir: entry.is_dir(),
        }
    }
}

/// JSON output for archive listing.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveListJson {
    archive: String,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtype: Option<String>,
    unexpected_end: bool,
    entries: Vec<EntryJson>,
}

pub fn cmd_list(
    archive: &Path,
    settings: &Settings,
    verbose: bool,
    json: bool,
    include: &[String],
    exclude: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open_reader(archive)?;
    let registry = HandlerRegistry::new();
    let mut handler = registry.open(
        &mut reader,
        &settings.open_options(),
        settings.forced_format.as_deref(),
    )?;

    let table = handler.table()?;
    let entries = filter_entries(&table, include, exclude);
    let subtype = handler.archive_property(ArchivePropertyKind::Subtype)?;
    let unexpected_end = handler
        .archive_property(ArchivePropertyKind::UnexpectedEnd)?
        .as_bool()
        .unwrap_or(false);

    if json {
        let listing = ArchiveListJson {
            archive: archive.display().to_string(),
            format: handler.format_name().to_string(),
            subtype: subtype.as_str().map(str::to_string),
            unexpected_end,
            entries: entries
                .iter()
                .map(|(index, entry)| EntryJson::from_entry(*index, entry))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        if verbose {
            println!("Archive: {}", archive.display());
            println!("Format: {} ({})", handler.format_name(), subtype);
            println!();
        }
        print_entries(&entries, verbose);
        if unexpected_end {
            eprintln!("Warning: unexpected end of archive");
        }
    }

    handler.close();
    Ok(())
}
