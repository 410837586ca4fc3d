//! Hash command implementation.

use crate::utils::{Settings, archive_jobs, exit_on_failure, print_archive_failures};
use arcview_archive::{EntrySelection, ExtractionDriver};
use arcview_core::{EntryOutcome, EntryRecord, ExtractObserver, NoSinks};
use std::path::PathBuf;

/// One line of the hash listing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HashLine {
    name: String,
    size: u64,
    crc32: Option<u32>,
}

/// Collects the CRC-32 reported for every entry.
#[derive(Default)]
struct HashCollector {
    archive: String,
    current: String,
    lines: Vec<HashLine>,
}

impl ExtractObserver for HashCollector {
    fn on_archive_start(&mut self, name: &str, _entry_count: u32) {
        self.archive = name.to_string();
    }

    fn on_entry_start(&mut self, _index: u32, entry: &EntryRecord) {
        self.current = entry.name().to_string();
    }

    fn on_entry_done(&mut self, outcome: &EntryOutcome) {
        let name = format!("{}/{}", self.archive, self.current);
        let line = match &outcome.result {
            Ok(extracted) => HashLine {
                name,
                size: extracted.bytes,
                crc32: Some(extracted.crc32),
            },
            Err(_) => HashLine {
                name,
                size: 0,
                crc32: None,
            },
        };
        self.lines.push(line);
    }
}

/// Wrapping sum of all entry CRCs, and total size.
fn combined(lines: &[HashLine]) -> (u32, u64) {
    lines.iter().fold((0u32, 0u64), |(crc, size), line| {
        (
            crc.wrapping_add(line.crc32.unwrap_or(0)),
            size + line.size,
        )
    })
}

pub fn cmd_hash(archives: &[PathBuf], settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = archive_jobs(archives, &EntrySelection::All);
    let driver = ExtractionDriver::new(settings.driver_options());
    let mut collector = HashCollector::default();
    let result = driver.run(jobs, &mut NoSinks, true, &mut collector);

    println!("{:>8} {:>12}  Name", "CRC32", "Size");
    println!("{}", "-".repeat(60));
    for line in &collector.lines {
        match line.crc32 {
            Some(crc) => println!("{:08X} {:>12}  {}", crc, line.size, line.name),
            None => println!("{:>8} {:>12}  {}", "FAILED", "", line.name),
        }
    }
    println!("{}", "-".repeat(60));

    let (crc, size) = combined(&collector.lines);
    println!("{:08X} {:>12}  CRC32 for data", crc, size);
    println!("Entries: {}", collector.lines.len());

    print_archive_failures(&result);
    exit_on_failure(result.status());
    Ok(())
}
