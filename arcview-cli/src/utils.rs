//! Utility functions for the CLI.

use arcview_archive::{ArchiveJob, ArchiveOutcome, BatchResult, BatchStatus, DriverOptions};
use arcview_core::{EntryOutcome, EntryRecord, EntryTable, ExtractObserver, OpenOptions};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Signature scan bound in bytes.
    pub max_scan: u64,
    /// Handler name forced with `-t`.
    pub forced_format: Option<String>,
}

impl Settings {
    /// Open options for a single handler open.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::with_max_check_start_position(self.max_scan)
    }

    /// Driver options for a batch.
    pub fn driver_options(&self) -> DriverOptions {
        let options = DriverOptions::default()
            .with_open_options(self.open_options())
            .with_sorted_archives(true);
        match &self.forced_format {
            Some(name) => options.with_forced_format(name.clone()),
            None => options,
        }
    }
}

/// Install `env_logger`, raising the default filter with each `-d`.
pub fn init_logging(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Open an archive file for reading.
pub fn open_reader(path: &Path) -> Result<BufReader<File>, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(BufReader::new(file))
}

/// One batch job per archive path, all sharing `selection`.
///
/// Files that cannot be opened still get a job, so the batch reports them
/// as failed archives and goes on with the rest.
pub fn archive_jobs(
    archives: &[PathBuf],
    selection: &arcview_archive::EntrySelection,
) -> Vec<ArchiveJob<'static>> {
    archives
        .iter()
        .map(|path| {
            let name = path.display().to_string();
            let job = match File::open(path) {
                Ok(file) => ArchiveJob::new(name, BufReader::new(file)),
                Err(e) => ArchiveJob::unopened(name, e),
            };
            job.with_selection(selection.clone())
        })
        .collect()
}

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Check if a name matches the filter patterns.
/// - If include patterns are specified, the name must match at least one
/// - If exclude patterns are specified, the name must not match any
pub fn matches_filters(name: &str, include: &[String], exclude: &[String]) -> bool {
    // Check exclude patterns first
    for pattern_str in exclude {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches(name) {
                return false;
            }
        }
    }

    if include.is_empty() {
        return true;
    }

    for pattern_str in include {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches(name) {
                return true;
            }
        }
    }

    false
}

/// Entries of `table` passing the filters, with their indices.
pub fn filter_entries<'t>(
    table: &'t EntryTable,
    include: &[String],
    exclude: &[String],
) -> Vec<(u32, &'t EntryRecord)> {
    (0u32..)
        .zip(table.iter())
        .filter(|(_, e)| matches_filters(e.name(), include, exclude))
        .collect()
}

/// Modification time as seconds since the Unix epoch.
pub fn unix_mtime(entry: &EntryRecord) -> Option<u64> {
    entry
        .mtime()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

/// Print entries in a formatted table.
pub fn print_entries(entries: &[(u32, &EntryRecord)], verbose: bool) {
    if verbose {
        println!("{:<10} {:>10} {:>12}  Name", "Mode", "Size", "Modified");
        println!("{}", "-".repeat(60));

        let mut total_size = 0u64;
        for (_, entry) in entries {
            let size = entry.size().unwrap_or(0);
            let mtime = unix_mtime(entry).map_or_else(|| "-".to_string(), |t| t.to_string());
            match entry.link_target() {
                Some(target) => println!(
                    "{:<10} {:>10} {:>12}  {} -> {}",
                    entry.mode().to_string(),
                    size,
                    mtime,
                    entry.name(),
                    target
                ),
                None => println!(
                    "{:<10} {:>10} {:>12}  {}",
                    entry.mode().to_string(),
                    size,
                    mtime,
                    entry.name()
                ),
            }
            total_size += size;
        }

        println!("{}", "-".repeat(60));
        println!("{:<10} {:>10} {:>12}  {} entries", "", total_size, "", entries.len());
    } else {
        for (_, entry) in entries {
            println!("{}", entry.name());
        }
    }
}

/// Observer driving a progress bar and collecting per-entry failures.
pub struct ProgressObserver {
    pb: ProgressBar,
    verbose: bool,
    archive: String,
    current: String,
    /// `(archive, entry, error)` for every failed entry.
    pub errors: Vec<(String, String, String)>,
    /// Entries that finished without error.
    pub ok_count: usize,
}

impl ProgressObserver {
    /// Observer drawing `pb`, printing each entry when `verbose`.
    pub fn new(pb: ProgressBar, verbose: bool) -> Self {
        Self {
            pb,
            verbose,
            archive: String::new(),
            current: String::new(),
            errors: Vec::new(),
            ok_count: 0,
        }
    }

    /// Remove the progress bar.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    fn say(&self, line: String) {
        if self.pb.is_hidden() {
            println!("{}", line);
        } else {
            self.pb.println(line);
        }
    }
}

impl ExtractObserver for ProgressObserver {
    fn on_archive_start(&mut self, name: &str, entry_count: u32) {
        self.archive = name.to_string();
        self.pb.set_length(u64::from(entry_count));
        self.pb.set_position(0);
        self.pb.set_message(name.to_string());
        if self.verbose {
            self.say(format!("{}:", name));
        }
    }

    fn on_entry_start(&mut self, _index: u32, entry: &EntryRecord) {
        self.current = entry.name().to_string();
    }

    fn on_entry_done(&mut self, outcome: &EntryOutcome) {
        self.pb.inc(1);
        match &outcome.result {
            Ok(_) => {
                self.ok_count += 1;
                if self.verbose {
                    self.say(format!("  OK: {}", self.current));
                }
            }
            Err(e) => {
                if self.verbose {
                    self.say(format!("  FAILED: {} - {}", self.current, e));
                }
                self.errors
                    .push((self.archive.clone(), self.current.clone(), e.to_string()));
            }
        }
    }
}

/// Print the archives whose open or extract call failed, and unmatched paths.
pub fn print_archive_failures(result: &BatchResult) {
    for archive in &result.archives {
        match &archive.outcome {
            ArchiveOutcome::OpenFailed(e) | ArchiveOutcome::Rejected(e) => {
                eprintln!("{}: {}", archive.name, e);
            }
            ArchiveOutcome::Processed { missing, .. } => {
                for path in missing {
                    eprintln!("{}: no entry named {}", archive.name, path);
                }
            }
        }
    }
}

/// Exit with the batch status code unless the batch succeeded.
pub fn exit_on_failure(status: BatchStatus) {
    match status {
        BatchStatus::Success => {}
        BatchStatus::Failure => std::process::exit(2),
        BatchStatus::Cancelled => std::process::exit(255),
    }
}
