//! Test command implementation.

use crate::utils::{
    ProgressObserver, Settings, archive_jobs, create_progress_bar, exit_on_failure,
    print_archive_failures,
};
use arcview_archive::{BatchResult, EntrySelection, ExtractionDriver};
use arcview_core::NoSinks;
use std::path::PathBuf;

/// One line per archive the driver actually processed, in its order.
fn testing_lines(result: &BatchResult) -> Vec<String> {
    result
        .archives
        .iter()
        .map(|archive| match archive.format {
            Some(format) => format!("Testing {} ({})", archive.name, format),
            None => format!("Testing {}", archive.name),
        })
        .collect()
}

pub fn cmd_test(
    archives: &[PathBuf],
    settings: &Settings,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = archive_jobs(archives, &EntrySelection::All);
    let driver = ExtractionDriver::new(settings.driver_options());
    let mut observer = ProgressObserver::new(create_progress_bar(0, false), verbose);

    let result = driver.run(jobs, &mut NoSinks, true, &mut observer);
    observer.finish();

    for line in testing_lines(&result) {
        println!("{}", line);
    }

    println!();
    println!("Test results:");
    println!("  Archives: {}", result.archives.len());
    println!("  Total entries: {}", observer.ok_count + result.failed_entries());
    println!("  OK: {}", observer.ok_count);
    println!("  Failed: {}", result.failed_entries());

    if !observer.errors.is_empty() && !verbose {
        println!();
        println!("Errors:");
        for (archive, name, err) in &observer.errors {
            println!("  {}: {}: {}", archive, name, err);
        }
    }
    print_archive_failures(&result);

    exit_on_failure(result.status());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcview_archive::{ArchiveJob, CpioFormat, CpioWriter, DriverOptions};
    use arcview_core::NoopObserver;
    use std::io::Cursor;

    fn archive() -> Cursor<Vec<u8>> {
        let mut writer = CpioWriter::new(Vec::new(), CpioFormat::Odc);
        writer.add_file("a.txt", b"data").unwrap();
        Cursor::new(writer.into_inner().unwrap())
    }

    #[test]
    fn test_testing_lines_follow_processing_order() {
        let jobs = vec![
            ArchiveJob::new("b.cpio", archive()),
            ArchiveJob::new("a.cpio", archive()),
            ArchiveJob::new("b.cpio", archive()),
        ];
        let driver = ExtractionDriver::new(DriverOptions::default().with_sorted_archives(true));
        let result = driver.run(jobs, &mut NoSinks, true, &mut NoopObserver);

        assert_eq!(
            testing_lines(&result),
            vec!["Testing a.cpio (cpio)", "Testing b.cpio (cpio)"]
        );
    }
}
