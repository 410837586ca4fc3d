//! Extract command implementation.

use crate::utils::{
    ProgressObserver, Settings, archive_jobs, create_progress_bar, exit_on_failure,
    print_archive_failures,
};
use arcview_archive::{
    DirectoryDestination, EntrySelection, ExtractionDriver, OverwriteDecision, OverwriteMode,
    OverwritePrompt, PathMode,
};
use arcview_core::EntryRecord;
use clap::ValueEnum;
use dialoguer::Select;
use log::debug;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Policy for output files that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverwriteArg {
    /// Ask for each file (skips when not interactive)
    Ask,
    /// Replace existing files
    Overwrite,
    /// Keep existing files
    Skip,
    /// Write the extracted file under a new name
    Rename,
    /// Move the existing file to a new name
    RenameExisting,
}

impl From<OverwriteArg> for OverwriteMode {
    fn from(arg: OverwriteArg) -> Self {
        match arg {
            OverwriteArg::Ask => OverwriteMode::Ask,
            OverwriteArg::Overwrite => OverwriteMode::Overwrite,
            OverwriteArg::Skip => OverwriteMode::Skip,
            OverwriteArg::Rename => OverwriteMode::AutoRename,
            OverwriteArg::RenameExisting => OverwriteMode::AutoRenameExisting,
        }
    }
}

/// How stored paths map to output paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PathModeArg {
    /// Keep the stored directory structure
    Full,
    /// Write every file directly into the output directory
    None,
}

impl From<PathModeArg> for PathMode {
    fn from(arg: PathModeArg) -> Self {
        match arg {
            PathModeArg::Full => PathMode::FullPaths,
            PathModeArg::None => PathMode::NoPaths,
        }
    }
}

/// Options for extracting archives.
pub struct ExtractOptions {
    pub output: PathBuf,
    pub files: Vec<String>,
    pub overwrite: OverwriteArg,
    pub path_mode: PathModeArg,
    pub subdir: bool,
    pub preserve_permissions: bool,
    pub verbose: bool,
    pub progress: bool,
}

/// Interactive overwrite question on the terminal.
struct ConsolePrompt;

impl OverwritePrompt for ConsolePrompt {
    fn ask(&mut self, existing: &Path, entry: &EntryRecord) -> OverwriteDecision {
        let items = ["Yes", "Yes to all", "No", "No to all", "Auto rename", "Cancel"];
        let choice = Select::new()
            .with_prompt(format!(
                "{} already exists. Overwrite with {}?",
                existing.display(),
                entry.name()
            ))
            .items(&items)
            .default(2)
            .interact_opt();

        match choice {
            Ok(Some(index)) => decision(index),
            Ok(None) => OverwriteDecision::Cancel,
            Err(_) => OverwriteDecision::Skip,
        }
    }
}

/// Map a prompt item to a decision.
fn decision(index: usize) -> OverwriteDecision {
    match index {
        0 => OverwriteDecision::Overwrite,
        1 => OverwriteDecision::OverwriteAll,
        3 => OverwriteDecision::SkipAll,
        4 => OverwriteDecision::Rename,
        5 => OverwriteDecision::Cancel,
        _ => OverwriteDecision::Skip,
    }
}

fn selection(files: &[String]) -> EntrySelection {
    if files.is_empty() {
        EntrySelection::All
    } else {
        EntrySelection::Paths(files.to_vec())
    }
}

pub fn cmd_extract(
    archives: &[PathBuf],
    settings: &Settings,
    options: &ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&options.output)?;

    let jobs = archive_jobs(archives, &selection(&options.files));
    let mut destination = DirectoryDestination::new(&options.output)
        .with_path_mode(options.path_mode.into())
        .with_overwrite(options.overwrite.into())
        .with_archive_subdir(options.subdir)
        .with_preserve_permissions(options.preserve_permissions);
    let prompting = options.overwrite == OverwriteArg::Ask && std::io::stdin().is_terminal();
    if prompting {
        destination = destination.with_prompt(ConsolePrompt);
    }

    let pb = create_progress_bar(0, options.progress && !prompting);
    let mut observer = ProgressObserver::new(pb, options.verbose);

    debug!(
        "extracting {} archive(s) into {}",
        archives.len(),
        options.output.display()
    );
    let driver = ExtractionDriver::new(settings.driver_options());
    let result = driver.run(jobs, &mut destination, false, &mut observer);
    observer.finish();

    println!(
        "Extracted {} entries to {}",
        observer.ok_count,
        options.output.display()
    );
    if !observer.errors.is_empty() && !options.verbose {
        eprintln!("Errors:");
        for (archive, name, err) in &observer.errors {
            eprintln!("  {}: {}: {}", archive, name, err);
        }
    }
    print_archive_failures(&result);

    exit_on_failure(result.status());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_files() {
        assert_eq!(selection(&[]), EntrySelection::All);
        assert_eq!(
            selection(&["a/b".to_string()]),
            EntrySelection::Paths(vec!["a/b".to_string()])
        );
    }

    #[test]
    fn test_prompt_items_map_to_decisions() {
        assert_eq!(decision(0), OverwriteDecision::Overwrite);
        assert_eq!(decision(2), OverwriteDecision::Skip);
        assert_eq!(decision(4), OverwriteDecision::Rename);
        assert_eq!(decision(5), OverwriteDecision::Cancel);
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(OverwriteMode::from(OverwriteArg::Rename), OverwriteMode::AutoRename);
        assert_eq!(
            OverwriteMode::from(OverwriteArg::RenameExisting),
            OverwriteMode::AutoRenameExisting
        );
        assert_eq!(PathMode::from(PathModeArg::None), PathMode::NoPaths);
    }
}
