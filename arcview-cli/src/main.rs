//! ArcView CLI - list, test, hash, extract and create cpio archives.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{
    CreateFormat, ExtractOptions, OverwriteArg, PathModeArg, cmd_create, cmd_extract, cmd_hash,
    cmd_info, cmd_list, cmd_test,
};
use std::path::PathBuf;
use utils::Settings;

#[derive(Parser)]
#[command(name = "arcview")]
#[command(author, version, about = "ArcView - archive browser and extractor")]
#[command(long_about = "
ArcView opens archives through format handlers and extracts them in batches.
Supported formats: cpio (binary, odc, newc, crc)

Examples:
  arcview list archive.cpio
  arcview list --json archive.cpio
  arcview test a.cpio b.cpio
  arcview hash archive.cpio
  arcview extract archive.cpio -o out
  arcview extract a.cpio b.cpio --subdir -- docs/readme.txt
  arcview create archive.cpio src/ README.md
")]
struct Cli {
    /// Maximum offset at which an archive signature is searched for
    #[arg(long, global = true, default_value_t = 0, value_name = "BYTES")]
    max_scan: u64,

    /// Only try this archive format
    #[arg(
        id = "forced_type",
        short = 't',
        long = "type",
        global = true,
        value_name = "FORMAT"
    )]
    forced_type: Option<String>,

    /// Increase log output (-d info, -dd debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,
    },

    /// Show information about an archive
    #[command(alias = "i")]
    Info {
        /// Archive file to inspect
        archive: PathBuf,
    },

    /// Test archive integrity
    #[command(alias = "t")]
    Test {
        /// Archive files to test
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the CRC-32 of every entry
    Hash {
        /// Archive files to hash
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },

    /// Extract files from archives
    #[command(alias = "x")]
    Extract {
        /// Archive files to extract
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Paths to extract, after `--` (all if empty)
        #[arg(last = true)]
        files: Vec<String>,

        /// What to do when an output file already exists
        #[arg(long, value_enum, default_value = "ask")]
        overwrite: OverwriteArg,

        /// How stored paths map to output paths
        #[arg(long, value_enum, default_value = "full")]
        path_mode: PathModeArg,

        /// Extract each archive into its own subdirectory
        #[arg(long)]
        subdir: bool,

        /// Do not restore permission bits
        #[arg(long)]
        no_permissions: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long, default_value = "true")]
        progress: bool,
    },

    /// Create a new archive
    #[command(alias = "c")]
    Create {
        /// Output archive file
        archive: PathBuf,

        /// Files to add to the archive
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Archive variant
        #[arg(short, long, value_enum, default_value = "newc")]
        format: CreateFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    utils::init_logging(cli.debug);

    let settings = Settings {
        max_scan: cli.max_scan,
        forced_format: cli.forced_type,
    };

    let result = match cli.command {
        Commands::List {
            archive,
            verbose,
            json,
            include,
            exclude,
        } => cmd_list(&archive, &settings, verbose, json, &include, &exclude),
        Commands::Info { archive } => cmd_info(&archive, &settings),
        Commands::Test { archives, verbose } => cmd_test(&archives, &settings, verbose),
        Commands::Hash { archives } => cmd_hash(&archives, &settings),
        Commands::Extract {
            archives,
            output,
            files,
            overwrite,
            path_mode,
            subdir,
            no_permissions,
            verbose,
            progress,
        } => cmd_extract(
            &archives,
            &settings,
            &ExtractOptions {
                output,
                files,
                overwrite,
                path_mode,
                subdir,
                preserve_permissions: !no_permissions,
                verbose,
                progress,
            },
        ),
        Commands::Create {
            archive,
            files,
            format,
            verbose,
        } => cmd_create(&archive, &files, format, verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_paths_after_separator() {
        let cli = Cli::parse_from([
            "arcview", "-dd", "--max-scan", "4096", "extract", "a.cpio", "b.cpio", "--subdir",
            "--", "docs/readme.txt",
        ]);
        assert_eq!(cli.debug, 2);
        assert_eq!(cli.max_scan, 4096);
        match cli.command {
            Commands::Extract {
                archives,
                files,
                subdir,
                overwrite,
                ..
            } => {
                assert_eq!(archives.len(), 2);
                assert_eq!(files, vec!["docs/readme.txt"]);
                assert!(subdir);
                assert_eq!(overwrite, OverwriteArg::Ask);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_global_type_after_subcommand() {
        let cli = Cli::parse_from(["arcview", "list", "a.cpio", "-t", "cpio"]);
        assert_eq!(cli.forced_type.as_deref(), Some("cpio"));
    }

    #[test]
    fn test_create_format_alongside_type() {
        let cli = Cli::parse_from(["arcview", "create", "a.cpio", "f.txt", "-f", "odc"]);
        assert_eq!(cli.forced_type, None);
        match cli.command {
            Commands::Create { format, files, .. } => {
                assert_eq!(format, CreateFormat::Odc);
                assert_eq!(files, vec![PathBuf::from("f.txt")]);
            }
            _ => panic!("expected create"),
        }

        let cli = Cli::parse_from(["arcview", "-t", "cpio", "create", "a.cpio", "f.txt"]);
        assert_eq!(cli.forced_type.as_deref(), Some("cpio"));
        match cli.command {
            Commands::Create { format, .. } => assert_eq!(format, CreateFormat::Newc),
            _ => panic!("expected create"),
        }
    }
}
