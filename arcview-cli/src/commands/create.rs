//! Create command implementation.

use arcview_archive::{CpioFormat, CpioWriter};
use clap::ValueEnum;
use filetime::FileTime;
use std::fs::{File, Metadata};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// cpio variant to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CreateFormat {
    /// SVR4 "newc" (070701)
    Newc,
    /// SVR4 with checksums (070702)
    Crc,
    /// POSIX portable ASCII (070707)
    Odc,
    /// Old binary, little-endian
    BinLe,
    /// Old binary, big-endian
    BinBe,
}

impl From<CreateFormat> for CpioFormat {
    fn from(format: CreateFormat) -> Self {
        match format {
            CreateFormat::Newc => CpioFormat::Newc,
            CreateFormat::Crc => CpioFormat::NewcCrc,
            CreateFormat::Odc => CpioFormat::Odc,
            CreateFormat::BinLe => CpioFormat::BinaryLe,
            CreateFormat::BinBe => CpioFormat::BinaryBe,
        }
    }
}

pub fn cmd_create(
    archive: &Path,
    files: &[PathBuf],
    format: CreateFormat,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = CpioFormat::from(format);
    if verbose {
        eprintln!("Creating {} archive: {}", format, archive.display());
    }

    let file = File::create(archive)?;
    let mut writer = CpioWriter::new(BufWriter::new(file), format);
    for path in files {
        add_path(&mut writer, path, path, verbose)?;
    }
    writer.into_inner()?.flush()?;
    Ok(())
}

/// Stored name of `path`: relative to the parent of `base`, with `/` separators.
fn entry_name(path: &Path, base: &Path) -> String {
    path.strip_prefix(base.parent().unwrap_or(base))
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn add_path<W: Write>(
    writer: &mut CpioWriter<W>,
    path: &Path,
    base: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = std::fs::symlink_metadata(path)?;
    let name = entry_name(path, base);
    let mtime = FileTime::from_last_modification_time(&metadata).unix_seconds();
    writer.set_mtime(u64::try_from(mtime).unwrap_or(0));

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)?;
        writer.add_symlink(&name, &target.to_string_lossy())?;
        if verbose {
            println!("  Added: {} -> {}", name, target.display());
        }
    } else if metadata.is_dir() {
        writer.add_directory_with_mode(&name, permissions(&metadata, 0o755))?;
        if verbose {
            println!("  Added: {}/", name);
        }

        let mut children = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        children.sort();
        for child in &children {
            add_path(writer, child, base, verbose)?;
        }
    } else {
        let data = std::fs::read(path)?;
        writer.add_file_with_mode(&name, &data, permissions(&metadata, 0o644))?;
        if verbose {
            println!("  Added: {} ({} bytes)", name, data.len());
        }
    }
    Ok(())
}

#[cfg(unix)]
fn permissions(metadata: &Metadata, _default: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions(metadata: &Metadata, default: u32) -> u32 {
    if metadata.permissions().readonly() {
        default & !0o222
    } else {
        default
    }
}
