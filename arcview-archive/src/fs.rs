//! Extraction into a directory tree.
//!
//! [`DirectoryDestination`] turns entry records into files on disk: it maps
//! stored paths to output paths, applies the overwrite policy, creates
//! directories and links, and hands out a [`FileSink`] per regular file.

use crate::driver::Destination;
use arcview_core::entry::{EntryKind, EntryRecord};
use arcview_core::error::{ArcError, Result};
use arcview_core::stream::EntrySink;
use filetime::FileTime;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// How stored paths map to output paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMode {
    /// Keep the stored directory structure.
    #[default]
    FullPaths,
    /// Write every file directly into the output directory.
    NoPaths,
}

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Ask the prompt; without one, keep the existing file.
    #[default]
    Ask,
    /// Replace the existing file.
    Overwrite,
    /// Keep the existing file and skip the entry.
    Skip,
    /// Write the entry under a new name.
    AutoRename,
    /// Rename the existing file, then write the entry.
    AutoRenameExisting,
}

/// Answer from an [`OverwritePrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteDecision {
    /// Replace this file.
    Overwrite,
    /// Replace this and every later file.
    OverwriteAll,
    /// Keep this file.
    Skip,
    /// Keep this and every later file.
    SkipAll,
    /// Write the entry under a new name.
    Rename,
    /// Stop the whole extraction.
    Cancel,
}

/// Asks the user about existing files.
pub trait OverwritePrompt {
    /// Decide what to do with `existing` when extracting `entry`.
    fn ask(&mut self, existing: &Path, entry: &EntryRecord) -> OverwriteDecision;
}

/// Writes entries below a root directory.
pub struct DirectoryDestination {
    root: PathBuf,
    path_mode: PathMode,
    overwrite: OverwriteMode,
    archive_subdir: bool,
    preserve_permissions: bool,
    prompt: Option<Box<dyn OverwritePrompt>>,
}

impl DirectoryDestination {
    /// Destination writing below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            path_mode: PathMode::default(),
            overwrite: OverwriteMode::default(),
            archive_subdir: false,
            preserve_permissions: true,
            prompt: None,
        }
    }

    /// Set the path mode.
    pub fn with_path_mode(mut self, mode: PathMode) -> Self {
        self.path_mode = mode;
        self
    }

    /// Set the overwrite policy.
    pub fn with_overwrite(mut self, mode: OverwriteMode) -> Self {
        self.overwrite = mode;
        self
    }

    /// Extract each archive into `root/<archive stem>/`.
    pub fn with_archive_subdir(mut self, enabled: bool) -> Self {
        self.archive_subdir = enabled;
        self
    }

    /// Apply stored permission bits (Unix only).
    pub fn with_preserve_permissions(mut self, enabled: bool) -> Self {
        self.preserve_permissions = enabled;
        self
    }

    /// Prompt used by [`OverwriteMode::Ask`].
    pub fn with_prompt(mut self, prompt: impl OverwritePrompt + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output path for an entry, before overwrite handling.
    ///
    /// Returns `None` for entries that map to nothing (e.g. `./`).
    pub fn output_path(&self, archive: &str, entry: &EntryRecord) -> Option<PathBuf> {
        if entry.validate_path().is_err() {
            warn!("{}: unsafe path {:?}, sanitizing", archive, entry.name());
        }
        let sanitized = entry.sanitized_name();
        let relative = match self.path_mode {
            PathMode::FullPaths => sanitized,
            PathMode::NoPaths => sanitized.rsplit('/').next().unwrap_or_default().to_string(),
        };
        if relative.is_empty() {
            return None;
        }

        let mut base = self.root.clone();
        if self.archive_subdir {
            base.push(archive_stem(archive));
        }
        Some(base.join(relative))
    }

    /// Apply the overwrite policy; `None` means skip the entry.
    fn resolve_existing(&mut self, path: PathBuf, entry: &EntryRecord) -> Result<Option<PathBuf>> {
        if fs::symlink_metadata(&path).is_err() {
            return Ok(Some(path));
        }

        let mode = match self.overwrite {
            OverwriteMode::Ask => match self.prompt.as_mut() {
                Some(prompt) => match prompt.ask(&path, entry) {
                    OverwriteDecision::Overwrite => OverwriteMode::Overwrite,
                    OverwriteDecision::OverwriteAll => {
                        self.overwrite = OverwriteMode::Overwrite;
                        OverwriteMode::Overwrite
                    }
                    OverwriteDecision::Skip => OverwriteMode::Skip,
                    OverwriteDecision::SkipAll => {
                        self.overwrite = OverwriteMode::Skip;
                        OverwriteMode::Skip
                    }
                    OverwriteDecision::Rename => OverwriteMode::AutoRename,
                    OverwriteDecision::Cancel => return Err(ArcError::Cancelled),
                },
                None => OverwriteMode::Skip,
            },
            mode => mode,
        };

        match mode {
            OverwriteMode::Overwrite => {
                remove_existing(&path)?;
                Ok(Some(path))
            }
            OverwriteMode::AutoRename => Ok(Some(unique_path(&path))),
            OverwriteMode::AutoRenameExisting => {
                let renamed = unique_path(&path);
                debug!("renaming {} to {}", path.display(), renamed.display());
                fs::rename(&path, &renamed)?;
                Ok(Some(path))
            }
            OverwriteMode::Skip | OverwriteMode::Ask => {
                debug!("skipping existing {}", path.display());
                Ok(None)
            }
        }
    }

    fn create_link(&mut self, archive: &str, path: PathBuf, entry: &EntryRecord) -> Result<()> {
        let Some(target) = entry.link_target() else {
            warn!("{}: link {} has no target", archive, entry.name());
            return Ok(());
        };
        let escapes = Path::new(target)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            warn!("{}: skipping link {} -> {}", archive, entry.name(), target);
            return Ok(());
        }

        let Some(path) = self.resolve_existing(path, entry)? else {
            return Ok(());
        };
        create_parent(&path)?;
        make_symlink(target, &path)
    }
}

impl Destination for DirectoryDestination {
    fn create_sink(
        &mut self,
        archive: &str,
        _index: u32,
        entry: &EntryRecord,
    ) -> Result<Option<Box<dyn EntrySink + '_>>> {
        let Some(path) = self.output_path(archive, entry) else {
            return Ok(None);
        };

        match entry.kind() {
            EntryKind::Directory => {
                if self.path_mode == PathMode::FullPaths {
                    fs::create_dir_all(&path)?;
                }
                Ok(None)
            }
            EntryKind::Symlink => {
                self.create_link(archive, path, entry)?;
                Ok(None)
            }
            EntryKind::File | EntryKind::Hardlink | EntryKind::Unknown => {
                let Some(path) = self.resolve_existing(path, entry)? else {
                    return Ok(None);
                };
                create_parent(&path)?;
                let mode = self
                    .preserve_permissions
                    .then_some(entry.mode().permissions());
                let sink = FileSink::create(path, entry.mtime(), mode)?;
                Ok(Some(Box::new(sink)))
            }
            kind => {
                warn!("{}: skipping {:?} entry {}", archive, kind, entry.name());
                Ok(None)
            }
        }
    }
}

/// Writes one file; removes it again when aborted.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    mtime: Option<SystemTime>,
    mode: Option<u32>,
}

impl FileSink {
    /// Create (truncate) the file at `path`.
    pub fn create(path: PathBuf, mtime: Option<SystemTime>, mode: Option<u32>) -> Result<Self> {
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            mtime,
            mode,
        })
    }

    /// Path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntrySink for FileSink {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => Ok(writer.write_all(buf)?),
            None => Err(ArcError::unsupported("write after finish")),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        if let Some(mtime) = self.mtime {
            filetime::set_file_mtime(&self.path, FileTime::from_system_time(mtime))?;
        }
        if let Some(mode) = self.mode {
            set_permissions(&self.path, mode)?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("cannot remove partial file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Archive file name without directories and extension.
fn archive_stem(archive: &str) -> String {
    let path = Path::new(archive);
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.to_string())
}

/// First `name (n).ext` next to `path` that does not exist yet.
fn unique_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{} ({}){}", stem, n, ext));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        n += 1;
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn remove_existing(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        return Err(ArcError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} is a directory", path.display()),
        )));
    }
    fs::remove_file(path)?;
    Ok(())
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &str, path: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, path)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_symlink(target: &str, path: &Path) -> Result<()> {
    warn!("symbolic links unsupported here, skipping {} -> {}", path.display(), target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Always(OverwriteDecision);

    impl OverwritePrompt for Always {
        fn ask(&mut self, _existing: &Path, _entry: &EntryRecord) -> OverwriteDecision {
            self.0
        }
    }

    fn write_entry(dest: &mut DirectoryDestination, name: &str, data: &[u8]) -> Option<PathBuf> {
        let entry = EntryRecord::file(name, data.len() as u64);
        let path = dest.output_path("test.cpio", &entry);
        let mut sink = dest.create_sink("test.cpio", 0, &entry).unwrap()?;
        sink.write(data).unwrap();
        sink.finish().unwrap();
        path
    }

    #[test]
    fn test_output_path_modes() {
        let dest = DirectoryDestination::new("/out");
        let entry = EntryRecord::file("a/b/c.txt", 1);
        assert_eq!(
            dest.output_path("x.cpio", &entry),
            Some(PathBuf::from("/out/a/b/c.txt"))
        );

        let dest = DirectoryDestination::new("/out")
            .with_path_mode(PathMode::NoPaths)
            .with_archive_subdir(true);
        assert_eq!(
            dest.output_path("dir/x.cpio", &entry),
            Some(PathBuf::from("/out/x/c.txt"))
        );

        let traversal = EntryRecord::file("../../etc/passwd", 1);
        let dest = DirectoryDestination::new("/out");
        assert_eq!(
            dest.output_path("x.cpio", &traversal),
            Some(PathBuf::from("/out/etc/passwd"))
        );
        assert_eq!(dest.output_path("x.cpio", &EntryRecord::directory("./")), None);
    }

    #[test]
    fn test_write_file_and_mtime() {
        let tmp = TempDir::new().unwrap();
        let mut dest = DirectoryDestination::new(tmp.path());
        let mtime = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000);
        let entry = EntryRecord::file("sub/file.txt", 5).with_mtime(mtime);

        let mut sink = dest.create_sink("a.cpio", 0, &entry).unwrap().unwrap();
        sink.write(b"hello").unwrap();
        sink.finish().unwrap();
        drop(sink);

        let path = tmp.path().join("sub/file.txt");
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta).unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_abort_removes_partial_file() {
        let tmp = TempDir::new().unwrap();
        let mut dest = DirectoryDestination::new(tmp.path());
        let entry = EntryRecord::file("partial.bin", 100);

        let mut sink = dest.create_sink("a.cpio", 0, &entry).unwrap().unwrap();
        sink.write(b"half").unwrap();
        sink.abort();
        drop(sink);

        assert!(!tmp.path().join("partial.bin").exists());
    }

    #[test]
    fn test_directory_entry_creates_dir() {
        let tmp = TempDir::new().unwrap();
        let mut dest = DirectoryDestination::new(tmp.path());
        let sink = dest
            .create_sink("a.cpio", 0, &EntryRecord::directory("d1/d2"))
            .unwrap();
        assert!(sink.is_none());
        assert!(tmp.path().join("d1/d2").is_dir());
    }

    #[test]
    fn test_overwrite_modes() {
        let tmp = TempDir::new().unwrap();

        let mut dest = DirectoryDestination::new(tmp.path()).with_overwrite(OverwriteMode::Overwrite);
        write_entry(&mut dest, "f.txt", b"one");
        write_entry(&mut dest, "f.txt", b"two");
        assert_eq!(fs::read(tmp.path().join("f.txt")).unwrap(), b"two");

        let mut dest = DirectoryDestination::new(tmp.path()).with_overwrite(OverwriteMode::Skip);
        assert!(write_entry(&mut dest, "f.txt", b"three").is_none());
        assert_eq!(fs::read(tmp.path().join("f.txt")).unwrap(), b"two");

        let mut dest =
            DirectoryDestination::new(tmp.path()).with_overwrite(OverwriteMode::AutoRename);
        write_entry(&mut dest, "f.txt", b"four");
        assert_eq!(fs::read(tmp.path().join("f.txt")).unwrap(), b"two");
        assert_eq!(fs::read(tmp.path().join("f (1).txt")).unwrap(), b"four");

        let mut dest = DirectoryDestination::new(tmp.path())
            .with_overwrite(OverwriteMode::AutoRenameExisting);
        write_entry(&mut dest, "f.txt", b"five");
        assert_eq!(fs::read(tmp.path().join("f.txt")).unwrap(), b"five");
        assert_eq!(fs::read(tmp.path().join("f (2).txt")).unwrap(), b"two");
    }

    #[test]
    fn test_ask_without_prompt_skips() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("f.txt"), b"keep").unwrap();

        let mut dest = DirectoryDestination::new(tmp.path());
        assert!(write_entry(&mut dest, "f.txt", b"new").is_none());
        assert_eq!(fs::read(tmp.path().join("f.txt")).unwrap(), b"keep");
    }

    #[test]
    fn test_ask_with_prompt() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"old").unwrap();
        fs::write(tmp.path().join("b.txt"), b"old").unwrap();

        let mut dest = DirectoryDestination::new(tmp.path())
            .with_prompt(Always(OverwriteDecision::OverwriteAll));
        write_entry(&mut dest, "a.txt", b"new");
        write_entry(&mut dest, "b.txt", b"new");
        assert_eq!(fs::read(tmp.path().join("a.txt")).unwrap(), b"new");
        assert_eq!(fs::read(tmp.path().join("b.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_ask_cancel_stops() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"old").unwrap();

        let mut dest =
            DirectoryDestination::new(tmp.path()).with_prompt(Always(OverwriteDecision::Cancel));
        let entry = EntryRecord::file("a.txt", 3);
        let err = dest.create_sink("test.cpio", 0, &entry).err().unwrap();
        assert!(err.is_cancelled());
        assert_eq!(fs::read(tmp.path().join("a.txt")).unwrap(), b"old");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_created() {
        let tmp = TempDir::new().unwrap();
        let mut dest = DirectoryDestination::new(tmp.path());
        let link = EntryRecord::symlink("ln", "target.txt");
        assert!(dest.create_sink("a.cpio", 0, &link).unwrap().is_none());
        assert_eq!(
            fs::read_link(tmp.path().join("ln")).unwrap(),
            PathBuf::from("target.txt")
        );

        let escaping = EntryRecord::symlink("bad", "../../etc/passwd");
        assert!(dest.create_sink("a.cpio", 1, &escaping).unwrap().is_none());
        assert!(fs::symlink_metadata(tmp.path().join("bad")).is_err());
    }
}
