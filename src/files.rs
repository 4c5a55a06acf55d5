//! Temp file lifecycle.
//!
//! Every path a request creates on disk is owned by a [`TrackedFile`]. The
//! guard deletes its file when dropped unless it was explicitly consumed or
//! handed off, so cleanup happens on every exit path: early returns, `?`,
//! panics, and client disconnects that drop the handler future.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use uuid::Uuid;
use vidforge_common::ResultToken;

/// Hidden subdirectory of the output dir holding outputs being downloaded.
pub const INFLIGHT_DIR: &str = ".inflight";

/// Where a tracked path is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Path minted, nothing written yet
    Reserved,
    /// Bytes written, file in use
    Populated,
    /// Used successfully and deleted
    Consumed,
    /// Deleted without being used
    Abandoned,
    /// Ownership moved elsewhere; the guard no longer deletes it
    HandedOff,
}

impl FileState {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Consumed | Self::Abandoned | Self::HandedOff)
    }
}

/// Delete `path` if it exists.
///
/// Best-effort and idempotent: a missing file is not an error, and any other
/// failure is logged rather than returned. Blocks; async callers go through
/// [`TrackedFile::consume`] or [`TrackedFile::release`] instead.
pub fn release(path: &Path) {
    log_removal(path, std::fs::remove_file(path));
}

async fn release_async(path: &Path) {
    log_removal(path, tokio::fs::remove_file(path).await);
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Released temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to release temp file"),
    }
}

/// Mints tracked paths and counts how many are still live.
#[derive(Debug, Clone, Default)]
pub struct TempFileRegistry {
    live: Arc<AtomicUsize>,
}

impl TempFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh `<uuid>.<extension>` path in `dir`.
    ///
    /// The file itself is not created.
    pub fn reserve(&self, dir: &Path, extension: &str) -> TrackedFile {
        self.reserve_for(dir, &ResultToken::new(), extension)
    }

    /// Reserve `<token>.<extension>` in `dir`.
    pub fn reserve_for(&self, dir: &Path, token: &ResultToken, extension: &str) -> TrackedFile {
        self.track(dir.join(token.file_name_with(extension)), FileState::Reserved)
    }

    /// Take exclusive ownership of an existing output file for download.
    ///
    /// The file is atomically renamed into the in-flight directory, so of any
    /// number of concurrent claims for the same name exactly one succeeds.
    /// Returns `Ok(None)` when there is no regular file by that name.
    pub async fn claim(&self, dir: &Path, name: &str) -> io::Result<Option<TrackedFile>> {
        let source = dir.join(name);

        match tokio::fs::symlink_metadata(&source).await {
            Ok(meta) if meta.file_type().is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        }

        let inflight = dir.join(INFLIGHT_DIR);
        tokio::fs::create_dir_all(&inflight).await?;
        let target = inflight.join(format!("{}-{}", Uuid::new_v4(), name));

        match tokio::fs::rename(&source, &target).await {
            Ok(()) => Ok(Some(self.track(target, FileState::Populated))),
            // Lost the race to another download
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Number of tracked files not yet consumed, released or handed off.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn track(&self, path: PathBuf, state: FileState) -> TrackedFile {
        self.live.fetch_add(1, Ordering::AcqRel);
        TrackedFile {
            path,
            state,
            live: self.live.clone(),
        }
    }
}

/// Scoped owner of one temp path.
#[derive(Debug)]
pub struct TrackedFile {
    path: PathBuf,
    state: FileState,
    live: Arc<AtomicUsize>,
}

impl TrackedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// Record that bytes have been written to the path.
    pub fn mark_populated(&mut self) {
        if self.state == FileState::Reserved {
            self.state = FileState::Populated;
        }
    }

    /// Delete the file after successful use.
    pub async fn consume(mut self) {
        release_async(&self.path).await;
        self.settle(FileState::Consumed);
    }

    /// Delete the file without using it.
    pub async fn release(mut self) {
        release_async(&self.path).await;
        self.settle(FileState::Abandoned);
    }

    /// Give up ownership without deleting; the caller now owns cleanup.
    pub fn hand_off(mut self) -> PathBuf {
        self.settle(FileState::HandedOff);
        std::mem::take(&mut self.path)
    }

    fn settle(&mut self, state: FileState) {
        if !self.state.is_terminal() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        self.state = state;
    }
}

impl Drop for TrackedFile {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(
                path = %self.path.display(),
                state = ?self.state,
                "Temp file dropped before completion"
            );
            release(&self.path);
            self.settle(FileState::Abandoned);
        }
    }
}

/// Create `dir` if needed and delete files a previous run left in it.
///
/// Only names this server mints are touched: `<token>.<ext>` at the top
/// level and `<uuid>-<token>.<ext>` in the in-flight subdirectory. Anything
/// else in the directory is left alone. Returns the number of files removed.
pub fn prepare_dir(dir: &Path) -> io::Result<usize> {
    std::fs::create_dir_all(dir)?;
    let mut removed = purge_matching(dir, is_minted_name)?;

    let inflight = dir.join(INFLIGHT_DIR);
    if inflight.is_dir() {
        removed += purge_matching(&inflight, is_inflight_name)?;
    }

    Ok(removed)
}

fn purge_matching(dir: &Path, owned: fn(&str) -> bool) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !(file_type.is_file() || file_type.is_symlink()) {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if owned(name) => {
                release(&entry.path());
                removed += 1;
            }
            _ => tracing::debug!(path = %entry.path().display(), "Leaving foreign file in place"),
        }
    }
    Ok(removed)
}

/// `<token>.<ext>`, as produced by [`TempFileRegistry::reserve_for`].
fn is_minted_name(name: &str) -> bool {
    name.split_once('.')
        .is_some_and(|(stem, ext)| !ext.is_empty() && stem.parse::<ResultToken>().is_ok())
}

/// `<uuid>-<token>.<ext>`, as produced by [`TempFileRegistry::claim`].
fn is_inflight_name(name: &str) -> bool {
    let prefix = uuid::fmt::Hyphenated::LENGTH;
    let Some(rest) = name.get(prefix..).and_then(|r| r.strip_prefix('-')) else {
        return false;
    };
    name.get(..prefix).is_some_and(|id| Uuid::parse_str(id).is_ok()) && is_minted_name(rest)
}
