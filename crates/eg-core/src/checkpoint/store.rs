use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use orion_error::prelude::*;

use super::record::Checkpoint;
use crate::error::{CoreReason, CoreResult};

// ---------------------------------------------------------------------------
// CheckpointStore
// ---------------------------------------------------------------------------

/// Durable storage for per-source checkpoints, keyed by a location string.
pub trait CheckpointStore {
    /// Read the checkpoint for `location`. Absent, unreadable or corrupt
    /// records all mean "start from scratch" and yield `None`.
    fn load(&self, location: &str) -> Option<Checkpoint>;

    /// Persist `checkpoint` atomically: on failure the previous record is
    /// left untouched.
    fn save(&self, location: &str, checkpoint: &Checkpoint) -> CoreResult<()>;

    /// Remove the checkpoint for `location`. Returns whether one existed.
    fn clear(&self, location: &str) -> CoreResult<bool>;
}

/// One `<root>/<location>.json` file per location.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `location`, or `None` for keys that would escape `root`.
    pub fn path_for(&self, location: &str) -> Option<PathBuf> {
        if location.is_empty()
            || location.contains(['/', '\\'])
            || location.contains("..")
        {
            return None;
        }
        Some(self.root.join(format!("{location}.json")))
    }

    fn require_path(&self, location: &str) -> CoreResult<PathBuf> {
        match self.path_for(location) {
            Some(path) => Ok(path),
            None => StructError::from(CoreReason::CheckpointWrite)
                .with_detail(format!("invalid checkpoint location {location:?}"))
                .err(),
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, location: &str) -> Option<Checkpoint> {
        match self.path_for(location) {
            Some(path) => load_checkpoint(&path),
            None => {
                log::warn!("ignoring checkpoint for invalid location {location:?}");
                None
            }
        }
    }

    fn save(&self, location: &str, checkpoint: &Checkpoint) -> CoreResult<()> {
        save_checkpoint(&self.require_path(location)?, checkpoint)
    }

    fn clear(&self, location: &str) -> CoreResult<bool> {
        let path = self.require_path(location)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("removed checkpoint {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => StructError::from(CoreReason::CheckpointWrite)
                .with_detail(format!("remove checkpoint {}: {e}", path.display()))
                .err(),
        }
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Read a checkpoint file. Never fails: problems are logged and reported as
/// "no checkpoint".
pub fn load_checkpoint(path: &Path) -> Option<Checkpoint> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("no checkpoint at {}", path.display());
            return None;
        }
        Err(e) => {
            log::warn!(
                "unreadable checkpoint {}: {e}; starting from scratch",
                path.display()
            );
            return None;
        }
    };

    match serde_json::from_slice::<Checkpoint>(&bytes) {
        Ok(checkpoint) if checkpoint.is_supported() => Some(checkpoint),
        Ok(checkpoint) => {
            log::warn!(
                "checkpoint {} has unsupported schema_version {:?}; starting from scratch",
                path.display(),
                checkpoint.schema_version
            );
            None
        }
        Err(e) => {
            log::warn!(
                "corrupt checkpoint {}: {e}; starting from scratch",
                path.display()
            );
            None
        }
    }
}

/// Write `checkpoint` to `path` via a synced sibling temp file and a rename,
/// so readers only ever see the old or the new record.
pub fn save_checkpoint(path: &Path, checkpoint: &Checkpoint) -> CoreResult<()> {
    let write_error = |what: &str, e: &dyn std::fmt::Display| {
        StructError::from(CoreReason::CheckpointWrite)
            .with_detail(format!("{what} {}: {e}", path.display()))
    };

    let Some(file_name) = path.file_name() else {
        return Err(write_error("checkpoint path has no file name", &"-"));
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| write_error("create directory for", &e))?;

    let json =
        serde_json::to_vec_pretty(checkpoint).map_err(|e| write_error("serialize", &e))?;

    let tmp = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));
    if let Err(e) = write_synced(&tmp, &json).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(write_error("write checkpoint", &e));
    }
    // Persist the rename itself; the new record is already in place.
    if let Err(e) = sync_dir(dir) {
        log::debug!("could not sync directory {}: {e}", dir.display());
    }

    log::debug!(
        "saved checkpoint {} ({} messages)",
        path.display(),
        checkpoint.messages_processed
    );
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
