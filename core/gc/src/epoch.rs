//! The "GC epoch" advisory lock (spec.md §4.7: "it acquires a ... lock that prevents
//! concurrent GC but not writes"). Mirrors the NBS manifest lock's own use of `fs2`
//! (`dolt_chunks::nbs` takes an OS advisory lock on a file in the store directory), but on
//! a distinct file so a GC in progress never blocks an ordinary writer's manifest CAS.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::GcError;

const EPOCH_LOCK_FILE: &str = "gc-epoch.lock";

/// Held for the duration of one GC run. Dropping it releases the OS lock.
pub struct GcEpochGuard {
    _file: File,
}

/// Attempts to enter a GC epoch for the store rooted at `dir`. Returns
/// `GcError::EpochLocked` immediately (non-blocking) if another GC already holds it,
/// since spec.md only asks that concurrent GCs be serialized, not queued.
pub fn acquire_epoch(dir: impl AsRef<Path>) -> Result<GcEpochGuard, GcError> {
    let path = dir.as_ref().join(EPOCH_LOCK_FILE);
    let file = OpenOptions::new().create(true).write(true).open(&path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(GcEpochGuard { _file: file }),
        Err(_) => Err(GcError::EpochLocked),
    }
}
