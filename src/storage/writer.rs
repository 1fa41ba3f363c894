#[cfg(unix)]
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::options::SyncPolicy;

/// Publish `bytes` as a brand new file at `target`.
///
/// Write process:
/// 1. Write everything to a temp file in the same directory
/// 2. fsync it (per SyncPolicy)
/// 3. Link it into place, failing if `target` already exists
/// 4. fsync the directory so the new name itself is durable
///
/// A reader never observes a partial file: before step 3 the name does
/// not exist, after it the contents are complete. On any failure the temp
/// file is removed and `target` is untouched.
pub fn publish_new(dir: &Path, target: &Path, bytes: &[u8], sync: SyncPolicy) -> io::Result<()> {
    let tmp = write_temp(dir, bytes, sync)?;
    tmp.persist_noclobber(target).map_err(|e| e.error)?;
    sync_dir(dir, sync)
}

/// Like [`publish_new`], but atomically replaces an existing `target`.
/// Used for index snapshots, which are rewritten whole on every save.
pub fn replace(dir: &Path, target: &Path, bytes: &[u8], sync: SyncPolicy) -> io::Result<()> {
    let tmp = write_temp(dir, bytes, sync)?;
    tmp.persist(target).map_err(|e| e.error)?;
    sync_dir(dir, sync)
}

fn write_temp(dir: &Path, bytes: &[u8], sync: SyncPolicy) -> io::Result<NamedTempFile> {
    let mut tmp = Builder::new().prefix(".yarder-").suffix(".tmp").tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    if sync == SyncPolicy::Fsync {
        tmp.as_file().sync_all()?;
    }
    Ok(tmp)
}

/// fsync a directory so a rename/link inside it survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path, sync: SyncPolicy) -> io::Result<()> {
    if sync == SyncPolicy::Fsync {
        File::open(dir)?.sync_all()?;
    }
    Ok(())
}

// Directories cannot be opened as files on other platforms.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path, _sync: SyncPolicy) -> io::Result<()> {
    Ok(())
}
