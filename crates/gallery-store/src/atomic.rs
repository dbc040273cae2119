//! Temp-write-then-rename helpers

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix of in-flight temporary files
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

/// Whether a directory entry name belongs to an in-flight (or abandoned) write
pub(crate) fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Temporary sibling of `dest`: `.<file-name>.<uuid>.tmp`
fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("write");
    dest.with_file_name(format!(
        ".{}.{}{}",
        name,
        uuid::Uuid::new_v4().simple(),
        TEMP_SUFFIX
    ))
}

/// Write `bytes` to `dest` so readers observe either the previous file or
/// the complete new one.
///
/// The parent directory is created if missing. The temp file is removed if
/// any step fails.
pub(crate) fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent")
    })?;
    fs::create_dir_all(parent)?;

    let tmp = temp_path_for(dest);
    let result = write_and_publish(&tmp, dest, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    sync_dir(parent);
    Ok(())
}

fn write_and_publish(tmp: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
    {
        let mut file = OpenOptions::new().write(true).create_new(true).open(tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(tmp, dest)
}

/// Flush a directory entry table so a rename survives power loss
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Remove a directory if it is empty, ignoring every failure
pub(crate) fn prune_empty_dir(dir: &Path) {
    let _ = fs::remove_dir(dir);
}
