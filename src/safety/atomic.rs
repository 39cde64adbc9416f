//! Crash-safe file replacement
//!
//! Content goes to a uniquely named temp file in the target's directory, is
//! synced, then renamed over the target. A reader sees the old or the new
//! file, never a partial one. A temp file left behind by a crash is never
//! renamed by anything but its own writer.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Suffix shared by all in-flight temp files
pub const TEMP_SUFFIX: &str = ".repolift.tmp";

/// Temp path next to `target`
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let unique = Uuid::new_v4().simple().to_string();
    let temp_name = format!(".{}.{}{}", name, &unique[..8], TEMP_SUFFIX);
    match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// First phase: write and sync `bytes` to a fresh temp file beside `target`
pub fn write_temp(target: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    let temp = temp_path_for(target);
    let result = (|| {
        let mut file = File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(temp)
}

/// Second phase: rename the temp file over `target`
pub fn commit(temp: &Path, target: &Path) -> io::Result<()> {
    if let Err(e) = fs::rename(temp, target) {
        let _ = fs::remove_file(temp);
        return Err(e);
    }
    Ok(())
}

/// Replace `target` with `bytes` atomically, creating parent dirs as needed
pub fn atomic_write(target: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp = write_temp(target, bytes)?;
    commit(&temp, target)
}
