//! Generated-file installation
//!
//! Configuration-mode translators render daemon config files to fixed system
//! paths. Writes are atomic (temp file in the target directory, then rename)
//! so a crashed commit never leaves a half-written config behind, and mode
//! bits are set before the rename so the file is never visible with looser
//! permissions.

use crate::core::error::{Error, Result};
use nix::unistd::User;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::debug;

/// Writes `contents` to `path` atomically with the given mode bits.
pub fn install(path: &Path, contents: &str, mode: u32) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Internal(format!("No parent directory for {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.flush()?;
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))?;
    temp.persist(path)
        .map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Installed generated file");
    Ok(())
}

/// Changes ownership of `path` to the given system user and its primary group.
///
/// # Errors
///
/// Returns a configuration error if the user does not exist on the system;
/// the daemon package is expected to have created it.
pub fn chown_to_user(path: &Path, username: &str) -> Result<()> {
    let user = User::from_name(username)
        .map_err(|e| Error::Internal(format!("User lookup failed: {e}")))?
        .ok_or_else(|| Error::config(format!("System user \"{username}\" does not exist")))?;
    nix::unistd::chown(path, Some(user.uid), Some(user.gid))
        .map_err(|e| Error::Internal(format!("chown {}: {e}", path.display())))?;
    Ok(())
}

/// Removes previously generated files: `path` itself plus any sibling whose
/// name extends it (rotated or editor leftovers). Missing files are fine.
pub fn remove_generated(path: &Path) -> Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    let Some(base) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(());
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.starts_with(base)) {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
