//! Filesystem helpers for install, data and log locations.
use std::{
    fs::{self, File, OpenOptions},
    io,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};

use nix::unistd::{AccessFlags, access};
use tracing::debug;

/// Derives the install path from the launcher executable (`INSTALL/bin/launcher`).
pub fn find_install_path(executable: &Path) -> io::Result<PathBuf> {
    let resolved = executable.canonicalize()?;
    resolved
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot derive install path from {:?}", resolved),
            )
        })
}

/// Creates `path` and any missing parents.
pub fn make_dirs(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Fails unless `path` is an existing directory.
pub fn require_dir(path: &Path) -> io::Result<()> {
    if fs::metadata(path)?.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a directory",
        ))
    }
}

/// Fails unless `path` is an existing regular file.
pub fn require_file(path: &Path) -> io::Result<()> {
    if fs::metadata(path)?.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(io::ErrorKind::InvalidInput, "not a file"))
    }
}

/// Fails unless `path`, or the nearest ancestor that exists, is writable.
pub fn ensure_writable(path: &Path) -> io::Result<()> {
    let existing = path
        .ancestors()
        .find(|candidate| !candidate.as_os_str().is_empty() && candidate.exists())
        .unwrap_or_else(|| Path::new("."));
    access(existing, AccessFlags::W_OK).map_err(io::Error::from)
}

/// Opens `path` for appending, creating it if needed.
pub fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Points `link` at `source` unless `link` already exists or `source` is missing.
pub fn create_symlink(source: &Path, link: &Path) -> io::Result<()> {
    if fs::symlink_metadata(link).is_ok() {
        return Ok(());
    }
    if !source.exists() {
        debug!("Skipping symlink {:?}: {:?} does not exist", link, source);
        return Ok(());
    }
    debug!("Linking {:?} -> {:?}", link, source);
    symlink(source, link)
}
