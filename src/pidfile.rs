//! PID file that doubles as the launcher's cross-invocation lock.
//!
//! Every read happens under a shared advisory lock and every write under an
//! exclusive one. A handle never stacks locks: asking for a mode it already
//! holds (or a weaker one) is a no-op, and an upgrade releases before
//! re-acquiring. Writes always release the lock on the way out, which is how a
//! daemonizing parent hands the record over to its child.
use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use tracing::debug;

use crate::{error::PidFileError, process::ProcessControl};

/// What the record says about the supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Empty, missing or unparsable record.
    NoRecord,
    /// A pid is recorded but no such process exists.
    RecordedButDead(i32),
    /// A pid is recorded and the process exists.
    RecordedAndAlive(i32),
}

/// Advisory lock mode currently held by a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers.
    Shared,
    /// The single writer.
    Exclusive,
}

/// A lockable record holding at most one pid.
///
/// Lifecycle operations receive the record explicitly so tests can swap the
/// filesystem for memory.
pub trait PidRecord {
    /// Takes the exclusive lock, blocking until it is available.
    fn acquire_lock(&mut self) -> Result<(), PidFileError>;

    /// Takes the shared lock, blocking until it is available.
    fn acquire_shared_lock(&mut self) -> Result<(), PidFileError>;

    /// Drops whatever lock is held.
    fn release_lock(&mut self) -> Result<(), PidFileError>;

    /// Reads the recorded pid under a shared lock (or the lock already held).
    fn read_pid(&mut self) -> Result<i32, PidFileError>;

    /// Replaces the record with `pid` under the exclusive lock, then releases it.
    fn write_pid(&mut self, pid: i32) -> Result<(), PidFileError>;

    /// Empties the record under the exclusive lock, then releases it.
    fn clear_pid(&mut self) -> Result<(), PidFileError>;

    /// Classifies the record by checking the recorded pid.
    ///
    /// The lock is only held while reading; a worker exiting between the read
    /// and the check is reported as dead.
    fn state<C: ProcessControl + ?Sized>(&mut self, control: &C) -> ProcessState {
        match self.read_pid() {
            Ok(pid) if control.exists(pid) => ProcessState::RecordedAndAlive(pid),
            Ok(pid) => ProcessState::RecordedButDead(pid),
            Err(err) => {
                debug!("No usable pid record: {err}");
                ProcessState::NoRecord
            }
        }
    }

    /// Whether the recorded pid belongs to a live process.
    fn alive<C: ProcessControl + ?Sized>(&mut self, control: &C) -> bool {
        matches!(self.state(control), ProcessState::RecordedAndAlive(_))
    }
}

/// Filesystem-backed [`PidRecord`] using `flock`-style advisory locks.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    file: File,
    held: Option<LockMode>,
}

impl PidFile {
    /// Opens (creating if needed) the PID file and its parent directories.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let path = path.into();
        let open_error = |source| PidFileError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(open_error)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(open_error)?;

        Ok(Self {
            path,
            file,
            held: None,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock currently held by this handle.
    pub fn lock_mode(&self) -> Option<LockMode> {
        self.held
    }

    fn lock(&mut self, mode: LockMode) -> Result<(), PidFileError> {
        match (self.held, mode) {
            (Some(LockMode::Exclusive), _) | (Some(LockMode::Shared), LockMode::Shared) => {
                return Ok(());
            }
            (Some(LockMode::Shared), LockMode::Exclusive) => self.release_lock()?,
            (None, _) => {}
        }

        let result = match mode {
            LockMode::Shared => FileExt::lock_shared(&self.file),
            LockMode::Exclusive => FileExt::lock_exclusive(&self.file),
        };
        result.map_err(|source| PidFileError::Lock {
            path: self.path.clone(),
            source,
        })?;

        debug!("Acquired {:?} lock on {:?}", mode, self.path);
        self.held = Some(mode);
        Ok(())
    }

    fn read_content(&self) -> Result<String, PidFileError> {
        let mut file = &self.file;
        let mut content = String::new();
        file.seek(SeekFrom::Start(0)).map_err(PidFileError::Read)?;
        file.read_to_string(&mut content)
            .map_err(PidFileError::Read)?;
        Ok(content)
    }

    fn truncate(&self) -> Result<(), PidFileError> {
        let mut file = &self.file;
        file.set_len(0).map_err(PidFileError::Write)?;
        file.seek(SeekFrom::Start(0)).map_err(PidFileError::Write)?;
        Ok(())
    }

    fn append_pid(&self, pid: i32) -> Result<(), PidFileError> {
        let mut file = &self.file;
        writeln!(file, "{pid}").map_err(PidFileError::Write)?;
        file.sync_data().map_err(PidFileError::Write)
    }

    /// Runs `op` under the exclusive lock and releases it afterwards, even on failure.
    fn with_exclusive<T>(
        &mut self,
        op: impl FnOnce(&Self) -> Result<T, PidFileError>,
    ) -> Result<T, PidFileError> {
        self.lock(LockMode::Exclusive)?;
        let result = op(self);
        let released = self.release_lock();
        let value = result?;
        released?;
        Ok(value)
    }
}

impl PidRecord for PidFile {
    fn acquire_lock(&mut self) -> Result<(), PidFileError> {
        self.lock(LockMode::Exclusive)
    }

    fn acquire_shared_lock(&mut self) -> Result<(), PidFileError> {
        self.lock(LockMode::Shared)
    }

    fn release_lock(&mut self) -> Result<(), PidFileError> {
        if self.held.is_none() {
            return Ok(());
        }
        FileExt::unlock(&self.file).map_err(|source| PidFileError::Unlock {
            path: self.path.clone(),
            source,
        })?;
        debug!("Released lock on {:?}", self.path);
        self.held = None;
        Ok(())
    }

    fn read_pid(&mut self) -> Result<i32, PidFileError> {
        let already_held = self.held.is_some();
        if !already_held {
            self.lock(LockMode::Shared)?;
        }
        let content = self.read_content();
        if !already_held {
            self.release_lock()?;
        }
        parse_pid(&content?)
    }

    fn write_pid(&mut self, pid: i32) -> Result<(), PidFileError> {
        self.with_exclusive(|record| {
            record.truncate()?;
            record.append_pid(pid)
        })?;
        debug!("Recorded pid {pid} in {:?}", self.path);
        Ok(())
    }

    fn clear_pid(&mut self) -> Result<(), PidFileError> {
        self.with_exclusive(|record| record.truncate())?;
        debug!("Cleared {:?}", self.path);
        Ok(())
    }
}

/// Parses the persisted form: one line holding a positive decimal pid.
pub fn parse_pid(content: &str) -> Result<i32, PidFileError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PidFileError::Empty);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PidFileError::Invalid(trimmed.to_string()));
    }
    match trimmed.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(PidFileError::Invalid(trimmed.to_string())),
    }
}
