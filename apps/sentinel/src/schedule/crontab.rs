//! Reading and writing the user's crontab, with a backup before every change.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info};

use crate::schedule::{strip_marked, with_entries};

#[derive(Debug, Error)]
pub enum CrontabError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("crontab exited with code {code:?}: {stderr}")]
    Write { code: Option<i32>, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait CrontabBackend {
    /// Current crontab. `None` when there is none or it cannot be listed.
    fn read(&self) -> Result<Option<String>, CrontabError>;

    /// Replaces the whole crontab.
    fn write(&self, contents: &str) -> Result<(), CrontabError>;
}

/// The real `crontab` binary.
pub struct SystemCrontab {
    program: String,
}

impl Default for SystemCrontab {
    fn default() -> Self {
        Self {
            program: "crontab".into(),
        }
    }
}

#[cfg(test)]
impl SystemCrontab {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CrontabBackend for SystemCrontab {
    fn read(&self) -> Result<Option<String>, CrontabError> {
        let output = Command::new(&self.program)
            .arg("-l")
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(out) if out.status.success() => Ok(Some(String::from_utf8_lossy(&out.stdout).into_owned())),
            Ok(out) => {
                debug!(
                    code = ?out.status.code(),
                    "crontab -l failed ({}); treating as empty",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Ok(None)
            }
            Err(e) => {
                debug!("Could not run {} -l ({e}); treating as empty", self.program);
                Ok(None)
            }
        }
    }

    fn write(&self, contents: &str) -> Result<(), CrontabError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        let output = Command::new(&self.program)
            .arg(file.path())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CrontabError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CrontabError::Write {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub backup: PathBuf,
    /// Previous Sentinel lines replaced.
    pub replaced: usize,
    pub installed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UninstallReport {
    pub backup: PathBuf,
    pub removed: usize,
}

/// Writes `crontab_backup_<YYYYMMDD_HHMMSS>.txt` into `dir`. An absent
/// crontab is backed up as an empty file.
pub fn write_backup(dir: &Path, contents: &str, now: NaiveDateTime) -> Result<PathBuf, CrontabError> {
    fs::create_dir_all(dir)?;
    let stem = format!("crontab_backup_{}", now.format("%Y%m%d_%H%M%S"));

    let mut path = dir.join(format!("{stem}.txt"));
    let mut n = 1;
    let mut file = loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                path = dir.join(format!("{stem}-{n}.txt"));
                n += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    info!("Backed up crontab to {}", path.display());
    Ok(path)
}

/// Replaces any Sentinel lines with `entries`. The backup is written first.
pub fn install(
    backend: &dyn CrontabBackend,
    entries: &[String],
    backup_dir: &Path,
    now: NaiveDateTime,
) -> Result<InstallReport, CrontabError> {
    let current = backend.read()?.unwrap_or_default();
    let backup = write_backup(backup_dir, &current, now)?;

    let (updated, replaced) = with_entries(&current, entries);
    backend.write(&updated)?;

    info!(replaced, installed = entries.len(), "Installed cron entries");
    Ok(InstallReport {
        backup,
        replaced,
        installed: entries.len(),
    })
}

/// Removes every Sentinel line. The backup is written first; when there is
/// nothing to remove the crontab is left untouched.
pub fn uninstall(
    backend: &dyn CrontabBackend,
    backup_dir: &Path,
    now: NaiveDateTime,
) -> Result<UninstallReport, CrontabError> {
    let current = backend.read()?.unwrap_or_default();
    let backup = write_backup(backup_dir, &current, now)?;

    let (updated, removed) = strip_marked(&current);
    if removed > 0 {
        backend.write(&updated)?;
        info!(removed, "Removed cron entries");
    } else {
        info!("No Sentinel cron entries found");
    }

    Ok(UninstallReport { backup, removed })
}
