//! Size-based rotating log files.
//!
//! Rotation itself is performed by `file-rotate`: the active file is
//! `path`, backups are `path.1`, `path.2`, ... (newest first, `.gz` when
//! compressed). Age-based pruning of backups is done here, when the sink
//! is opened and after each explicit [`RotatingFileSink::rotate`].

use crate::config::BuildError;
use crate::sink::LogSink;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

const MB: usize = 1024 * 1024;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Parameters of a rotating log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    pub path: PathBuf,
    /// Rotate once the active file grows past this many megabytes.
    pub max_size_mb: usize,
    /// Backups to keep; 0 keeps every backup.
    pub max_backups: usize,
    /// Remove backups older than this many days; 0 disables pruning.
    pub max_age_days: u64,
    /// Gzip backups when they are rotated out.
    pub compress: bool,
}

impl RotationConfig {
    pub fn new(
        path: impl Into<PathBuf>,
        max_size_mb: usize,
        max_backups: usize,
        max_age_days: u64,
        compress: bool,
    ) -> Self {
        Self { path: path.into(), max_size_mb, max_backups, max_age_days, compress }
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.path.as_os_str().is_empty() {
            return Err(BuildError::InvalidRotation("log file path is empty".to_string()));
        }
        if self.max_size_mb == 0 {
            return Err(BuildError::InvalidRotation("max size must be at least 1 MB".to_string()));
        }
        Ok(())
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("app.log"),
            max_size_mb: 100,
            max_backups: 3,
            max_age_days: 28,
            compress: false,
        }
    }
}

/// [`LogSink`] writing to a size-rotated file.
pub struct RotatingFileSink {
    file: Mutex<FileRotate<AppendCount>>,
    config: RotationConfig,
}

impl RotatingFileSink {
    /// Open (or create) the log file described by `config`.
    ///
    /// **Returns**
    /// - `Err(BuildError::InvalidRotation)` for an empty path or a zero size limit.
    /// - `Err(BuildError::OpenLogFile)` if the directory or file cannot be created.
    pub fn open(config: RotationConfig) -> Result<Self, BuildError> {
        config.validate()?;

        let open_err = |source: io::Error| BuildError::OpenLogFile { path: config.path.clone(), source };
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        OpenOptions::new().create(true).append(true).open(&config.path).map_err(open_err)?;

        prune_expired(&config);
        let file = build_file(&config);
        Ok(Self { file: Mutex::new(file), config })
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Force a rotation of the active file.
    pub fn rotate(&self) -> io::Result<()> {
        let mut file = self.lock();
        file.rotate()?;
        if prune_expired(&self.config) {
            // rescan the remaining backups
            *file = build_file(&self.config);
        }
        Ok(())
    }

    /// Backup files currently on disk, newest first.
    pub fn backups(&self) -> Vec<PathBuf> {
        let mut found = backup_files(&self.config.path);
        found.sort_by_key(|(index, _)| *index);
        found.into_iter().map(|(_, path)| path).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FileRotate<AppendCount>> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn build_file(config: &RotationConfig) -> FileRotate<AppendCount> {
    let max_backups = if config.max_backups == 0 { usize::MAX } else { config.max_backups };
    let compression = if config.compress { Compression::OnRotate(0) } else { Compression::None };
    FileRotate::new(
        &config.path,
        AppendCount::new(max_backups),
        ContentLimit::BytesSurpassed(config.max_size_mb * MB),
        compression,
        #[cfg(unix)]
        None,
    )
}

/// Remove backups older than `max_age_days`. Returns whether any file was
/// removed.
fn prune_expired(config: &RotationConfig) -> bool {
    if config.max_age_days == 0 {
        return false;
    }
    let max_age = Duration::from_secs(config.max_age_days.saturating_mul(SECS_PER_DAY));
    let now = SystemTime::now();
    let mut removed = false;
    for (_, path) in backup_files(&config.path) {
        let expired = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);
        if !expired {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed = true,
            Err(err) => tracing::debug!(path = %path.display(), error = %err, "failed to prune expired log backup"),
        }
    }
    removed
}

/// `(index, path)` of every `name.N` / `name.N.gz` next to `base`.
fn backup_files(base: &Path) -> Vec<(usize, PathBuf)> {
    let Some(name) = base.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let prefix = format!("{}.", name);
    entries
        .flatten()
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let suffix = file_name.strip_prefix(&prefix)?;
            let index = suffix.strip_suffix(".gz").unwrap_or(suffix).parse::<usize>().ok()?;
            Some((index, entry.path()))
        })
        .collect()
}

impl LogSink for RotatingFileSink {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        self.lock().write_all(line)
    }

    fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = RotationConfig::new(dir.path().join("app.log"), 0, 3, 0, false);
        assert!(matches!(RotatingFileSink::open(config), Err(BuildError::InvalidRotation(_))));
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("app.log");
        let sink = RotatingFileSink::open(RotationConfig::new(&path, 1, 3, 0, false)).unwrap();
        sink.write_line(b"hello\n").unwrap();
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn explicit_rotation_creates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::open(RotationConfig::new(&path, 1, 3, 0, false)).unwrap();
        sink.write_line(b"before\n").unwrap();
        sink.rotate().unwrap();
        sink.write_line(b"after\n").unwrap();
        sink.flush().unwrap();

        let backups = sink.backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
    }

    #[test]
    fn huge_max_age_keeps_fresh_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let backup = dir.path().join("app.log.1");
        fs::write(&backup, "recent\n").unwrap();
        let config = RotationConfig::new(&path, 1, 3, 1 << 32, false);
        assert!(!prune_expired(&config));
        assert!(backup.exists());
    }

    #[test]
    fn backup_listing_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        for name in ["app.log.1", "app.log.2.gz", "app.log.bak", "other.log.1"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let mut indexes: Vec<_> = backup_files(&base).into_iter().map(|(i, _)| i).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![1, 2]);
    }
}
