//! Persisted history window
//!
//! Layout: `<root>/<entry-id>/<flat files>`, one directory per retained run.
//! The entry id is the UTC creation time with `:` and `.` replaced, so ids
//! also sort chronologically.
//!
//! No lock is taken. One invocation is assumed to own the store at a time;
//! two runs racing on snapshot and prune can leave the window corrupted.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use time::OffsetDateTime;
use time::macros::format_description;
use walkdir::WalkDir;

use crate::Result;
use crate::error::io_at;

/// Reserved sub-path of a results or report directory
pub const HISTORY_DIR: &str = "history";

const TREND_SUFFIX: &str = "-trend.json";

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl HistoryEntry {
    /// Regular files in the entry, sorted by name
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        flat_files(&self.path)
    }
}

pub struct HistoryStore {
    root: PathBuf,
    retention: usize,
    trend_window: usize,
}

impl HistoryStore {
    /// `retention` and `trend_window` are clamped to at least 1.
    pub fn new(root: impl Into<PathBuf>, retention: usize, trend_window: usize) -> Self {
        Self {
            root: root.into(),
            retention: retention.max(1),
            trend_window: trend_window.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Delete everything in `results_dir` except its `history` sub-path.
    pub fn reset_working_set(&self, results_dir: &Path) -> Result<()> {
        if !results_dir.exists() {
            fs::create_dir_all(results_dir).map_err(io_at(results_dir))?;
            return Ok(());
        }

        let mut removed = 0;
        for entry in WalkDir::new(results_dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_name() == HISTORY_DIR {
                continue;
            }

            let path = entry.path();
            if entry.file_type().is_dir() {
                fs::remove_dir_all(path).map_err(io_at(path))?;
            } else {
                fs::remove_file(path).map_err(io_at(path))?;
            }
            removed += 1;
        }

        tracing::debug!(
            "Cleared {} stale entries from {}",
            removed,
            results_dir.display()
        );
        Ok(())
    }

    /// Rebuild `results_dir/history` from the newest entries.
    ///
    /// Entries are copied oldest first and every file is renamed
    /// `<entry-id>-<file-name>`. Returns the merged entries in copy order.
    pub fn merge_window(&self, results_dir: &Path) -> Result<Vec<HistoryEntry>> {
        let target = results_dir.join(HISTORY_DIR);
        if target.exists() {
            fs::remove_dir_all(&target).map_err(io_at(&target))?;
        }
        fs::create_dir_all(&target).map_err(io_at(&target))?;

        let mut window: Vec<HistoryEntry> =
            self.list_entries()?.into_iter().take(self.retention).collect();
        window.reverse();

        let mut copied = 0;
        for entry in &window {
            for file in entry.files()? {
                let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let dest = target.join(format!("{}-{}", entry.id, name));
                fs::copy(&file, &dest).map_err(io_at(&file))?;
                copied += 1;
            }
        }

        if window.is_empty() {
            tracing::info!("No retained history, report will start a new trend");
        } else {
            tracing::info!(
                "Merged {} file(s) from {} history entr{} into {}",
                copied,
                window.len(),
                if window.len() == 1 { "y" } else { "ies" },
                target.display()
            );
        }

        Ok(window)
    }

    /// Persist `report_dir/history` as a new entry, then prune.
    ///
    /// Returns `None` without touching the store when the report has no
    /// history output.
    pub fn snapshot_current_run(&self, report_dir: &Path) -> Result<Option<HistoryEntry>> {
        self.snapshot_at(report_dir, OffsetDateTime::now_utc())
    }

    fn snapshot_at(&self, report_dir: &Path, now: OffsetDateTime) -> Result<Option<HistoryEntry>> {
        let source = report_dir.join(HISTORY_DIR);
        if !source.is_dir() {
            tracing::info!("Report produced no history output, nothing to snapshot");
            return Ok(None);
        }

        let files = flat_files(&source)?;
        if files.is_empty() {
            tracing::info!("Report history output is empty, nothing to snapshot");
            return Ok(None);
        }

        fs::create_dir_all(&self.root).map_err(io_at(&self.root))?;

        let base_id = entry_id(now)?;
        let mut id = base_id.clone();
        let mut suffix = 1;
        while self.root.join(&id).exists() {
            id = format!("{}-{}", base_id, suffix);
            suffix += 1;
        }

        let path = self.root.join(&id);
        fs::create_dir(&path).map_err(io_at(&path))?;

        for file in &files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let dest = path.join(name);
            if name.to_string_lossy().ends_with(TREND_SUFFIX) {
                self.copy_trend(file, &dest)?;
            } else {
                fs::copy(file, &dest).map_err(io_at(file))?;
            }
        }

        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(io_at(&path))?;

        tracing::info!("Snapshotted {} history file(s) as {}", files.len(), id);

        let pruned = self.prune()?;
        if !pruned.is_empty() {
            tracing::info!(
                "Pruned history beyond {} entries: {}",
                self.retention,
                pruned.join(", ")
            );
        }

        Ok(Some(HistoryEntry { id, path, modified }))
    }

    /// Entries newest first. A missing store is an empty list.
    pub fn list_entries(&self) -> Result<Vec<HistoryEntry>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str() else {
                continue;
            };
            let modified = entry
                .metadata()?
                .modified()
                .map_err(io_at(entry.path()))?;

            entries.push(HistoryEntry {
                id: id.to_string(),
                path: entry.path().to_path_buf(),
                modified,
            });
        }

        entries.sort_by(|a, b| {
            (Reverse(a.modified), Reverse(&a.id)).cmp(&(Reverse(b.modified), Reverse(&b.id)))
        });
        Ok(entries)
    }

    /// Delete every entry past the retention window. Returns removed ids.
    fn prune(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for entry in self.list_entries()?.into_iter().skip(self.retention) {
            fs::remove_dir_all(&entry.path).map_err(io_at(&entry.path))?;
            removed.push(entry.id);
        }
        Ok(removed)
    }

    /// Copy a trend file, keeping only the newest `trend_window` points.
    /// Files that are not a JSON array are copied untouched.
    fn copy_trend(&self, source: &Path, dest: &Path) -> Result<()> {
        let content = fs::read_to_string(source).map_err(io_at(source))?;

        match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(mut points) if points.len() > self.trend_window => {
                points.truncate(self.trend_window);
                let trimmed = serde_json::to_string_pretty(&points)?;
                fs::write(dest, trimmed).map_err(io_at(dest))?;
            }
            Ok(_) => {
                fs::write(dest, content).map_err(io_at(dest))?;
            }
            Err(e) => {
                tracing::warn!(
                    "Trend file {} is not a JSON array ({}), copying as is",
                    source.display(),
                    e
                );
                fs::write(dest, content).map_err(io_at(dest))?;
            }
        }
        Ok(())
    }
}

/// Filesystem-safe id for an entry created at `now`
fn entry_id(now: OffsetDateTime) -> Result<String> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
    );
    let stamp = now.format(format)?;
    Ok(stamp.replace([':', '.'], "-"))
}

fn flat_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
