//! `RetryPlanner` — selects `failed` `HistoryStore` rows by recency/error
//! substring, groups them by target playlist, and re-emits each group as
//! an independent batch the Orchestrator can run (spec.md §4.9), grounded
//! in `original_source/src/commands/retry.py`.

use std::path::{Path, PathBuf};

use crate::history::{self, HistoryStore, UploadRecord};

/// Filters applied when selecting failed rows to retry.
#[derive(Debug, Clone, Default)]
pub struct RetryFilter {
    /// Only rows recorded at or after this timestamp (seconds since epoch).
    pub since: Option<i64>,
    /// Only rows whose `error` text contains this substring.
    pub error_substring: Option<String>,
    /// Caps the number of rows selected, applied after the above filters.
    pub limit: Option<usize>,
}

/// One group of files to retry, all sharing a target playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBatch {
    pub playlist_name: String,
    pub files: Vec<PathBuf>,
}

pub struct RetryPlanner<'a> {
    history: &'a HistoryStore,
}

impl<'a> RetryPlanner<'a> {
    pub fn new(history: &'a HistoryStore) -> Self {
        RetryPlanner { history }
    }

    /// Selects failed rows per `filter`, verifies each file still exists on
    /// disk (original source's explicit existence check — SPEC_FULL.md
    /// §4.9), and groups the survivors by `playlist_name` (falling back to
    /// the parent directory name).
    pub fn plan(&self, filter: &RetryFilter) -> crate::core::Result<Vec<RetryBatch>> {
        let mut rows = self.history.get_failed()?;

        if let Some(since) = filter.since {
            rows.retain(|r| r.timestamp >= since);
        }
        if let Some(ref substring) = filter.error_substring {
            rows.retain(|r| r.error.as_deref().unwrap_or("").contains(substring.as_str()));
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }

        let mut existing = Vec::with_capacity(rows.len());
        for row in rows {
            if Path::new(&row.file_path).exists() {
                existing.push(row);
            } else {
                log::warn!("skipping retry for missing file: {}", row.file_path);
            }
        }

        Ok(group_into_batches(existing))
    }
}

fn group_into_batches(rows: Vec<UploadRecord>) -> Vec<RetryBatch> {
    let groups = history::group_by_playlist(rows);
    groups
        .into_iter()
        .map(|(playlist_name, records)| RetryBatch {
            playlist_name,
            files: records.into_iter().map(|r| PathBuf::from(r.file_path)).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Source;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(&Source::File(dir.path().join("h.db"))).unwrap();
        (dir, store)
    }

    #[test]
    fn plan_skips_files_that_no_longer_exist() {
        let (dir, store) = open_store();
        let present = dir.path().join("present.mp4");
        std::fs::write(&present, b"x").unwrap();

        store.upsert_failure(&present.to_string_lossy(), "h1", "boom", "Folder", 1).unwrap();
        store.upsert_failure("/in/gone.mp4", "h2", "boom", "Folder", 1).unwrap();

        let planner = RetryPlanner::new(&store);
        let batches = planner.plan(&RetryFilter::default()).unwrap();
        let total_files: usize = batches.iter().map(|b| b.files.len()).sum();
        assert_eq!(total_files, 1);
        assert_eq!(batches[0].files[0], present);
    }

    #[test]
    fn plan_filters_by_error_substring() {
        let (dir, store) = open_store();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"x").unwrap();

        store.upsert_failure(&a.to_string_lossy(), "h1", "Quota Exceeded", "Folder", 1).unwrap();
        store.upsert_failure(&b.to_string_lossy(), "h2", "some other error", "Folder", 1).unwrap();

        let filter = RetryFilter { error_substring: Some("Quota".to_string()), ..Default::default() };
        let planner = RetryPlanner::new(&store);
        let batches = planner.plan(&filter).unwrap();
        let total_files: usize = batches.iter().map(|b| b.files.len()).sum();
        assert_eq!(total_files, 1);
    }

    #[test]
    fn plan_groups_by_playlist_name() {
        let (dir, store) = open_store();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"x").unwrap();

        store.upsert_failure(&a.to_string_lossy(), "h1", "boom", "Vacation", 1).unwrap();
        store.upsert_failure(&b.to_string_lossy(), "h2", "boom", "Work", 1).unwrap();

        let planner = RetryPlanner::new(&store);
        let batches = planner.plan(&RetryFilter::default()).unwrap();
        assert_eq!(batches.len(), 2);
    }
}
