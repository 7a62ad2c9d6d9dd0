//! `QuotaEstimator` — advisory projection of today's remote unit consumption.

use chrono::{Local, TimeZone};

use crate::history::HistoryStore;

/// One successful video insert costs this many remote units; all other
/// calls are considered negligible for the estimator.
pub const COST_PER_UPLOAD: u64 = 1_600;

/// The verdict `QuotaEstimator::estimate` hands back to the Orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaVerdict {
    /// Remaining quota can't cover even one more upload; the run should not
    /// dispatch any files.
    Halt,
    /// Quota is tight enough that the run may not finish; carries the
    /// maximum number of uploads that can be attempted before exhaustion.
    Warn { max_processable: u64 },
    /// Plenty of headroom; proceed normally.
    Ok,
}

/// Reads `store` and projects whether today's remaining quota can absorb
/// another batch of uploads against `daily_quota_limit`.
pub fn estimate(
    store: &HistoryStore,
    daily_quota_limit: u64,
    batch_size: u64,
) -> crate::core::Result<QuotaVerdict> {
    let used_today = units_used_today(store)?;
    let remaining = daily_quota_limit.saturating_sub(used_today);

    if remaining < COST_PER_UPLOAD {
        return Ok(QuotaVerdict::Halt);
    }

    let max_processable = remaining / COST_PER_UPLOAD;
    if max_processable < batch_size {
        return Ok(QuotaVerdict::Warn { max_processable });
    }

    Ok(QuotaVerdict::Ok)
}

fn units_used_today(store: &HistoryStore) -> crate::core::Result<u64> {
    let start_of_today = Local::today().and_hms(0, 0, 0).timestamp();
    let count = store
        .get_all(None)?
        .into_iter()
        .filter(|r| r.status == "success" && r.timestamp >= start_of_today)
        .count() as u64;
    Ok(count * COST_PER_UPLOAD)
}

/// Human-readable byte size, used by the `quota` CLI subcommand's report.
pub fn format_bytes(bytes: f64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes;
    for unit in &units {
        if size.abs() < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} EB", size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Source;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("upload_history.db");
        let store = HistoryStore::new(&Source::File(db_path)).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_store_has_full_quota() {
        let (_dir, store) = open_store();
        assert_eq!(estimate(&store, 10_000, 1).unwrap(), QuotaVerdict::Ok);
    }

    #[test]
    fn halts_when_remaining_below_one_upload() {
        let (_dir, store) = open_store();
        for i in 0..6 {
            store
                .upsert_success(
                    &format!("/in/{}.mp4", i),
                    &format!("hash{}", i),
                    &format!("vid{}", i),
                    None,
                    "Folder",
                    10,
                )
                .unwrap();
        }
        // 6 * 1600 = 9600, ceiling 10000 -> remaining 400 < 1600
        assert_eq!(estimate(&store, 10_000, 1).unwrap(), QuotaVerdict::Halt);
    }

    #[test]
    fn warns_when_batch_would_not_fit() {
        let (_dir, store) = open_store();
        store
            .upsert_success("/in/a.mp4", "hash1", "vid1", None, "Folder", 10)
            .unwrap();
        // remaining = 10000 - 1600 = 8400; 8400/1600 = 5
        match estimate(&store, 10_000, 10).unwrap() {
            QuotaVerdict::Warn { max_processable } => assert_eq!(max_processable, 5),
            other => panic!("expected Warn, got {:?}", other),
        }
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(500.0), "500.0 B");
        assert_eq!(format_bytes(2048.0), "2.0 KB");
    }
}
