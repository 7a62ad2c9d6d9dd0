//! `SyncComparer` — diffs `HistoryStore` against the remote account's
//! "uploads" playlist (spec.md §4.8), grounded in
//! `original_source/src/services/sync_manager.py`.

pub mod error;

use std::collections::{HashMap, HashSet};

pub use self::error::{Error, ErrorKind, Result};
use crate::history::HistoryStore;

/// One remote video as reported by the account's uploads playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVideo {
    pub video_id: String,
    pub title: String,
}

/// The capability `SyncComparer` depends on to enumerate every video the
/// remote account has ever uploaded (its implicit "uploads" playlist).
pub trait RemoteUploadsLister: Send + Sync {
    fn fetch_uploaded_videos(&self) -> Result<Vec<RemoteVideo>>;
}

/// One row of a sync comparison result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub video_id: String,
    pub remote_title: Option<String>,
    pub local_path: Option<String>,
}

/// The three-way partition `compare` returns (spec.md §4.8, testable
/// property 8: the three sets are pairwise disjoint and their union is
/// `remote_ids ∪ local_ids`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparisonResult {
    pub in_sync: Vec<SyncItem>,
    pub missing_local: Vec<SyncItem>,
    pub missing_remote: Vec<SyncItem>,
}

pub struct SyncComparer<'a, L: RemoteUploadsLister> {
    history: &'a HistoryStore,
    lister: L,
}

impl<'a, L: RemoteUploadsLister> SyncComparer<'a, L> {
    pub fn new(history: &'a HistoryStore, lister: L) -> Self {
        SyncComparer { history, lister }
    }

    /// Fetches the remote uploads exhaustively, then diffs their video ids
    /// against every successful `HistoryStore` row's `video_id`.
    pub fn compare(&self) -> Result<ComparisonResult> {
        let remote_videos = self.lister.fetch_uploaded_videos()?;
        let remote_map: HashMap<String, String> = remote_videos
            .into_iter()
            .map(|v| (v.video_id, v.title))
            .collect();

        let local_records = self.history.get_all(None)?;
        let local_map: HashMap<String, String> = local_records
            .into_iter()
            .filter(|r| r.status == "success")
            .filter_map(|r| r.video_id.clone().map(|id| (id, r.file_path)))
            .collect();

        let remote_ids: HashSet<&String> = remote_map.keys().collect();
        let local_ids: HashSet<&String> = local_map.keys().collect();

        let mut result = ComparisonResult::default();

        for id in remote_ids.intersection(&local_ids) {
            result.in_sync.push(SyncItem {
                video_id: (*id).clone(),
                remote_title: remote_map.get(*id).cloned(),
                local_path: local_map.get(*id).cloned(),
            });
        }

        for id in remote_ids.difference(&local_ids) {
            result.missing_local.push(SyncItem {
                video_id: (*id).clone(),
                remote_title: remote_map.get(*id).cloned(),
                local_path: None,
            });
        }

        for id in local_ids.difference(&remote_ids) {
            result.missing_remote.push(SyncItem {
                video_id: (*id).clone(),
                remote_title: None,
                local_path: local_map.get(*id).cloned(),
            });
        }

        Ok(result)
    }

    /// Deletes the local `HistoryStore` row for each `missing_remote` item
    /// (the remote no longer recognizes the video). Returns
    /// `(deleted, failed)`.
    pub fn fix_missing_remote(&self, items: &[SyncItem]) -> (usize, usize) {
        let mut deleted = 0;
        let mut failed = 0;
        for item in items {
            match self.history.delete_by_video_id(&item.video_id) {
                Ok(true) => deleted += 1,
                Ok(false) | Err(_) => failed += 1,
            }
        }
        (deleted, failed)
    }
}

/// Default production `RemoteUploadsLister`: pages through the account's
/// implicit "uploads" playlist the same way `HttpPlaylistDriver` pages
/// through user playlists, grounded in
/// `original_source/src/services/sync_manager.py`'s remote listing call.
pub struct HttpUploadsLister {
    credentials: crate::upload::Credentials,
    api_base: String,
}

impl HttpUploadsLister {
    pub fn new(credentials: crate::upload::Credentials, api_base: String) -> Self {
        HttpUploadsLister {
            credentials,
            api_base,
        }
    }
}

impl RemoteUploadsLister for HttpUploadsLister {
    fn fetch_uploaded_videos(&self) -> Result<Vec<RemoteVideo>> {
        let client = reqwest::blocking::Client::new();
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = client
                .get(&format!("{}/videos", self.api_base))
                .query(&[("mine", "true"), ("maxResults", "50")])
                .bearer_auth(&self.credentials.access_token);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .map_err(|e| Error::lister(e.to_string()))?;
            if !response.status().is_success() {
                return Err(Error::lister(format!("http {}", response.status())));
            }

            let body: serde_json::Value =
                response.json().map_err(|e| Error::lister(e.to_string()))?;

            if let Some(items) = body.get("items").and_then(|v| v.as_array()) {
                for item in items {
                    let video_id = item.get("id").and_then(|v| v.as_str());
                    let title = item
                        .get("snippet")
                        .and_then(|s| s.get("title"))
                        .and_then(|v| v.as_str());
                    if let (Some(video_id), Some(title)) = (video_id, title) {
                        videos.push(RemoteVideo {
                            video_id: video_id.to_string(),
                            title: title.to_string(),
                        });
                    }
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            if page_token.is_none() {
                break;
            }
        }

        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Source;
    use tempfile::tempdir;

    struct FakeLister(Vec<RemoteVideo>);
    impl RemoteUploadsLister for FakeLister {
        fn fetch_uploaded_videos(&self) -> Result<Vec<RemoteVideo>> {
            Ok(self.0.clone())
        }
    }

    fn open_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(&Source::File(dir.path().join("h.db"))).unwrap();
        (dir, store)
    }

    #[test]
    fn partitions_are_disjoint_and_cover_the_union() {
        let (_dir, store) = open_store();
        store.upsert_success("/in/a.mp4", "h1", "vid_1", None, "Folder", 1).unwrap();
        store.upsert_success("/in/b.mp4", "h2", "vid_2", None, "Folder", 1).unwrap();

        let lister = FakeLister(vec![
            RemoteVideo { video_id: "vid_1".into(), title: "A".into() },
            RemoteVideo { video_id: "vid_3".into(), title: "C".into() },
        ]);
        let comparer = SyncComparer::new(&store, lister);
        let result = comparer.compare().unwrap();

        assert_eq!(result.in_sync.len(), 1);
        assert_eq!(result.in_sync[0].video_id, "vid_1");
        assert_eq!(result.missing_local.len(), 1);
        assert_eq!(result.missing_local[0].video_id, "vid_3");
        assert_eq!(result.missing_remote.len(), 1);
        assert_eq!(result.missing_remote[0].video_id, "vid_2");
    }

    #[test]
    fn fix_missing_remote_deletes_local_rows() {
        let (_dir, store) = open_store();
        store.upsert_success("/in/a.mp4", "h1", "vid_1", None, "Folder", 1).unwrap();

        let lister = FakeLister(vec![]);
        let comparer = SyncComparer::new(&store, lister);
        let result = comparer.compare().unwrap();
        assert_eq!(result.missing_remote.len(), 1);

        let (deleted, failed) = comparer.fix_missing_remote(&result.missing_remote);
        assert_eq!(deleted, 1);
        assert_eq!(failed, 0);
        assert!(store.get_by_video_id("vid_1").unwrap().is_none());
    }
}
