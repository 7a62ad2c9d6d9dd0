//! `PlaylistCache` — lazy title→id lookups over the remote playlist API,
//! with a `PlaylistDriver` seam so the HTTP details stay out of the cache
//! logic (spec.md §4.5).

pub mod error;

use std::collections::HashMap;
use std::sync::Mutex;

pub use self::error::{Error, ErrorKind, Result};

/// One page of playlists as returned by the remote list endpoint.
pub struct PlaylistPage {
    pub items: Vec<(String, String)>, // (title, id)
    pub next_page_token: Option<String>,
}

/// The capability the cache depends on for talking to the remote platform.
/// Kept deliberately thin: the cache owns all title/id bookkeeping, the
/// driver only ever makes one HTTP call per method.
pub trait PlaylistDriver: Send + Sync {
    fn list_playlists(&self, page_token: Option<&str>) -> Result<PlaylistPage>;

    fn create_playlist(&self, title: &str, description: &str, privacy_status: &str)
        -> Result<String>;

    /// Attaches `video_id` to `playlist_id`. A duplicate attach (the remote
    /// API reports the video is already in the playlist) is treated as
    /// success, not an error.
    fn attach(&self, playlist_id: &str, video_id: &str) -> Result<()>;

    /// Finds the id of the `playlistItems` resource joining `playlist_id`
    /// and `video_id`, if any — the indirection `detach` needs before it
    /// can delete anything.
    fn find_playlist_item_id(&self, playlist_id: &str, video_id: &str) -> Result<Option<String>>;

    fn delete_playlist_item(&self, playlist_item_id: &str) -> Result<()>;

    fn rename_playlist(&self, playlist_id: &str, new_title: &str) -> Result<()>;
}

/// Default privacy status for playlists this crate creates.
pub const DEFAULT_PRIVACY_STATUS: &str = "unlisted";

/// Lazily-populated title→id cache, filled by walking every page of the
/// remote playlist list exactly once. The teacher-original's cache never
/// paginated past the first 50 playlists; this one always walks
/// `next_page_token` to exhaustion before considering itself populated.
pub struct PlaylistCache<D: PlaylistDriver> {
    driver: D,
    by_title: Mutex<HashMap<String, String>>,
    populated: Mutex<bool>,
}

impl<D: PlaylistDriver> PlaylistCache<D> {
    pub fn new(driver: D) -> Self {
        PlaylistCache {
            driver,
            by_title: Mutex::new(HashMap::new()),
            populated: Mutex::new(false),
        }
    }

    fn ensure_populated(&self) -> Result<()> {
        let mut populated = self.populated.lock().unwrap();
        if *populated {
            return Ok(());
        }

        let mut map = self.by_title.lock().unwrap();
        map.clear();

        let mut page_token = None;
        loop {
            let page = self.driver.list_playlists(page_token.as_deref())?;
            for (title, id) in page.items {
                map.insert(title, id);
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        *populated = true;
        Ok(())
    }

    /// Looks up a playlist id by title, with no side effects: does not
    /// create a playlist if the title isn't found. Kept distinct from
    /// `get_or_create` so callers that only want to query don't
    /// accidentally create playlists (resolves spec.md's Open Question).
    pub fn find_by_name(&self, title: &str) -> Result<Option<String>> {
        self.ensure_populated()?;
        let map = self.by_title.lock().unwrap();
        Ok(map.get(title).cloned())
    }

    /// Looks up a playlist by title, creating it (with `description` and
    /// `privacy_status`) if it doesn't already exist.
    pub fn get_or_create(
        &self,
        title: &str,
        description: &str,
        privacy_status: &str,
    ) -> Result<String> {
        if let Some(id) = self.find_by_name(title)? {
            return Ok(id);
        }

        let id = self
            .driver
            .create_playlist(title, description, privacy_status)?;

        let mut map = self.by_title.lock().unwrap();
        map.insert(title.to_string(), id.clone());
        Ok(id)
    }

    /// Attaches `video_id` to the playlist named `title`, creating the
    /// playlist first if necessary.
    pub fn attach_by_name(&self, title: &str, video_id: &str) -> Result<String> {
        let playlist_id = self.get_or_create(
            title,
            &format!("Created into playlist '{}' by bulkup", title),
            DEFAULT_PRIVACY_STATUS,
        )?;
        self.driver.attach(&playlist_id, video_id)?;
        Ok(playlist_id)
    }

    /// Removes `video_id` from `playlist_id`. Returns `false` if the video
    /// wasn't in the playlist to begin with (a no-op, not an error).
    pub fn detach(&self, playlist_id: &str, video_id: &str) -> Result<bool> {
        match self.driver.find_playlist_item_id(playlist_id, video_id)? {
            Some(item_id) => {
                self.driver.delete_playlist_item(&item_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Renames a playlist, identified either by its cached title or by a
    /// raw id, and updates the cache to match.
    pub fn rename(&self, title_or_id: &str, new_title: &str) -> Result<()> {
        let playlist_id = match self.find_by_name(title_or_id)? {
            Some(id) => id,
            None => title_or_id.to_string(),
        };

        self.driver.rename_playlist(&playlist_id, new_title)?;

        let mut map = self.by_title.lock().unwrap();
        map.retain(|_, id| id != &playlist_id);
        map.insert(new_title.to_string(), playlist_id);
        Ok(())
    }
}

/// Default production `PlaylistDriver`: one `reqwest::blocking` client per
/// call against the resumable-upload platform's playlist endpoints,
/// fully paginating `list_playlists` via `next_page_token` rather than
/// stopping at the first page.
pub struct HttpPlaylistDriver {
    credentials: crate::upload::Credentials,
    api_base: String,
}

impl HttpPlaylistDriver {
    pub fn new(credentials: crate::upload::Credentials, api_base: String) -> Self {
        HttpPlaylistDriver {
            credentials,
            api_base,
        }
    }

    fn client(&self) -> reqwest::blocking::Client {
        reqwest::blocking::Client::new()
    }

    fn send(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let response = builder
            .bearer_auth(&self.credentials.access_token)
            .send()
            .map_err(|e| Error::driver(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::driver(format!("http {}: {}", status, body)));
        }
        Ok(response)
    }
}

impl PlaylistDriver for HttpPlaylistDriver {
    fn list_playlists(&self, page_token: Option<&str>) -> Result<PlaylistPage> {
        let mut request = self
            .client()
            .get(&format!("{}/playlists", self.api_base))
            .query(&[("mine", "true"), ("maxResults", "50")]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = self.send(request)?;
        let body: serde_json::Value = response
            .json()
            .map_err(|e| Error::driver(e.to_string()))?;

        let items = body
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let id = item.get("id")?.as_str()?.to_string();
                        let title = item.get("snippet")?.get("title")?.as_str()?.to_string();
                        Some((title, id))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let next_page_token = body
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(PlaylistPage {
            items,
            next_page_token,
        })
    }

    fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy_status: &str,
    ) -> Result<String> {
        let payload = serde_json::json!({
            "snippet": { "title": title, "description": description },
            "status": { "privacyStatus": privacy_status },
        });
        let request = self
            .client()
            .post(&format!("{}/playlists", self.api_base))
            .json(&payload);
        let response = self.send(request)?;
        let body: serde_json::Value = response
            .json()
            .map_err(|e| Error::driver(e.to_string()))?;
        body.get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::driver("create_playlist response contained no id"))
    }

    fn attach(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        let payload = serde_json::json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "video", "videoId": video_id },
            },
        });
        let request = self
            .client()
            .post(&format!("{}/playlistItems", self.api_base))
            .json(&payload);
        match self.send(request) {
            Ok(_) => Ok(()),
            // A duplicate attach is reported by the platform as a 409/400
            // with a recognizable reason; treated as success, not an error.
            Err(e) if e.to_string().contains("duplicate") => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn find_playlist_item_id(&self, playlist_id: &str, video_id: &str) -> Result<Option<String>> {
        let request = self
            .client()
            .get(&format!("{}/playlistItems", self.api_base))
            .query(&[("playlistId", playlist_id), ("videoId", video_id)]);
        let response = self.send(request)?;
        let body: serde_json::Value = response
            .json()
            .map_err(|e| Error::driver(e.to_string()))?;
        Ok(body
            .get("items")
            .and_then(|v| v.as_array())
            .and_then(|items| items.first())
            .and_then(|item| item.get("id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    fn delete_playlist_item(&self, playlist_item_id: &str) -> Result<()> {
        let request = self
            .client()
            .delete(&format!("{}/playlistItems", self.api_base))
            .query(&[("id", playlist_item_id)]);
        self.send(request)?;
        Ok(())
    }

    fn rename_playlist(&self, playlist_id: &str, new_title: &str) -> Result<()> {
        let payload = serde_json::json!({
            "id": playlist_id,
            "snippet": { "title": new_title },
        });
        let request = self
            .client()
            .put(&format!("{}/playlists", self.api_base))
            .json(&payload);
        self.send(request)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeDriver {
        pages: Vec<Vec<(String, String)>>,
        attached: StdMutex<Vec<(String, String)>>,
        created: StdMutex<Vec<String>>,
        items: StdMutex<HashMap<(String, String), String>>,
        deleted: StdMutex<Vec<String>>,
        renamed: StdMutex<Vec<(String, String)>>,
    }

    impl PlaylistDriver for FakeDriver {
        fn list_playlists(&self, page_token: Option<&str>) -> Result<PlaylistPage> {
            let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let items = self.pages.get(index).cloned().unwrap_or_default();
            let next_page_token = if index + 1 < self.pages.len() {
                Some((index + 1).to_string())
            } else {
                None
            };
            Ok(PlaylistPage {
                items,
                next_page_token,
            })
        }

        fn create_playlist(
            &self,
            title: &str,
            _description: &str,
            _privacy_status: &str,
        ) -> Result<String> {
            self.created.lock().unwrap().push(title.to_string());
            Ok(format!("created-{}", title))
        }

        fn attach(&self, playlist_id: &str, video_id: &str) -> Result<()> {
            self.attached
                .lock()
                .unwrap()
                .push((playlist_id.to_string(), video_id.to_string()));
            Ok(())
        }

        fn find_playlist_item_id(&self, playlist_id: &str, video_id: &str) -> Result<Option<String>> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .get(&(playlist_id.to_string(), video_id.to_string()))
                .cloned())
        }

        fn delete_playlist_item(&self, playlist_item_id: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(playlist_item_id.to_string());
            Ok(())
        }

        fn rename_playlist(&self, playlist_id: &str, new_title: &str) -> Result<()> {
            self.renamed
                .lock()
                .unwrap()
                .push((playlist_id.to_string(), new_title.to_string()));
            Ok(())
        }
    }

    #[test]
    fn find_by_name_paginates_across_every_page() {
        let driver = FakeDriver {
            pages: vec![
                vec![("Vacation".to_string(), "pl-1".to_string())],
                vec![("Work Trips".to_string(), "pl-2".to_string())],
            ],
            ..Default::default()
        };
        let cache = PlaylistCache::new(driver);
        assert_eq!(cache.find_by_name("Work Trips").unwrap(), Some("pl-2".to_string()));
        assert_eq!(cache.find_by_name("Vacation").unwrap(), Some("pl-1".to_string()));
    }

    #[test]
    fn find_by_name_does_not_create() {
        let driver = FakeDriver::default();
        let cache = PlaylistCache::new(driver);
        assert_eq!(cache.find_by_name("Nonexistent").unwrap(), None);
        assert!(cache.driver.created.lock().unwrap().is_empty());
    }

    #[test]
    fn get_or_create_creates_once_then_reuses_cache() {
        let driver = FakeDriver::default();
        let cache = PlaylistCache::new(driver);
        let id1 = cache.get_or_create("New Playlist", "desc", "unlisted").unwrap();
        let id2 = cache.get_or_create("New Playlist", "desc", "unlisted").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(cache.driver.created.lock().unwrap().len(), 1);
    }

    #[test]
    fn detach_is_a_noop_when_video_not_in_playlist() {
        let driver = FakeDriver::default();
        let cache = PlaylistCache::new(driver);
        assert_eq!(cache.detach("pl-1", "vid-1").unwrap(), false);
        assert!(cache.driver.deleted.lock().unwrap().is_empty());
    }

    #[test]
    fn detach_deletes_the_resolved_playlist_item() {
        let driver = FakeDriver::default();
        driver
            .items
            .lock()
            .unwrap()
            .insert(("pl-1".to_string(), "vid-1".to_string()), "item-99".to_string());
        let cache = PlaylistCache::new(driver);
        assert_eq!(cache.detach("pl-1", "vid-1").unwrap(), true);
        assert_eq!(cache.driver.deleted.lock().unwrap()[0], "item-99");
    }

    #[test]
    fn rename_updates_the_cache_under_the_new_title() {
        let driver = FakeDriver {
            pages: vec![vec![("Old Name".to_string(), "pl-1".to_string())]],
            ..Default::default()
        };
        let cache = PlaylistCache::new(driver);
        cache.rename("Old Name", "New Name").unwrap();
        assert_eq!(cache.find_by_name("New Name").unwrap(), Some("pl-1".to_string()));
        assert_eq!(cache.find_by_name("Old Name").unwrap(), None);
    }
}
