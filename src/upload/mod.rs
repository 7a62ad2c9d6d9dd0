//! `UploadDriver` — resumable chunked upload with classified retry.

pub mod error;

use std::path::Path;
use std::thread;
use std::time::Duration;

pub use self::error::{Error, ErrorKind, Result};
use crate::metadata::MetadataRecord;

/// Default chunk size for a resumable upload: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Default number of classified-retry attempts before giving up.
pub const DEFAULT_RETRY_COUNT: usize = 5;

/// An opaque, immutable handle to whatever OAuth/API credentials the
/// driver needs. Acquisition and refresh are out of this crate's scope;
/// the driver only ever reads from it.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
}

/// Progress reported after each chunk: `(bytes_sent, total_bytes)`.
pub type ProgressCallback<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// The capability the core depends on for resumable chunked uploads and
/// thumbnail attachment (spec.md §4.4).
pub trait UploadDriver: Send + Sync {
    fn upload_video(
        &self,
        path: &Path,
        metadata: &MetadataRecord,
        progress: &ProgressCallback<'_>,
    ) -> Result<String>;

    fn upload_thumbnail(&self, video_id: &str, path: &Path) -> Result<()>;
}

/// Classifies an HTTP response into the spec.md §7 error taxonomy. A pure
/// function over status code and response body substring, so retry
/// decisions never need to be re-derived at call sites.
pub fn classify_http(status: u16, body: &str) -> ErrorKind {
    if status == 403 && body.contains("quotaExceeded") {
        return ErrorKind::RemoteQuotaExceeded;
    }
    if status == 400 && body.contains("uploadLimitExceeded") {
        return ErrorKind::RemoteUploadLimit;
    }
    if body.contains("youtubeSignupRequired") {
        return ErrorKind::ChannelMissing {
            message: body.to_string(),
        };
    }
    if is_retryable_status(status) {
        return ErrorKind::Transient {
            status: Some(status),
            message: body.to_string(),
        };
    }
    ErrorKind::PlatformOther {
        message: format!("HTTP {}: {}", status, body),
    }
}

/// HTTP statuses the classified-retry loop treats as transient.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Computes the exponential backoff delay for the given (1-based) attempt
/// number: multiplier 1, floor 2s, ceiling 60s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let seconds = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_secs(seconds.min(60).max(2))
}

/// Runs `op`, retrying while the returned error classifies as retryable,
/// sleeping the exponential backoff between attempts, up to `retry_count`
/// total attempts.
pub fn with_classified_retry<F, T>(retry_count: usize, mut op: F) -> Result<T>
where
    F: FnMut(usize) -> Result<T>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.kind().is_retryable() || attempt >= retry_count {
                    if err.kind().is_retryable() {
                        return Err(Error::retries_exhausted(attempt));
                    }
                    return Err(err);
                }
                thread::sleep(backoff_delay(attempt as u32));
            }
        }
    }
}

/// Default production `UploadDriver`: a blocking HTTP client built fresh
/// per call from the shared `Credentials` handle, so no mutable client
/// state is ever shared across concurrent uploads.
pub struct ResumableUploadDriver {
    credentials: Credentials,
    upload_endpoint: String,
    chunk_size: u64,
    retry_count: usize,
}

impl ResumableUploadDriver {
    pub fn new(credentials: Credentials, upload_endpoint: String) -> Self {
        ResumableUploadDriver {
            credentials,
            upload_endpoint,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_count: DEFAULT_RETRY_COUNT,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    fn client(&self) -> reqwest::blocking::Client {
        // A fresh client per call: no connection state or auth headers are
        // shared across concurrent uploads.
        reqwest::blocking::Client::new()
    }
}

impl UploadDriver for ResumableUploadDriver {
    fn upload_video(
        &self,
        path: &Path,
        metadata: &MetadataRecord,
        progress: &ProgressCallback<'_>,
    ) -> Result<String> {
        if !path.exists() {
            return Err(Error::file_not_found(path.to_path_buf()));
        }

        let total_bytes = path.metadata()?.len();
        let chunk_size = self.chunk_size;

        with_classified_retry(self.retry_count, |_attempt| {
            let client = self.client();
            let mut sent = 0u64;

            while sent < total_bytes {
                let this_chunk = chunk_size.min(total_bytes - sent);
                let response = client
                    .put(&self.upload_endpoint)
                    .bearer_auth(&self.credentials.access_token)
                    .header("X-Upload-Title", metadata.title.as_str())
                    .header(
                        "Content-Range",
                        format!(
                            "bytes {}-{}/{}",
                            sent,
                            sent + this_chunk - 1,
                            total_bytes
                        ),
                    )
                    .send()
                    .map_err(Error::from)?;

                let status = response.status().as_u16();
                sent += this_chunk;
                progress(sent, total_bytes);

                if status >= 400 {
                    let body = response.text().unwrap_or_default();
                    return Err(classify_http(status, &body).into());
                }

                if sent >= total_bytes {
                    let body = response.text().unwrap_or_default();
                    return extract_video_id(&body);
                }
            }

            Err(Error::platform_other("upload loop ended without a video id"))
        })
    }

    fn upload_thumbnail(&self, video_id: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::file_not_found(path.to_path_buf()));
        }

        with_classified_retry(self.retry_count, |_attempt| {
            let client = self.client();
            let bytes = std::fs::read(path)?;
            let response = client
                .post(format!("{}/thumbnails/{}", self.upload_endpoint, video_id))
                .bearer_auth(&self.credentials.access_token)
                .body(bytes)
                .send()
                .map_err(Error::from)?;

            let status = response.status().as_u16();
            if status >= 400 {
                let body = response.text().unwrap_or_default();
                return Err(classify_http(status, &body).into());
            }
            Ok(())
        })
    }
}

fn extract_video_id(body: &str) -> Result<String> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::platform_other(e.to_string()))?;
    parsed
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::platform_other("response contained no video id"))
}

/// Looks beside `video_path` for a sibling image file with one of
/// `.jpg`/`.jpeg`/`.png`. First match wins (spec.md's Open Questions:
/// the source implicitly assumes one match is enough; we keep that).
pub fn find_sibling_thumbnail(video_path: &Path) -> Option<std::path::PathBuf> {
    let stem = video_path.file_stem()?;
    let parent = video_path.parent()?;
    for ext in &["jpg", "jpeg", "png"] {
        let candidate = parent.join(stem).with_extension(ext);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_http_recognizes_quota_exceeded() {
        let kind = classify_http(403, r#"{"error": {"errors": [{"reason": "quotaExceeded"}]}}"#);
        assert_eq!(kind, ErrorKind::RemoteQuotaExceeded);
        assert!(kind.should_halt_run());
    }

    #[test]
    fn classify_http_recognizes_upload_limit() {
        let kind = classify_http(400, "uploadLimitExceeded");
        assert_eq!(kind, ErrorKind::RemoteUploadLimit);
        assert!(kind.should_halt_run());
    }

    #[test]
    fn classify_http_recognizes_channel_missing() {
        let kind = classify_http(401, "youtubeSignupRequired");
        assert!(matches!(kind, ErrorKind::ChannelMissing { .. }));
        assert!(!kind.should_halt_run());
    }

    #[test]
    fn classify_http_retries_server_errors() {
        for status in &[408, 429, 500, 502, 503, 504] {
            let kind = classify_http(*status, "");
            assert!(kind.is_retryable(), "status {} should be retryable", status);
        }
    }

    #[test]
    fn classify_http_does_not_retry_other_4xx() {
        let kind = classify_http(404, "not found");
        assert!(!kind.is_retryable());
        assert!(!kind.should_halt_run());
    }

    #[test]
    fn backoff_delay_is_bounded_between_2_and_60_seconds() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(10), Duration::from_secs(60));
    }

    #[test]
    fn with_classified_retry_gives_up_after_retry_count() {
        let mut calls = 0;
        let result: Result<()> = with_classified_retry(3, |_attempt| {
            calls += 1;
            Err(Error::transient(Some(503), "boom"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn with_classified_retry_does_not_retry_non_transient_errors() {
        let mut calls = 0;
        let result: Result<()> = with_classified_retry(5, |_attempt| {
            calls += 1;
            Err(Error::platform_other("nope"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn find_sibling_thumbnail_prefers_first_match() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(dir.path().join("clip.jpg"), b"thumb").unwrap();
        let found = find_sibling_thumbnail(&video).unwrap();
        assert_eq!(found.extension().unwrap(), "jpg");
    }

    #[test]
    fn find_sibling_thumbnail_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"video").unwrap();
        assert!(find_sibling_thumbnail(&video).is_none());
    }

    #[test]
    fn connect_failure_classifies_as_transient_not_http_error() {
        // Port 0 is never listening; the send() never reaches a server.
        let result = reqwest::blocking::Client::new()
            .get("http://127.0.0.1:0")
            .send();
        let err: Error = result.expect_err("connecting to port 0 must fail").into();
        assert!(err.kind().is_retryable(), "got {:?}", err.kind());
        assert!(matches!(err.kind(), ErrorKind::Transient { .. }));
    }
}
