//! Orchestrator — the pipeline (spec.md §4.7): per-folder ordinals, a
//! bounded worker pool, the cooperative stop signal, and the strictly
//! ordered post-processing sequence.
//!
//! Generalizes the teacher's actor/futures-0.1 worker
//! (`src/ps/agent/upload/worker.rs`) down to a plain `std::thread`-backed
//! bounded pool, per `original_source/src/services/upload_manager.py`'s
//! semaphore/stop_event shape (see SPEC_FULL.md §5).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::hash;
use crate::history::{self, HistoryStore};
use crate::metadata::{self, MetadataGenerator, MetadataRecord, TemplateConfig};
use crate::playlist::{PlaylistCache, PlaylistDriver};
use crate::scan::{self, Ordinal};
use crate::upload::{self, UploadDriver};

/// Events the Orchestrator reports as it works through a file, per
/// spec.md §4.7's state machine. Carried through to whatever `DisplaySink`
/// the caller supplies; the core itself never renders anything.
#[derive(Debug, Clone)]
pub enum FileEvent<'a> {
    Hashing,
    Duplicate,
    HashFailed,
    Uploading { total_bytes: u64 },
    Progress { bytes_sent: u64, total_bytes: u64 },
    Uploaded { video_id: &'a str },
    ThumbnailAttached,
    PlaylistAttached { playlist: &'a str },
    Failed { error: &'a str },
    Halted,
    DryRunPreview { metadata: &'a MetadataRecord, playlist: &'a str },
}

/// The progress/output capability the Orchestrator reports through
/// (spec.md §4.7). Default production implementation lives in the `cli`
/// module, backed by `indicatif`.
pub trait DisplaySink: Send + Sync {
    fn on_event(&self, path: &Path, event: FileEvent<'_>);
}

/// A `DisplaySink` that discards every event. Used by tests and by
/// headless callers that don't want terminal output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplaySink;

impl DisplaySink for NullDisplaySink {
    fn on_event(&self, _path: &Path, _event: FileEvent<'_>) {}
}

/// Configuration the Orchestrator needs beyond the collaborators it's
/// constructed with (spec.md §6 `upload.*`).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub workers: usize,
    pub dry_run: bool,
    /// Bypasses the dedup check: re-uploads even if the hash/path is
    /// already recorded as a success (original source's `force` flag,
    /// carried forward as an ambient CLI option).
    pub force: bool,
    pub playlist_name_override: Option<String>,
    pub privacy_status: String,
    pub template: TemplateConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            workers: 1,
            dry_run: false,
            force: false,
            playlist_name_override: None,
            privacy_status: "private".to_string(),
            template: TemplateConfig::default(),
        }
    }
}

/// The terminal outcome of a run (spec.md §7, "Halted" in the GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTally {
    pub uploaded: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every file was considered; the stop signal was never latched.
    Completed(RunTally),
    /// The stop signal latched partway through; some files were never
    /// attempted (spec.md §5 Cancellation semantics).
    Halted(RunTally),
    /// `QuotaEstimator` returned `halt` before any file was dispatched.
    QuotaHalt,
}

pub struct Orchestrator<U, P, M, D>
where
    U: UploadDriver,
    P: PlaylistDriver,
    M: MetadataGenerator,
    D: DisplaySink,
{
    history: Arc<HistoryStore>,
    uploader: Arc<U>,
    playlists: Arc<PlaylistCache<P>>,
    metadata_gen: Arc<M>,
    display: Arc<D>,
    config: OrchestratorConfig,
}

impl<U, P, M, D> Orchestrator<U, P, M, D>
where
    U: UploadDriver + 'static,
    P: PlaylistDriver + 'static,
    M: MetadataGenerator + 'static,
    D: DisplaySink + 'static,
{
    pub fn new(
        history: Arc<HistoryStore>,
        uploader: Arc<U>,
        playlists: Arc<PlaylistCache<P>>,
        metadata_gen: Arc<M>,
        display: Arc<D>,
        config: OrchestratorConfig,
    ) -> Self {
        Orchestrator {
            history,
            uploader,
            playlists,
            metadata_gen,
            display,
            config,
        }
    }

    /// Runs the pipeline over `files`. Quota gating happens once, before
    /// any worker is dispatched (spec.md §4.7).
    pub fn run(&self, files: Vec<PathBuf>, quota_verdict: crate::quota::QuotaVerdict) -> RunOutcome {
        if quota_verdict == crate::quota::QuotaVerdict::Halt {
            log::warn!("quota estimator reports halt; skipping this run entirely");
            return RunOutcome::QuotaHalt;
        }

        let ordinals = scan::ordinals_by_folder(&files);
        let queue = Arc::new(Mutex::new(files.into_iter().collect::<VecDeque<PathBuf>>()));
        let stop = Arc::new(AtomicBool::new(false));

        let uploaded = Arc::new(Mutex::new(0usize));
        let skipped = Arc::new(Mutex::new(0usize));
        let failed = Arc::new(Mutex::new(0usize));

        let workers = self.config.workers.max(1);
        let mut handles = Vec::with_capacity(workers);

        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let history = Arc::clone(&self.history);
            let uploader = Arc::clone(&self.uploader);
            let playlists = Arc::clone(&self.playlists);
            let metadata_gen = Arc::clone(&self.metadata_gen);
            let display = Arc::clone(&self.display);
            let config = self.config.clone();
            let ordinals = ordinals.clone();
            let uploaded = Arc::clone(&uploaded);
            let skipped = Arc::clone(&skipped);
            let failed = Arc::clone(&failed);

            handles.push(thread::spawn(move || loop {
                if stop.load(Ordering::SeqCst) {
                    return;
                }

                let next = {
                    let mut q = queue.lock().unwrap();
                    q.pop_front()
                };

                let path = match next {
                    Some(path) => path,
                    None => return,
                };

                let ordinal = ordinals.get(&path).copied().unwrap_or(Ordinal { index: 0, total: 0 });

                match process_file(
                    &path,
                    ordinal,
                    &history,
                    uploader.as_ref(),
                    &playlists,
                    metadata_gen.as_ref(),
                    display.as_ref(),
                    &config,
                ) {
                    FileOutcome::Uploaded => *uploaded.lock().unwrap() += 1,
                    FileOutcome::Skipped => *skipped.lock().unwrap() += 1,
                    FileOutcome::Failed => *failed.lock().unwrap() += 1,
                    FileOutcome::Previewed => {}
                    FileOutcome::Halt => {
                        *failed.lock().unwrap() += 1;
                        stop.store(true, Ordering::SeqCst);
                    }
                }
            }));
        }

        for handle in handles {
            let _ = handle.join();
        }

        let tally = RunTally {
            uploaded: *uploaded.lock().unwrap(),
            skipped_duplicate: *skipped.lock().unwrap(),
            failed: *failed.lock().unwrap(),
        };

        if stop.load(Ordering::SeqCst) {
            RunOutcome::Halted(tally)
        } else {
            RunOutcome::Completed(tally)
        }
    }
}

enum FileOutcome {
    Uploaded,
    Skipped,
    Failed,
    Previewed,
    /// A classified-terminal quota/upload-limit failure: caller must latch
    /// the shared stop signal.
    Halt,
}

#[allow(clippy::too_many_arguments)]
fn process_file<U, P, M, D>(
    path: &Path,
    ordinal: Ordinal,
    history: &HistoryStore,
    uploader: &U,
    playlists: &PlaylistCache<P>,
    metadata_gen: &M,
    display: &D,
    config: &OrchestratorConfig,
) -> FileOutcome
where
    U: UploadDriver,
    P: PlaylistDriver,
    M: MetadataGenerator,
    D: DisplaySink,
{
    let path_str = path.to_string_lossy().to_string();
    let target_playlist = config
        .playlist_name_override
        .clone()
        .unwrap_or_else(|| history::default_playlist_name(&path_str));

    if !config.force {
        match history.is_uploaded_by_path(&path_str) {
            Ok(true) => {
                display.on_event(path, FileEvent::Duplicate);
                return FileOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => log::warn!("history lookup by path failed for {:?}: {}", path, e),
        }
    }

    display.on_event(path, FileEvent::Hashing);
    let file_hash = hash::hash_file(path);
    if file_hash.is_empty() {
        display.on_event(path, FileEvent::HashFailed);
        if let Err(e) = history.upsert_failure(&path_str, &path_str, "hash failure: unreadable file", &target_playlist, 0) {
            log::error!("failed to record hash failure for {:?}: {}", path, e);
        }
        return FileOutcome::Failed;
    }

    if !config.force {
        match history.is_uploaded(&file_hash) {
            Ok(true) => {
                display.on_event(path, FileEvent::Duplicate);
                return FileOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => log::warn!("history lookup by hash failed for {:?}: {}", path, e),
        }
    }

    let container = metadata_gen.extract(path);
    let folder = path.parent().unwrap_or_else(|| Path::new("."));
    let template = metadata::resolve_template_config(&config.template, folder).unwrap_or_else(|e| {
        log::warn!("folder override for {:?} ignored: {}", folder, e);
        config.template.clone()
    });
    let record = metadata::build(path, ordinal.index, ordinal.total, &template, &container);

    let file_size = path.metadata().map(|m| m.len()).unwrap_or(0) as i64;

    if config.dry_run {
        display.on_event(
            path,
            FileEvent::DryRunPreview {
                metadata: &record,
                playlist: &target_playlist,
            },
        );
        return FileOutcome::Previewed;
    }

    let total_bytes = file_size.max(0) as u64;
    display.on_event(path, FileEvent::Uploading { total_bytes });

    let progress_path = path.to_path_buf();
    let progress_display: &D = display;
    let progress_cb = move |sent: u64, total: u64| {
        progress_display.on_event(&progress_path, FileEvent::Progress { bytes_sent: sent, total_bytes: total });
    };

    match uploader.upload_video(path, &record, &progress_cb) {
        Ok(video_id) => {
            display.on_event(path, FileEvent::Uploaded { video_id: &video_id });

            // Post-processing is strictly ordered: history commit, then
            // playlist attach, then thumbnail attach (spec.md §5).
            let metadata_json = serde_json::to_value(&record).ok();
            if let Err(e) = history.upsert_success(
                &path_str,
                &file_hash,
                &video_id,
                metadata_json.as_ref(),
                &target_playlist,
                file_size,
            ) {
                log::error!("failed to commit success row for {:?}: {}", path, e);
            }

            match playlists.attach_by_name(&target_playlist, &video_id) {
                Ok(_) => display.on_event(path, FileEvent::PlaylistAttached { playlist: &target_playlist }),
                Err(e) => log::warn!("best-effort playlist attach failed for {:?}: {}", path, e),
            }

            if let Some(thumbnail) = upload::find_sibling_thumbnail(path) {
                match uploader.upload_thumbnail(&video_id, &thumbnail) {
                    Ok(()) => display.on_event(path, FileEvent::ThumbnailAttached),
                    Err(e) => log::warn!("best-effort thumbnail attach failed for {:?}: {}", path, e),
                }
            }

            FileOutcome::Uploaded
        }
        Err(err) => {
            let message = err.to_string();
            display.on_event(path, FileEvent::Failed { error: &message });

            if let Err(e) = history.upsert_failure(&path_str, &file_hash, &message, &target_playlist, file_size) {
                log::error!("failed to record failure for {:?}: {}", path, e);
            }

            if err.kind().should_halt_run() {
                display.on_event(path, FileEvent::Halted);
                FileOutcome::Halt
            } else {
                FileOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Source;
    use crate::metadata::NullMetadataGenerator;
    use crate::playlist::{PlaylistDriver, PlaylistPage};
    use crate::quota::QuotaVerdict;
    use crate::upload::ProgressCallback;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeUploader {
        next_id: StdMutex<usize>,
        fail_first_n: StdMutex<usize>,
        calls: StdMutex<usize>,
    }

    impl UploadDriver for FakeUploader {
        fn upload_video(
            &self,
            _path: &Path,
            _metadata: &MetadataRecord,
            progress: &ProgressCallback<'_>,
        ) -> upload::Result<String> {
            *self.calls.lock().unwrap() += 1;
            let mut remaining = self.fail_first_n.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(upload::Error::transient(Some(503), "boom"));
            }
            progress(10, 10);
            let mut id = self.next_id.lock().unwrap();
            *id += 1;
            Ok(format!("vid_{:03}", *id))
        }

        fn upload_thumbnail(&self, _video_id: &str, _path: &Path) -> upload::Result<()> {
            Ok(())
        }
    }

    struct QuotaExceededUploader;
    impl UploadDriver for QuotaExceededUploader {
        fn upload_video(
            &self,
            _path: &Path,
            _metadata: &MetadataRecord,
            _progress: &ProgressCallback<'_>,
        ) -> upload::Result<String> {
            Err(upload::Error::from(upload::classify_http(403, "quotaExceeded")))
        }
        fn upload_thumbnail(&self, _video_id: &str, _path: &Path) -> upload::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePlaylistDriver {
        attached: StdMutex<Vec<(String, String)>>,
    }

    impl PlaylistDriver for FakePlaylistDriver {
        fn list_playlists(&self, _page_token: Option<&str>) -> crate::playlist::Result<PlaylistPage> {
            Ok(PlaylistPage { items: vec![], next_page_token: None })
        }
        fn create_playlist(&self, title: &str, _d: &str, _p: &str) -> crate::playlist::Result<String> {
            Ok(format!("pl-{}", title))
        }
        fn attach(&self, playlist_id: &str, video_id: &str) -> crate::playlist::Result<()> {
            self.attached.lock().unwrap().push((playlist_id.to_string(), video_id.to_string()));
            Ok(())
        }
        fn find_playlist_item_id(&self, _p: &str, _v: &str) -> crate::playlist::Result<Option<String>> {
            Ok(None)
        }
        fn delete_playlist_item(&self, _i: &str) -> crate::playlist::Result<()> {
            Ok(())
        }
        fn rename_playlist(&self, _p: &str, _n: &str) -> crate::playlist::Result<()> {
            Ok(())
        }
    }

    fn setup() -> (tempfile::TempDir, Arc<HistoryStore>) {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(&Source::File(dir.path().join("h.db"))).unwrap();
        (dir, Arc::new(store))
    }

    #[test]
    fn s1_new_upload_records_success_and_attaches_playlist() {
        let (dir, history) = setup();
        let folder = dir.path().join("Vacation");
        std::fs::create_dir(&folder).unwrap();
        let file = folder.join("clip01.mp4");
        std::fs::write(&file, vec![0u8; 1_000_000]).unwrap();

        let uploader = Arc::new(FakeUploader::default());
        let playlists = Arc::new(PlaylistCache::new(FakePlaylistDriver::default()));
        let orchestrator = Orchestrator::new(
            Arc::clone(&history),
            Arc::clone(&uploader),
            Arc::clone(&playlists),
            Arc::new(NullMetadataGenerator),
            Arc::new(NullDisplaySink),
            OrchestratorConfig::default(),
        );

        let outcome = orchestrator.run(vec![file.clone()], QuotaVerdict::Ok);
        assert_eq!(outcome, RunOutcome::Completed(RunTally { uploaded: 1, skipped_duplicate: 0, failed: 0 }));
        assert_eq!(*uploader.calls.lock().unwrap(), 1);

        let record = history.get_by_video_id("vid_001").unwrap().unwrap();
        assert_eq!(record.status, "success");
        assert_eq!(record.playlist_name, "Vacation");
        assert_eq!(record.file_size, 1_000_000);
    }

    #[test]
    fn s2_duplicate_skip_does_not_reupload() {
        let (dir, history) = setup();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"hello").unwrap();
        let hash = hash::hash_file(&file);
        history.upsert_success(&file.to_string_lossy(), &hash, "vid_existing", None, "Folder", 5).unwrap();

        let uploader = Arc::new(FakeUploader::default());
        let playlists = Arc::new(PlaylistCache::new(FakePlaylistDriver::default()));
        let orchestrator = Orchestrator::new(
            Arc::clone(&history),
            Arc::clone(&uploader),
            playlists,
            Arc::new(NullMetadataGenerator),
            Arc::new(NullDisplaySink),
            OrchestratorConfig::default(),
        );

        let outcome = orchestrator.run(vec![file], QuotaVerdict::Ok);
        assert_eq!(outcome, RunOutcome::Completed(RunTally { uploaded: 0, skipped_duplicate: 1, failed: 0 }));
        assert_eq!(*uploader.calls.lock().unwrap(), 0);
    }

    #[test]
    fn s3_transient_then_success_retries_and_commits_once() {
        let (dir, history) = setup();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"hello world").unwrap();

        let uploader = Arc::new(FakeUploader { fail_first_n: StdMutex::new(1), ..Default::default() });
        let playlists = Arc::new(PlaylistCache::new(FakePlaylistDriver::default()));
        let orchestrator = Orchestrator::new(
            Arc::clone(&history),
            Arc::clone(&uploader),
            playlists,
            Arc::new(NullMetadataGenerator),
            Arc::new(NullDisplaySink),
            OrchestratorConfig::default(),
        );

        let outcome = orchestrator.run(vec![file], QuotaVerdict::Ok);
        assert_eq!(outcome, RunOutcome::Completed(RunTally { uploaded: 1, skipped_duplicate: 0, failed: 0 }));
        assert_eq!(history.get_all(None).unwrap().len(), 1);
    }

    #[test]
    fn s4_quota_halt_mid_batch_stops_remaining_files() {
        let (dir, history) = setup();
        let file1 = dir.path().join("a.mp4");
        let file2 = dir.path().join("b.mp4");
        std::fs::write(&file1, b"one").unwrap();
        std::fs::write(&file2, b"two").unwrap();

        let uploader = Arc::new(QuotaExceededUploader);
        let playlists = Arc::new(PlaylistCache::new(FakePlaylistDriver::default()));
        let mut config = OrchestratorConfig::default();
        config.workers = 1;
        let orchestrator = Orchestrator::new(
            Arc::clone(&history),
            uploader,
            playlists,
            Arc::new(NullMetadataGenerator),
            Arc::new(NullDisplaySink),
            config,
        );

        let outcome = orchestrator.run(vec![file1.clone(), file2.clone()], QuotaVerdict::Ok);
        match outcome {
            RunOutcome::Halted(tally) => assert_eq!(tally.failed, 1),
            other => panic!("expected Halted, got {:?}", other),
        }

        let all = history.get_all(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].error.as_deref(), Some("Quota Exceeded"));
    }

    #[test]
    fn s5_dry_run_emits_no_upload_and_no_record() {
        let (dir, history) = setup();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"hello").unwrap();

        let uploader = Arc::new(FakeUploader::default());
        let playlists = Arc::new(PlaylistCache::new(FakePlaylistDriver::default()));
        let mut config = OrchestratorConfig::default();
        config.dry_run = true;
        let orchestrator = Orchestrator::new(
            Arc::clone(&history),
            Arc::clone(&uploader),
            playlists,
            Arc::new(NullMetadataGenerator),
            Arc::new(NullDisplaySink),
            config,
        );

        let outcome = orchestrator.run(vec![file], QuotaVerdict::Ok);
        assert_eq!(outcome, RunOutcome::Completed(RunTally { uploaded: 0, skipped_duplicate: 0, failed: 0 }));
        assert_eq!(*uploader.calls.lock().unwrap(), 0);
        assert!(history.get_all(None).unwrap().is_empty());
    }

    #[test]
    fn quota_halt_verdict_skips_the_run_entirely() {
        let (_dir, history) = setup();
        let uploader = Arc::new(FakeUploader::default());
        let playlists = Arc::new(PlaylistCache::new(FakePlaylistDriver::default()));
        let orchestrator = Orchestrator::new(
            history,
            uploader,
            playlists,
            Arc::new(NullMetadataGenerator),
            Arc::new(NullDisplaySink),
            OrchestratorConfig::default(),
        );

        let outcome = orchestrator.run(vec![PathBuf::from("/in/a.mp4")], QuotaVerdict::Halt);
        assert_eq!(outcome, RunOutcome::QuotaHalt);
    }
}
