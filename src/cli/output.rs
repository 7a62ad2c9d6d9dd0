//! CLI-facing rendering: the default `DisplaySink` (an `indicatif`
//! multi-bar progress display, grounded in the teacher's
//! `src/ps/agent/cli/upload.rs`) and `prettytable-rs` table renderers for
//! the `history`/`quota`/`sync`/`playlist` subcommands (grounded in
//! `src/ps/agent/cli/output.rs` and `src/ps/agent/cli/types.rs`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use prettytable::{self as pt, row};

use crate::history::UploadRecord;
use crate::orchestrator::{DisplaySink, FileEvent};
use crate::quota::format_bytes;
use crate::sync::ComparisonResult;

lazy_static! {
    static ref PROGRESS_BAR_STYLE: ProgressStyle = ProgressStyle::default_bar()
        .template("{prefix:20.bold.dim} {spinner} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")
        .progress_chars("#>-");
    static ref ERROR_PROGRESS_BAR_STYLE: ProgressStyle = ProgressStyle::default_bar()
        .template("{prefix:20.bold.dim} {spinner} {bar:40.red/red} {msg}")
        .progress_chars("#>-");
}

/// A `DisplaySink` that renders one `indicatif` progress bar per in-flight
/// file, keyed by path. Bars are created lazily on the first byte-bearing
/// event and finished (successfully or with an error style) on terminal
/// events; purely informational events (`Hashing`, `Duplicate`, ...)
/// without a meaningful byte count are logged instead of drawing a bar.
pub struct IndicatifDisplaySink {
    multi: MultiProgress,
    bars: Mutex<HashMap<PathBuf, ProgressBar>>,
}

impl IndicatifDisplaySink {
    pub fn new() -> IndicatifDisplaySink {
        IndicatifDisplaySink {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn prefix(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }

    fn bar_for(&self, path: &Path, total_bytes: u64) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();
        bars.entry(path.to_path_buf())
            .or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new(total_bytes));
                bar.set_style(PROGRESS_BAR_STYLE.clone());
                bar.set_prefix(&Self::prefix(path));
                bar
            })
            .clone()
    }
}

impl Default for IndicatifDisplaySink {
    fn default() -> Self {
        IndicatifDisplaySink::new()
    }
}

impl DisplaySink for IndicatifDisplaySink {
    fn on_event(&self, path: &Path, event: FileEvent<'_>) {
        match event {
            FileEvent::Hashing => log::debug!("{}: hashing", path.display()),
            FileEvent::Duplicate => log::info!("{}: already uploaded, skipping", path.display()),
            FileEvent::HashFailed => log::warn!("{}: could not be hashed, skipping", path.display()),
            FileEvent::Uploading { total_bytes } => {
                self.bar_for(path, total_bytes).set_message("uploading");
            }
            FileEvent::Progress {
                bytes_sent,
                total_bytes,
            } => {
                let bar = self.bar_for(path, total_bytes);
                bar.set_position(bytes_sent);
            }
            FileEvent::Uploaded { video_id } => {
                if let Some(bar) = self.bars.lock().unwrap().get(path) {
                    bar.finish_with_message(&format!("uploaded as {}", video_id));
                }
            }
            FileEvent::ThumbnailAttached => {
                if let Some(bar) = self.bars.lock().unwrap().get(path) {
                    bar.set_message("thumbnail attached");
                }
            }
            FileEvent::PlaylistAttached { playlist } => {
                if let Some(bar) = self.bars.lock().unwrap().get(path) {
                    bar.set_message(&format!("added to \"{}\"", playlist));
                }
            }
            FileEvent::Failed { error } => {
                if let Some(bar) = self.bars.lock().unwrap().get(path) {
                    bar.set_style(ERROR_PROGRESS_BAR_STYLE.clone());
                    bar.finish_with_message(error);
                } else {
                    log::error!("{}: {}", path.display(), error);
                }
            }
            FileEvent::Halted => {
                log::warn!("run halted; remaining files were not attempted");
            }
            FileEvent::DryRunPreview { metadata, playlist } => {
                println!(
                    "{}\n  title:     {}\n  playlist:  {}\n  tags:      {}",
                    path.display(),
                    metadata.title,
                    playlist,
                    metadata.tags.join(", ")
                );
            }
        }
    }
}

/// Builds a `prettytable` table with the teacher's standard
/// no-linesep-with-title format.
pub fn table<F>(titles: Vec<&str>, build: F) -> pt::Table
where
    F: Fn(&mut pt::Table),
{
    let mut t = pt::Table::new();
    t.set_format(*pt::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    t.set_titles(pt::Row::new(titles.into_iter().map(pt::Cell::new).collect()));
    build(&mut t);
    t
}

pub fn render_history_table(records: &[UploadRecord]) -> pt::Table {
    table(
        vec!["STATUS", "FILE", "VIDEO ID", "PLAYLIST", "SIZE", "ERROR"],
        |t| {
            for r in records {
                t.add_row(row![
                    r.status,
                    r.file_path,
                    r.video_id.clone().unwrap_or_default(),
                    r.playlist_name,
                    format_bytes(r.file_size as f64),
                    r.error.clone().unwrap_or_default()
                ]);
            }
        },
    )
}

pub fn render_sync_table(result: &ComparisonResult) -> pt::Table {
    table(vec!["VIDEO ID", "STATE", "LOCAL PATH", "REMOTE TITLE"], |t| {
        for item in &result.in_sync {
            t.add_row(row![
                item.video_id,
                "in sync",
                item.local_path.clone().unwrap_or_default(),
                item.remote_title.clone().unwrap_or_default()
            ]);
        }
        for item in &result.missing_local {
            t.add_row(row![
                item.video_id,
                "missing local",
                "",
                item.remote_title.clone().unwrap_or_default()
            ]);
        }
        for item in &result.missing_remote {
            t.add_row(row![
                item.video_id,
                "missing remote",
                item.local_path.clone().unwrap_or_default(),
                ""
            ]);
        }
    })
}
