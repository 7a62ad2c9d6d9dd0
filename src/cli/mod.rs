//! Thin binary-side wiring: the `clap` subcommand tree and the dispatch
//! logic that turns parsed arguments into calls against the library's
//! public collaborators (spec.md §2). Grounded in the teacher's
//! `src/main.rs` subcommand tree and `src/ps/agent/cli/mod.rs`'s `Cli`
//! struct, generalized away from its actix/futures plumbing.

pub mod error;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

pub use self::error::{Error, ErrorKind, Result};
use crate::config::{Config, ProfileBook};
use crate::history::{ExportFormat, HistoryStore, Source};
use crate::metadata::NullMetadataGenerator;
use crate::orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome, RunTally};
use crate::playlist::{HttpPlaylistDriver, PlaylistCache};
use crate::quota::{self, QuotaVerdict};
use crate::retry::{RetryFilter, RetryPlanner};
use crate::scan;
use crate::sync::{HttpUploadsLister, SyncComparer};
use crate::upload::ResumableUploadDriver;

use self::output::IndicatifDisplaySink;

/// Builds the full `clap` application: `bulkup <subcommand> [args]`.
pub fn build_cli() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Bulk video upload orchestrator")
        .setting(AppSettings::UnifiedHelpMessage)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("output")
                .short("O")
                .long("output")
                .takes_value(true)
                .global(true)
                .possible_value("simple")
                .possible_value("rich")
                .default_value("rich")
                .help("Sets the output format"),
        )
        .subcommand(
            SubCommand::with_name("upload")
                .about("Scans a directory and uploads every recognized video file in it")
                .arg(Arg::with_name("directory").required(true).index(1))
                .arg(
                    Arg::with_name("dry-run")
                        .long("dry-run")
                        .help("Previews metadata and target playlists without uploading"),
                )
                .arg(
                    Arg::with_name("force")
                        .long("force")
                        .help("Bypasses the dedup check, re-uploading already-recorded files"),
                )
                .arg(
                    Arg::with_name("playlist")
                        .long("playlist")
                        .takes_value(true)
                        .help("Overrides the per-folder playlist name for this run"),
                ),
        )
        .subcommand(
            SubCommand::with_name("history")
                .about("Inspects and maintains the upload history database")
                .subcommand(
                    SubCommand::with_name("list")
                        .arg(Arg::with_name("limit").long("limit").takes_value(true)),
                )
                .subcommand(
                    SubCommand::with_name("export")
                        .arg(Arg::with_name("format").long("format").takes_value(true).default_value("json"))
                        .arg(Arg::with_name("out").required(true).index(1)),
                )
                .subcommand(
                    SubCommand::with_name("import").arg(Arg::with_name("in").required(true).index(1)),
                )
                .subcommand(
                    SubCommand::with_name("delete")
                        .arg(Arg::with_name("hash").long("hash").takes_value(true))
                        .arg(Arg::with_name("path").long("path").takes_value(true))
                        .arg(Arg::with_name("video-id").long("video-id").takes_value(true)),
                ),
        )
        .subcommand(SubCommand::with_name("quota").about("Estimates today's remaining remote quota"))
        .subcommand(
            SubCommand::with_name("retry")
                .about("Re-attempts previously failed uploads")
                .arg(Arg::with_name("since").long("since").takes_value(true))
                .arg(Arg::with_name("error-contains").long("error-contains").takes_value(true))
                .arg(Arg::with_name("limit").long("limit").takes_value(true))
                .arg(Arg::with_name("dry-run").long("dry-run")),
        )
        .subcommand(
            SubCommand::with_name("sync")
                .about("Compares local history against the remote account's uploads")
                .subcommand(SubCommand::with_name("compare"))
                .subcommand(SubCommand::with_name("fix")),
        )
        .subcommand(
            SubCommand::with_name("playlist")
                .about("Playlist maintenance")
                .subcommand(
                    SubCommand::with_name("rename")
                        .arg(Arg::with_name("from").required(true).index(1))
                        .arg(Arg::with_name("to").required(true).index(2)),
                ),
        )
        .subcommand(
            SubCommand::with_name("config")
                .about("Shows or scaffolds the configuration file")
                .subcommand(SubCommand::with_name("show"))
                .subcommand(SubCommand::with_name("example")),
        )
}

/// Parses and dispatches a subcommand, returning the process exit code.
pub fn run() -> i32 {
    let matches = build_cli().get_matches();
    match dispatch(&matches) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}

fn dispatch(matches: &ArgMatches<'_>) -> Result<i32> {
    match matches.subcommand() {
        ("upload", Some(sub)) => upload(sub),
        ("history", Some(sub)) => history(sub),
        ("quota", Some(_)) => quota_report(),
        ("retry", Some(sub)) => retry(sub),
        ("sync", Some(sub)) => sync(sub),
        ("playlist", Some(sub)) => playlist(sub),
        ("config", Some(sub)) => config_cmd(sub),
        _ => Err(Error::usage("no subcommand given; run with --help")),
    }
}

fn open_history(config: &Config) -> Result<HistoryStore> {
    let path = config.resolve_history_db()?;
    Ok(HistoryStore::new(&Source::File(path))?)
}

fn upload(matches: &ArgMatches<'_>) -> Result<i32> {
    let directory = matches.value_of("directory").ok_or_else(|| Error::usage("missing directory"))?;
    let dry_run = matches.is_present("dry-run");
    let force = matches.is_present("force");
    let playlist_name_override = matches.value_of("playlist").map(|s| s.to_string());

    let config = Config::from_config_file_and_environment()?;
    let profile_book = ProfileBook::open_default()?;
    let history = Arc::new(open_history(&config)?);

    let files = scan::scan_directory(directory);
    if files.is_empty() {
        println!("no recognized video files found under {}", directory);
        return Ok(0);
    }

    let verdict = quota::estimate(&history, config.upload.daily_quota_limit, files.len() as u64)?;
    if let QuotaVerdict::Warn { max_processable } = &verdict {
        eprintln!(
            "warning: only ~{} of {} files are likely to fit in today's remaining quota",
            max_processable,
            files.len()
        );
    }

    let orchestrator_config = OrchestratorConfig {
        workers: config.upload.workers,
        dry_run,
        force,
        playlist_name_override,
        privacy_status: config.upload.privacy_status.clone(),
        template: config.metadata.clone(),
    };

    if dry_run {
        let orchestrator = Orchestrator::new(
            Arc::clone(&history),
            Arc::new(NoopUploadDriver),
            Arc::new(PlaylistCache::new(NoopPlaylistDriver)),
            Arc::new(NullMetadataGenerator),
            Arc::new(IndicatifDisplaySink::new()),
            orchestrator_config,
        );
        return Ok(report_outcome(orchestrator.run(files, verdict)));
    }

    let credentials = profile_book.active_credentials()?;
    let uploader = ResumableUploadDriver::new(credentials.clone(), config.auth.upload_endpoint.clone())
        .with_chunk_size(config.upload.chunk_size)
        .with_retry_count(config.upload.retry_count);
    let playlist_driver = HttpPlaylistDriver::new(credentials, config.auth.api_base.clone());

    let orchestrator = Orchestrator::new(
        Arc::clone(&history),
        Arc::new(uploader),
        Arc::new(PlaylistCache::new(playlist_driver)),
        Arc::new(NullMetadataGenerator),
        Arc::new(IndicatifDisplaySink::new()),
        orchestrator_config,
    );

    Ok(report_outcome(orchestrator.run(files, verdict)))
}

fn report_outcome(outcome: RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed(tally) => {
            println!(
                "done: {} uploaded, {} skipped (already uploaded), {} failed",
                tally.uploaded, tally.skipped_duplicate, tally.failed
            );
            if tally.failed > 0 {
                1
            } else {
                0
            }
        }
        RunOutcome::Halted(tally) => {
            println!(
                "halted: {} uploaded, {} skipped, {} failed before the run stopped",
                tally.uploaded, tally.skipped_duplicate, tally.failed
            );
            1
        }
        RunOutcome::QuotaHalt => {
            println!("today's quota is exhausted; no files were attempted");
            1
        }
    }
}

fn history(matches: &ArgMatches<'_>) -> Result<i32> {
    let config = Config::from_config_file_and_environment()?;
    let store = open_history(&config)?;

    match matches.subcommand() {
        ("list", Some(sub)) => {
            let limit = sub.value_of("limit").and_then(|s| s.parse().ok());
            let records = store.get_all(limit)?;
            output::render_history_table(&records).printstd();
            Ok(0)
        }
        ("export", Some(sub)) => {
            let format = match sub.value_of("format").unwrap_or("json") {
                "csv" => ExportFormat::Csv,
                _ => ExportFormat::Json,
            };
            let body = store.export(format)?;
            let out = sub.value_of("out").ok_or_else(|| Error::usage("missing output path"))?;
            std::fs::write(out, body).map_err(crate::core::Error::from)?;
            Ok(0)
        }
        ("import", Some(sub)) => {
            let path = sub.value_of("in").ok_or_else(|| Error::usage("missing input path"))?;
            let body = std::fs::read_to_string(path).map_err(crate::core::Error::from)?;
            let records: Vec<crate::history::UploadRecord> =
                serde_json::from_str(&body).map_err(|e| Error::usage(e.to_string()))?;
            let (imported, skipped) = store.import(&records)?;
            println!("imported {} rows, skipped {} duplicates", imported, skipped);
            Ok(0)
        }
        ("delete", Some(sub)) => {
            let deleted = if let Some(hash) = sub.value_of("hash") {
                store.delete_by_hash(hash)?
            } else if let Some(path) = sub.value_of("path") {
                store.delete_by_path(path)?
            } else if let Some(video_id) = sub.value_of("video-id") {
                store.delete_by_video_id(video_id)?
            } else {
                return Err(Error::usage("history delete requires --hash, --path, or --video-id"));
            };
            println!("{}", if deleted { "deleted" } else { "no matching row" });
            Ok(0)
        }
        _ => Err(Error::usage("usage: history <list|export|import|delete>")),
    }
}

fn quota_report() -> Result<i32> {
    let config = Config::from_config_file_and_environment()?;
    let store = open_history(&config)?;
    let verdict = quota::estimate(&store, config.upload.daily_quota_limit, 1)?;
    match verdict {
        QuotaVerdict::Halt => {
            println!("quota halt: no remaining headroom for today");
            Ok(1)
        }
        QuotaVerdict::Warn { max_processable } => {
            println!("quota warn: ~{} more uploads fit today", max_processable);
            Ok(0)
        }
        QuotaVerdict::Ok => {
            println!("quota ok: plenty of headroom remains today");
            Ok(0)
        }
    }
}

fn retry(matches: &ArgMatches<'_>) -> Result<i32> {
    let config = Config::from_config_file_and_environment()?;
    let profile_book = ProfileBook::open_default()?;
    let history = Arc::new(open_history(&config)?);

    let filter = RetryFilter {
        since: matches.value_of("since").and_then(|s| s.parse().ok()),
        error_substring: matches.value_of("error-contains").map(|s| s.to_string()),
        limit: matches.value_of("limit").and_then(|s| s.parse().ok()),
    };

    let planner = RetryPlanner::new(&history);
    let batches = planner.plan(&filter)?;

    if batches.is_empty() {
        println!("no failed uploads matched the given filters");
        return Ok(0);
    }

    let dry_run = matches.is_present("dry-run");
    let total_files: usize = batches.iter().map(|b| b.files.len()).sum();
    let verdict = quota::estimate(&history, config.upload.daily_quota_limit, total_files as u64)?;

    if verdict == QuotaVerdict::Halt {
        return Ok(report_outcome(RunOutcome::QuotaHalt));
    }

    let credentials = if dry_run {
        None
    } else {
        Some(profile_book.active_credentials()?)
    };

    // Each batch carries its own originally-recorded playlist_name; run one
    // Orchestrator per batch so retries land back in the playlist they came
    // from instead of the parent-directory default. A halt in one batch
    // stops the remaining batches.
    let mut combined = RunTally { uploaded: 0, skipped_duplicate: 0, failed: 0 };
    let mut halted = false;

    for batch in batches {
        let orchestrator_config = OrchestratorConfig {
            workers: config.upload.workers,
            dry_run,
            force: true,
            playlist_name_override: Some(batch.playlist_name.clone()),
            privacy_status: config.upload.privacy_status.clone(),
            template: config.metadata.clone(),
        };

        let outcome = if dry_run {
            let orchestrator = Orchestrator::new(
                Arc::clone(&history),
                Arc::new(NoopUploadDriver),
                Arc::new(PlaylistCache::new(NoopPlaylistDriver)),
                Arc::new(NullMetadataGenerator),
                Arc::new(IndicatifDisplaySink::new()),
                orchestrator_config,
            );
            orchestrator.run(batch.files, verdict.clone())
        } else {
            let credentials = credentials.clone().expect("credentials required outside dry-run");
            let uploader =
                ResumableUploadDriver::new(credentials.clone(), config.auth.upload_endpoint.clone())
                    .with_chunk_size(config.upload.chunk_size)
                    .with_retry_count(config.upload.retry_count);
            let playlist_driver = HttpPlaylistDriver::new(credentials, config.auth.api_base.clone());

            let orchestrator = Orchestrator::new(
                Arc::clone(&history),
                Arc::new(uploader),
                Arc::new(PlaylistCache::new(playlist_driver)),
                Arc::new(NullMetadataGenerator),
                Arc::new(IndicatifDisplaySink::new()),
                orchestrator_config,
            );
            orchestrator.run(batch.files, verdict.clone())
        };

        match outcome {
            RunOutcome::Completed(tally) => {
                combined.uploaded += tally.uploaded;
                combined.skipped_duplicate += tally.skipped_duplicate;
                combined.failed += tally.failed;
            }
            RunOutcome::Halted(tally) => {
                combined.uploaded += tally.uploaded;
                combined.skipped_duplicate += tally.skipped_duplicate;
                combined.failed += tally.failed;
                halted = true;
                break;
            }
            RunOutcome::QuotaHalt => {
                halted = true;
                break;
            }
        }
    }

    let outcome = if halted {
        RunOutcome::Halted(combined)
    } else {
        RunOutcome::Completed(combined)
    };
    Ok(report_outcome(outcome))
}

fn sync(matches: &ArgMatches<'_>) -> Result<i32> {
    let config = Config::from_config_file_and_environment()?;
    let profile_book = ProfileBook::open_default()?;
    let history = open_history(&config)?;
    let credentials = profile_book.active_credentials()?;
    let lister = HttpUploadsLister::new(credentials, config.auth.api_base.clone());
    let comparer = SyncComparer::new(&history, lister);

    match matches.subcommand() {
        ("fix", Some(_)) => {
            let result = comparer.compare()?;
            let (deleted, failed) = comparer.fix_missing_remote(&result.missing_remote);
            println!("deleted {} stale local rows, {} failed", deleted, failed);
            Ok(0)
        }
        _ => {
            let result = comparer.compare()?;
            output::render_sync_table(&result).printstd();
            Ok(0)
        }
    }
}

fn playlist(matches: &ArgMatches<'_>) -> Result<i32> {
    let config = Config::from_config_file_and_environment()?;
    let profile_book = ProfileBook::open_default()?;
    let credentials = profile_book.active_credentials()?;
    let driver = HttpPlaylistDriver::new(credentials, config.auth.api_base.clone());
    let cache = PlaylistCache::new(driver);

    match matches.subcommand() {
        ("rename", Some(sub)) => {
            let from = sub.value_of("from").ok_or_else(|| Error::usage("missing source name"))?;
            let to = sub.value_of("to").ok_or_else(|| Error::usage("missing target name"))?;
            cache.rename(from, to)?;
            println!("renamed \"{}\" to \"{}\"", from, to);
            Ok(0)
        }
        _ => Err(Error::usage("usage: playlist rename <from> <to>")),
    }
}

fn config_cmd(matches: &ArgMatches<'_>) -> Result<i32> {
    match matches.subcommand() {
        ("example", Some(_)) => {
            print_config_example();
            Ok(0)
        }
        _ => {
            let config = Config::from_config_file_and_environment()?;
            println!("{:#?}", config);
            Ok(0)
        }
    }
}

fn print_config_example() {
    println!(
        "[auth]\nclient_secrets_file = /path/to/client_secret.json\nscopes = https://www.googleapis.com/auth/youtube.upload\n\n[upload]\nchunk_size = 4194304\nretry_count = 5\nprivacy_status = private\ndaily_quota_limit = 10000\nworkers = 1\n\n[metadata]\ntitle_template = {{stem}}\ndescription_template = {{folder}}\\nNo. {{index}}/{{total}}\ntags = \n\n[history]\nhistory_db = \n"
    );
}

/// Used by `--dry-run` runs, which never call into an upload/playlist
/// driver: the Orchestrator still needs a concrete type to instantiate.
struct NoopUploadDriver;

impl crate::upload::UploadDriver for NoopUploadDriver {
    fn upload_video(
        &self,
        _path: &std::path::Path,
        _metadata: &crate::metadata::MetadataRecord,
        _progress: &crate::upload::ProgressCallback<'_>,
    ) -> crate::upload::Result<String> {
        Err(crate::upload::Error::platform_other("dry run: no upload performed"))
    }

    fn upload_thumbnail(&self, _video_id: &str, _path: &std::path::Path) -> crate::upload::Result<()> {
        Ok(())
    }
}

struct NoopPlaylistDriver;

impl crate::playlist::PlaylistDriver for NoopPlaylistDriver {
    fn list_playlists(&self, _page_token: Option<&str>) -> crate::playlist::Result<crate::playlist::PlaylistPage> {
        Ok(crate::playlist::PlaylistPage {
            items: Vec::new(),
            next_page_token: None,
        })
    }

    fn create_playlist(&self, title: &str, _description: &str, _privacy_status: &str) -> crate::playlist::Result<String> {
        Ok(format!("dry-run-{}", title))
    }

    fn attach(&self, _playlist_id: &str, _video_id: &str) -> crate::playlist::Result<()> {
        Ok(())
    }

    fn find_playlist_item_id(&self, _playlist_id: &str, _video_id: &str) -> crate::playlist::Result<Option<String>> {
        Ok(None)
    }

    fn delete_playlist_item(&self, _playlist_item_id: &str) -> crate::playlist::Result<()> {
        Ok(())
    }

    fn rename_playlist(&self, _playlist_id: &str, _new_title: &str) -> crate::playlist::Result<()> {
        Ok(())
    }
}
