use std::env;
use std::process::exit;

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
#[cfg(not(debug_assertions))]
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use bulkup::cli;
use bulkup::config::constants as c;

/// Reads the console logging level from `BULKUP_LOG_LEVEL`, falling back to
/// `default_level` on an unset or unrecognized value.
fn log_level(default_level: LevelFilter) -> LevelFilter {
    match env::var("BULKUP_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            other => {
                eprintln!("not a valid logging level: {}", other);
                default_level
            }
        },
        Err(_) => default_level,
    }
}

/// Console logging for debug builds, plus a rolling file appender under the
/// tool's home directory for release builds (mirrors the teacher's debug vs
/// release logging split).
fn setup_logging() {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(c::LOG_FORMAT)))
        .build();

    #[cfg(debug_assertions)]
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(
            Root::builder()
                .appender("stdout")
                .build(log_level(LevelFilter::Info)),
        )
        .expect("couldn't initialize the console logger");

    #[cfg(not(debug_assertions))]
    let config = {
        let home = bulkup::home_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        let log_file = home.join("bulkup.log");
        let rolling = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(c::LOG_FORMAT)))
            .build(log_file)
            .expect("couldn't initialize the file logger");

        LogConfig::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .appender(Appender::builder().build("rolling", Box::new(rolling)))
            .build(
                Root::builder()
                    .appender("stdout")
                    .appender("rolling")
                    .build(log_level(LevelFilter::Warn)),
            )
            .expect("couldn't initialize the file logger")
    };

    log4rs::init_config(config).expect("couldn't initialize the logger");
}

fn main() {
    setup_logging();

    #[cfg(not(debug_assertions))]
    setup_panic!();

    let code = cli::run();
    exit(code);
}
