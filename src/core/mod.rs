//! Crate-wide path helpers and shared types.
//!
//! Every other module reaches here for the on-disk layout of the tool's
//! home directory and for the small set of types (`Error`, `Result`,
//! `OutputFormat`) that get threaded through the rest of the crate.

pub mod error;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt, result};

pub use self::error::{Error, ErrorKind, Result};

/// The home directory for this tool's configuration files, database, and
/// cached credential tokens.
pub static BULKUP_HOME: &str = ".bulkup";

/// Environment variable that, if set, overrides the location of the config
/// file without moving the rest of the home directory.
pub static CONFIG_FILE_ENV_VAR: &str = "BULKUP_CONFIG";

/// Gets the base directory used by this tool for configuration files,
/// the history database, and cached credential tokens.
pub fn home_dir() -> Result<PathBuf> {
    match dirs::home_dir() {
        Some(path) => {
            let mut dir = path;
            dir.push(BULKUP_HOME);
            Ok(dir)
        }
        None => Err(ErrorKind::MissingHomeDir.into()),
    }
}

/// Gets the location of the configuration file.
/// By default, this file is located at "${home_dir()}/config.ini", unless
/// overridden by the `BULKUP_CONFIG` environment variable.
pub fn config_file() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_FILE_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    home_dir().map(|dir| {
        let mut config_file = dir;
        config_file.push("config");
        config_file.set_extension("ini");
        config_file
    })
}

/// Gets the location of the upload history database.
/// By default, this file is located at "${home_dir()}/upload_history.db".
pub fn database_file() -> Result<PathBuf> {
    home_dir().map(|dir| {
        let mut db_file = dir;
        db_file.push("upload_history");
        db_file.set_extension("db");
        db_file
    })
}

/// Gets the legacy JSON dump that `HistoryStore` migrates from on first run,
/// if present: a sibling of the database file named `upload_history.json`.
pub fn legacy_history_file(database_file: &Path) -> PathBuf {
    database_file.with_extension("json")
}

/// Gets the directory holding one credential blob per named profile.
pub fn tokens_dir() -> Result<PathBuf> {
    home_dir().map(|dir| {
        let mut tokens = dir;
        tokens.push("tokens");
        tokens
    })
}

/// Gets the location of the `.active_profile` marker file.
pub fn active_profile_file() -> Result<PathBuf> {
    home_dir().map(|dir| {
        let mut marker = dir;
        marker.push(".active_profile");
        marker
    })
}

/// Output type formats used by the CLI layer.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Uncolorized, newline-separated text.
    Simple,
    /// Colorized, terminal-rendered output (the default).
    Rich,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Rich
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Simple => write!(f, "simple"),
            OutputFormat::Rich => write!(f, "rich"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(format: &str) -> result::Result<Self, Self::Err> {
        match format.to_lowercase().as_ref() {
            "rich" => Ok(OutputFormat::Rich),
            "simple" => Ok(OutputFormat::Simple),
            other => Err(Error::output_format(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_round_trips() {
        assert_eq!("rich".parse::<OutputFormat>().unwrap(), OutputFormat::Rich);
        assert_eq!(
            "SIMPLE".parse::<OutputFormat>().unwrap(),
            OutputFormat::Simple
        );
        assert!("json".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn legacy_history_file_is_a_json_sibling() {
        let db = PathBuf::from("/home/user/.bulkup/upload_history.db");
        assert_eq!(
            legacy_history_file(&db),
            PathBuf::from("/home/user/.bulkup/upload_history.json")
        );
    }
}
