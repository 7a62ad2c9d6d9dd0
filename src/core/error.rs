//! Top level error types shared by every module in this crate.
use failure::{Backtrace, Context, Fail};
use std::{fmt, result};

use crate::config;
use crate::history;
use crate::metadata;
use crate::playlist;
use crate::upload;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub fn missing_home_dir() -> Error {
        ErrorKind::MissingHomeDir.into()
    }

    pub fn output_format<S: Into<String>>(bad_format: S) -> Error {
        ErrorKind::OutputFormat {
            bad_format: bad_format.into(),
        }
        .into()
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        self.kind().clone().into()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        self.kind() == other.kind()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "could not determine the user's home directory")]
    MissingHomeDir,

    #[fail(display = "unexpected output format: {}", bad_format)]
    OutputFormat { bad_format: String },

    #[fail(display = "history error: {}", kind)]
    HistoryError { kind: history::ErrorKind },

    #[fail(display = "config error: {}", kind)]
    ConfigError { kind: config::ErrorKind },

    #[fail(display = "metadata error: {}", kind)]
    MetadataError { kind: metadata::ErrorKind },

    #[fail(display = "upload error: {}", kind)]
    UploadError { kind: upload::ErrorKind },

    #[fail(display = "playlist error: {}", kind)]
    PlaylistError { kind: playlist::ErrorKind },

    #[fail(display = "i/o error: {}", error)]
    IoError { error: String },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::from(Context::new(ErrorKind::IoError {
            error: error.to_string(),
        }))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

macro_rules! bridge_error {
    ($child_kind:ty, $child_err:ty, $variant:ident) => {
        impl From<$child_kind> for Error {
            fn from(kind: $child_kind) -> Error {
                Error::from(Context::new(ErrorKind::$variant { kind }))
            }
        }
        impl From<$child_err> for Error {
            fn from(error: $child_err) -> Error {
                error.kind().clone().into()
            }
        }
    };
}

bridge_error!(history::ErrorKind, history::Error, HistoryError);
bridge_error!(config::ErrorKind, config::Error, ConfigError);
bridge_error!(metadata::ErrorKind, metadata::Error, MetadataError);
bridge_error!(upload::ErrorKind, upload::Error, UploadError);
bridge_error!(playlist::ErrorKind, playlist::Error, PlaylistError);
