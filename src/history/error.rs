//! History store specific errors.
use failure::{Backtrace, Context, Fail};
use std::{fmt, io, path, result};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub fn path(path: path::PathBuf) -> Error {
        ErrorKind::Path { path }.into()
    }

    pub fn migration<S: Into<String>, T: Into<String>>(version: usize, error: T, sql: S) -> Error {
        ErrorKind::Migration {
            version,
            error: error.into(),
            sql: sql.into(),
        }
        .into()
    }

    pub fn legacy_import<S: Into<String>>(reason: S) -> Error {
        ErrorKind::LegacyImport {
            reason: reason.into(),
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

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "invalid path: {:?}", path)]
    Path { path: path::PathBuf },

    #[fail(display = "migration error: version {}: {}: {}", version, error, sql)]
    Migration {
        version: usize,
        error: String,
        sql: String,
    },

    #[fail(display = "r2d2 error: {}", error)]
    R2d2Error { error: String },

    #[fail(display = "rusqlite error: {}", error)]
    RusqliteError { error: String },

    #[fail(display = "json error: {}", error)]
    JsonError { error: String },

    #[fail(display = "csv error: {}", error)]
    CsvError { error: String },

    #[fail(display = "query returned no rows")]
    QueryReturnedNoRows,

    #[fail(display = "legacy import failed: {}", reason)]
    LegacyImport { reason: String },

    #[fail(display = "i/o error: {}", error)]
    IoError { error: String },
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::from(Context::new(ErrorKind::IoError {
            error: error.to_string(),
        }))
    }
}

impl From<r2d2::Error> for Error {
    fn from(error: r2d2::Error) -> Error {
        Error::from(Context::new(ErrorKind::R2d2Error {
            error: error.to_string(),
        }))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Error {
        Error::from(Context::new(ErrorKind::RusqliteError {
            error: error.to_string(),
        }))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::from(Context::new(ErrorKind::JsonError {
            error: error.to_string(),
        }))
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Error {
        Error::from(Context::new(ErrorKind::CsvError {
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
