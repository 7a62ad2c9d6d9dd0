//! Configuration-layer specific errors.
use failure::{Backtrace, Context, Fail};
use std::{fmt, io, result};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub fn missing_key<S: Into<String>>(key: S) -> Error {
        ErrorKind::MissingKey { key: key.into() }.into()
    }

    pub fn unknown_profile<S: Into<String>>(name: S) -> Error {
        ErrorKind::UnknownProfile { name: name.into() }.into()
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
    #[fail(display = "missing required configuration option \"{}\"", key)]
    MissingKey { key: String },

    #[fail(display = "unknown profile: {}", name)]
    UnknownProfile { name: String },

    #[fail(display = "config parse error: {}", error)]
    ParseError { error: String },

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

impl From<ini::ini::Error> for Error {
    fn from(error: ini::ini::Error) -> Error {
        Error::from(Context::new(ErrorKind::ParseError {
            error: error.to_string(),
        }))
    }
}

impl From<ini::ini::ParseError> for Error {
    fn from(error: ini::ini::ParseError) -> Error {
        Error::from(Context::new(ErrorKind::ParseError {
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
