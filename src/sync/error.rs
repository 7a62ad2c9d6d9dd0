//! Sync-comparer specific errors.
use failure::{Backtrace, Context, Fail};
use std::{fmt, result};

use crate::history;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub fn lister<S: Into<String>>(message: S) -> Error {
        ErrorKind::Lister {
            message: message.into(),
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
    #[fail(display = "failed to list remote uploaded videos: {}", message)]
    Lister { message: String },

    #[fail(display = "history error: {}", kind)]
    HistoryError { kind: history::ErrorKind },
}

impl From<history::Error> for Error {
    fn from(error: history::Error) -> Error {
        Error::from(Context::new(ErrorKind::HistoryError {
            kind: error.kind().clone(),
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
