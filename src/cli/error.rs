//! CLI-layer errors: thin wrapper around `crate::core::Error` plus the
//! process exit-code mapping (spec.md §6: maintenance commands exit 0 on
//! success, 1 on any unrecoverable error).
use failure::{Backtrace, Context, Fail};
use std::{fmt, result};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub fn usage<S: Into<String>>(message: S) -> Error {
        ErrorKind::Usage {
            message: message.into(),
        }
        .into()
    }

    /// The process exit code this error should surface as.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Usage { .. } => 2,
            _ => 1,
        }
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

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "{}", message)]
    Usage { message: String },

    #[fail(display = "{}", kind)]
    CoreError { kind: crate::core::ErrorKind },

    #[fail(display = "{}", kind)]
    HistoryError { kind: crate::history::ErrorKind },

    #[fail(display = "{}", kind)]
    ConfigError { kind: crate::config::ErrorKind },

    #[fail(display = "{}", kind)]
    PlaylistError { kind: crate::playlist::ErrorKind },

    #[fail(display = "{}", kind)]
    SyncError { kind: crate::sync::ErrorKind },
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

impl From<crate::core::Error> for Error {
    fn from(error: crate::core::Error) -> Error {
        Error::from(Context::new(ErrorKind::CoreError {
            kind: error.kind().clone(),
        }))
    }
}

macro_rules! bridge_error {
    ($child_err:ty, $variant:ident) => {
        impl From<$child_err> for Error {
            fn from(error: $child_err) -> Error {
                Error::from(Context::new(ErrorKind::$variant {
                    kind: error.kind().clone(),
                }))
            }
        }
    };
}

bridge_error!(crate::history::Error, HistoryError);
bridge_error!(crate::config::Error, ConfigError);
bridge_error!(crate::playlist::Error, PlaylistError);
bridge_error!(crate::sync::Error, SyncError);
