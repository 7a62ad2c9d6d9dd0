//! Metadata-builder specific errors.
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

    pub fn template_expansion<S: Into<String>>(placeholder: S) -> Error {
        ErrorKind::TemplateExpansion {
            placeholder: placeholder.into(),
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
    #[fail(display = "unknown template placeholder: {}", placeholder)]
    TemplateExpansion { placeholder: String },

    #[fail(display = "override file parse error: {}", error)]
    OverrideParseError { error: String },

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

impl From<ini::ini::ParseError> for Error {
    fn from(error: ini::ini::ParseError) -> Error {
        Error::from(Context::new(ErrorKind::OverrideParseError {
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
