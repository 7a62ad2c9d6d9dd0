//! Upload-driver specific errors and the classified-retry error taxonomy
//! (spec.md §7).
use failure::{Backtrace, Context, Fail};
use std::path::PathBuf;
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

    pub fn file_not_found(missing_file: PathBuf) -> Error {
        ErrorKind::FileNotFound { missing_file }.into()
    }

    pub fn transient<S: Into<String>>(status: Option<u16>, message: S) -> Error {
        ErrorKind::Transient {
            status,
            message: message.into(),
        }
        .into()
    }

    pub fn remote_quota_exceeded() -> Error {
        ErrorKind::RemoteQuotaExceeded.into()
    }

    pub fn remote_upload_limit() -> Error {
        ErrorKind::RemoteUploadLimit.into()
    }

    pub fn channel_missing<S: Into<String>>(message: S) -> Error {
        ErrorKind::ChannelMissing {
            message: message.into(),
        }
        .into()
    }

    pub fn auth_missing() -> Error {
        ErrorKind::AuthMissing.into()
    }

    pub fn platform_other<S: Into<String>>(message: S) -> Error {
        ErrorKind::PlatformOther {
            message: message.into(),
        }
        .into()
    }

    pub fn retries_exhausted(attempts: usize) -> Error {
        ErrorKind::RetriesExhausted { attempts }.into()
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

/// The error taxonomy the classified-retry loop and the Orchestrator
/// dispatch on (spec.md §7).
#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "file or directory not found: {:?}", missing_file)]
    FileNotFound { missing_file: PathBuf },

    #[fail(display = "transient error (status {:?}): {}", status, message)]
    Transient {
        status: Option<u16>,
        message: String,
    },

    #[fail(display = "Quota Exceeded")]
    RemoteQuotaExceeded,

    #[fail(display = "Account Upload Limit Exceeded")]
    RemoteUploadLimit,

    #[fail(display = "channel missing: {}", message)]
    ChannelMissing { message: String },

    #[fail(display = "no valid credentials or secrets file")]
    AuthMissing,

    #[fail(display = "{}", message)]
    PlatformOther { message: String },

    #[fail(display = "gave up after {} attempt(s)", attempts)]
    RetriesExhausted { attempts: usize },

    #[fail(display = "i/o error: {}", error)]
    IoError { error: String },

    #[fail(display = "http client error: {}", error)]
    HttpError { error: String },
}

impl ErrorKind {
    /// True for kinds the classified-retry loop should retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient { .. })
    }

    /// True for kinds that latch the Orchestrator's global stop signal.
    pub fn should_halt_run(&self) -> bool {
        matches!(
            self,
            ErrorKind::RemoteQuotaExceeded | ErrorKind::RemoteUploadLimit
        )
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::from(Context::new(ErrorKind::IoError {
            error: error.to_string(),
        }))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Error {
        // Socket errors, connect failures and timeouts never reached a
        // server response and are transient by definition; only a
        // completed-but-unparseable exchange is a bare HttpError.
        if error.is_timeout() || error.is_connect() || error.is_request() {
            return Error::from(Context::new(ErrorKind::Transient {
                status: error.status().map(|s| s.as_u16()),
                message: error.to_string(),
            }));
        }
        Error::from(Context::new(ErrorKind::HttpError {
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
