use error_stack::{Context, Report};
use serde::Serialize;
use thiserror::Error;
use tracing_error::SpanTrace;

mod impls;

pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong from the point of view of the client. This is the
/// only part of an [`Error`] that ever reaches the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Internal,
    NotFound,
    MethodNotAllowed,
}

impl ErrorKind {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Internal => "Something went wrong",
            Self::NotFound => "Post not found",
            Self::MethodNotAllowed => "Method not allowed",
        }
    }
}

/// Where a request failed while being handled.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("could not decode request body")]
    DecodeBody,
    #[error("could not encode response body")]
    EncodeBody,
    #[error("repository operation failed")]
    Repository,
    #[error("repository operation timed out")]
    TimedOut,
    #[error("post not found")]
    NotFound,
}

/// Error returned by request handlers.
///
/// The report and span trace are only logged. Clients get a fixed
/// message derived from [`ErrorKind`].
pub struct Error {
    kind: ErrorKind,
    report: Report<HandlerError>,
    trace: SpanTrace,
}

impl Error {
    #[must_use]
    pub fn from_context(kind: ErrorKind, context: HandlerError) -> Self {
        Self::from_report(kind, Report::new(context))
    }

    #[must_use]
    pub fn from_report(kind: ErrorKind, report: Report<HandlerError>) -> Self {
        Self {
            kind,
            report,
            trace: SpanTrace::capture(),
        }
    }

    /// Wraps a lower level report as an internal failure.
    #[must_use]
    pub fn internal<C: Context>(report: Report<C>, context: HandlerError) -> Self {
        Self::from_report(ErrorKind::Internal, report.change_context(context))
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::from_context(ErrorKind::NotFound, HandlerError::NotFound)
    }
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn report(&self) -> &Report<HandlerError> {
        &self.report
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("report", &self.report)
            .field("trace", &self.trace)
            .finish()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.kind.message())?;
        writeln!(f, "{:?}", self.report)?;
        std::fmt::Display::fmt(&self.trace, f)
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub code: ErrorKind,
    pub message: &'static str,
}

impl From<ErrorKind> for ErrorBody {
    fn from(kind: ErrorKind) -> Self {
        Self {
            code: kind,
            message: kind.message(),
        }
    }
}
