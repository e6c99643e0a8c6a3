use error_stack::Report;
use thiserror::Error;

/// Database related errors
#[derive(Debug, Error)]
pub enum Error {
    /// The configured Postgres connection url could not be parsed.
    #[error("invalid connection url")]
    InvalidUrl,
    /// The pool could not hand out a connection in time, or it
    /// has already been closed.
    #[error("unhealthy database pool")]
    UnhealthyPool,
    /// Any other error reported by [`sqlx`] while talking to the
    /// database. The original [`sqlx::Error`] is kept as the source
    /// of the report so constraint violations stay visible as-is.
    #[error("database query failed")]
    Query,
}

/// Converts from a generic [sqlx] result into a [database compatible error](Error).
pub trait ErrorExt<T> {
    fn into_db_error(self) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn into_db_error(self) -> Result<T> {
        self.map_err(|e| match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Report::new(e).change_context(Error::UnhealthyPool)
            }
            _ => Report::new(e).change_context(Error::Query),
        })
    }
}

/// Lazily typed [`std::result::Result`] but the error generic
/// is filled up with [a database error](Error).
pub type Result<T> = error_stack::Result<T, Error>;

/// Shortcut for checking which [database error](Error) sits at the top
/// of a report without matching on it every time.
pub trait ReportExt {
    fn is_unhealthy(&self) -> bool;
}

impl ReportExt for Report<Error> {
    fn is_unhealthy(&self) -> bool {
        matches!(self.current_context(), Error::UnhealthyPool)
    }
}
