//! Error type for `shelf-store-sqlite`.

use shelf_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row held a value no domain type can represent.
  #[error("corrupt row: {0}")]
  Corrupt(String),

  #[error("arithmetic overflow computing {0}")]
  Overflow(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for StoreError {
  fn from(e: Error) -> Self { StoreError::backend(e) }
}

/// Whether a write failed on a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  match e {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, _)) => {
      err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    }
    _ => false,
  }
}

/// Map a failed insert to `Conflict(what)` or a backend error.
pub(crate) fn write_error(e: tokio_rusqlite::Error, what: &'static str) -> StoreError {
  if is_unique_violation(&e) {
    StoreError::Conflict(what)
  } else {
    Error::Database(e).into()
  }
}
