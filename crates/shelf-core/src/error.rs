//! Storage-level error type shared by every backend.

use thiserror::Error;

/// An error returned by a store trait method.
///
/// Backends translate their native failures into this type. Absence on a
/// lookup is not an error (lookups return `Option`); `NotFound` is reserved
/// for a mutation whose target row vanished inside a transaction.
#[derive(Debug, Error)]
pub enum StoreError {
  /// A uniqueness constraint rejected the write.
  #[error("{0} already exists")]
  Conflict(&'static str),

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("store backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
  pub fn backend(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(e))
  }

  pub fn is_conflict(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
