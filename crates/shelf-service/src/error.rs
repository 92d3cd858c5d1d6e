//! Business error taxonomy shared by the identity and cart services.

use shelf_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  // ── validation ──
  #[error("currency is required")]
  CurrencyRequired,

  #[error("at least one update action is required")]
  ActionsRequired,

  #[error("email is required")]
  EmailRequired,

  #[error("weak password: {0}")]
  WeakPassword(String),

  #[error("unsupported update action: {0}")]
  UnsupportedAction(String),

  #[error("invalid update action: {0}")]
  InvalidAction(String),

  #[error("a cart is owned by a customer or an anonymous visitor, not both")]
  AmbiguousOwner,

  #[error("no product with sku {0:?}")]
  ProductNotFound(String),

  // ── authorization ──
  #[error("unauthorized")]
  Unauthorized,

  #[error("invalid token")]
  InvalidToken,

  #[error("invalid credentials")]
  InvalidCredentials,

  // ── not found / conflict ──
  /// Also returned for records that exist but belong to someone else.
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("{0} already exists")]
  AlreadyExists(&'static str),

  #[error("cart is not active")]
  CartNotActive,

  // ── infrastructure ──
  #[error("token value collided {0} times in a row")]
  TokenCollision(u32),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("entropy source failed: {0}")]
  Entropy(String),

  #[error(transparent)]
  Store(StoreError),
}

impl Error {
  /// Infrastructure failures, as opposed to expected business outcomes.
  pub fn is_internal(&self) -> bool {
    matches!(
      self,
      Self::TokenCollision(_) | Self::PasswordHash(_) | Self::Entropy(_) | Self::Store(_)
    )
  }
}

impl From<StoreError> for Error {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::Conflict(what) => Self::AlreadyExists(what),
      StoreError::NotFound(what) => Self::NotFound(what),
      other => Self::Store(other),
    }
  }
}

impl From<argon2::password_hash::Error> for Error {
  fn from(e: argon2::password_hash::Error) -> Self { Self::PasswordHash(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
