//! Store traits implemented by storage backends (e.g. `shelf-store-sqlite`).
//!
//! Higher layers (`shelf-service`, `shelf-api`) depend on these abstractions,
//! not on any concrete backend. Lookups return `Option`; uniqueness violations
//! surface as [`StoreError::Conflict`](crate::StoreError::Conflict).
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  StoreResult,
  cart::{Cart, CartState, LineChange},
  catalog::{Product, Project},
  customer::Customer,
  subject::Subject,
  token::Token,
};

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Durable keyed storage for opaque session tokens.
pub trait TokenStore: Send + Sync {
  /// Persist a token. Fails with `Conflict` if the value is already taken.
  fn insert_token(&self, token: Token) -> impl Future<Output = StoreResult<()>> + Send + '_;

  fn get_token(&self, token: String) -> impl Future<Output = StoreResult<Option<Token>>> + Send + '_;

  /// Returns `true` if a row was removed.
  fn delete_token(&self, token: String) -> impl Future<Output = StoreResult<bool>> + Send + '_;
}

// ─── Customers ───────────────────────────────────────────────────────────────

pub trait CustomerStore: Send + Sync {
  /// Persist a customer. Fails with `Conflict` on a duplicate
  /// `(project_id, email)`.
  fn insert_customer(
    &self,
    customer: Customer,
  ) -> impl Future<Output = StoreResult<Customer>> + Send + '_;

  fn get_customer(
    &self,
    project_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = StoreResult<Option<Customer>>> + Send + '_;

  /// Case-insensitive match on email.
  fn get_customer_by_email(
    &self,
    project_id: Uuid,
    email: String,
  ) -> impl Future<Output = StoreResult<Option<Customer>>> + Send + '_;
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

pub trait ProjectStore: Send + Sync {
  fn insert_project(&self, project: Project) -> impl Future<Output = StoreResult<Project>> + Send + '_;

  fn get_project_by_key(
    &self,
    key: String,
  ) -> impl Future<Output = StoreResult<Option<Project>>> + Send + '_;
}

pub trait ProductCatalog: Send + Sync {
  /// Fails with `Conflict` on a duplicate `(project_id, sku)`.
  fn insert_product(&self, product: Product) -> impl Future<Output = StoreResult<Product>> + Send + '_;

  fn get_product(
    &self,
    project_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = StoreResult<Option<Product>>> + Send + '_;

  fn get_product_by_sku(
    &self,
    project_id: Uuid,
    sku: String,
  ) -> impl Future<Output = StoreResult<Option<Product>>> + Send + '_;

  fn list_products(&self, project_id: Uuid) -> impl Future<Output = StoreResult<Vec<Product>>> + Send + '_;
}

// ─── Carts ───────────────────────────────────────────────────────────────────

/// Persistence for the cart aggregate.
///
/// Every method that touches more than one row runs in a single transaction;
/// a reader never observes a cart whose total disagrees with its lines.
pub trait CartStore: Send + Sync {
  /// Persist a new (empty) cart.
  fn insert_cart(&self, cart: Cart) -> impl Future<Output = StoreResult<Cart>> + Send + '_;

  /// Load a cart with its lines ordered by creation time.
  fn get_cart(
    &self,
    project_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = StoreResult<Option<Cart>>> + Send + '_;

  /// The most recently created active cart owned by `owner`.
  fn get_active_cart(
    &self,
    project_id: Uuid,
    owner: Subject,
  ) -> impl Future<Output = StoreResult<Option<Cart>>> + Send + '_;

  /// Move the anonymous visitor's most recent active cart to `customer_id`,
  /// clearing the anonymous id. Returns `None` if there is no such cart.
  fn reassign_anonymous_cart(
    &self,
    project_id: Uuid,
    anonymous_id: Uuid,
    customer_id: Uuid,
  ) -> impl Future<Output = StoreResult<Option<Cart>>> + Send + '_;

  /// Apply `changes` in order and recompute the cart total, atomically.
  ///
  /// Ownership and the `active` state are re-checked inside the transaction;
  /// `None` means the cart is gone, no longer owned by `owner`, or deleted.
  /// A `SetQuantity` naming a line not on the cart fails with
  /// `StoreError::NotFound` and rolls the whole batch back.
  fn apply_line_changes(
    &self,
    project_id: Uuid,
    cart_id: Uuid,
    owner: Subject,
    changes: Vec<LineChange>,
  ) -> impl Future<Output = StoreResult<Option<Cart>>> + Send + '_;

  /// Set the cart state if `owner` still owns it. Lines and totals are left
  /// untouched.
  fn set_cart_state(
    &self,
    project_id: Uuid,
    cart_id: Uuid,
    owner: Subject,
    state: CartState,
  ) -> impl Future<Output = StoreResult<Option<Cart>>> + Send + '_;
}

// ─── Health ──────────────────────────────────────────────────────────────────

pub trait StoreHealth: Send + Sync {
  /// Round-trip to the backend. `Ok` means it can serve requests.
  fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send + '_;
}

// ─── Umbrella ────────────────────────────────────────────────────────────────

/// Everything the HTTP layer needs from one backend.
pub trait CommerceStore:
  TokenStore
  + CustomerStore
  + CartStore
  + ProductCatalog
  + ProjectStore
  + StoreHealth
  + Clone
  + 'static
{
}

impl<T> CommerceStore for T where
  T: TokenStore
    + CustomerStore
    + CartStore
    + ProductCatalog
    + ProjectStore
    + StoreHealth
    + Clone
    + 'static
{
}
