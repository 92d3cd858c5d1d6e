//! Identity and cart services for Shelf.
//!
//! Everything here is written against the store traits in
//! [`shelf_core::store`]; pick a backend and hand it over in an `Arc`.
//!
//! ```rust,ignore
//! let store = Arc::new(SqliteStore::open("shelf.db").await?);
//! let services = Services::new(store, Arc::new(SystemClock), &IdentityConfig::default())?;
//! let session = services.anonymous.issue(project.id).await?;
//! ```

pub mod actor;
pub mod anonymous;
pub mod cart;
pub mod customer;
pub mod error;
pub mod password;
pub mod token;

use std::sync::Arc;

use serde::Deserialize;
use shelf_core::{
  clock::Clock,
  store::{CartStore, CustomerStore, ProductCatalog, TokenStore},
};
use uuid::Uuid;

pub use actor::{Actor, resolve_actor};
pub use error::{Error, Result};

use anonymous::AnonymousService;
use cart::CartService;
use customer::CustomerService;
use password::{HashCost, PasswordPolicy};
use token::TokenTtl;

/// Token lifetimes and password settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
  pub customer_tokens:  TokenTtl,
  pub anonymous_tokens: TokenTtl,
  pub password:         PasswordPolicy,
  pub hash_cost:        HashCost,
}

impl Default for IdentityConfig {
  fn default() -> Self {
    Self {
      customer_tokens:  TokenTtl::CUSTOMER,
      anonymous_tokens: TokenTtl::ANONYMOUS,
      password:         PasswordPolicy::default(),
      hash_cost:        HashCost::default(),
    }
  }
}

/// The three services over one shared store and clock.
pub struct Services<S> {
  pub customers: CustomerService<S>,
  pub anonymous: AnonymousService<S>,
  pub carts:     CartService<S>,
}

impl<S> Services<S>
where
  S: CustomerStore + TokenStore + CartStore + ProductCatalog,
{
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: &IdentityConfig) -> Result<Self> {
    Ok(Self {
      customers: CustomerService::new(store.clone(), clock.clone(), config)?,
      anonymous: AnonymousService::new(store.clone(), clock.clone(), config.anonymous_tokens),
      carts:     CartService::new(store, clock),
    })
  }

  pub async fn resolve_actor(&self, project_id: Uuid, token: &str) -> Result<Actor> {
    resolve_actor(&self.customers, &self.anonymous, project_id, token).await
  }
}
