//! Resolving a bearer token to the caller.

use shelf_core::{
  customer::Customer,
  store::{CustomerStore, TokenStore},
  subject::Subject,
};
use uuid::Uuid;

use crate::{Error, Result, anonymous::AnonymousService, customer::CustomerService};

/// The caller of a request: exactly one of a customer or an anonymous id.
#[derive(Debug, Clone)]
pub enum Actor {
  Customer(Customer),
  Anonymous(Uuid),
}

impl Actor {
  pub fn subject(&self) -> Subject {
    match self {
      Self::Customer(c) => Subject::Customer(c.id),
      Self::Anonymous(id) => Subject::Anonymous(*id),
    }
  }
}

/// Try the token as a customer token, then as an anonymous one.
///
/// Only `InvalidToken` moves resolution on to the next step; any other error
/// is returned as is. Failing both steps is `Unauthorized`.
pub async fn resolve_actor<S>(
  customers:  &CustomerService<S>,
  anonymous:  &AnonymousService<S>,
  project_id: Uuid,
  token:      &str,
) -> Result<Actor>
where
  S: CustomerStore + TokenStore,
{
  match customers.lookup_by_token(project_id, token).await {
    Ok(customer) => return Ok(Actor::Customer(customer)),
    Err(Error::InvalidToken) => {}
    Err(e) => return Err(e),
  }

  match anonymous.lookup_by_token(project_id, token).await {
    Ok(id) => Ok(Actor::Anonymous(id)),
    Err(Error::InvalidToken) => Err(Error::Unauthorized),
    Err(e) => Err(e),
  }
}
