//! Anonymous visitor identity.
//!
//! An anonymous id has no row of its own; it exists only through the tokens
//! bound to it and the carts it owns.

use std::sync::Arc;

use shelf_core::{clock::Clock, store::TokenStore, subject::SubjectKind};
use uuid::Uuid;

use crate::{
  Error, Result,
  token::{TokenIssuer, TokenPair, TokenTtl},
};

#[derive(Debug, Clone)]
pub struct AnonymousSession {
  pub anonymous_id: Uuid,
  pub tokens:       TokenPair,
}

pub struct AnonymousService<S> {
  tokens: TokenIssuer<S>,
  ttl:    TokenTtl,
}

impl<S: TokenStore> AnonymousService<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, ttl: TokenTtl) -> Self {
    Self { tokens: TokenIssuer::new(store, clock, SubjectKind::Anonymous), ttl }
  }

  pub fn access_ttl_secs(&self) -> i64 { self.ttl.access_secs }

  /// Mint a new anonymous id and its token pair.
  pub async fn issue(&self, project_id: Uuid) -> Result<AnonymousSession> {
    let anonymous_id = Uuid::new_v4();
    let tokens = self.tokens.issue_pair(project_id, anonymous_id, self.ttl).await?;
    tracing::debug!(%project_id, %anonymous_id, "anonymous session issued");
    Ok(AnonymousSession { anonymous_id, tokens })
  }

  pub async fn lookup_by_token(&self, project_id: Uuid, token: &str) -> Result<Uuid> {
    self
      .tokens
      .validate(project_id, token)
      .await?
      .ok_or(Error::InvalidToken)
  }
}
