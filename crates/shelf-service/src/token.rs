//! Token issuance and validation.
//!
//! One [`TokenIssuer`] exists per [`SubjectKind`]. The issuer only ever binds
//! tokens to its own kind of subject and only ever accepts tokens bound to it,
//! so a customer token can never validate as an anonymous one or vice versa.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, SubsecRound as _};
use rand_core::{OsRng, RngCore as _};
use serde::Deserialize;
use shelf_core::{
  StoreError,
  clock::{Clock, PRECISION_DIGITS},
  store::TokenStore,
  subject::{Subject, SubjectKind},
  token::{Token, TokenKind, redact},
};
use uuid::Uuid;

use crate::{Error, Result};

/// Insert attempts before issuance gives up with [`Error::TokenCollision`].
pub const MAX_ISSUE_ATTEMPTS: u32 = 5;

const TOKEN_BYTES: usize = 32;

// ─── Lifetimes ───────────────────────────────────────────────────────────────

/// Access and refresh lifetimes for one kind of subject, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TokenTtl {
  pub access_secs:  i64,
  pub refresh_secs: i64,
}

impl TokenTtl {
  pub const CUSTOMER: Self = Self { access_secs: 48 * 3600, refresh_secs: 30 * 86400 };
  pub const ANONYMOUS: Self = Self { access_secs: 3 * 3600, refresh_secs: 30 * 86400 };

  pub fn access(&self) -> Duration { Duration::seconds(self.access_secs) }

  pub fn refresh(&self) -> Duration { Duration::seconds(self.refresh_secs) }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
  pub access:  Token,
  pub refresh: Token,
}

impl TokenPair {
  /// Seconds until the access token expires, as of issuance.
  pub fn expires_in(&self) -> i64 { (self.access.expires_at - self.access.created_at).num_seconds() }
}

// ─── Issuer ──────────────────────────────────────────────────────────────────

pub struct TokenIssuer<S> {
  store:   Arc<S>,
  clock:   Arc<dyn Clock>,
  subject: SubjectKind,
}

impl<S> Clone for TokenIssuer<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), clock: self.clock.clone(), subject: self.subject }
  }
}

impl<S: TokenStore> TokenIssuer<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, subject: SubjectKind) -> Self {
    Self { store, clock, subject }
  }

  fn bind(&self, subject_id: Uuid) -> Subject {
    match self.subject {
      SubjectKind::Customer => Subject::Customer(subject_id),
      SubjectKind::Anonymous => Subject::Anonymous(subject_id),
    }
  }

  /// Mint and persist one token, retrying on a value collision.
  pub async fn issue(
    &self,
    project_id: Uuid,
    subject_id: Uuid,
    kind:       TokenKind,
    ttl:        Duration,
  ) -> Result<Token> {
    let subject = self.bind(subject_id);

    for attempt in 1..=MAX_ISSUE_ATTEMPTS {
      // Stored at microsecond precision; the returned token must match the row.
      let now = self.clock.now().trunc_subsecs(PRECISION_DIGITS);
      let token = Token {
        token: generate_token()?,
        project_id,
        kind,
        subject,
        expires_at: now + ttl,
        created_at: now,
      };

      match self.store.insert_token(token.clone()).await {
        Ok(()) => return Ok(token),
        Err(StoreError::Conflict(_)) => {
          tracing::warn!(%project_id, attempt, "token value collided, regenerating");
        }
        Err(e) => return Err(e.into()),
      }
    }

    tracing::error!(
      page = true,
      %project_id,
      %subject,
      attempts = MAX_ISSUE_ATTEMPTS,
      "token issuance exhausted its retries"
    );
    Err(Error::TokenCollision(MAX_ISSUE_ATTEMPTS))
  }

  pub async fn issue_pair(&self, project_id: Uuid, subject_id: Uuid, ttl: TokenTtl) -> Result<TokenPair> {
    let access = self.issue(project_id, subject_id, TokenKind::Access, ttl.access()).await?;
    let refresh = self.issue(project_id, subject_id, TokenKind::Refresh, ttl.refresh()).await?;
    Ok(TokenPair { access, refresh })
  }

  /// The subject id an access token is bound to, or `None` if the token is
  /// unknown, expired, a refresh token, from another project, or bound to
  /// the other kind of subject.
  ///
  /// Expired tokens are deleted on sight.
  pub async fn validate(&self, project_id: Uuid, token: &str) -> Result<Option<Uuid>> {
    let Some(row) = self.store.get_token(token.to_owned()).await? else {
      return Ok(None);
    };

    if row.project_id != project_id || row.kind != TokenKind::Access {
      return Ok(None);
    }

    if row.is_expired(self.clock.now()) {
      if let Err(e) = self.store.delete_token(row.token.clone()).await {
        tracing::warn!(token = %redact(&row.token), error = %e, "failed to delete expired token");
      }
      return Ok(None);
    }

    Ok(match (self.subject, row.subject) {
      (SubjectKind::Customer, Subject::Customer(id)) => Some(id),
      (SubjectKind::Anonymous, Subject::Anonymous(id)) => Some(id),
      _ => None,
    })
  }
}

/// 32 bytes from the OS, URL-safe base64 without padding.
fn generate_token() -> Result<String> {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng
    .try_fill_bytes(&mut bytes)
    .map_err(|e| Error::Entropy(e.to_string()))?;
  Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// A short random id for a customer address: 6 bytes, 8 URL-safe characters.
pub(crate) fn generate_short_id() -> Result<String> {
  let mut bytes = [0u8; 6];
  OsRng
    .try_fill_bytes(&mut bytes)
    .map_err(|e| Error::Entropy(e.to_string()))?;
  Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_tokens_are_url_safe() {
    let token = generate_token().unwrap();
    assert_eq!(token.len(), 43);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    assert_ne!(token, generate_token().unwrap());
  }

  #[test]
  fn short_ids_are_eight_characters() {
    assert_eq!(generate_short_id().unwrap().len(), 8);
  }

  #[test]
  fn default_lifetimes() {
    assert_eq!(TokenTtl::CUSTOMER.access(), Duration::hours(48));
    assert_eq!(TokenTtl::ANONYMOUS.access(), Duration::hours(3));
    assert_eq!(TokenTtl::ANONYMOUS.refresh(), Duration::days(30));
  }
}
