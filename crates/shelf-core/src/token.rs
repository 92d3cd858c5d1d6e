//! Opaque session tokens.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::Subject;

/// Access tokens authorise identity resolution; refresh tokens never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

impl TokenKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Access => "access",
      Self::Refresh => "refresh",
    }
  }
}

/// A persisted token row. The token value is globally unique.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
  pub token:      String,
  pub project_id: Uuid,
  pub kind:       TokenKind,
  pub subject:    Subject,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl Token {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now > self.expires_at }
}

/// First six characters of a token, for log lines.
pub fn redact(token: &str) -> String {
  let prefix: String = token.chars().take(6).collect();
  format!("{prefix}…")
}

impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Token")
      .field("token", &redact(&self.token))
      .field("project_id", &self.project_id)
      .field("kind", &self.kind)
      .field("subject", &self.subject)
      .field("expires_at", &self.expires_at)
      .field("created_at", &self.created_at)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn debug_output_hides_token_value() {
    let now = Utc::now();
    let token = Token {
      token:      "abcdefghijklmnopqrstuvwxyz".into(),
      project_id: Uuid::new_v4(),
      kind:       TokenKind::Access,
      subject:    Subject::Customer(Uuid::new_v4()),
      expires_at: now + Duration::hours(1),
      created_at: now,
    };
    let printed = format!("{token:?}");
    assert!(printed.contains("abcdef…"));
    assert!(!printed.contains("ghijkl"));
  }

  #[test]
  fn expiry_is_strictly_after() {
    let now = Utc::now();
    let token = Token {
      token:      "t".into(),
      project_id: Uuid::new_v4(),
      kind:       TokenKind::Access,
      subject:    Subject::Anonymous(Uuid::new_v4()),
      expires_at: now,
      created_at: now,
    };
    assert!(!token.is_expired(now));
    assert!(token.is_expired(now + Duration::milliseconds(1)));
  }
}
