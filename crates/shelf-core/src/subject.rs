//! Subject: who a token or a cart belongs to.
//!
//! A subject is either a registered customer or an anonymous visitor. The two
//! are never mixed: a value of this type has exactly one populated arm, and
//! storage keeps the two ids in separate columns.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminant of [`Subject`], used to specialise token issuers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
  Customer,
  Anonymous,
}

/// A customer id or an anonymous id.
///
/// Serialises externally tagged as `{"customerId": ...}` or
/// `{"anonymousId": ...}`, which lets a flattened `Option<Subject>` render the
/// platform's two optional owner fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
  #[serde(rename = "customerId")]
  Customer(Uuid),
  #[serde(rename = "anonymousId")]
  Anonymous(Uuid),
}

impl Subject {
  pub fn kind(&self) -> SubjectKind {
    match self {
      Self::Customer(_) => SubjectKind::Customer,
      Self::Anonymous(_) => SubjectKind::Anonymous,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::Customer(id) | Self::Anonymous(id) => *id,
    }
  }

  pub fn customer_id(&self) -> Option<Uuid> {
    match self {
      Self::Customer(id) => Some(*id),
      Self::Anonymous(_) => None,
    }
  }

  pub fn anonymous_id(&self) -> Option<Uuid> {
    match self {
      Self::Anonymous(id) => Some(*id),
      Self::Customer(_) => None,
    }
  }

  /// Rebuild a subject from the two nullable storage columns.
  ///
  /// Returns `None` when neither or both are set.
  pub fn from_columns(customer_id: Option<Uuid>, anonymous_id: Option<Uuid>) -> Option<Self> {
    match (customer_id, anonymous_id) {
      (Some(c), None) => Some(Self::Customer(c)),
      (None, Some(a)) => Some(Self::Anonymous(a)),
      _ => None,
    }
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Customer(id) => write!(f, "customer:{id}"),
      Self::Anonymous(id) => write!(f, "anonymous:{id}"),
    }
  }
}
