//! Registered customers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A postal address attached to a customer. `id` is a short random string
/// assigned at signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id:          String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub first_name:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_name:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub country:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub street_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub postal_code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub department:  Option<String>,
}

/// A registered user tied to a project. `(project_id, email)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id:                          Uuid,
  pub project_id:                  Uuid,
  /// Always stored trimmed and lower-cased.
  pub email:                       String,
  /// Argon2 PHC string. Never serialised.
  #[serde(skip)]
  pub password_hash:               String,
  pub first_name:                  Option<String>,
  pub last_name:                   Option<String>,
  pub date_of_birth:               Option<String>,
  pub addresses:                   Vec<Address>,
  pub default_shipping_address_id: Option<String>,
  pub default_billing_address_id:  Option<String>,
  pub shipping_address_ids:        Vec<String>,
  pub billing_address_ids:         Vec<String>,
  pub created_at:                  DateTime<Utc>,
}
