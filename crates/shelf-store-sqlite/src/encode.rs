//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microseconds,
//! `Z` suffix) so that string order is time order. Structured fields
//! (addresses, snapshots, attributes) are stored as compact JSON. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use shelf_core::{
  cart::{Cart, CartLine, CartState, LineSnapshot},
  catalog::{Product, Project},
  customer::{Address, Customer},
  subject::Subject,
  token::{Token, TokenKind},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_token_kind(k: TokenKind) -> &'static str { k.as_str() }

pub fn decode_token_kind(s: &str) -> Result<TokenKind> {
  match s {
    "access" => Ok(TokenKind::Access),
    "refresh" => Ok(TokenKind::Refresh),
    other => Err(Error::Corrupt(format!("unknown token kind: {other:?}"))),
  }
}

pub fn encode_cart_state(s: CartState) -> &'static str { s.as_str() }

pub fn decode_cart_state(s: &str) -> Result<CartState> {
  match s {
    "active" => Ok(CartState::Active),
    "deleted" => Ok(CartState::Deleted),
    other => Err(Error::Corrupt(format!("unknown cart state: {other:?}"))),
  }
}

/// Split a subject into its `(customer_id, anonymous_id)` columns.
pub fn encode_subject(s: &Subject) -> (Option<String>, Option<String>) {
  (s.customer_id().map(encode_uuid), s.anonymous_id().map(encode_uuid))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id: String,
  pub key:        String,
  pub name:       String,
  pub created_at: String,
}

impl RawProject {
  pub const COLUMNS: &'static str = "project_id, key, name, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id: row.get(0)?,
      key:        row.get(1)?,
      name:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:         decode_uuid(&self.project_id)?,
      key:        self.key,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `products` row.
pub struct RawProduct {
  pub product_id:  String,
  pub project_id:  String,
  pub key:         String,
  pub sku:         String,
  pub name:        String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub currency:    String,
  pub attributes:  String,
  pub created_at:  String,
}

impl RawProduct {
  pub const COLUMNS: &'static str = "product_id, project_id, key, sku, name, description, \
                                     price_cents, currency, attributes, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      product_id:  row.get(0)?,
      project_id:  row.get(1)?,
      key:         row.get(2)?,
      sku:         row.get(3)?,
      name:        row.get(4)?,
      description: row.get(5)?,
      price_cents: row.get(6)?,
      currency:    row.get(7)?,
      attributes:  row.get(8)?,
      created_at:  row.get(9)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    let attributes: Map<String, Value> = serde_json::from_str(&self.attributes)?;
    Ok(Product {
      id: decode_uuid(&self.product_id)?,
      project_id: decode_uuid(&self.project_id)?,
      key: self.key,
      sku: self.sku,
      name: self.name,
      description: self.description,
      price_cents: self.price_cents,
      currency: self.currency,
      attributes,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `customers` row.
pub struct RawCustomer {
  pub customer_id:                 String,
  pub project_id:                  String,
  pub email:                       String,
  pub password_hash:               String,
  pub first_name:                  Option<String>,
  pub last_name:                   Option<String>,
  pub date_of_birth:               Option<String>,
  pub addresses:                   String,
  pub default_shipping_address_id: Option<String>,
  pub default_billing_address_id:  Option<String>,
  pub shipping_address_ids:        String,
  pub billing_address_ids:         String,
  pub created_at:                  String,
}

impl RawCustomer {
  pub const COLUMNS: &'static str = "customer_id, project_id, email, password_hash, first_name, \
                                     last_name, date_of_birth, addresses, \
                                     default_shipping_address_id, default_billing_address_id, \
                                     shipping_address_ids, billing_address_ids, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      customer_id:                 row.get(0)?,
      project_id:                  row.get(1)?,
      email:                       row.get(2)?,
      password_hash:               row.get(3)?,
      first_name:                  row.get(4)?,
      last_name:                   row.get(5)?,
      date_of_birth:               row.get(6)?,
      addresses:                   row.get(7)?,
      default_shipping_address_id: row.get(8)?,
      default_billing_address_id:  row.get(9)?,
      shipping_address_ids:        row.get(10)?,
      billing_address_ids:         row.get(11)?,
      created_at:                  row.get(12)?,
    })
  }

  pub fn into_customer(self) -> Result<Customer> {
    let addresses: Vec<Address> = serde_json::from_str(&self.addresses)?;
    Ok(Customer {
      id: decode_uuid(&self.customer_id)?,
      project_id: decode_uuid(&self.project_id)?,
      email: self.email,
      password_hash: self.password_hash,
      first_name: self.first_name,
      last_name: self.last_name,
      date_of_birth: self.date_of_birth,
      addresses,
      default_shipping_address_id: self.default_shipping_address_id,
      default_billing_address_id: self.default_billing_address_id,
      shipping_address_ids: serde_json::from_str(&self.shipping_address_ids)?,
      billing_address_ids: serde_json::from_str(&self.billing_address_ids)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `tokens` row.
pub struct RawToken {
  pub token:        String,
  pub project_id:   String,
  pub customer_id:  Option<String>,
  pub anonymous_id: Option<String>,
  pub kind:         String,
  pub expires_at:   String,
  pub created_at:   String,
}

impl RawToken {
  pub const COLUMNS: &'static str =
    "token, project_id, customer_id, anonymous_id, kind, expires_at, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token:        row.get(0)?,
      project_id:   row.get(1)?,
      customer_id:  row.get(2)?,
      anonymous_id: row.get(3)?,
      kind:         row.get(4)?,
      expires_at:   row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_token(self) -> Result<Token> {
    let subject = Subject::from_columns(
      decode_opt_uuid(self.customer_id)?,
      decode_opt_uuid(self.anonymous_id)?,
    )
    .ok_or_else(|| Error::Corrupt("token row must name exactly one subject".into()))?;

    Ok(Token {
      project_id: decode_uuid(&self.project_id)?,
      kind: decode_token_kind(&self.kind)?,
      subject,
      expires_at: decode_dt(&self.expires_at)?,
      created_at: decode_dt(&self.created_at)?,
      token: self.token,
    })
  }
}

/// Raw strings read directly from a `carts` row.
pub struct RawCart {
  pub cart_id:      String,
  pub project_id:   String,
  pub customer_id:  Option<String>,
  pub anonymous_id: Option<String>,
  pub currency:     String,
  pub total_cents:  i64,
  pub state:        String,
  pub created_at:   String,
}

impl RawCart {
  pub const COLUMNS: &'static str =
    "cart_id, project_id, customer_id, anonymous_id, currency, total_cents, state, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      cart_id:      row.get(0)?,
      project_id:   row.get(1)?,
      customer_id:  row.get(2)?,
      anonymous_id: row.get(3)?,
      currency:     row.get(4)?,
      total_cents:  row.get(5)?,
      state:        row.get(6)?,
      created_at:   row.get(7)?,
    })
  }

  pub fn into_cart(self, lines: Vec<RawLine>) -> Result<Cart> {
    let owner = match (decode_opt_uuid(self.customer_id)?, decode_opt_uuid(self.anonymous_id)?) {
      (None, None) => None,
      (Some(c), None) => Some(Subject::Customer(c)),
      (None, Some(a)) => Some(Subject::Anonymous(a)),
      (Some(_), Some(_)) => {
        return Err(Error::Corrupt(format!("cart {} has two owners", self.cart_id)));
      }
    };

    Ok(Cart {
      id: decode_uuid(&self.cart_id)?,
      project_id: decode_uuid(&self.project_id)?,
      owner,
      currency: self.currency,
      total_cents: self.total_cents,
      state: decode_cart_state(&self.state)?,
      created_at: decode_dt(&self.created_at)?,
      lines: lines.into_iter().map(RawLine::into_line).collect::<Result<_>>()?,
    })
  }
}

/// Raw strings read directly from a `cart_lines` row.
pub struct RawLine {
  pub line_id:          String,
  pub cart_id:          String,
  pub product_id:       String,
  pub quantity:         i64,
  pub unit_price_cents: i64,
  pub total_cents:      i64,
  pub snapshot:         String,
  pub created_at:       String,
}

impl RawLine {
  pub const COLUMNS: &'static str = "line_id, cart_id, product_id, quantity, unit_price_cents, \
                                     total_cents, snapshot, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      line_id:          row.get(0)?,
      cart_id:          row.get(1)?,
      product_id:       row.get(2)?,
      quantity:         row.get(3)?,
      unit_price_cents: row.get(4)?,
      total_cents:      row.get(5)?,
      snapshot:         row.get(6)?,
      created_at:       row.get(7)?,
    })
  }

  pub fn into_line(self) -> Result<CartLine> {
    let snapshot: LineSnapshot = serde_json::from_str(&self.snapshot)?;
    Ok(CartLine {
      id: decode_uuid(&self.line_id)?,
      cart_id: decode_uuid(&self.cart_id)?,
      product_id: decode_uuid(&self.product_id)?,
      quantity: self.quantity,
      unit_price_cents: self.unit_price_cents,
      total_cents: self.total_cents,
      snapshot,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc::now();
    let b = a + Duration::microseconds(1);
    let c = a + Duration::seconds(10);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(a)).unwrap().timestamp_micros(), a.timestamp_micros());
  }

  #[test]
  fn unknown_enum_values_are_corrupt() {
    assert!(matches!(decode_token_kind("bearer"), Err(Error::Corrupt(_))));
    assert!(matches!(decode_cart_state("ordered"), Err(Error::Corrupt(_))));
  }
}
