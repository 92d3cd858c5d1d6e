//! The cart aggregate: a cart, its lines, and the frozen product snapshots.
//!
//! Two invariants hold for every cart at rest:
//! - `total_cents` equals the sum of its lines' `total_cents`;
//! - the owner is a single [`Subject`], never both a customer and an
//!   anonymous visitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{catalog::Product, subject::Subject};

// ─── State ───────────────────────────────────────────────────────────────────

/// `Active → Deleted` is the only transition; `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartState {
  Active,
  Deleted,
}

impl CartState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Deleted => "deleted",
    }
  }
}

// ─── Lines ───────────────────────────────────────────────────────────────────

/// Catalog fields copied into a line when it is first added. Later catalog
/// edits never reach an existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSnapshot {
  pub product_key:  String,
  pub product_name: String,
  pub sku:          String,
  pub product_slug: String,
  pub currency:     String,
  pub price_cents:  i64,
  #[serde(default)]
  pub images:       Vec<String>,
}

impl LineSnapshot {
  pub fn of(product: &Product) -> Self {
    Self {
      product_key:  product.key.clone(),
      product_name: product.name.clone(),
      sku:          product.sku.clone(),
      product_slug: product.slug(),
      currency:     product.currency.clone(),
      price_cents:  product.price_cents,
      images:       product.images(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub id:               Uuid,
  pub cart_id:          Uuid,
  pub product_id:       Uuid,
  /// Always positive; a line whose quantity would drop to zero is removed.
  pub quantity:         i64,
  /// Pinned at first add; merges and quantity changes reuse it.
  pub unit_price_cents: i64,
  /// `unit_price_cents * quantity`.
  pub total_cents:      i64,
  pub snapshot:         LineSnapshot,
  pub created_at:       DateTime<Utc>,
}

// ─── Cart ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
  pub id:          Uuid,
  pub project_id:  Uuid,
  #[serde(flatten)]
  pub owner:       Option<Subject>,
  pub currency:    String,
  pub total_cents: i64,
  pub state:       CartState,
  pub created_at:  DateTime<Utc>,
  /// Ordered by `created_at` ascending.
  #[serde(rename = "lineItems")]
  pub lines:       Vec<CartLine>,
}

impl Cart {
  /// A fresh, empty, active cart.
  pub fn new(project_id: Uuid, owner: Option<Subject>, currency: String, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      project_id,
      owner,
      currency,
      total_cents: 0,
      state: CartState::Active,
      created_at: now,
      lines: Vec::new(),
    }
  }

  pub fn is_owned_by(&self, owner: &Subject) -> bool { self.owner.as_ref() == Some(owner) }

  pub fn is_active(&self) -> bool { self.state == CartState::Active }

  pub fn line(&self, line_id: Uuid) -> Option<&CartLine> {
    self.lines.iter().find(|l| l.id == line_id)
  }

  pub fn line_for_product(&self, product_id: Uuid) -> Option<&CartLine> {
    self.lines.iter().find(|l| l.product_id == product_id)
  }

  /// Sum of line totals; what `total_cents` must equal at rest.
  pub fn computed_total(&self) -> i64 { self.lines.iter().map(|l| l.total_cents).sum() }

}

// ─── Mutations ───────────────────────────────────────────────────────────────

/// One resolved line mutation, applied by
/// [`CartStore::apply_line_changes`](crate::store::CartStore::apply_line_changes)
/// inside a single transaction together with the total recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
  /// Insert a new line, or merge into the existing line for `product_id` by
  /// adding `quantity` and recomputing from that line's pinned unit price.
  /// `unit_price_cents`, `snapshot` and `created_at` are used only on insert.
  Add {
    product_id:       Uuid,
    quantity:         i64,
    unit_price_cents: i64,
    snapshot:         LineSnapshot,
    created_at:       DateTime<Utc>,
  },
  /// Set a line's quantity; `quantity <= 0` removes the line.
  SetQuantity { line_id: Uuid, quantity: i64 },
}
