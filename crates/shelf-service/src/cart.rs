//! The cart aggregate engine.
//!
//! [`CartService::update`] resolves every action up front (product lookups,
//! snapshots, id parsing) and hands the store a single batch of
//! [`LineChange`]s. The store applies the batch and recomputes the total in
//! one transaction, so a failing action leaves the cart untouched.

use std::sync::Arc;

use serde::Deserialize;
use shelf_core::{
  cart::{Cart, CartState, LineChange, LineSnapshot},
  clock::Clock,
  store::{CartStore, ProductCatalog},
  subject::Subject,
};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on any single quantity an action may carry.
pub const MAX_QUANTITY: i64 = 1_000_000;

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCart {
  #[serde(default)]
  pub currency:     String,
  pub customer_id:  Option<Uuid>,
  pub anonymous_id: Option<Uuid>,
}

/// One update action as received. Which fields matter depends on `action`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAction {
  pub action:       String,
  pub sku:          Option<String>,
  pub quantity:     Option<i64>,
  pub line_item_id: Option<String>,
}

impl UpdateAction {
  pub fn add_line_item(sku: impl Into<String>, quantity: i64) -> Self {
    Self { action: "addLineItem".into(), sku: Some(sku.into()), quantity: Some(quantity), line_item_id: None }
  }

  pub fn change_line_item_quantity(line_item_id: impl ToString, quantity: i64) -> Self {
    Self {
      action: "changeLineItemQuantity".into(),
      sku: None,
      quantity: Some(quantity),
      line_item_id: Some(line_item_id.to_string()),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCart {
  #[serde(default)]
  pub actions: Vec<UpdateAction>,
}

/// A validated action.
#[derive(Debug, PartialEq, Eq)]
enum Action {
  AddLineItem { sku: String, quantity: i64 },
  ChangeLineItemQuantity { line_id: Uuid, quantity: i64 },
}

impl TryFrom<UpdateAction> for Action {
  type Error = Error;

  fn try_from(raw: UpdateAction) -> Result<Self> {
    match raw.action.trim().to_ascii_lowercase().as_str() {
      "addlineitem" => {
        let sku = raw.sku.as_deref().map(str::trim).unwrap_or_default();
        if sku.is_empty() {
          return Err(Error::InvalidAction("addLineItem requires a sku".into()));
        }
        let quantity = match raw.quantity {
          Some(q) if q > 0 => q,
          _ => return Err(Error::InvalidAction("addLineItem requires a positive quantity".into())),
        };
        check_bound(quantity)?;
        Ok(Self::AddLineItem { sku: sku.to_owned(), quantity })
      }
      "changelineitemquantity" => {
        let Some(quantity) = raw.quantity else {
          return Err(Error::InvalidAction("changeLineItemQuantity requires a quantity".into()));
        };
        check_bound(quantity)?;
        let line_id = raw
          .line_item_id
          .as_deref()
          .and_then(|id| Uuid::parse_str(id.trim()).ok())
          .ok_or(Error::NotFound("line item"))?;
        Ok(Self::ChangeLineItemQuantity { line_id, quantity })
      }
      _ => Err(Error::UnsupportedAction(raw.action)),
    }
  }
}

fn check_bound(quantity: i64) -> Result<()> {
  if quantity > MAX_QUANTITY {
    return Err(Error::InvalidAction(format!("quantity may not exceed {MAX_QUANTITY}")));
  }
  Ok(())
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct CartService<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S: CartStore + ProductCatalog> CartService<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

  pub async fn create(&self, project_id: Uuid, input: CreateCart) -> Result<Cart> {
    let currency = input.currency.trim();
    if currency.is_empty() {
      return Err(Error::CurrencyRequired);
    }

    let owner = match (input.customer_id, input.anonymous_id) {
      (Some(_), Some(_)) => return Err(Error::AmbiguousOwner),
      (customer, anonymous) => Subject::from_columns(customer, anonymous),
    };

    let cart = Cart::new(project_id, owner, currency.to_owned(), self.clock.now());
    let cart = self.store.insert_cart(cart).await?;
    tracing::debug!(%project_id, cart_id = %cart.id, "cart created");
    Ok(cart)
  }

  pub async fn get(&self, project_id: Uuid, cart_id: Uuid) -> Result<Cart> {
    self
      .store
      .get_cart(project_id, cart_id)
      .await?
      .ok_or(Error::NotFound("cart"))
  }

  /// The owner's most recently created active cart.
  pub async fn get_active(&self, project_id: Uuid, owner: Subject) -> Result<Cart> {
    self
      .store
      .get_active_cart(project_id, owner)
      .await?
      .ok_or(Error::NotFound("cart"))
  }

  /// Hand the anonymous visitor's active cart to a customer.
  ///
  /// `NotFound` when the visitor has no active cart; callers usually ignore
  /// that case.
  pub async fn assign_customer_from_anonymous(
    &self,
    project_id:   Uuid,
    anonymous_id: Uuid,
    customer_id:  Uuid,
  ) -> Result<Cart> {
    let cart = self
      .store
      .reassign_anonymous_cart(project_id, anonymous_id, customer_id)
      .await?
      .ok_or(Error::NotFound("cart"))?;
    tracing::info!(%project_id, cart_id = %cart.id, %anonymous_id, %customer_id, "cart reassigned");
    Ok(cart)
  }

  /// The cart if `owner` owns it; someone else's cart is `NotFound` too.
  async fn owned(&self, project_id: Uuid, owner: Subject, cart_id: Uuid) -> Result<Cart> {
    self
      .store
      .get_cart(project_id, cart_id)
      .await?
      .filter(|cart| cart.is_owned_by(&owner))
      .ok_or(Error::NotFound("cart"))
  }

  /// Apply `input.actions` in order and return the refreshed cart.
  pub async fn update(
    &self,
    project_id: Uuid,
    owner:      Subject,
    cart_id:    Uuid,
    input:      UpdateCart,
  ) -> Result<Cart> {
    if input.actions.is_empty() {
      return Err(Error::ActionsRequired);
    }

    let cart = self.owned(project_id, owner, cart_id).await?;
    if !cart.is_active() {
      return Err(Error::CartNotActive);
    }

    let now = self.clock.now();
    let mut changes = Vec::with_capacity(input.actions.len());
    for raw in input.actions {
      let change = match Action::try_from(raw)? {
        Action::AddLineItem { sku, quantity } => {
          let product = self
            .store
            .get_product_by_sku(project_id, sku.clone())
            .await?
            .ok_or(Error::ProductNotFound(sku))?;
          LineChange::Add {
            product_id: product.id,
            quantity,
            unit_price_cents: product.price_cents,
            snapshot: LineSnapshot::of(&product),
            created_at: now,
          }
        }
        Action::ChangeLineItemQuantity { line_id, quantity } => {
          LineChange::SetQuantity { line_id, quantity }
        }
      };
      changes.push(change);
    }

    match self
      .store
      .apply_line_changes(project_id, cart_id, owner, changes)
      .await?
    {
      Some(cart) => Ok(cart),
      // Deleted or reassigned between the read above and the write.
      None => match self.owned(project_id, owner, cart_id).await {
        Ok(cart) if !cart.is_active() => Err(Error::CartNotActive),
        _ => Err(Error::NotFound("cart")),
      },
    }
  }

  /// Soft-delete. Lines and totals are kept; deleting twice is a no-op.
  pub async fn delete(&self, project_id: Uuid, owner: Subject, cart_id: Uuid) -> Result<Cart> {
    let cart = self.owned(project_id, owner, cart_id).await?;
    if !cart.is_active() {
      return Ok(cart);
    }

    let cart = self
      .store
      .set_cart_state(project_id, cart_id, owner, CartState::Deleted)
      .await?
      .ok_or(Error::NotFound("cart"))?;
    tracing::debug!(%project_id, cart_id = %cart.id, "cart deleted");
    Ok(cart)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(raw: UpdateAction) -> Result<Action> { Action::try_from(raw) }

  #[test]
  fn action_names_ignore_case_and_whitespace() {
    let mut raw = UpdateAction::add_line_item("SKU-1", 2);
    raw.action = "  ADDLINEITEM ".into();
    assert_eq!(parse(raw).unwrap(), Action::AddLineItem { sku: "SKU-1".into(), quantity: 2 });
  }

  #[test]
  fn unknown_action_is_unsupported() {
    let raw = UpdateAction { action: "setShippingAddress".into(), ..Default::default() };
    assert!(matches!(parse(raw), Err(Error::UnsupportedAction(name)) if name == "setShippingAddress"));
  }

  #[test]
  fn add_requires_sku_and_positive_quantity() {
    assert!(matches!(parse(UpdateAction::add_line_item("  ", 1)), Err(Error::InvalidAction(_))));
    assert!(matches!(parse(UpdateAction::add_line_item("SKU", 0)), Err(Error::InvalidAction(_))));
    assert!(matches!(
      parse(UpdateAction::add_line_item("SKU", MAX_QUANTITY + 1)),
      Err(Error::InvalidAction(_))
    ));
  }

  #[test]
  fn unparseable_line_id_is_not_found() {
    let raw = UpdateAction::change_line_item_quantity("line-7", 1);
    assert!(matches!(parse(raw), Err(Error::NotFound("line item"))));
  }

  #[test]
  fn zero_quantity_change_is_allowed() {
    let id = Uuid::new_v4();
    let raw = UpdateAction::change_line_item_quantity(id, 0);
    assert_eq!(parse(raw).unwrap(), Action::ChangeLineItemQuantity { line_id: id, quantity: 0 });
  }
}
