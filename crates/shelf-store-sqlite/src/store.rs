//! [`SqliteStore`]: the SQLite implementation of the `shelf-core` store
//! traits.

use std::path::Path;

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use shelf_core::{
  StoreError, StoreResult,
  cart::{Cart, CartState, LineChange},
  catalog::{Product, Project},
  customer::Customer,
  store::{CartStore, CustomerStore, ProductCatalog, ProjectStore, StoreHealth, TokenStore},
  subject::{Subject, SubjectKind},
  token::Token,
};

use crate::{
  Error, Result,
  encode::{
    RawCart, RawCustomer, RawLine, RawProduct, RawProject, RawToken, encode_cart_state,
    encode_dt, encode_json, encode_subject, encode_token_kind, encode_uuid,
  },
  error::write_error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Shelf store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load a cart by id within a project, decoding it outside the
  /// connection thread.
  async fn fetch_cart(&self, project_id: Uuid, cart_id: Uuid) -> Result<Option<Cart>> {
    let project_str = encode_uuid(project_id);
    let cart_str    = encode_uuid(cart_id);

    let raw = self
      .conn
      .call(move |conn| Ok(load_cart(conn, &project_str, &cart_str)?))
      .await?;

    decode_cart(raw)
  }
}

// ─── Connection-thread helpers ───────────────────────────────────────────────
//
// These run inside `Connection::call` closures, either directly on the
// connection or on an open transaction (which derefs to a connection).

type RawCartRows = (RawCart, Vec<RawLine>);

fn decode_cart(raw: Option<RawCartRows>) -> Result<Option<Cart>> {
  raw.map(|(cart, lines)| cart.into_cart(lines)).transpose()
}

fn load_cart(
  conn:       &rusqlite::Connection,
  project_id: &str,
  cart_id:    &str,
) -> rusqlite::Result<Option<RawCartRows>> {
  let cart = conn
    .query_row(
      &format!(
        "SELECT {} FROM carts WHERE project_id = ?1 AND cart_id = ?2",
        RawCart::COLUMNS
      ),
      rusqlite::params![project_id, cart_id],
      RawCart::from_row,
    )
    .optional()?;

  let Some(cart) = cart else { return Ok(None) };

  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM cart_lines WHERE cart_id = ?1 ORDER BY created_at ASC, rowid ASC",
    RawLine::COLUMNS
  ))?;
  let lines = stmt
    .query_map(rusqlite::params![cart_id], RawLine::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some((cart, lines)))
}

fn owner_column(kind: SubjectKind) -> &'static str {
  match kind {
    SubjectKind::Customer => "customer_id",
    SubjectKind::Anonymous => "anonymous_id",
  }
}

/// The most recently created active cart for an owner.
fn active_cart_id(
  conn:       &rusqlite::Connection,
  project_id: &str,
  owner:      &Subject,
) -> rusqlite::Result<Option<String>> {
  let column = owner_column(owner.kind());
  conn
    .query_row(
      &format!(
        "SELECT cart_id FROM carts
         WHERE project_id = ?1 AND {column} = ?2 AND state = 'active'
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1"
      ),
      rusqlite::params![project_id, encode_uuid(owner.id())],
      |r| r.get(0),
    )
    .optional()
}

/// Whether `owner` owns the cart, optionally requiring it to be active.
fn owns_cart(
  conn:          &rusqlite::Connection,
  project_id:    &str,
  cart_id:       &str,
  owner:         &Subject,
  require_active: bool,
) -> rusqlite::Result<bool> {
  let (customer_id, anonymous_id) = encode_subject(owner);
  let state_filter = if require_active { "AND state = 'active'" } else { "" };
  Ok(
    conn
      .query_row(
        &format!(
          "SELECT 1 FROM carts
           WHERE project_id = ?1 AND cart_id = ?2
             AND customer_id IS ?3 AND anonymous_id IS ?4
             {state_filter}"
        ),
        rusqlite::params![project_id, cart_id, customer_id, anonymous_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Rewrite the cart total from its current lines.
fn recompute_total(conn: &rusqlite::Connection, cart_id: &str) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE carts
     SET total_cents = COALESCE(
       (SELECT SUM(total_cents) FROM cart_lines WHERE cart_id = ?1), 0)
     WHERE cart_id = ?1",
    rusqlite::params![cart_id],
  )?;
  Ok(())
}

/// A [`LineChange`] with its columns pre-encoded so the closure that applies
/// it does no serde work.
enum EncodedChange {
  Add {
    product_id:       String,
    quantity:         i64,
    unit_price_cents: i64,
    snapshot:         String,
    created_at:       String,
  },
  SetQuantity {
    line_id:  String,
    quantity: i64,
  },
}

impl EncodedChange {
  fn encode(change: LineChange) -> Result<Self> {
    Ok(match change {
      LineChange::Add { product_id, quantity, unit_price_cents, snapshot, created_at } => {
        Self::Add {
          product_id: encode_uuid(product_id),
          quantity,
          unit_price_cents,
          snapshot: encode_json(&snapshot)?,
          created_at: encode_dt(created_at),
        }
      }
      LineChange::SetQuantity { line_id, quantity } => Self::SetQuantity {
        line_id: encode_uuid(line_id),
        quantity,
      },
    })
  }
}

/// How a batch of line changes ended. Anything other than `Applied` means the
/// transaction was dropped without committing.
enum ApplyOutcome {
  Applied(RawCartRows),
  CartUnavailable,
  LineMissing,
  Overflow,
}

fn line_total(unit_price_cents: i64, quantity: i64) -> Option<i64> {
  unit_price_cents.checked_mul(quantity)
}

// ─── TokenStore ──────────────────────────────────────────────────────────────

impl TokenStore for SqliteStore {
  async fn insert_token(&self, token: Token) -> StoreResult<()> {
    let (customer_id, anonymous_id) = encode_subject(&token.subject);
    let project_str = encode_uuid(token.project_id);
    let kind_str    = encode_token_kind(token.kind);
    let expires_str = encode_dt(token.expires_at);
    let created_str = encode_dt(token.created_at);
    let value       = token.token;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tokens (token, project_id, customer_id, anonymous_id, kind, expires_at, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            value,
            project_str,
            customer_id,
            anonymous_id,
            kind_str,
            expires_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| write_error(e, "token"))
  }

  async fn get_token(&self, token: String) -> StoreResult<Option<Token>> {
    let raw: Option<RawToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM tokens WHERE token = ?1", RawToken::COLUMNS),
              rusqlite::params![token],
              RawToken::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawToken::into_token).transpose()?)
  }

  async fn delete_token(&self, token: String) -> StoreResult<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM tokens WHERE token = ?1", rusqlite::params![token])?)
      })
      .await
      .map_err(Error::from)?;
    Ok(removed > 0)
  }
}

// ─── CustomerStore ───────────────────────────────────────────────────────────

impl CustomerStore for SqliteStore {
  async fn insert_customer(&self, customer: Customer) -> StoreResult<Customer> {
    let id_str        = encode_uuid(customer.id);
    let project_str   = encode_uuid(customer.project_id);
    let email         = customer.email.clone();
    let password_hash = customer.password_hash.clone();
    let first_name    = customer.first_name.clone();
    let last_name     = customer.last_name.clone();
    let date_of_birth = customer.date_of_birth.clone();
    let addresses     = encode_json(&customer.addresses)?;
    let default_ship  = customer.default_shipping_address_id.clone();
    let default_bill  = customer.default_billing_address_id.clone();
    let shipping_ids  = encode_json(&customer.shipping_address_ids)?;
    let billing_ids   = encode_json(&customer.billing_address_ids)?;
    let created_str   = encode_dt(customer.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO customers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            RawCustomer::COLUMNS
          ),
          rusqlite::params![
            id_str,
            project_str,
            email,
            password_hash,
            first_name,
            last_name,
            date_of_birth,
            addresses,
            default_ship,
            default_bill,
            shipping_ids,
            billing_ids,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| write_error(e, "customer"))?;

    Ok(customer)
  }

  async fn get_customer(&self, project_id: Uuid, id: Uuid) -> StoreResult<Option<Customer>> {
    let project_str = encode_uuid(project_id);
    let id_str      = encode_uuid(id);

    let raw: Option<RawCustomer> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM customers WHERE project_id = ?1 AND customer_id = ?2",
                RawCustomer::COLUMNS
              ),
              rusqlite::params![project_str, id_str],
              RawCustomer::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawCustomer::into_customer).transpose()?)
  }

  async fn get_customer_by_email(
    &self,
    project_id: Uuid,
    email:      String,
  ) -> StoreResult<Option<Customer>> {
    let project_str = encode_uuid(project_id);

    // `email` is declared COLLATE NOCASE, so `=` is case-insensitive.
    let raw: Option<RawCustomer> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM customers WHERE project_id = ?1 AND email = ?2",
                RawCustomer::COLUMNS
              ),
              rusqlite::params![project_str, email.trim()],
              RawCustomer::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawCustomer::into_customer).transpose()?)
  }
}

// ─── StoreHealth ─────────────────────────────────────────────────────────────

impl StoreHealth for SqliteStore {
  async fn ping(&self) -> StoreResult<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;
    Ok(())
  }
}

// ─── ProjectStore ────────────────────────────────────────────────────────────

impl ProjectStore for SqliteStore {
  async fn insert_project(&self, project: Project) -> StoreResult<Project> {
    let id_str      = encode_uuid(project.id);
    let key         = project.key.clone();
    let name        = project.name.clone();
    let created_str = encode_dt(project.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, key, name, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, key, name, created_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| write_error(e, "project"))?;

    Ok(project)
  }

  async fn get_project_by_key(&self, key: String) -> StoreResult<Option<Project>> {
    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM projects WHERE key = ?1", RawProject::COLUMNS),
              rusqlite::params![key],
              RawProject::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawProject::into_project).transpose()?)
  }
}

// ─── ProductCatalog ──────────────────────────────────────────────────────────

impl ProductCatalog for SqliteStore {
  async fn insert_product(&self, product: Product) -> StoreResult<Product> {
    let id_str      = encode_uuid(product.id);
    let project_str = encode_uuid(product.project_id);
    let key         = product.key.clone();
    let sku         = product.sku.clone();
    let name        = product.name.clone();
    let description = product.description.clone();
    let price_cents = product.price_cents;
    let currency    = product.currency.clone();
    let attributes  = encode_json(&product.attributes)?;
    let created_str = encode_dt(product.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO products ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            RawProduct::COLUMNS
          ),
          rusqlite::params![
            id_str,
            project_str,
            key,
            sku,
            name,
            description,
            price_cents,
            currency,
            attributes,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| write_error(e, "product"))?;

    Ok(product)
  }

  async fn get_product(&self, project_id: Uuid, id: Uuid) -> StoreResult<Option<Product>> {
    let project_str = encode_uuid(project_id);
    let id_str      = encode_uuid(id);

    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM products WHERE project_id = ?1 AND product_id = ?2",
                RawProduct::COLUMNS
              ),
              rusqlite::params![project_str, id_str],
              RawProduct::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawProduct::into_product).transpose()?)
  }

  async fn get_product_by_sku(&self, project_id: Uuid, sku: String) -> StoreResult<Option<Product>> {
    let project_str = encode_uuid(project_id);

    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM products WHERE project_id = ?1 AND sku = ?2",
                RawProduct::COLUMNS
              ),
              rusqlite::params![project_str, sku],
              RawProduct::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawProduct::into_product).transpose()?)
  }

  async fn list_products(&self, project_id: Uuid) -> StoreResult<Vec<Product>> {
    let project_str = encode_uuid(project_id);

    let raws: Vec<RawProduct> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM products WHERE project_id = ?1 ORDER BY created_at ASC, rowid ASC",
          RawProduct::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![project_str], RawProduct::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    Ok(raws.into_iter().map(RawProduct::into_product).collect::<Result<_>>()?)
  }
}

// ─── CartStore ───────────────────────────────────────────────────────────────

impl CartStore for SqliteStore {
  async fn insert_cart(&self, cart: Cart) -> StoreResult<Cart> {
    let (customer_id, anonymous_id) = cart
      .owner
      .as_ref()
      .map(encode_subject)
      .unwrap_or_default();
    let id_str      = encode_uuid(cart.id);
    let project_str = encode_uuid(cart.project_id);
    let currency    = cart.currency.clone();
    let total_cents = cart.total_cents;
    let state_str   = encode_cart_state(cart.state);
    let created_str = encode_dt(cart.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO carts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            RawCart::COLUMNS
          ),
          rusqlite::params![
            id_str,
            project_str,
            customer_id,
            anonymous_id,
            currency,
            total_cents,
            state_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| write_error(e, "cart"))?;

    Ok(cart)
  }

  async fn get_cart(&self, project_id: Uuid, id: Uuid) -> StoreResult<Option<Cart>> {
    Ok(self.fetch_cart(project_id, id).await?)
  }

  async fn get_active_cart(&self, project_id: Uuid, owner: Subject) -> StoreResult<Option<Cart>> {
    let project_str = encode_uuid(project_id);

    let raw = self
      .conn
      .call(move |conn| {
        let Some(cart_id) = active_cart_id(conn, &project_str, &owner)? else {
          return Ok(None);
        };
        Ok(load_cart(conn, &project_str, &cart_id)?)
      })
      .await
      .map_err(Error::from)?;

    Ok(decode_cart(raw)?)
  }

  async fn reassign_anonymous_cart(
    &self,
    project_id:   Uuid,
    anonymous_id: Uuid,
    customer_id:  Uuid,
  ) -> StoreResult<Option<Cart>> {
    let project_str  = encode_uuid(project_id);
    let customer_str = encode_uuid(customer_id);
    let anonymous    = Subject::Anonymous(anonymous_id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(cart_id) = active_cart_id(&tx, &project_str, &anonymous)? else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE carts SET customer_id = ?1, anonymous_id = NULL WHERE cart_id = ?2",
          rusqlite::params![customer_str, cart_id],
        )?;

        let cart = load_cart(&tx, &project_str, &cart_id)?;
        tx.commit()?;
        Ok(cart)
      })
      .await
      .map_err(Error::from)?;

    Ok(decode_cart(raw)?)
  }

  async fn apply_line_changes(
    &self,
    project_id: Uuid,
    cart_id:    Uuid,
    owner:      Subject,
    changes:    Vec<LineChange>,
  ) -> StoreResult<Option<Cart>> {
    let project_str = encode_uuid(project_id);
    let cart_str    = encode_uuid(cart_id);
    let encoded     = changes
      .into_iter()
      .map(EncodedChange::encode)
      .collect::<Result<Vec<_>>>()?;

    tracing::debug!(%cart_id, changes = encoded.len(), "applying cart line changes");

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !owns_cart(&tx, &project_str, &cart_str, &owner, true)? {
          return Ok(ApplyOutcome::CartUnavailable);
        }

        for change in encoded {
          match change {
            EncodedChange::Add { product_id, quantity, unit_price_cents, snapshot, created_at } => {
              let existing: Option<(String, i64, i64)> = tx
                .query_row(
                  "SELECT line_id, quantity, unit_price_cents FROM cart_lines
                   WHERE cart_id = ?1 AND product_id = ?2",
                  rusqlite::params![cart_str, product_id],
                  |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .optional()?;

              match existing {
                // Merge: keep the pinned unit price and the first snapshot.
                Some((line_id, current, pinned_price)) => {
                  let Some(merged) = current.checked_add(quantity) else {
                    return Ok(ApplyOutcome::Overflow);
                  };
                  let Some(total) = line_total(pinned_price, merged) else {
                    return Ok(ApplyOutcome::Overflow);
                  };
                  tx.execute(
                    "UPDATE cart_lines SET quantity = ?1, total_cents = ?2 WHERE line_id = ?3",
                    rusqlite::params![merged, total, line_id],
                  )?;
                }
                None => {
                  let Some(total) = line_total(unit_price_cents, quantity) else {
                    return Ok(ApplyOutcome::Overflow);
                  };
                  tx.execute(
                    &format!(
                      "INSERT INTO cart_lines ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                      RawLine::COLUMNS
                    ),
                    rusqlite::params![
                      encode_uuid(Uuid::new_v4()),
                      cart_str,
                      product_id,
                      quantity,
                      unit_price_cents,
                      total,
                      snapshot,
                      created_at,
                    ],
                  )?;
                }
              }
            }

            EncodedChange::SetQuantity { line_id, quantity } if quantity <= 0 => {
              let removed = tx.execute(
                "DELETE FROM cart_lines WHERE line_id = ?1 AND cart_id = ?2",
                rusqlite::params![line_id, cart_str],
              )?;
              if removed == 0 {
                return Ok(ApplyOutcome::LineMissing);
              }
            }

            EncodedChange::SetQuantity { line_id, quantity } => {
              let pinned_price: Option<i64> = tx
                .query_row(
                  "SELECT unit_price_cents FROM cart_lines WHERE line_id = ?1 AND cart_id = ?2",
                  rusqlite::params![line_id, cart_str],
                  |r| r.get(0),
                )
                .optional()?;
              let Some(pinned_price) = pinned_price else {
                return Ok(ApplyOutcome::LineMissing);
              };
              let Some(total) = line_total(pinned_price, quantity) else {
                return Ok(ApplyOutcome::Overflow);
              };
              tx.execute(
                "UPDATE cart_lines SET quantity = ?1, total_cents = ?2
                 WHERE line_id = ?3 AND cart_id = ?4",
                rusqlite::params![quantity, total, line_id, cart_str],
              )?;
            }
          }
        }

        recompute_total(&tx, &cart_str)?;
        let cart = load_cart(&tx, &project_str, &cart_str)?;
        tx.commit()?;

        Ok(match cart {
          Some(rows) => ApplyOutcome::Applied(rows),
          None => ApplyOutcome::CartUnavailable,
        })
      })
      .await
      .map_err(Error::from)?;

    match outcome {
      ApplyOutcome::Applied(rows) => Ok(decode_cart(Some(rows))?),
      ApplyOutcome::CartUnavailable => Ok(None),
      ApplyOutcome::LineMissing => Err(StoreError::NotFound("line item")),
      ApplyOutcome::Overflow => Err(Error::Overflow("line total").into()),
    }
  }

  async fn set_cart_state(
    &self,
    project_id: Uuid,
    cart_id:    Uuid,
    owner:      Subject,
    state:      CartState,
  ) -> StoreResult<Option<Cart>> {
    let project_str = encode_uuid(project_id);
    let cart_str    = encode_uuid(cart_id);
    let state_str   = encode_cart_state(state);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !owns_cart(&tx, &project_str, &cart_str, &owner, false)? {
          return Ok(None);
        }

        tx.execute(
          "UPDATE carts SET state = ?1 WHERE cart_id = ?2",
          rusqlite::params![state_str, cart_str],
        )?;

        let cart = load_cart(&tx, &project_str, &cart_str)?;
        tx.commit()?;
        Ok(cart)
      })
      .await
      .map_err(Error::from)?;

    Ok(decode_cart(raw)?)
  }
}
