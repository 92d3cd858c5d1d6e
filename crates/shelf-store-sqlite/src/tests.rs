//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, json};
use shelf_core::{
  StoreError,
  cart::{Cart, CartState, LineChange, LineSnapshot},
  catalog::{Product, Project},
  customer::{Address, Customer},
  store::{CartStore, CustomerStore, ProductCatalog, ProjectStore, StoreHealth, TokenStore},
  subject::Subject,
  token::{Token, TokenKind},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn project(s: &SqliteStore, key: &str) -> Project {
  s.insert_project(Project {
    id:         Uuid::new_v4(),
    key:        key.into(),
    name:       format!("Project {key}"),
    created_at: Utc::now(),
  })
  .await
  .unwrap()
}

async fn product(s: &SqliteStore, project_id: Uuid, sku: &str, price_cents: i64) -> Product {
  let mut attributes = Map::new();
  attributes.insert("images".into(), json!([format!("https://img.example/{sku}.png")]));
  s.insert_product(Product {
    id: Uuid::new_v4(),
    project_id,
    key: sku.to_lowercase(),
    sku: sku.into(),
    name: format!("Product {sku}"),
    description: None,
    price_cents,
    currency: "EUR".into(),
    attributes,
    created_at: Utc::now(),
  })
  .await
  .unwrap()
}

fn customer(project_id: Uuid, email: &str) -> Customer {
  Customer {
    id: Uuid::new_v4(),
    project_id,
    email: email.into(),
    password_hash: "$argon2id$v=19$placeholder".into(),
    first_name: Some("Ada".into()),
    last_name: Some("Lovelace".into()),
    date_of_birth: None,
    addresses: vec![Address { id: "aB3x_9".into(), city: Some("London".into()), ..Default::default() }],
    default_shipping_address_id: Some("aB3x_9".into()),
    default_billing_address_id: None,
    shipping_address_ids: vec!["aB3x_9".into()],
    billing_address_ids: vec![],
    created_at: Utc::now(),
  }
}

fn add(product: &Product, quantity: i64) -> LineChange {
  LineChange::Add {
    product_id: product.id,
    quantity,
    unit_price_cents: product.price_cents,
    snapshot: LineSnapshot::of(product),
    created_at: Utc::now(),
  }
}

async fn cart(s: &SqliteStore, project_id: Uuid, owner: Option<Subject>) -> Cart {
  s.insert_cart(Cart::new(project_id, owner, "EUR".into(), Utc::now()))
    .await
    .unwrap()
}

// ─── Projects & catalog ──────────────────────────────────────────────────────

#[tokio::test]
async fn ping_answers_on_an_open_store() {
  let s = store().await;
  s.ping().await.unwrap();
}

#[tokio::test]
async fn project_lookup_by_key() {
  let s = store().await;
  let p = project(&s, "demo").await;

  let found = s.get_project_by_key("demo".into()).await.unwrap().unwrap();
  assert_eq!(found.id, p.id);
  assert!(s.get_project_by_key("other".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_project_key_conflicts() {
  let s = store().await;
  project(&s, "demo").await;
  let err = s
    .insert_project(Project {
      id:         Uuid::new_v4(),
      key:        "demo".into(),
      name:       "again".into(),
      created_at: Utc::now(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::Conflict("project")));
}

#[tokio::test]
async fn products_are_scoped_to_their_project() {
  let s = store().await;
  let a = project(&s, "a").await;
  let b = project(&s, "b").await;
  let shoe = product(&s, a.id, "SHOE-1", 4999).await;

  let by_sku = s.get_product_by_sku(a.id, "SHOE-1".into()).await.unwrap().unwrap();
  assert_eq!(by_sku.id, shoe.id);
  assert_eq!(by_sku.images(), vec!["https://img.example/SHOE-1.png".to_string()]);

  assert!(s.get_product(b.id, shoe.id).await.unwrap().is_none());
  assert!(s.get_product_by_sku(b.id, "SHOE-1".into()).await.unwrap().is_none());
  assert_eq!(s.list_products(a.id).await.unwrap().len(), 1);
  assert!(s.list_products(b.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_sku_conflicts() {
  let s = store().await;
  let p = project(&s, "demo").await;
  product(&s, p.id, "SKU-1", 100).await;

  let mut dup = product(&s, p.id, "SKU-2", 100).await;
  dup.id = Uuid::new_v4();
  dup.sku = "SKU-1".into();
  let err = s.insert_product(dup).await.unwrap_err();
  assert!(err.is_conflict());
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_round_trip_and_delete() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let now = Utc::now();
  let token = Token {
    token:      "tok-123".into(),
    project_id: p.id,
    kind:       TokenKind::Refresh,
    subject:    Subject::Anonymous(Uuid::new_v4()),
    expires_at: now + Duration::days(30),
    created_at: now,
  };
  s.insert_token(token.clone()).await.unwrap();

  let fetched = s.get_token("tok-123".into()).await.unwrap().unwrap();
  assert_eq!(fetched.subject, token.subject);
  assert_eq!(fetched.kind, TokenKind::Refresh);
  assert_eq!(fetched.expires_at.timestamp_micros(), token.expires_at.timestamp_micros());

  assert!(s.delete_token("tok-123".into()).await.unwrap());
  assert!(!s.delete_token("tok-123".into()).await.unwrap());
  assert!(s.get_token("tok-123".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_token_value_conflicts() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let now = Utc::now();
  let token = Token {
    token:      "same".into(),
    project_id: p.id,
    kind:       TokenKind::Access,
    subject:    Subject::Customer(Uuid::new_v4()),
    expires_at: now + Duration::hours(1),
    created_at: now,
  };
  s.insert_token(token.clone()).await.unwrap();
  let err = s.insert_token(token).await.unwrap_err();
  assert!(matches!(err, StoreError::Conflict("token")));
}

// ─── Customers ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn customer_round_trip_keeps_addresses() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let c = s.insert_customer(customer(p.id, "ada@example.com")).await.unwrap();

  let fetched = s.get_customer(p.id, c.id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "ada@example.com");
  assert_eq!(fetched.password_hash, c.password_hash);
  assert_eq!(fetched.addresses, c.addresses);
  assert_eq!(fetched.default_shipping_address_id.as_deref(), Some("aB3x_9"));
  assert_eq!(fetched.shipping_address_ids, vec!["aB3x_9".to_string()]);
}

#[tokio::test]
async fn customer_email_lookup_ignores_case() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let c = s.insert_customer(customer(p.id, "ada@example.com")).await.unwrap();

  let found = s
    .get_customer_by_email(p.id, "ADA@Example.com".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.id, c.id);
}

#[tokio::test]
async fn duplicate_email_conflicts_within_project_only() {
  let s = store().await;
  let a = project(&s, "a").await;
  let b = project(&s, "b").await;
  s.insert_customer(customer(a.id, "ada@example.com")).await.unwrap();

  let err = s.insert_customer(customer(a.id, "Ada@Example.com")).await.unwrap_err();
  assert!(matches!(err, StoreError::Conflict("customer")));

  s.insert_customer(customer(b.id, "ada@example.com")).await.unwrap();
}

// ─── Carts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_cart_is_empty_and_active() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let c = cart(&s, p.id, None).await;

  let fetched = s.get_cart(p.id, c.id).await.unwrap().unwrap();
  assert!(fetched.is_active());
  assert!(fetched.owner.is_none());
  assert!(fetched.lines.is_empty());
  assert_eq!(fetched.total_cents, 0);
}

#[tokio::test]
async fn adding_same_product_merges_into_one_line() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 2500).await;
  let owner = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  s.apply_line_changes(p.id, c.id, owner, vec![add(&shoe, 2)]).await.unwrap();
  let updated = s
    .apply_line_changes(p.id, c.id, owner, vec![add(&shoe, 3)])
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.lines.len(), 1);
  assert_eq!(updated.lines[0].quantity, 5);
  assert_eq!(updated.lines[0].total_cents, 12_500);
  assert_eq!(updated.total_cents, 12_500);
}

#[tokio::test]
async fn merge_keeps_pinned_price_and_snapshot() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 2500).await;
  let owner = Subject::Anonymous(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  s.apply_line_changes(p.id, c.id, owner, vec![add(&shoe, 1)]).await.unwrap();

  let mut repriced = shoe.clone();
  repriced.price_cents = 9999;
  repriced.name = "Renamed".into();
  let updated = s
    .apply_line_changes(p.id, c.id, owner, vec![add(&repriced, 1)])
    .await
    .unwrap()
    .unwrap();

  let line = &updated.lines[0];
  assert_eq!(line.unit_price_cents, 2500);
  assert_eq!(line.total_cents, 5000);
  assert_eq!(line.snapshot.product_name, "Product SHOE-1");
}

#[tokio::test]
async fn inserted_lines_carry_the_supplied_timestamp() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 2500).await;
  let owner = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  let stamped = DateTime::from_timestamp(1_600_000_000, 250_000_000).unwrap();
  let change = LineChange::Add {
    product_id: shoe.id,
    quantity: 1,
    unit_price_cents: shoe.price_cents,
    snapshot: LineSnapshot::of(&shoe),
    created_at: stamped,
  };
  let updated = s
    .apply_line_changes(p.id, c.id, owner, vec![change])
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.lines[0].created_at, stamped);
}

#[tokio::test]
async fn set_quantity_updates_and_removes_lines() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 1000).await;
  let hat = product(&s, p.id, "HAT-1", 300).await;
  let owner = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  let filled = s
    .apply_line_changes(p.id, c.id, owner, vec![add(&shoe, 1), add(&hat, 2)])
    .await
    .unwrap()
    .unwrap();
  assert_eq!(filled.total_cents, 1600);
  let shoe_line = filled.line_for_product(shoe.id).unwrap().id;
  let hat_line = filled.line_for_product(hat.id).unwrap().id;

  let updated = s
    .apply_line_changes(p.id, c.id, owner, vec![
      LineChange::SetQuantity { line_id: shoe_line, quantity: 4 },
      LineChange::SetQuantity { line_id: hat_line, quantity: 0 },
    ])
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.lines.len(), 1);
  assert_eq!(updated.lines[0].quantity, 4);
  assert_eq!(updated.total_cents, 4000);
  assert_eq!(updated.total_cents, updated.computed_total());
}

#[tokio::test]
async fn missing_line_rolls_back_whole_batch() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 1000).await;
  let owner = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  let err = s
    .apply_line_changes(p.id, c.id, owner, vec![
      add(&shoe, 1),
      LineChange::SetQuantity { line_id: Uuid::new_v4(), quantity: 2 },
    ])
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::NotFound("line item")));

  let unchanged = s.get_cart(p.id, c.id).await.unwrap().unwrap();
  assert!(unchanged.lines.is_empty());
  assert_eq!(unchanged.total_cents, 0);
}

#[tokio::test]
async fn overflowing_line_total_is_rejected() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let pricey = product(&s, p.id, "GOLD", i64::MAX / 2).await;
  let owner = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  let err = s
    .apply_line_changes(p.id, c.id, owner, vec![add(&pricey, 3)])
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::Backend(_)));
  assert!(s.get_cart(p.id, c.id).await.unwrap().unwrap().lines.is_empty());
}

#[tokio::test]
async fn changes_require_matching_owner_and_active_state() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 1000).await;
  let owner = Subject::Customer(Uuid::new_v4());
  let stranger = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;

  let result = s.apply_line_changes(p.id, c.id, stranger, vec![add(&shoe, 1)]).await.unwrap();
  assert!(result.is_none());

  let deleted = s
    .set_cart_state(p.id, c.id, owner, CartState::Deleted)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(deleted.state, CartState::Deleted);

  let result = s.apply_line_changes(p.id, c.id, owner, vec![add(&shoe, 1)]).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn set_state_by_stranger_returns_none() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let c = cart(&s, p.id, Some(Subject::Anonymous(Uuid::new_v4()))).await;

  let result = s
    .set_cart_state(p.id, c.id, Subject::Anonymous(Uuid::new_v4()), CartState::Deleted)
    .await
    .unwrap();
  assert!(result.is_none());
  assert!(s.get_cart(p.id, c.id).await.unwrap().unwrap().is_active());
}

#[tokio::test]
async fn active_cart_is_most_recent_active_one() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let owner = Subject::Customer(Uuid::new_v4());
  let now = Utc::now();

  let older = s
    .insert_cart(Cart::new(p.id, Some(owner), "EUR".into(), now - Duration::minutes(5)))
    .await
    .unwrap();
  let newer = s
    .insert_cart(Cart::new(p.id, Some(owner), "EUR".into(), now))
    .await
    .unwrap();

  let active = s.get_active_cart(p.id, owner).await.unwrap().unwrap();
  assert_eq!(active.id, newer.id);

  s.set_cart_state(p.id, newer.id, owner, CartState::Deleted).await.unwrap();
  let active = s.get_active_cart(p.id, owner).await.unwrap().unwrap();
  assert_eq!(active.id, older.id);

  assert!(
    s.get_active_cart(p.id, Subject::Anonymous(owner.id()))
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn reassign_moves_anonymous_cart_to_customer() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let shoe = product(&s, p.id, "SHOE-1", 1000).await;
  let anonymous_id = Uuid::new_v4();
  let customer_id = Uuid::new_v4();
  let anon = Subject::Anonymous(anonymous_id);
  let c = cart(&s, p.id, Some(anon)).await;
  s.apply_line_changes(p.id, c.id, anon, vec![add(&shoe, 2)]).await.unwrap();

  let moved = s
    .reassign_anonymous_cart(p.id, anonymous_id, customer_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(moved.id, c.id);
  assert_eq!(moved.owner, Some(Subject::Customer(customer_id)));
  assert_eq!(moved.total_cents, 2000);

  assert!(s.get_active_cart(p.id, anon).await.unwrap().is_none());
  let active = s
    .get_active_cart(p.id, Subject::Customer(customer_id))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(active.id, c.id);
}

#[tokio::test]
async fn reassign_without_anonymous_cart_returns_none() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let result = s
    .reassign_anonymous_cart(p.id, Uuid::new_v4(), Uuid::new_v4())
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn lines_are_listed_in_insertion_order() {
  let s = store().await;
  let p = project(&s, "demo").await;
  let owner = Subject::Customer(Uuid::new_v4());
  let c = cart(&s, p.id, Some(owner)).await;
  let mut products = Vec::new();
  for sku in ["A", "B", "C"] {
    products.push(product(&s, p.id, sku, 100).await);
  }

  let changes = products.iter().map(|p| add(p, 1)).collect();
  let filled = s.apply_line_changes(p.id, c.id, owner, changes).await.unwrap().unwrap();

  let skus: Vec<_> = filled.lines.iter().map(|l| l.snapshot.sku.as_str()).collect();
  assert_eq!(skus, ["A", "B", "C"]);
}

#[tokio::test]
async fn carts_are_invisible_from_other_projects() {
  let s = store().await;
  let a = project(&s, "a").await;
  let b = project(&s, "b").await;
  let c = cart(&s, a.id, None).await;
  assert!(s.get_cart(b.id, c.id).await.unwrap().is_none());
}
