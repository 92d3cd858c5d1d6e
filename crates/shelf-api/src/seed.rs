//! Demo data for `shelf seed`.

use chrono::Utc;
use serde_json::{Map, json};
use shelf_core::{
  StoreError,
  catalog::{Product, Project},
  store::{ProductCatalog, ProjectStore},
};
use uuid::Uuid;

/// `(sku, name, price in cents, image)`
const DEMO_PRODUCTS: &[(&str, &str, i64, &str)] = &[
  ("TSHIRT-BLK-M", "Black T-Shirt", 1999, "https://img.example.com/tshirt-black.png"),
  ("MUG-WHT", "White Mug", 899, "https://img.example.com/mug-white.png"),
  ("CAP-NVY", "Navy Cap", 1499, "https://img.example.com/cap-navy.png"),
];

/// Ensure a project with `key` exists and carries the demo products. Safe to
/// run repeatedly: existing rows are left alone.
pub async fn seed_demo<S>(store: &S, key: &str, currency: &str) -> Result<Project, StoreError>
where
  S: ProjectStore + ProductCatalog,
{
  let project = match store.get_project_by_key(key.to_owned()).await? {
    Some(project) => project,
    None => {
      let project = store
        .insert_project(Project {
          id:         Uuid::new_v4(),
          key:        key.to_owned(),
          name:       format!("{key} (demo)"),
          created_at: Utc::now(),
        })
        .await?;
      tracing::info!(project_id = %project.id, %key, "created project");
      project
    }
  };

  for &(sku, name, price_cents, image) in DEMO_PRODUCTS {
    let mut attributes = Map::new();
    attributes.insert("images".into(), json!([image]));

    let product = Product {
      id: Uuid::new_v4(),
      project_id: project.id,
      key: sku.to_lowercase(),
      sku: sku.to_owned(),
      name: name.to_owned(),
      description: None,
      price_cents,
      currency: currency.to_owned(),
      attributes,
      created_at: Utc::now(),
    };

    match store.insert_product(product).await {
      Ok(p) => tracing::info!(sku = %p.sku, "created product"),
      Err(StoreError::Conflict(_)) => tracing::debug!(%sku, "product already present"),
      Err(e) => return Err(e),
    }
  }

  Ok(project)
}
