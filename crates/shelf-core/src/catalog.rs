//! Projects and the product catalog.
//!
//! Carts only ever read from the catalog; catalog maintenance happens outside
//! this service (seeding, imports).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A tenant. Every other record is scoped to exactly one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id:         Uuid,
  /// URL-facing identifier, unique across the store.
  pub key:        String,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id:          Uuid,
  pub project_id:  Uuid,
  pub key:         String,
  /// Unique per project.
  pub sku:         String,
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Minor currency units.
  pub price_cents: i64,
  pub currency:    String,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub attributes:  Map<String, Value>,
  pub created_at:  DateTime<Utc>,
}

impl Product {
  /// Image URLs from the `images` attribute, if it is a list of strings.
  pub fn images(&self) -> Vec<String> {
    match self.attributes.get("images") {
      Some(Value::Array(items)) => items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
        .collect(),
      _ => Vec::new(),
    }
  }

  /// The product key, or a slugified name when the key is blank.
  pub fn slug(&self) -> String {
    let key = self.key.trim();
    if key.is_empty() {
      self.name.to_lowercase().replace(' ', "-")
    } else {
      key.to_owned()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn product(key: &str, name: &str, attributes: Value) -> Product {
    Product {
      id:          Uuid::new_v4(),
      project_id:  Uuid::new_v4(),
      key:         key.into(),
      sku:         "SKU-1".into(),
      name:        name.into(),
      description: None,
      price_cents: 1299,
      currency:    "EUR".into(),
      attributes:  attributes.as_object().cloned().unwrap_or_default(),
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn slug_falls_back_to_name() {
    assert_eq!(product("tulip-bulbs", "Tulip Bulbs", json!({})).slug(), "tulip-bulbs");
    assert_eq!(product("  ", "Tulip Bulbs", json!({})).slug(), "tulip-bulbs");
  }

  #[test]
  fn images_ignores_non_strings() {
    let p = product("k", "n", json!({ "images": ["a.jpg", 3, "", "b.jpg"] }));
    assert_eq!(p.images(), vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    assert!(product("k", "n", json!({ "images": "a.jpg" })).images().is_empty());
  }
}
