//! Read-only catalog endpoints.
//!
//! `POST /{project_key}/products/search` takes the platform's search body,
//! of which only the price range filter, the first sort clause, `limit` and
//! `offset` are honoured:
//!
//! ```json
//! {
//!   "query": { "filter": [{ "range": { "field": "variants.prices.centAmount", "gte": 0, "lte": 1500 } }] },
//!   "sort": [{ "field": "variants.prices.centAmount", "order": "desc" }],
//!   "limit": 20,
//!   "offset": 0
//! }
//! ```

use std::cmp::Ordering;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelf_core::{catalog::Product, store::CommerceStore};
use uuid::Uuid;

use crate::{AppState, error::ApiError, load_project};

/// A result page in the platform's list envelope.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
  pub count:   usize,
  pub total:   usize,
  pub offset:  usize,
  pub results: Vec<T>,
}

impl<T> From<Vec<T>> for Paged<T> {
  fn from(results: Vec<T>) -> Self {
    Self { count: results.len(), total: results.len(), offset: 0, results }
  }
}

/// `GET /{project_key}/products`
pub async fn list<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
) -> Result<Json<Paged<Product>>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let products = state.store.list_products(project.id).await?;
  Ok(Json(products.into()))
}

/// `GET /{project_key}/products/{id}`
pub async fn get_one<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path((project_key, id)): Path<(String, String)>,
) -> Result<Json<Product>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("product"))?;
  state
    .store
    .get_product(project.id, id)
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("product"))
}

// ─── Search ──────────────────────────────────────────────────────────────────

const PRICE_FIELD: &str = "variants.prices.centAmount";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
  pub query:  SearchQuery,
  pub sort:   Vec<SortClause>,
  pub limit:  i64,
  pub offset: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
  pub filter: Vec<FilterClause>,
}

/// Clauses other than `range` (e.g. `exact` on categories) are accepted and
/// ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterClause {
  pub range: Option<RangeFilter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RangeFilter {
  pub field: String,
  pub gte:   Option<i64>,
  pub lte:   Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SortClause {
  pub field: String,
  pub order: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
  pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
  pub total:   usize,
  pub offset:  usize,
  pub limit:   usize,
  pub facets:  Vec<Value>,
  pub results: Vec<SearchHit>,
}

/// `POST /{project_key}/products/search`
pub async fn search<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
  Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let products = state.store.list_products(project.id).await?;
  Ok(Json(run_search(products, &req)))
}

/// Filter, sort, then page `products`. A non-positive `limit` means "all";
/// a negative `offset` counts as zero.
pub fn run_search(mut products: Vec<Product>, req: &SearchRequest) -> SearchResponse {
  // The last price range clause wins.
  if let Some(range) = req
    .query
    .filter
    .iter()
    .filter_map(|f| f.range.as_ref())
    .rfind(|r| r.field == PRICE_FIELD)
  {
    products.retain(|p| {
      range.gte.is_none_or(|min| p.price_cents >= min)
        && range.lte.is_none_or(|max| p.price_cents <= max)
    });
  }

  sort_products(&mut products, req.sort.first());

  let total = products.len();
  let offset = usize::try_from(req.offset).unwrap_or(0);
  let limit = usize::try_from(req.limit).ok().filter(|&l| l > 0).unwrap_or(total);

  let results = products
    .into_iter()
    .skip(offset)
    .take(limit)
    .map(|p| SearchHit { id: p.id })
    .collect();

  SearchResponse { total, offset, limit, facets: Vec::new(), results }
}

fn by_name(a: &Product, b: &Product) -> Ordering {
  a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Name ascending unless the clause asks for `name` or a price field.
fn sort_products(products: &mut [Product], clause: Option<&SortClause>) {
  let Some(clause) = clause else {
    products.sort_by(by_name);
    return;
  };

  let descending = clause.order.eq_ignore_ascii_case("desc");
  let cmp: fn(&Product, &Product) -> Ordering = match clause.field.to_lowercase().as_str() {
    "name" => by_name,
    "variants.prices.centamount" | "variants.prices.value.centamount" | "price" => {
      |a, b| a.price_cents.cmp(&b.price_cents)
    }
    _ => {
      products.sort_by(by_name);
      return;
    }
  };

  if descending {
    products.sort_by(|a, b| cmp(b, a));
  } else {
    products.sort_by(cmp);
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use serde_json::json;

  use super::*;

  fn product(name: &str, price_cents: i64) -> Product {
    Product {
      id: Uuid::new_v4(),
      project_id: Uuid::nil(),
      key: name.to_lowercase(),
      sku: name.to_uppercase(),
      name: name.into(),
      description: None,
      price_cents,
      currency: "EUR".into(),
      attributes: Default::default(),
      created_at: Utc::now(),
    }
  }

  fn request(body: serde_json::Value) -> SearchRequest { serde_json::from_value(body).unwrap() }

  #[test]
  fn price_range_is_inclusive_and_pages() {
    let beta = product("Beta", 100);
    let alpha = product("Alpha", 200);
    let gamma = product("gamma", 150);
    let products = vec![beta.clone(), alpha, gamma.clone()];

    let res = run_search(
      products,
      &request(json!({
        "limit": 1,
        "query": { "filter": [{ "range": { "field": "variants.prices.centAmount", "gte": 0, "lte": 150 } }] },
      })),
    );
    assert_eq!(res.total, 2);
    assert_eq!(res.limit, 1);
    assert_eq!(res.results.len(), 1);
    assert_eq!(res.results[0].id, beta.id);

    let next = run_search(
      vec![beta, gamma.clone()],
      &request(json!({ "limit": 1, "offset": 1 })),
    );
    assert_eq!(next.results[0].id, gamma.id);
  }

  #[test]
  fn sorts_by_price_descending() {
    let cheap = product("Cheap", 100);
    let dear = product("Expensive", 500);
    let res = run_search(
      vec![cheap.clone(), dear.clone()],
      &request(json!({ "sort": [{ "field": "variants.prices.centAmount", "order": "desc" }] })),
    );
    let ids: Vec<_> = res.results.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![dear.id, cheap.id]);
  }

  #[test]
  fn defaults_return_everything_by_name() {
    let b = product("beta", 1);
    let a = product("Alpha", 2);
    let res = run_search(vec![b.clone(), a.clone()], &SearchRequest::default());
    assert_eq!(res.total, 2);
    assert_eq!(res.limit, 2);
    assert_eq!(res.offset, 0);
    assert_eq!(res.results.iter().map(|h| h.id).collect::<Vec<_>>(), vec![a.id, b.id]);

    let past_end = run_search(vec![a, b], &request(json!({ "offset": 5, "limit": -3 })));
    assert_eq!(past_end.total, 2);
    assert!(past_end.results.is_empty());
  }
}
