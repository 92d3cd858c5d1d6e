//! HTTP API for Shelf.
//!
//! Exposes an axum [`Router`] over any [`CommerceStore`]. Routes are scoped
//! by project key, mirroring the commerce platform's URL layout:
//!
//! ```text
//! POST /oauth/{project_key}/customers/token
//! POST /oauth/{project_key}/anonymous/token
//! POST /{project_key}/me/carts
//! POST /{project_key}/products/search
//! GET  /readyz
//! ...
//! ```

pub mod auth;
pub mod carts;
pub mod customers;
pub mod error;
pub mod oauth;
pub mod products;
pub mod seed;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{Request, State},
  http::StatusCode,
  response::IntoResponse,
  routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use shelf_core::{catalog::Project, store::CommerceStore};
use shelf_service::{IdentityConfig, Services};
use tower_http::trace::TraceLayer;
use tracing::{Span, field};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `shelf.toml` and
/// `SHELF__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub identity:   IdentityConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("shelf.db"),
      identity:   IdentityConfig::default(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub services: Arc<Services<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), services: self.services.clone() }
  }
}

impl<S: CommerceStore> AppState<S> {
  pub fn new(store: Arc<S>, services: Services<S>) -> Self {
    Self { store, services: Arc::new(services) }
  }
}

/// Look a project up by its URL key; unknown keys are 404.
///
/// The resolved id is recorded on the request span.
pub async fn load_project<S: CommerceStore>(state: &AppState<S>, key: &str) -> Result<Project, ApiError> {
  let project = state
    .store
    .get_project_by_key(key.to_owned())
    .await?
    .ok_or(ApiError::NotFound("project"))?;
  Span::current().record("project_id", field::display(project.id));
  Ok(project)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
pub fn router<S: CommerceStore>(state: AppState<S>) -> Router {
  Router::new()
    .route("/healthz", get(healthz))
    .route("/readyz", get(readyz::<S>))
    // OAuth
    .route("/oauth/{project_key}/customers/token", post(oauth::customer_token::<S>))
    .route("/oauth/{project_key}/anonymous/token", post(oauth::anonymous_token::<S>))
    // Customers
    .route("/{project_key}/me", get(customers::me))
    .route("/{project_key}/me/signup", post(customers::signup::<S>))
    .route("/{project_key}/me/login", post(customers::login::<S>))
    // Catalog
    .route("/{project_key}/products", get(products::list::<S>))
    .route("/{project_key}/products/search", post(products::search::<S>))
    .route("/{project_key}/products/{id}", get(products::get_one::<S>))
    // Carts
    .route("/{project_key}/carts", post(carts::create::<S>))
    .route("/{project_key}/carts/{id}", get(carts::get_one::<S>))
    .route("/{project_key}/me/carts", post(carts::create_mine::<S>))
    .route(
      "/{project_key}/me/carts/{id}",
      post(carts::update_mine::<S>).delete(carts::delete_mine::<S>),
    )
    .route("/{project_key}/me/active-cart", get(carts::active::<S>))
    .layer(TraceLayer::new_for_http().make_span_with(request_span))
    .with_state(state)
}

/// The per-request span. `project_id` and `subject` start empty and are
/// filled in once the project and the caller are resolved, so every event
/// logged while handling the request carries them.
fn request_span(req: &Request) -> Span {
  tracing::info_span!(
    "request",
    method = %req.method(),
    uri = %req.uri(),
    project_id = field::Empty,
    subject = field::Empty
  )
}

async fn healthz() -> &'static str { "ok" }

const READY_TIMEOUT: Duration = Duration::from_secs(1);

/// `GET /readyz`: 200 once the store answers a ping, 503 otherwise.
async fn readyz<S: CommerceStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
  match tokio::time::timeout(READY_TIMEOUT, state.store.ping()).await {
    Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
    Ok(Err(e)) => {
      tracing::warn!(error = %e, "store ping failed");
      unavailable("store not reachable")
    }
    Err(_) => {
      tracing::warn!(timeout = ?READY_TIMEOUT, "store ping timed out");
      unavailable("store not reachable")
    }
  }
}

fn unavailable(reason: &str) -> (StatusCode, Json<serde_json::Value>) {
  (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable", "reason": reason })))
}
