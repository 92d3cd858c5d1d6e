//! shelf server binary.
//!
//! Reads `shelf.toml` (or the path given with `--config`) layered under
//! `SHELF__*` environment variables, opens the SQLite store, and serves the
//! API over HTTP.
//!
//! ```text
//! shelf seed --project demo   # demo project + products
//! shelf serve                 # the default
//! SHELF__PORT=9000 SHELF__IDENTITY__PASSWORD__MIN_LENGTH=10 shelf
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use shelf_api::{AppState, ServerConfig, seed::seed_demo};
use shelf_core::clock::SystemClock;
use shelf_service::Services;
use shelf_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Shelf commerce API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "shelf.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  Serve,
  /// Create a demo project and products.
  Seed {
    /// Project key to create or fill.
    #[arg(long, default_value = "demo")]
    project: String,
    #[arg(long, default_value = "EUR")]
    currency: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("SHELF")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Seed { project, currency } => {
      let project = seed_demo(&store, &project, &currency)
        .await
        .context("failed to seed demo data")?;
      tracing::info!(project_id = %project.id, key = %project.key, "seeded");
      Ok(())
    }
    Command::Serve => serve(store, server_cfg).await,
  }
}

async fn serve(store: SqliteStore, cfg: ServerConfig) -> anyhow::Result<()> {
  let store = Arc::new(store);
  let services = Services::new(store.clone(), Arc::new(SystemClock), &cfg.identity)
    .context("failed to build services")?;

  let app = shelf_api::router(AppState::new(store, services));
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
