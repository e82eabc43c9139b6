//! acad-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `ACAD_*`
//! environment variables, opens the SQLite store and the upload directory,
//! and serves the JSON API over HTTP.
//!
//! Nested keys use a double underscore, e.g. `ACAD_POLICY__CATEGORY_CAP=40`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use acad_api::{AppState, ServerConfig, artifacts::FsArtifactStore};
use acad_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Activity-point tracker API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Override the configured listen port.
  #[arg(short, long)]
  port: Option<u16>,
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
      config::Environment::with_prefix("ACAD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("uploads.allowed_extensions"),
    )
    .build()
    .context("failed to read configuration")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  if let Some(port) = cli.port {
    server_cfg.port = port;
  }
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.upload_dir = expand_tilde(&server_cfg.upload_dir);

  if let Some(parent) = server_cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;
  let artifacts = FsArtifactStore::open(&server_cfg.upload_dir)
    .await
    .with_context(|| format!("failed to open upload dir {:?}", server_cfg.upload_dir))?;

  tracing::info!(
    category_cap = server_cfg.policy.category_cap,
    required_points = server_cfg.policy.required_points,
    max_upload = server_cfg.uploads.max_bytes,
    "policy loaded"
  );

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState {
    store:     Arc::new(store),
    artifacts: Arc::new(artifacts),
    config:    Arc::new(server_cfg),
  };
  let app = acad_api::router(state);

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
