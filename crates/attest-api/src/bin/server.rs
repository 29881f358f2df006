//! attestd — the Attest registry server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! SQLite registry, starts the ledger-mirror forwarder if one is
//! configured, and serves the JSON API.
//!
//! # Minimal config.toml
//!
//! ```toml
//! host          = "127.0.0.1"
//! port          = 7468
//! store_path    = "~/.local/share/attest/registry.db"
//! administrator = "deployer"
//!
//! [mirror]
//! endpoint     = "https://gateway.example.net:51234"
//! account      = "rMirrorAccount"
//! signing_seed = "sn0wBa11…"
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use attest_api::{MirrorSettings, ServerConfig};
use attest_core::principal::Principal;
use attest_mirror::{LedgerMirror, MirrorConfig};
use attest_store_sqlite::SqliteRegistry;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Attest identity registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ATTEST"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let administrator = Principal::new(server_cfg.administrator.clone())
    .context("invalid administrator principal")?;

  // Open the registry.
  let store_path = expand_tilde(&server_cfg.store_path);
  let registry = SqliteRegistry::open(&store_path, administrator)
    .await
    .with_context(|| format!("failed to open registry at {store_path:?}"))?;

  // Wire the mirror forwarder before serving so no event is missed.
  if let Some(mirror_cfg) = &server_cfg.mirror {
    let mirror = LedgerMirror::new(mirror_config(mirror_cfg))
      .context("failed to build ledger mirror")?;
    tokio::spawn(attest_api::forward::forward_audit(
      registry.subscribe(),
      mirror,
    ));
    tracing::info!("ledger mirror enabled");
  } else {
    tracing::info!("ledger mirror disabled");
  }

  let app = attest_api::api_router(Arc::new(registry))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn mirror_config(settings: &MirrorSettings) -> MirrorConfig {
  let mut cfg = MirrorConfig::new(
    settings.endpoint.clone(),
    settings.account.clone(),
    settings.signing_seed.clone(),
  );
  if let Some(retries) = settings.max_retries {
    cfg.max_retries = retries;
  }
  if let Some(ms) = settings.retry_backoff_ms {
    cfg.retry_backoff = Duration::from_millis(ms);
  }
  cfg
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  match path.strip_prefix("~") {
    Ok(rest) => match std::env::var_os("HOME") {
      Some(home) => PathBuf::from(home).join(rest),
      None => path.to_path_buf(),
    },
    Err(_) => path.to_path_buf(),
  }
}
