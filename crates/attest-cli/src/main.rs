//! `attest` — command-line client for the Attest identity registry.
//!
//! # Usage
//!
//! ```
//! attest --url http://localhost:7468 --principal alice get alice
//! attest --principal alice add alice --name Alice --email alice@example.com
//! attest --config ~/.config/attest/config.toml audit --limit 10
//! ```

mod client;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use attest_core::principal::Role;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "attest",
  about = "Command-line client for the Attest identity registry"
)]
struct Args {
  /// Path to a TOML config file (url, principal).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the attest server (default: http://localhost:7468).
  #[arg(long, env = "ATTEST_URL")]
  url: Option<String>,

  /// Principal to attribute requests to.
  #[arg(long, env = "ATTEST_PRINCIPAL")]
  principal: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch a principal's identity record.
  Get { target: String },
  /// Register an identity for a principal.
  Add {
    target: String,
    #[arg(long)]
    name:   String,
    #[arg(long)]
    email:  String,
  },
  /// Overwrite name and email on an existing identity.
  Update {
    target: String,
    #[arg(long)]
    name:   String,
    #[arg(long)]
    email:  String,
  },
  /// Mark an identity verified (requires the verifier role).
  Verify { target: String },
  /// Clear an identity's verification flag (requires the admin role).
  Revoke { target: String },
  /// Delete an identity.
  Delete { target: String },
  /// Look up a principal's role.
  Role { principal: String },
  /// Assign a role: unassigned, admin, or verifier (administrator only).
  AssignRole { principal: String, role: String },
  /// Show the most recent audit entries.
  Audit {
    #[arg(long, default_value_t = 20)]
    limit: usize,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:       String,
  #[serde(default)]
  principal: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let principal = args
    .principal
    .or_else(|| {
      (!file_cfg.principal.is_empty()).then(|| file_cfg.principal.clone())
    })
    .unwrap_or_default();

  let read_only = matches!(
    args.command,
    Command::Get { .. } | Command::Role { .. } | Command::Audit { .. }
  );
  if principal.is_empty() && !read_only {
    bail!(
      "a caller principal is required; pass --principal or set it in the \
       config file"
    );
  }

  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:7468".to_string()),
    principal,
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Get { target } => {
      print_json(&client.get_identity(&target).await?)?;
    }
    Command::Add { target, name, email } => {
      print_json(&client.add_identity(&target, &name, &email).await?)?;
    }
    Command::Update { target, name, email } => {
      print_json(&client.update_identity(&target, &name, &email).await?)?;
    }
    Command::Verify { target } => {
      print_json(&client.verify_identity(&target).await?)?;
    }
    Command::Revoke { target } => {
      print_json(&client.revoke_identity(&target).await?)?;
    }
    Command::Delete { target } => {
      client.delete_identity(&target).await?;
      println!("deleted {target}");
    }
    Command::Role { principal } => {
      print_json(&client.role_of(&principal).await?)?;
    }
    Command::AssignRole { principal, role } => {
      let role: Role = role.parse().map_err(|_| {
        anyhow!("unknown role {role:?}; expected unassigned, admin, or verifier")
      })?;
      print_json(&client.assign_role(&principal, role).await?)?;
    }
    Command::Audit { limit } => {
      print_json(&client.audit_log(limit).await?)?;
    }
  }

  Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
