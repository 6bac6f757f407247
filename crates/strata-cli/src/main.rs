//! `strata` — inspection CLI for the Strata versioned-hierarchy store.
//!
//! # Usage
//!
//! ```
//! strata seed
//! strata resolve --root <uuid> --at 2024-01-02T03:04:05Z
//! strata history --detail <uuid>
//! strata roots
//! ```
//!
//! The database path comes from `--db`, the `STRATA_DB` environment variable,
//! or a TOML config file, in that order of precedence.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use strata_core::{
  detail::{DetailPatch, NewDetail},
  store::{CardinalityPolicy, TemporalStore},
  view::HierarchyView,
};
use strata_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "strata", about = "Point-in-time queries over a versioned hierarchy")]
struct Cli {
  /// Path to the SQLite database file.
  #[arg(long, env = "STRATA_DB")]
  db: Option<PathBuf>,

  /// Path to a TOML config file (db, cardinality).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Detail cardinality policy: "single" or "multiple".
  #[arg(long)]
  cardinality: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create a demo hierarchy and mutate its detail, printing the
  /// timestamps that straddle the update.
  Seed {
    /// Name for the new root.
    #[arg(long, default_value = "Mariner Books")]
    name: String,
  },

  /// Resolve a hierarchy as it existed at an instant (default: now).
  Resolve {
    /// Root UUID.
    #[arg(long)]
    root: Uuid,

    /// RFC 3339 timestamp to resolve at; omit for the current state.
    #[arg(long)]
    at: Option<String>,

    /// Emit the view as JSON instead of text.
    #[arg(long)]
    json: bool,
  },

  /// Print every period row of a logical detail, oldest first.
  History {
    /// Detail UUID.
    #[arg(long)]
    detail: Uuid,
  },

  /// List all roots.
  Roots,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  db:          String,
  #[serde(default)]
  cardinality: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &cli.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let db_path = cli
    .db
    .or_else(|| (!file_cfg.db.is_empty()).then(|| PathBuf::from(&file_cfg.db)))
    .unwrap_or_else(|| PathBuf::from("strata.db"));

  let policy: CardinalityPolicy = cli
    .cardinality
    .or_else(|| (!file_cfg.cardinality.is_empty()).then(|| file_cfg.cardinality.clone()))
    .as_deref()
    .map(str::parse)
    .transpose()
    .context("parsing cardinality policy")?
    .unwrap_or_default();

  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("opening store at {}", db_path.display()))?
    .with_policy(policy);

  match cli.command {
    Command::Seed { name } => seed(&store, name).await,
    Command::Resolve { root, at, json } => resolve(&store, root, at, json).await,
    Command::History { detail } => history(&store, detail).await,
    Command::Roots => roots(&store).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// Build a root → record → detail hierarchy, then update the detail so the
/// database holds a period boundary to probe with `resolve --at`.
async fn seed(store: &SqliteStore, name: String) -> Result<()> {
  let root = store.create_root(name).await?;
  let record = store.open_record(root.root_id).await?;
  let detail = store
    .add_detail(NewDetail::new(record.record_id, "Home", "Wrong City"))
    .await?;

  tracing::info!(root = %root.root_id, record = %record.record_id, "seeded hierarchy");

  // Give the replacement row a visibly different period start.
  tokio::time::sleep(Duration::from_millis(200)).await;
  let before_update = Utc::now();
  tokio::time::sleep(Duration::from_millis(200)).await;

  store
    .update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await?;

  println!("root:          {}", root.root_id);
  println!("record:        {}", record.record_id);
  println!("detail:        {}", detail.detail_id);
  println!("before update: {}", before_update.to_rfc3339());
  println!("after update:  {}", Utc::now().to_rfc3339());
  println!();
  println!("try: strata resolve --root {} --at {}", root.root_id, before_update.to_rfc3339());

  Ok(())
}

async fn resolve(
  store: &SqliteStore,
  root: Uuid,
  at: Option<String>,
  json: bool,
) -> Result<()> {
  let view = match at {
    Some(raw) => {
      let as_of = DateTime::parse_from_rfc3339(&raw)
        .with_context(|| format!("parsing --at timestamp {raw:?}"))?
        .with_timezone(&Utc);
      store.resolve_as_of(root, as_of).await?
    }
    None => store.resolve_current(root).await?,
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&view)?);
  } else {
    print_view(&view);
  }
  Ok(())
}

async fn history(store: &SqliteStore, detail: Uuid) -> Result<()> {
  let rows = store.detail_history(detail).await?;
  if rows.is_empty() {
    println!("no rows for detail {detail}");
    return Ok(());
  }
  for row in rows {
    println!(
      "{} .. {:<32} {} / {}",
      row.period.valid_from.to_rfc3339(),
      row
        .period
        .valid_to
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "(open)".into()),
      row.name,
      row.city,
    );
  }
  Ok(())
}

async fn roots(store: &SqliteStore) -> Result<()> {
  for root in store.list_roots().await? {
    println!("{}  {}", root.root_id, root.name);
  }
  Ok(())
}

fn print_view(view: &HierarchyView) {
  println!("root:  {} ({})", view.root.root_id, view.root.name);
  println!("as of: {}", view.as_of.to_rfc3339());
  match &view.record {
    None => println!("record: none active at this instant"),
    Some(record) => {
      println!("record: {}", record.record_id);
      if view.details.is_empty() {
        println!("details: none");
      }
      for detail in &view.details {
        let marker = if detail.period.is_open() { " (current)" } else { "" };
        println!("  {}  {} / {}{}", detail.detail_id, detail.name, detail.city, marker);
      }
    }
  }
}
