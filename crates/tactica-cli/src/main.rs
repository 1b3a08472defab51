//! `tactica`: query the puzzle catalog and moderate it from the shell.
//!
//! Reads `tactica.toml` (or the path given with `--config`), loads the puzzle
//! snapshot into memory, reconciles the durable mutation store into it and
//! runs one subcommand. Output is JSON on stdout.
//!
//! # Usage
//!
//! ```
//! tactica query --theme fork --theme pin --min-rating 1500 --limit 5
//! tactica report 00sHx wrong_solution --notes "mates in one"
//! tactica block 00sHx
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tactica_catalog::{LoadProgress, PuzzleEngine, PuzzleFilter};
use tactica_moderation::{ActionResult, Coordinator, ReportListing};
use tactica_store_sqlite::{SqliteMutationStore, SqliteOpener};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tactica", version, about = "Chess puzzle catalog and moderation")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tactica.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Sample random puzzles.
  Query {
    /// Match any of these themes. Repeatable.
    #[arg(short, long = "theme")]
    themes:          Vec<String>,
    #[arg(long)]
    min_rating:      Option<i64>,
    #[arg(long)]
    max_rating:      Option<i64>,
    #[arg(long)]
    min_popularity:  Option<i64>,
    #[arg(short, long)]
    limit:           Option<usize>,
    /// Do not filter out blocked puzzles.
    #[arg(long)]
    include_blocked: bool,
  },
  /// List themes with their puzzle counts.
  Themes {
    #[arg(long)]
    top: Option<usize>,
  },
  /// Report a puzzle.
  Report {
    puzzle_id: String,
    /// wrong_solution, duplicate, broken_position or other.
    reason:    String,
    #[arg(long)]
    notes:     Option<String>,
  },
  /// List reports, newest first.
  Reports {
    #[arg(long, default_value_t = 1)]
    page:      usize,
    #[arg(long, default_value_t = tactica_moderation::view::DEFAULT_PAGE_SIZE)]
    page_size: usize,
    /// Include dismissed reports.
    #[arg(long)]
    all:       bool,
    /// Only reports for this puzzle.
    #[arg(long)]
    puzzle:    Option<String>,
  },
  Dismiss {
    id: i64,
  },
  DeleteReport {
    id: i64,
  },
  Block {
    puzzle_id: String,
  },
  Unblock {
    puzzle_id: String,
  },
  /// Serve `fen` in place of the catalog position.
  SetFen {
    puzzle_id: String,
    fen:       String,
  },
  /// A puzzle with its moderation state.
  Info {
    puzzle_id: String,
  },
  /// Catalog size and moderation counts.
  Stats,
  /// Write the in-memory catalog, mirror tables included, to a file.
  Export {
    path: PathBuf,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so stdout stays valid JSON.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let engine = PuzzleEngine::new().await.context("failed to create catalog")?;
  engine
    .load(
      &cfg.snapshot_path,
      Some(Box::new(|p: LoadProgress| {
        tracing::debug!(fraction = p.fraction(), "restoring snapshot");
      })),
    )
    .await
    .with_context(|| format!("failed to load snapshot {:?}", cfg.snapshot_path))?;

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let coordinator = Coordinator::new(
    engine.catalog().clone(),
    SqliteMutationStore::opener(&cfg.store_path),
  );
  // Queries still work without the durable store; mutations will report it.
  if let Err(e) = coordinator.initialize().await {
    tracing::warn!(error = %e, store = ?cfg.store_path, "starting without moderation state");
  }

  run(cli.command, &cfg, &engine, &coordinator).await
}

async fn run(
  command: Command,
  cfg: &AppConfig,
  engine: &PuzzleEngine,
  coordinator: &Coordinator<SqliteOpener>,
) -> anyhow::Result<()> {
  match command {
    Command::Query {
      themes,
      min_rating,
      max_rating,
      min_popularity,
      limit,
      include_blocked,
    } => {
      let filter = PuzzleFilter {
        themes,
        min_rating,
        max_rating,
        min_popularity,
        limit: limit.unwrap_or(cfg.default_limit),
        exclude_blocked: !include_blocked,
      };
      let blocked = coordinator.blocked_cache();
      let puzzles = engine.query_puzzles(&filter, Some(&blocked)).await?;
      print_json(&puzzles)
    }
    Command::Themes { top } => {
      let mut themes = engine.themes()?;
      if let Some(top) = top {
        themes.truncate(top);
      }
      print_json(&themes)
    }
    Command::Report { puzzle_id, reason, notes } => finish(
      coordinator
        .report_puzzle(&puzzle_id, &reason, notes.as_deref())
        .await,
    ),
    Command::Reports { page, page_size, all, puzzle } => match puzzle {
      Some(puzzle_id) => {
        print_json(&coordinator.get_reports_for_puzzle(&puzzle_id).await?)
      }
      None => {
        let listing = ReportListing { include_dismissed: all, page, page_size };
        print_json(&coordinator.get_reports(listing).await?)
      }
    },
    Command::Dismiss { id } => finish(coordinator.dismiss_report(id).await),
    Command::DeleteReport { id } => finish(coordinator.delete_report(id).await),
    Command::Block { puzzle_id } => {
      finish(coordinator.block_puzzle(&puzzle_id).await)
    }
    Command::Unblock { puzzle_id } => {
      finish(coordinator.unblock_puzzle(&puzzle_id).await)
    }
    Command::SetFen { puzzle_id, fen } => {
      finish(coordinator.update_puzzle_fen(&puzzle_id, &fen).await)
    }
    Command::Info { puzzle_id } => match coordinator.get_puzzle_info(&puzzle_id).await {
      Some(info) => print_json(&info),
      None => anyhow::bail!("puzzle {puzzle_id} not found"),
    },
    Command::Stats => {
      let moderation = coordinator.get_stats().await.ok();
      print_json(&json!({
        "state": coordinator.state(),
        "puzzles": engine.total_count().await,
        "blocked_cached": coordinator.blocked_cache().len(),
        "moderation": moderation,
      }))
    }
    Command::Export { path } => {
      let bytes = coordinator.export_database().await?;
      tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {path:?}"))?;
      tracing::info!(path = %path.display(), bytes = bytes.len(), "catalog exported");
      Ok(())
    }
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Print a mutation outcome, exiting non-zero when it failed.
fn finish<T, E>(result: Result<T, E>) -> anyhow::Result<()>
where
  T: Serialize,
  E: std::fmt::Display,
{
  let result: ActionResult<T> = result.into();
  print_json(&result)?;
  match result.error {
    Some(error) if !result.success => anyhow::bail!(error),
    _ => Ok(()),
  }
}
