//! Runtime configuration: an optional TOML file layered under `TACTICA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tactica_catalog::engine::DEFAULT_LIMIT;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Read-only puzzle snapshot loaded into memory at startup.
  pub snapshot_path: PathBuf,
  /// Durable SQLite file for reports and modifications.
  pub store_path:    PathBuf,
  /// Puzzles returned by `query` when `--limit` is not given.
  pub default_limit: usize,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      snapshot_path: PathBuf::from("puzzles.db"),
      store_path:    PathBuf::from("~/.local/share/tactica/mutations.db"),
      default_limit: DEFAULT_LIMIT,
    }
  }
}

impl AppConfig {
  /// Read `path` if it exists, apply the environment on top, and expand `~`
  /// in both paths.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TACTICA"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;

    cfg.snapshot_path = expand_tilde(&cfg.snapshot_path);
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
