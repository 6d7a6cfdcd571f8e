//! Runtime settings, read from an optional TOML file layered under
//! `PLINTH_*` environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CATALOG_PATH: &str = "catalog.db";
const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Directory holding one database file per project.
  pub data_dir:        PathBuf,
  /// The control-plane catalog database.
  pub catalog_path:    PathBuf,
  /// `*.sql` scripts run against every new project database.
  #[serde(default)]
  pub seed_dir:        Option<PathBuf>,
  pub busy_timeout_ms: u64,
}

impl Settings {
  /// Load from `path` (which need not exist) and the environment, then
  /// expand a leading `~` in every path.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
    let settings: Settings = config::Config::builder()
      .set_default("data_dir", DEFAULT_DATA_DIR)?
      .set_default("catalog_path", DEFAULT_CATALOG_PATH)?
      .set_default("busy_timeout_ms", DEFAULT_BUSY_TIMEOUT_MS)?
      .add_source(config::File::from(path.as_ref().to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("PLINTH"))
      .build()?
      .try_deserialize()?;
    Ok(settings.expanded())
  }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  fn expanded(self) -> Self {
    Self {
      data_dir: expand_tilde(&self.data_dir),
      catalog_path: expand_tilde(&self.catalog_path),
      seed_dir: self.seed_dir.as_deref().map(expand_tilde),
      ..self
    }
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
