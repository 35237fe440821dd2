//! Runtime configuration: an optional TOML file layered under `COPD_*`
//! environment variables, with `--store` taking precedence over both.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:   PathBuf,
  /// Check that an explicit link target exists before storing the link.
  #[serde(default)]
  pub strict_links: bool,
}

fn default_store_path() -> PathBuf { PathBuf::from("copd.db") }

impl Settings {
  pub fn load(config: &Path, store: Option<&Path>) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(config).required(false))
      .add_source(config::Environment::with_prefix("COPD"))
      .set_override_option(
        "store_path",
        store.map(|p| p.to_string_lossy().into_owned()),
      )
      .context("failed to apply --store override")?
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/copd.toml"), None).unwrap();
    assert!(!settings.strict_links);
  }

  #[test]
  fn store_flag_overrides_config() {
    let settings = Settings::load(
      Path::new("/nonexistent/copd.toml"),
      Some(Path::new("/var/lib/copd/plan.db")),
    )
    .unwrap();
    assert_eq!(settings.store_path, PathBuf::from("/var/lib/copd/plan.db"));
  }

  #[test]
  fn absolute_paths_are_untouched() {
    assert_eq!(expand_tilde(Path::new("/srv/copd.db")), PathBuf::from("/srv/copd.db"));
    assert_eq!(expand_tilde(Path::new("copd.db")), PathBuf::from("copd.db"));
  }
}
