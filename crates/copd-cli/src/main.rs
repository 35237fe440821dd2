//! `copd` — command-line front end for the COPD lineage store.
//!
//! Reads `copd.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one command against it. Results are printed to stdout as
//! JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```
//! copd factor add --plan <PLAN_ID> --title "Bridge destroyed" --domain INFRA
//! copd conclusion link <CONCLUSION_ID> --kind task --payload '{"name": "Recce"}'
//! copd trace <CONCLUSION_ID>
//! ```

mod cli;
mod commands;
mod settings;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use cli::Cli;
use copd_core::graph::LineageGraph;
use copd_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  match run(Cli::parse()).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      let class = err
        .downcast_ref::<copd_core::Error>()
        .map(copd_core::Error::class);
      tracing::error!(?class, "{err:#}");
      ExitCode::FAILURE
    }
  }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  let settings = Settings::load(&cli.config, cli.store.as_deref())?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  let graph = LineageGraph::new(Arc::new(store)).with_strict_links(settings.strict_links);

  let output = commands::run(&graph, cli.command).await?;
  println!(
    "{}",
    serde_json::to_string_pretty(&output).context("failed to encode output")?
  );
  Ok(())
}
