//! Command-line surface of the `copd` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "COPD factor lineage: factors, deductions, conclusions and links")]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "copd.toml")]
  pub config: PathBuf,

  /// SQLite database path; overrides `store_path` from the config.
  #[arg(long, env = "COPD_STORE", value_name = "PATH")]
  pub store: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Record, inspect and delete factors.
  #[command(subcommand)]
  Factor(FactorCommand),

  /// Add and delete deductions.
  #[command(subcommand)]
  Deduction(DeductionCommand),

  /// Add conclusions, change their status and link them to plan artefacts.
  #[command(subcommand)]
  Conclusion(ConclusionCommand),

  /// Print the provenance of a conclusion.
  Trace { conclusion_id: Uuid },

  /// Inspect and delete plan artefacts.
  #[command(subcommand)]
  Artefact(ArtefactCommand),
}

// ─── Factors ─────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum FactorCommand {
  Add(FactorAdd),

  List {
    #[arg(long)]
    plan: Option<Uuid>,
  },

  /// The factor with its deductions, conclusions and links.
  Show { factor_id: Uuid },

  /// Delete the factor and everything derived from it.
  Rm { factor_id: Uuid },
}

#[derive(Args, Debug)]
pub struct FactorAdd {
  #[arg(long)]
  pub plan:        Uuid,
  #[arg(long)]
  pub title:       String,
  /// POL, MIL, ECO, SOC, INF, INFRA, NATENV, LEGAL or OTHER.
  #[arg(long, default_value = "OTHER")]
  pub domain:      String,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub source_ref:  Option<String>,
  #[arg(long)]
  pub confidence:  Option<f64>,
  #[arg(long)]
  pub created_by:  Option<String>,
}

// ─── Deductions ──────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum DeductionCommand {
  Add {
    factor_id:  Uuid,
    #[arg(long)]
    text:       String,
    #[arg(long)]
    confidence: Option<f64>,
  },

  /// Delete the deduction with its conclusions and their links.
  Rm { deduction_id: Uuid },
}

// ─── Conclusions ─────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum ConclusionCommand {
  Add(ConclusionAdd),

  Show { conclusion_id: Uuid },

  /// Move to DRAFT, REVIEWED or APPROVED.
  Status {
    conclusion_id: Uuid,
    status:        String,
  },

  /// Link to an existing artefact (`--target`) or create one (`--payload`).
  Link(ConclusionLink),

  Links { conclusion_id: Uuid },

  Rm { conclusion_id: Uuid },
}

#[derive(Args, Debug)]
pub struct ConclusionAdd {
  pub factor_id: Uuid,
  #[arg(long)]
  pub deduction: Uuid,
  /// TASK, CONSTRAINT, RISK, ASSUMPTION, DC, DP, COG, CCIR, SYNC or INFO.
  #[arg(long = "type")]
  pub kind:      String,
  #[arg(long)]
  pub text:      String,
  #[arg(long)]
  pub priority:  Option<i64>,
  #[arg(long)]
  pub owner:     Option<String>,
}

#[derive(Args, Debug)]
pub struct ConclusionLink {
  pub conclusion_id: Uuid,
  /// Target kind, e.g. `task` or `decision_point`.
  #[arg(long)]
  pub kind:          String,
  #[arg(long)]
  pub target:        Option<Uuid>,
  /// JSON object describing the artefact to create.
  #[arg(long, value_parser = parse_object)]
  pub payload:       Option<Map<String, Value>>,
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
  match serde_json::from_str(raw) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Err("expected a JSON object".to_owned()),
    Err(e) => Err(e.to_string()),
  }
}

// ─── Artefacts ───────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum ArtefactCommand {
  List {
    #[arg(long)]
    plan: Uuid,
    #[arg(long)]
    kind: Option<String>,
  },

  Rm { kind: String, artefact_id: Uuid },
}
