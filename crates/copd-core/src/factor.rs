//! Factors and deductions: the observation end of the lineage chain.
//!
//! A factor is a raw planning observation classified by domain. Each deduction
//! is a "so what" statement derived from exactly one factor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Domain ──────────────────────────────────────────────────────────────────

/// PMESII-style classification of a factor. Canonical tags are uppercase;
/// parsing accepts any casing and the long-form names.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive)]
pub enum FactorDomain {
  #[strum(to_string = "POL", serialize = "POLITICAL")]
  Pol,
  #[strum(to_string = "MIL", serialize = "MILITARY")]
  Mil,
  #[strum(to_string = "ECO", serialize = "ECONOMIC")]
  Eco,
  #[strum(to_string = "SOC", serialize = "SOCIAL")]
  Soc,
  #[strum(to_string = "INF", serialize = "INFORMATION")]
  Inf,
  #[strum(to_string = "INFRA", serialize = "INFRASTRUCTURE")]
  Infra,
  #[strum(to_string = "NATENV", serialize = "ENVIRONMENT")]
  Natenv,
  #[strum(to_string = "LEGAL")]
  Legal,
  #[default]
  #[strum(to_string = "OTHER")]
  Other,
}

impl FactorDomain {
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse()
      .map_err(|_| Error::InvalidDomain(raw.to_owned()))
  }
}

// ─── Field checks ────────────────────────────────────────────────────────────

/// Reject confidences outside `[0, 1]`, including NaN.
pub(crate) fn check_confidence(confidence: Option<f64>) -> Result<Option<f64>> {
  match confidence {
    Some(c) if !(0.0..=1.0).contains(&c) => Err(Error::InvalidConfidence(c)),
    other => Ok(other),
  }
}

/// Trim `value` and reject it if nothing is left.
pub(crate) fn non_blank(field: &'static str, value: String) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::BlankField(field));
  }
  Ok(trimmed.to_owned())
}

// ─── Factor ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
  pub factor_id:   Uuid,
  /// Owning plan; plans themselves live outside this crate.
  pub plan_id:     Uuid,
  pub title:       String,
  pub description: Option<String>,
  pub domain:      FactorDomain,
  /// Free-text reference to the originating report, e.g. an INTSUM number.
  pub source_ref:  Option<String>,
  pub confidence:  Option<f64>,
  pub created_by:  Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Validated input to [`crate::store::LineageStore::add_factor`].
/// `factor_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewFactor {
  pub plan_id:     Uuid,
  pub title:       String,
  pub description: Option<String>,
  pub domain:      FactorDomain,
  pub source_ref:  Option<String>,
  pub confidence:  Option<f64>,
  pub created_by:  Option<String>,
}

impl NewFactor {
  pub fn new(plan_id: Uuid, title: impl Into<String>, domain: FactorDomain) -> Self {
    Self {
      plan_id,
      title: title.into(),
      description: None,
      domain,
      source_ref: None,
      confidence: None,
      created_by: None,
    }
  }
}

/// Unvalidated factor input as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct FactorInput {
  pub plan_id:     Uuid,
  pub title:       String,
  pub description: Option<String>,
  #[serde(default = "default_domain")]
  pub domain:      String,
  pub source_ref:  Option<String>,
  pub confidence:  Option<f64>,
  pub created_by:  Option<String>,
}

fn default_domain() -> String { FactorDomain::Other.to_string() }

impl TryFrom<FactorInput> for NewFactor {
  type Error = Error;

  fn try_from(input: FactorInput) -> Result<Self> {
    Ok(NewFactor {
      plan_id:     input.plan_id,
      title:       non_blank("title", input.title)?,
      description: input.description,
      domain:      FactorDomain::parse(&input.domain)?,
      source_ref:  input.source_ref,
      confidence:  check_confidence(input.confidence)?,
      created_by:  input.created_by,
    })
  }
}

// ─── Deduction ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduction {
  pub deduction_id: Uuid,
  pub factor_id:    Uuid,
  pub text:         String,
  pub confidence:   Option<f64>,
  pub created_at:   DateTime<Utc>,
}

/// Validated input to [`crate::store::LineageStore::add_deduction`].
#[derive(Debug, Clone)]
pub struct NewDeduction {
  pub factor_id:  Uuid,
  pub text:       String,
  pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeductionInput {
  pub text:       String,
  pub confidence: Option<f64>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
