//! Conclusions, their review lifecycle, and the links that tie them to plan
//! artefacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, target::TargetKind};

// ─── Type ────────────────────────────────────────────────────────────────────

/// What kind of recommendation a conclusion makes.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ConclusionType {
  Task,
  Constraint,
  Risk,
  Assumption,
  /// Decisive condition.
  #[strum(to_string = "DC", serialize = "DECISIVE_CONDITION")]
  Dc,
  /// Decision point.
  #[strum(to_string = "DP", serialize = "DECISION_POINT")]
  Dp,
  /// Centre of gravity.
  Cog,
  Ccir,
  Sync,
  Info,
}

impl ConclusionType {
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse()
      .map_err(|_| Error::InvalidConclusionType(raw.to_owned()))
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Review state of a conclusion. `Approved` is terminal.
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
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ConclusionStatus {
  #[default]
  Draft,
  Reviewed,
  Approved,
}

impl ConclusionStatus {
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse()
      .map_err(|_| Error::InvalidConclusionStatus(raw.to_owned()))
  }

  pub fn is_terminal(self) -> bool { matches!(self, Self::Approved) }

  /// Check the edge `self -> to` for a conclusion carrying `link_count` links.
  ///
  /// Re-applying the current status is always accepted. The approval edge is
  /// the only guarded one.
  pub fn check_transition(
    self,
    to: Self,
    conclusion_id: Uuid,
    link_count: usize,
  ) -> Result<()> {
    use ConclusionStatus::*;

    match (self, to) {
      (from, to) if from == to => Ok(()),
      (Approved, to) => Err(Error::InvalidTransition { from: Approved, to }),
      (_, Reviewed) => Ok(()),
      (_, Approved) if link_count == 0 => {
        Err(Error::ApprovalRequiresLink(conclusion_id))
      }
      (_, Approved) => Ok(()),
      (from, Draft) => Err(Error::InvalidTransition { from, to: Draft }),
    }
  }
}

// ─── Conclusion ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conclusion {
  pub conclusion_id: Uuid,
  /// Always equal to the parent deduction's `factor_id`.
  pub factor_id:     Uuid,
  pub deduction_id:  Uuid,
  #[serde(rename = "type")]
  pub kind:          ConclusionType,
  pub text:          String,
  pub priority:      Option<i64>,
  pub owner:         Option<String>,
  pub status:        ConclusionStatus,
  pub created_at:    DateTime<Utc>,
}

/// Validated input to [`crate::store::LineageStore::add_conclusion`]. New
/// conclusions always start in [`ConclusionStatus::Draft`].
#[derive(Debug, Clone)]
pub struct NewConclusion {
  pub factor_id:    Uuid,
  pub deduction_id: Uuid,
  pub kind:         ConclusionType,
  pub text:         String,
  pub priority:     Option<i64>,
  pub owner:        Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConclusionInput {
  pub deduction_id: Uuid,
  #[serde(rename = "type")]
  pub kind:         String,
  pub text:         String,
  pub priority:     Option<i64>,
  pub owner:        Option<String>,
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// A non-owning edge from a conclusion to a plan artefact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConclusionLink {
  pub link_id:       Uuid,
  pub conclusion_id: Uuid,
  pub target_kind:   TargetKind,
  /// Not checked against the artefact table; may dangle.
  pub target_id:     Uuid,
  pub created_at:    DateTime<Utc>,
}

/// Unvalidated link request. `target_id` wins when both it and
/// `create_payload` are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkInput {
  pub target_kind:    String,
  pub target_id:      Option<Uuid>,
  pub create_payload: Option<serde_json::Map<String, serde_json::Value>>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
