//! Plan artefacts a conclusion can link to or create.
//!
//! Artefacts belong to a plan, not to the lineage graph. The only lineage
//! information they carry is `derived_from`: the conclusions that caused them
//! to be auto-created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{
  Result,
  payload::Payload,
  target::{TargetArtefact, TargetKind},
};

// ─── Enumerated fields ───────────────────────────────────────────────────────

/// How a task entered the plan.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaskCategory {
  #[default]
  Assigned,
  Implied,
  Essential,
}

/// Commander's critical information requirement category.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
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
pub enum CcirKind {
  /// Priority intelligence requirement.
  #[default]
  Pir,
  /// Essential element of friendly information.
  Eefi,
  /// Friendly force information requirement.
  Ffir,
}

/// Centre-of-gravity analysis element.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CogType {
  CriticalCapability,
  CriticalRequirement,
  CriticalVulnerability,
}

// ─── Artefact shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskValue {
  pub name:              String,
  pub description:       Option<String>,
  pub category:          TaskCategory,
  pub force_orientation: Option<String>,
  pub service:           Option<String>,
  pub priority:          Option<i64>,
  pub phase_id:          Option<Uuid>,
  pub parent_id:         Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintValue {
  pub text:                  String,
  pub source:                Option<String>,
  pub scope:                 Option<String>,
  pub enforced_in_validator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskValue {
  pub title:       String,
  pub severity:    Option<String>,
  pub probability: Option<String>,
  pub mitigation:  Option<String>,
  pub owner:       Option<String>,
  pub phase_id:    Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionValue {
  pub text:               String,
  pub to_be_validated_by: Option<String>,
  pub validity_window:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisiveConditionValue {
  pub name:             String,
  pub description:      Option<String>,
  pub success_criteria: Option<String>,
  /// Measure of effectiveness.
  pub moe:              Option<String>,
  /// Measure of performance.
  pub mop:              Option<String>,
  pub related_effects:  Option<String>,
  pub phase_id:         Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPointValue {
  pub name:             String,
  pub description:      Option<String>,
  /// Time-based trigger, e.g. "D+3".
  pub trigger_time:     Option<String>,
  pub trigger_event:    Option<String>,
  /// Geospatial trigger expression.
  pub trigger_geo:      Option<String>,
  pub location_area_id: Option<Uuid>,
  pub branches_sequels: Option<String>,
  pub phase_id:         Option<Uuid>,
  pub coa_id:           Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CogItemValue {
  /// Friendly, enemy or neutral actor the analysis concerns.
  pub actor_name:     String,
  pub cog_type:       CogType,
  pub description:    String,
  pub analysis_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcirValue {
  pub kind:          CcirKind,
  pub text:          String,
  pub linked_rfi_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRowValue {
  pub text:     String,
  pub phase_id: Option<Uuid>,
  pub lane:     Option<String>,
  pub link_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRequirementValue {
  pub name:        String,
  pub description: Option<String>,
}

// ─── ArtefactValue ───────────────────────────────────────────────────────────

/// The typed body of an artefact. The variant name is the target-kind tag
/// stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ArtefactValue {
  Task(TaskValue),
  Constraint(ConstraintValue),
  Risk(RiskValue),
  Assumption(AssumptionValue),
  DecisiveCondition(DecisiveConditionValue),
  DecisionPoint(DecisionPointValue),
  CogItem(CogItemValue),
  Ccir(CcirValue),
  Sync(SyncRowValue),
  InfoReq(InfoRequirementValue),
}

impl ArtefactValue {
  pub fn target_kind(&self) -> TargetKind {
    match self {
      Self::Task(_) => TargetKind::Task,
      Self::Constraint(_) => TargetKind::Constraint,
      Self::Risk(_) => TargetKind::Risk,
      Self::Assumption(_) => TargetKind::Assumption,
      Self::DecisiveCondition(_) => TargetKind::DecisiveCondition,
      Self::DecisionPoint(_) => TargetKind::DecisionPoint,
      Self::CogItem(_) => TargetKind::CogItem,
      Self::Ccir(_) => TargetKind::Ccir,
      Self::Sync(_) => TargetKind::Sync,
      Self::InfoReq(_) => TargetKind::InfoReq,
    }
  }

  /// The short human-readable label shown in traces.
  pub fn summary(&self) -> String {
    self
      .target_kind()
      .entry()
      .summarize(self)
      .unwrap_or_default()
  }

  /// Serialise the inner payload (without the kind tag) for the `value_json`
  /// column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from the kind tag and JSON payload stored in the database.
  pub fn from_parts(kind: TargetKind, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_ref(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Artefact ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artefact {
  pub artefact_id:  Uuid,
  pub plan_id:      Uuid,
  pub value:        ArtefactValue,
  /// Conclusions this artefact was auto-created from, in order. Empty for
  /// artefacts created directly. Never changes after creation.
  pub derived_from: Vec<Uuid>,
  pub created_at:   DateTime<Utc>,
}

impl Artefact {
  pub fn kind(&self) -> TargetKind { self.value.target_kind() }
}

/// Input to [`crate::store::LineageStore::add_artefact`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtefact {
  pub plan_id:      Uuid,
  pub value:        ArtefactValue,
  pub derived_from: Vec<Uuid>,
}

// ─── Registry capabilities ───────────────────────────────────────────────────

/// Expands to the kind constant and the `ArtefactValue` plumbing for a shape.
macro_rules! artefact_variant {
  ($variant:ident) => {
    const KIND: TargetKind = TargetKind::$variant;

    fn into_value(self) -> ArtefactValue { ArtefactValue::$variant(self) }

    fn from_value(value: &ArtefactValue) -> Option<&Self> {
      match value {
        ArtefactValue::$variant(v) => Some(v),
        _ => None,
      }
    }
  };
}

impl TargetArtefact for TaskValue {
  artefact_variant!(Task);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      name:              p.required_str("name")?,
      description:       p.optional_str("description")?,
      category:          p.enum_or("category", TaskCategory::default())?,
      force_orientation: p.optional_str("force_orientation")?,
      service:           p.optional_str("service")?,
      priority:          p.optional_int("priority")?,
      phase_id:          p.optional_id("phase_id")?,
      parent_id:         p.optional_id("parent_id")?,
    })
  }

  fn summary(&self) -> String { self.name.clone() }
}

impl TargetArtefact for ConstraintValue {
  artefact_variant!(Constraint);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      text:                  p.required_str("text")?,
      source:                p.optional_str("source")?,
      scope:                 p.optional_str("scope")?,
      enforced_in_validator: p.bool_or("enforced_in_validator", false)?,
    })
  }

  fn summary(&self) -> String { self.text.clone() }
}

impl TargetArtefact for RiskValue {
  artefact_variant!(Risk);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      title:       p.required_str("title")?,
      severity:    p.optional_str("severity")?,
      probability: p.optional_str("probability")?,
      mitigation:  p.optional_str("mitigation")?,
      owner:       p.optional_str("owner")?,
      phase_id:    p.optional_id("phase_id")?,
    })
  }

  fn summary(&self) -> String { self.title.clone() }
}

impl TargetArtefact for AssumptionValue {
  artefact_variant!(Assumption);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      text:               p.required_str("text")?,
      to_be_validated_by: p.optional_str("to_be_validated_by")?,
      validity_window:    p.optional_str("validity_window")?,
    })
  }

  fn summary(&self) -> String { self.text.clone() }
}

impl TargetArtefact for DecisiveConditionValue {
  artefact_variant!(DecisiveCondition);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      name:             p.required_str("name")?,
      description:      p.optional_str("description")?,
      success_criteria: p.optional_str("success_criteria")?,
      moe:              p.optional_str("moe")?,
      mop:              p.optional_str("mop")?,
      related_effects:  p.optional_str("related_effects")?,
      phase_id:         p.optional_id("phase_id")?,
    })
  }

  fn summary(&self) -> String { self.name.clone() }
}

impl TargetArtefact for DecisionPointValue {
  artefact_variant!(DecisionPoint);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      name:             p.required_str("name")?,
      description:      p.optional_str("description")?,
      trigger_time:     p.optional_str("trigger_time")?,
      trigger_event:    p.optional_str("trigger_event")?,
      trigger_geo:      p.optional_str("trigger_geo")?,
      location_area_id: p.optional_id("location_area_id")?,
      branches_sequels: p.optional_str("branches_sequels")?,
      phase_id:         p.optional_id("phase_id")?,
      coa_id:           p.optional_id("coa_id")?,
    })
  }

  fn summary(&self) -> String { self.name.clone() }
}

impl TargetArtefact for CogItemValue {
  artefact_variant!(CogItem);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      actor_name:     p.required_str("actor_name")?,
      cog_type:       p.required_enum("cog_type")?,
      description:    p.required_str("description")?,
      analysis_notes: p.optional_str("analysis_notes")?,
    })
  }

  /// `"{actor}: {cog_type} - {description, cut at 50 chars}"`.
  fn summary(&self) -> String {
    let excerpt: String = self.description.chars().take(50).collect();
    format!("{}: {} - {}", self.actor_name, self.cog_type, excerpt)
  }
}

impl TargetArtefact for CcirValue {
  artefact_variant!(Ccir);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      kind:          p.enum_or("kind", CcirKind::default())?,
      text:          p.required_str("text")?,
      linked_rfi_id: p.optional_id("linked_rfi_id")?,
    })
  }

  fn summary(&self) -> String { self.text.clone() }
}

impl TargetArtefact for SyncRowValue {
  artefact_variant!(Sync);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      text:     p.required_str("text")?,
      phase_id: p.optional_id("phase_id")?,
      lane:     p.optional_str("lane")?,
      link_ref: p.optional_str("link_ref")?,
    })
  }

  fn summary(&self) -> String { self.text.clone() }
}

impl TargetArtefact for InfoRequirementValue {
  artefact_variant!(InfoReq);

  fn from_payload(p: &Payload<'_>) -> Result<Self> {
    Ok(Self {
      name:        p.required_str("name")?,
      description: p.optional_str("description")?,
    })
  }

  fn summary(&self) -> String { self.name.clone() }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
