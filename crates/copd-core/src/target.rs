//! The target registry: one row per artefact kind a conclusion can link to.
//!
//! Nothing outside this module branches on the set of target kinds. Callers
//! resolve a tag to a [`TargetEntry`] and use its capabilities to validate a
//! payload, construct an artefact, or summarise one for a trace.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  artefact::{
    ArtefactValue, AssumptionValue, CcirValue, CogItemValue, ConstraintValue,
    DecisionPointValue, DecisiveConditionValue, InfoRequirementValue,
    NewArtefact, RiskValue, SyncRowValue, TaskValue,
  },
  payload::Payload,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Declaration order must match [`REGISTRY`].
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TargetKind {
  Task,
  Constraint,
  Risk,
  Assumption,
  DecisiveCondition,
  DecisionPoint,
  CogItem,
  Ccir,
  Sync,
  InfoReq,
}

impl TargetKind {
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse()
      .map_err(|_| Error::UnknownTargetKind(raw.to_owned()))
  }

  pub fn entry(self) -> &'static TargetEntry { &REGISTRY[self as usize] }
}

// ─── Capabilities ────────────────────────────────────────────────────────────

/// Implemented by every artefact shape that can appear in the registry.
pub trait TargetArtefact: Sized {
  const KIND: TargetKind;

  /// Validate and coerce a raw payload into this shape.
  fn from_payload(payload: &Payload<'_>) -> Result<Self>;

  fn summary(&self) -> String;

  fn into_value(self) -> ArtefactValue;

  fn from_value(value: &ArtefactValue) -> Option<&Self>;
}

pub type ValidateFn = fn(&Payload<'_>) -> Result<ArtefactValue>;
pub type SummarizeFn = fn(&ArtefactValue) -> Option<String>;

/// One registry row.
#[derive(Debug)]
pub struct TargetEntry {
  pub kind:    TargetKind,
  /// `None` for kinds that can only be linked by id.
  auto_create: Option<ValidateFn>,
  summarize:   SummarizeFn,
}

impl TargetEntry {
  pub fn supports_auto_create(&self) -> bool { self.auto_create.is_some() }

  /// Validate `payload` against this kind's required and optional fields.
  pub fn validate(&self, payload: &Payload<'_>) -> Result<ArtefactValue> {
    let validate = self
      .auto_create
      .ok_or(Error::UnsupportedAutoCreate(self.kind))?;
    validate(payload)
  }

  /// Build a plan-scoped artefact with its provenance stamped.
  pub fn construct(
    &self,
    plan_id: Uuid,
    value: ArtefactValue,
    derived_from: Vec<Uuid>,
  ) -> NewArtefact {
    NewArtefact { plan_id, value, derived_from }
  }

  /// `None` if `value` is not of this entry's kind.
  pub fn summarize(&self, value: &ArtefactValue) -> Option<String> {
    (self.summarize)(value)
  }
}

fn validate_as<T: TargetArtefact>(payload: &Payload<'_>) -> Result<ArtefactValue> {
  T::from_payload(payload).map(T::into_value)
}

fn summarize_as<T: TargetArtefact>(value: &ArtefactValue) -> Option<String> {
  T::from_value(value).map(T::summary)
}

const fn entry<T: TargetArtefact>() -> TargetEntry {
  TargetEntry {
    kind:        T::KIND,
    auto_create: Some(validate_as::<T>),
    summarize:   summarize_as::<T>,
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

static REGISTRY: [TargetEntry; 10] = [
  entry::<TaskValue>(),
  entry::<ConstraintValue>(),
  entry::<RiskValue>(),
  entry::<AssumptionValue>(),
  entry::<DecisiveConditionValue>(),
  entry::<DecisionPointValue>(),
  entry::<CogItemValue>(),
  entry::<CcirValue>(),
  entry::<SyncRowValue>(),
  entry::<InfoRequirementValue>(),
];

/// Look up a target-kind tag in any casing.
pub fn resolve(tag: &str) -> Result<&'static TargetEntry> {
  TargetKind::parse(tag).map(TargetKind::entry)
}

pub fn registry() -> &'static [TargetEntry] { &REGISTRY }

// ─── Tests ───────────────────────────────────────────────────────────────────
