//! Error types for `copd-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{cascade::CascadeNode, conclusion::ConclusionStatus, target::TargetKind};

#[derive(Debug, Error)]
pub enum Error {
  // ── Not found ─────────────────────────────────────────────────────────
  #[error("factor not found: {0}")]
  FactorNotFound(Uuid),

  #[error("deduction not found: {0}")]
  DeductionNotFound(Uuid),

  #[error("conclusion not found: {0}")]
  ConclusionNotFound(Uuid),

  #[error("link not found: {0}")]
  LinkNotFound(Uuid),

  #[error("{kind} not found: {id}")]
  ArtefactNotFound { kind: TargetKind, id: Uuid },

  // ── Validation ────────────────────────────────────────────────────────
  #[error("unknown factor domain: {0:?}")]
  InvalidDomain(String),

  #[error("confidence {0} is outside [0, 1]")]
  InvalidConfidence(f64),

  #[error("unknown conclusion type: {0:?}")]
  InvalidConclusionType(String),

  #[error("unknown conclusion status: {0:?}")]
  InvalidConclusionStatus(String),

  #[error("unknown target kind: {0:?}")]
  UnknownTargetKind(String),

  #[error("invalid payload field `{field}`: {reason}")]
  InvalidPayload { field: String, reason: String },

  #[error("{0} must not be blank")]
  BlankField(&'static str),

  #[error("auto-creation is not supported for {0}")]
  UnsupportedAutoCreate(TargetKind),

  // ── Invariant violations ──────────────────────────────────────────────
  #[error("deduction {deduction_id} does not belong to factor {factor_id}")]
  DeductionMismatch { factor_id: Uuid, deduction_id: Uuid },

  #[error("conclusion {0} cannot be approved without at least one link")]
  ApprovalRequiresLink(Uuid),

  #[error("conclusion status cannot move from {from} to {to}")]
  InvalidTransition {
    from: ConclusionStatus,
    to:   ConclusionStatus,
  },

  #[error("a link needs either a target id or a non-empty create payload")]
  MissingTarget,

  // ── Collaborators ─────────────────────────────────────────────────────
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  NotFound,
  Validation,
  InvariantViolation,
  Store,
}

impl Error {
  /// Box a store backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// The not-found error for a row a cascade expected to remove.
  pub fn missing(node: CascadeNode) -> Self {
    match node {
      CascadeNode::Link(id) => Self::LinkNotFound(id),
      CascadeNode::Conclusion(id) => Self::ConclusionNotFound(id),
      CascadeNode::Deduction(id) => Self::DeductionNotFound(id),
      CascadeNode::Factor(id) => Self::FactorNotFound(id),
    }
  }

  pub fn class(&self) -> ErrorClass {
    match self {
      Self::FactorNotFound(_)
      | Self::DeductionNotFound(_)
      | Self::ConclusionNotFound(_)
      | Self::LinkNotFound(_)
      | Self::ArtefactNotFound { .. } => ErrorClass::NotFound,

      Self::InvalidDomain(_)
      | Self::InvalidConfidence(_)
      | Self::InvalidConclusionType(_)
      | Self::InvalidConclusionStatus(_)
      | Self::UnknownTargetKind(_)
      | Self::InvalidPayload { .. }
      | Self::BlankField(_)
      | Self::UnsupportedAutoCreate(_) => ErrorClass::Validation,

      Self::DeductionMismatch { .. }
      | Self::ApprovalRequiresLink(_)
      | Self::InvalidTransition { .. }
      | Self::MissingTarget => ErrorClass::InvariantViolation,

      Self::Store(_) | Self::Serialization(_) => ErrorClass::Store,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
