//! The `LineageStore` trait: the entity store the lineage graph reads from
//! and writes to.
//!
//! Implemented by storage backends (`copd-store-sqlite`, and the in-memory
//! [`crate::memory::MemoryStore`]). The store persists what it is given; the
//! lineage rules live in [`crate::graph::LineageGraph`].

use std::future::Future;

use uuid::Uuid;

use crate::{
  artefact::{Artefact, NewArtefact},
  cascade::{CascadeDelete, CascadeOutcome},
  conclusion::{Conclusion, ConclusionLink, ConclusionStatus, NewConclusion},
  factor::{Deduction, Factor, NewDeduction, NewFactor},
  target::TargetKind,
};

// ─── Link input ──────────────────────────────────────────────────────────────

/// What a new link points at.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
  /// An artefact id supplied by the caller, stored as-is.
  Existing(Uuid),
  /// An artefact to create in the same transaction as the link.
  Create(NewArtefact),
}

/// Input to [`LineageStore::add_link`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
  pub conclusion_id: Uuid,
  pub target_kind:   TargetKind,
  pub target:        LinkTarget,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a lineage store backend.
///
/// Ids and `created_at` timestamps are assigned by the store. Every method is
/// one transactional unit; in particular [`add_link`](Self::add_link) with
/// [`LinkTarget::Create`] and [`delete_cascade`](Self::delete_cascade) either
/// commit entirely or not at all.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait LineageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Factors ───────────────────────────────────────────────────────────

  fn add_factor(
    &self,
    input: NewFactor,
  ) -> impl Future<Output = Result<Factor, Self::Error>> + Send + '_;

  fn get_factor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Factor>, Self::Error>> + Send + '_;

  /// All factors, or only those of `plan_id`, oldest first.
  fn list_factors(
    &self,
    plan_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Factor>, Self::Error>> + Send + '_;

  // ── Deductions ────────────────────────────────────────────────────────

  fn add_deduction(
    &self,
    input: NewDeduction,
  ) -> impl Future<Output = Result<Deduction, Self::Error>> + Send + '_;

  fn get_deduction(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Deduction>, Self::Error>> + Send + '_;

  /// Children of `factor_id`, oldest first.
  fn list_deductions(
    &self,
    factor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Deduction>, Self::Error>> + Send + '_;

  // ── Conclusions ───────────────────────────────────────────────────────

  /// Persist a conclusion in [`ConclusionStatus::Draft`].
  fn add_conclusion(
    &self,
    input: NewConclusion,
  ) -> impl Future<Output = Result<Conclusion, Self::Error>> + Send + '_;

  fn get_conclusion(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Conclusion>, Self::Error>> + Send + '_;

  /// Children of `deduction_id`, oldest first.
  fn list_conclusions(
    &self,
    deduction_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Conclusion>, Self::Error>> + Send + '_;

  /// Overwrite the status. Returns `None` if the conclusion does not exist.
  fn set_conclusion_status(
    &self,
    id: Uuid,
    status: ConclusionStatus,
  ) -> impl Future<Output = Result<Option<Conclusion>, Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Persist a link, creating its artefact first when the target is
  /// [`LinkTarget::Create`]. Returns the created artefact alongside the link.
  fn add_link(
    &self,
    input: NewLink,
  ) -> impl Future<Output = Result<(ConclusionLink, Option<Artefact>), Self::Error>>
  + Send
  + '_;

  /// Children of `conclusion_id`, oldest first.
  fn list_links(
    &self,
    conclusion_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ConclusionLink>, Self::Error>> + Send + '_;

  // ── Artefacts ─────────────────────────────────────────────────────────

  fn add_artefact(
    &self,
    input: NewArtefact,
  ) -> impl Future<Output = Result<Artefact, Self::Error>> + Send + '_;

  /// Returns `None` if no artefact of `kind` has this id.
  fn get_artefact(
    &self,
    kind: TargetKind,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Artefact>, Self::Error>> + Send + '_;

  fn list_artefacts(
    &self,
    plan_id: Uuid,
    kind: Option<TargetKind>,
  ) -> impl Future<Output = Result<Vec<Artefact>, Self::Error>> + Send + '_;

  /// Remove an artefact. Links pointing at it are left in place. Returns
  /// `false` if nothing was deleted.
  fn delete_artefact(
    &self,
    kind: TargetKind,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Cascades ──────────────────────────────────────────────────────────

  /// Remove every row named in `plan`, in [`CascadeDelete::ordered`] order,
  /// atomically. Fails without deleting anything if a row outside the plan
  /// still references one being removed.
  ///
  /// Returns [`CascadeOutcome::Missing`] with the first named row that no
  /// longer exists, e.g. because a concurrent delete got there first. Nothing
  /// is removed in that case either.
  fn delete_cascade(
    &self,
    plan: CascadeDelete,
  ) -> impl Future<Output = Result<CascadeOutcome, Self::Error>> + Send + '_;
}
