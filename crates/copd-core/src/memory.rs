//! [`MemoryStore`] — an in-process [`LineageStore`] over an arena of rows and
//! explicit parent → children indexes.
//!
//! Every method takes the arena lock once for its whole unit of work, so a
//! cascade is never observable half-applied. Useful for tests and for
//! embedding the graph without a database.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  artefact::{Artefact, NewArtefact},
  cascade::{CascadeDelete, CascadeNode, CascadeOutcome},
  conclusion::{Conclusion, ConclusionLink, ConclusionStatus, NewConclusion},
  factor::{Deduction, Factor, NewDeduction, NewFactor},
  store::{LineageStore, LinkTarget, NewLink},
  target::TargetKind,
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("factor not found: {0}")]
  MissingFactor(Uuid),

  #[error("deduction not found: {0}")]
  MissingDeduction(Uuid),

  #[error("conclusion not found: {0}")]
  MissingConclusion(Uuid),

  /// A cascade would leave a child row pointing at a removed parent.
  #[error("{0} still has children outside the cascade")]
  StillReferenced(Uuid),
}

// ─── Arena ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Arena {
  factors:        HashMap<Uuid, Factor>,
  deductions:     HashMap<Uuid, Deduction>,
  conclusions:    HashMap<Uuid, Conclusion>,
  links:          HashMap<Uuid, ConclusionLink>,
  artefacts:      HashMap<Uuid, Artefact>,
  // Insertion order for the top-level listings.
  factor_order:   Vec<Uuid>,
  artefact_order: Vec<Uuid>,
  // Parent → children, in insertion order.
  factor_deductions:     HashMap<Uuid, Vec<Uuid>>,
  deduction_conclusions: HashMap<Uuid, Vec<Uuid>>,
  conclusion_links:      HashMap<Uuid, Vec<Uuid>>,
}

fn children<'a>(index: &'a HashMap<Uuid, Vec<Uuid>>, parent: &Uuid) -> &'a [Uuid] {
  index.get(parent).map(Vec::as_slice).unwrap_or_default()
}

fn unlink_child(index: &mut HashMap<Uuid, Vec<Uuid>>, parent: &Uuid, child: &Uuid) {
  if let Some(ids) = index.get_mut(parent) {
    ids.retain(|id| id != child);
  }
}

impl Arena {
  fn insert_artefact(&mut self, input: NewArtefact) -> Artefact {
    let artefact = Artefact {
      artefact_id:  Uuid::new_v4(),
      plan_id:      input.plan_id,
      value:        input.value,
      derived_from: input.derived_from,
      created_at:   Utc::now(),
    };
    self.artefact_order.push(artefact.artefact_id);
    self.artefacts.insert(artefact.artefact_id, artefact.clone());
    artefact
  }

  fn contains(&self, node: CascadeNode) -> bool {
    match node {
      CascadeNode::Link(id) => self.links.contains_key(&id),
      CascadeNode::Conclusion(id) => self.conclusions.contains_key(&id),
      CascadeNode::Deduction(id) => self.deductions.contains_key(&id),
      CascadeNode::Factor(id) => self.factors.contains_key(&id),
    }
  }

  /// Every child of a removed parent must itself be removed.
  fn check_cascade(&self, plan: &CascadeDelete) -> Result<(), MemoryError> {
    let links: HashSet<&Uuid> = plan.links.iter().collect();
    let conclusions: HashSet<&Uuid> = plan.conclusions.iter().collect();
    let deductions: HashSet<&Uuid> = plan.deductions.iter().collect();

    for id in &plan.conclusions {
      if !children(&self.conclusion_links, id).iter().all(|c| links.contains(c)) {
        return Err(MemoryError::StillReferenced(*id));
      }
    }
    for id in &plan.deductions {
      if !children(&self.deduction_conclusions, id)
        .iter()
        .all(|c| conclusions.contains(c))
      {
        return Err(MemoryError::StillReferenced(*id));
      }
    }
    match plan.factor {
      Some(id)
        if !children(&self.factor_deductions, &id)
          .iter()
          .all(|c| deductions.contains(c)) =>
      {
        Err(MemoryError::StillReferenced(id))
      }
      _ => Ok(()),
    }
  }

  fn remove(&mut self, node: CascadeNode) {
    match node {
      CascadeNode::Link(id) => {
        if let Some(link) = self.links.remove(&id) {
          unlink_child(&mut self.conclusion_links, &link.conclusion_id, &id);
        }
      }
      CascadeNode::Conclusion(id) => {
        if let Some(c) = self.conclusions.remove(&id) {
          unlink_child(&mut self.deduction_conclusions, &c.deduction_id, &id);
          self.conclusion_links.remove(&id);
        }
      }
      CascadeNode::Deduction(id) => {
        if let Some(d) = self.deductions.remove(&id) {
          unlink_child(&mut self.factor_deductions, &d.factor_id, &id);
          self.deduction_conclusions.remove(&id);
        }
      }
      CascadeNode::Factor(id) => {
        if self.factors.remove(&id).is_some() {
          self.factor_order.retain(|f| *f != id);
          self.factor_deductions.remove(&id);
        }
      }
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Clones share the same arena.
#[derive(Clone, Default)]
pub struct MemoryStore {
  arena: Arc<RwLock<Arena>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl LineageStore for MemoryStore {
  type Error = MemoryError;

  // ── Factors ───────────────────────────────────────────────────────────────

  async fn add_factor(&self, input: NewFactor) -> Result<Factor, MemoryError> {
    let factor = Factor {
      factor_id:   Uuid::new_v4(),
      plan_id:     input.plan_id,
      title:       input.title,
      description: input.description,
      domain:      input.domain,
      source_ref:  input.source_ref,
      confidence:  input.confidence,
      created_by:  input.created_by,
      created_at:  Utc::now(),
    };

    let mut arena = self.arena.write();
    arena.factor_order.push(factor.factor_id);
    arena.factors.insert(factor.factor_id, factor.clone());
    Ok(factor)
  }

  async fn get_factor(&self, id: Uuid) -> Result<Option<Factor>, MemoryError> {
    Ok(self.arena.read().factors.get(&id).cloned())
  }

  async fn list_factors(&self, plan_id: Option<Uuid>) -> Result<Vec<Factor>, MemoryError> {
    let arena = self.arena.read();
    Ok(
      arena
        .factor_order
        .iter()
        .filter_map(|id| arena.factors.get(id))
        .filter(|f| plan_id.is_none_or(|p| f.plan_id == p))
        .cloned()
        .collect(),
    )
  }

  // ── Deductions ────────────────────────────────────────────────────────────

  async fn add_deduction(&self, input: NewDeduction) -> Result<Deduction, MemoryError> {
    let mut arena = self.arena.write();
    if !arena.factors.contains_key(&input.factor_id) {
      return Err(MemoryError::MissingFactor(input.factor_id));
    }

    let deduction = Deduction {
      deduction_id: Uuid::new_v4(),
      factor_id:    input.factor_id,
      text:         input.text,
      confidence:   input.confidence,
      created_at:   Utc::now(),
    };
    arena
      .factor_deductions
      .entry(deduction.factor_id)
      .or_default()
      .push(deduction.deduction_id);
    arena.deductions.insert(deduction.deduction_id, deduction.clone());
    Ok(deduction)
  }

  async fn get_deduction(&self, id: Uuid) -> Result<Option<Deduction>, MemoryError> {
    Ok(self.arena.read().deductions.get(&id).cloned())
  }

  async fn list_deductions(&self, factor_id: Uuid) -> Result<Vec<Deduction>, MemoryError> {
    let arena = self.arena.read();
    Ok(
      children(&arena.factor_deductions, &factor_id)
        .iter()
        .filter_map(|id| arena.deductions.get(id))
        .cloned()
        .collect(),
    )
  }

  // ── Conclusions ───────────────────────────────────────────────────────────

  async fn add_conclusion(&self, input: NewConclusion) -> Result<Conclusion, MemoryError> {
    let mut arena = self.arena.write();
    if !arena.factors.contains_key(&input.factor_id) {
      return Err(MemoryError::MissingFactor(input.factor_id));
    }
    if !arena.deductions.contains_key(&input.deduction_id) {
      return Err(MemoryError::MissingDeduction(input.deduction_id));
    }

    let conclusion = Conclusion {
      conclusion_id: Uuid::new_v4(),
      factor_id:     input.factor_id,
      deduction_id:  input.deduction_id,
      kind:          input.kind,
      text:          input.text,
      priority:      input.priority,
      owner:         input.owner,
      status:        ConclusionStatus::Draft,
      created_at:    Utc::now(),
    };
    arena
      .deduction_conclusions
      .entry(conclusion.deduction_id)
      .or_default()
      .push(conclusion.conclusion_id);
    arena
      .conclusions
      .insert(conclusion.conclusion_id, conclusion.clone());
    Ok(conclusion)
  }

  async fn get_conclusion(&self, id: Uuid) -> Result<Option<Conclusion>, MemoryError> {
    Ok(self.arena.read().conclusions.get(&id).cloned())
  }

  async fn list_conclusions(
    &self,
    deduction_id: Uuid,
  ) -> Result<Vec<Conclusion>, MemoryError> {
    let arena = self.arena.read();
    Ok(
      children(&arena.deduction_conclusions, &deduction_id)
        .iter()
        .filter_map(|id| arena.conclusions.get(id))
        .cloned()
        .collect(),
    )
  }

  async fn set_conclusion_status(
    &self,
    id: Uuid,
    status: ConclusionStatus,
  ) -> Result<Option<Conclusion>, MemoryError> {
    let mut arena = self.arena.write();
    Ok(arena.conclusions.get_mut(&id).map(|c| {
      c.status = status;
      c.clone()
    }))
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn add_link(
    &self,
    input: NewLink,
  ) -> Result<(ConclusionLink, Option<Artefact>), MemoryError> {
    let mut arena = self.arena.write();
    if !arena.conclusions.contains_key(&input.conclusion_id) {
      return Err(MemoryError::MissingConclusion(input.conclusion_id));
    }

    let (target_id, created) = match input.target {
      LinkTarget::Existing(id) => (id, None),
      LinkTarget::Create(new) => {
        let artefact = arena.insert_artefact(new);
        (artefact.artefact_id, Some(artefact))
      }
    };

    let link = ConclusionLink {
      link_id: Uuid::new_v4(),
      conclusion_id: input.conclusion_id,
      target_kind: input.target_kind,
      target_id,
      created_at: Utc::now(),
    };
    arena
      .conclusion_links
      .entry(link.conclusion_id)
      .or_default()
      .push(link.link_id);
    arena.links.insert(link.link_id, link.clone());
    Ok((link, created))
  }

  async fn list_links(&self, conclusion_id: Uuid) -> Result<Vec<ConclusionLink>, MemoryError> {
    let arena = self.arena.read();
    Ok(
      children(&arena.conclusion_links, &conclusion_id)
        .iter()
        .filter_map(|id| arena.links.get(id))
        .cloned()
        .collect(),
    )
  }

  // ── Artefacts ─────────────────────────────────────────────────────────────

  async fn add_artefact(&self, input: NewArtefact) -> Result<Artefact, MemoryError> {
    Ok(self.arena.write().insert_artefact(input))
  }

  async fn get_artefact(
    &self,
    kind: TargetKind,
    id: Uuid,
  ) -> Result<Option<Artefact>, MemoryError> {
    Ok(
      self
        .arena
        .read()
        .artefacts
        .get(&id)
        .filter(|a| a.kind() == kind)
        .cloned(),
    )
  }

  async fn list_artefacts(
    &self,
    plan_id: Uuid,
    kind: Option<TargetKind>,
  ) -> Result<Vec<Artefact>, MemoryError> {
    let arena = self.arena.read();
    Ok(
      arena
        .artefact_order
        .iter()
        .filter_map(|id| arena.artefacts.get(id))
        .filter(|a| a.plan_id == plan_id && kind.is_none_or(|k| a.kind() == k))
        .cloned()
        .collect(),
    )
  }

  async fn delete_artefact(&self, kind: TargetKind, id: Uuid) -> Result<bool, MemoryError> {
    let mut arena = self.arena.write();
    if !arena.artefacts.get(&id).is_some_and(|a| a.kind() == kind) {
      return Ok(false);
    }
    arena.artefacts.remove(&id);
    arena.artefact_order.retain(|a| *a != id);
    Ok(true)
  }

  // ── Cascades ──────────────────────────────────────────────────────────────

  async fn delete_cascade(&self, plan: CascadeDelete) -> Result<CascadeOutcome, MemoryError> {
    let mut arena = self.arena.write();
    let nodes = plan.ordered();
    if let Some(&node) = nodes.iter().find(|node| !arena.contains(**node)) {
      return Ok(CascadeOutcome::Missing(node));
    }
    arena.check_cascade(&plan)?;
    for node in nodes {
      arena.remove(node);
    }
    Ok(CascadeOutcome::Applied)
  }
}
