//! [`LineageGraph`] — the Factor → Deduction → Conclusion → Link service.
//!
//! Every rule of the lineage chain is enforced here, on top of any
//! [`LineageStore`]:
//!
//! - a deduction hangs off an existing factor;
//! - a conclusion's deduction belongs to the conclusion's factor;
//! - a conclusion is approved only once it has at least one link;
//! - deleting a node removes all of its descendants in one transaction.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result, autocreate,
  artefact::Artefact,
  cascade::{CascadeDelete, CascadeOutcome},
  conclusion::{
    Conclusion, ConclusionInput, ConclusionLink, ConclusionStatus, ConclusionType,
    LinkInput, NewConclusion,
  },
  factor::{
    Deduction, DeductionInput, Factor, FactorInput, NewDeduction, NewFactor,
    check_confidence, non_blank,
  },
  store::{LineageStore, LinkTarget, NewLink},
  target::{self, TargetKind},
  trace::{self, TraceRecord},
};

/// A factor with everything hanging off it.
#[derive(Debug, Clone, Serialize)]
pub struct FactorDetail {
  pub factor:      Factor,
  pub deductions:  Vec<Deduction>,
  pub conclusions: Vec<Conclusion>,
  pub links:       Vec<ConclusionLink>,
}

pub struct LineageGraph<S> {
  store:        Arc<S>,
  strict_links: bool,
}

impl<S> Clone for LineageGraph<S> {
  fn clone(&self) -> Self {
    Self {
      store:        Arc::clone(&self.store),
      strict_links: self.strict_links,
    }
  }
}

impl<S: LineageStore> LineageGraph<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      strict_links: false,
    }
  }

  /// When set, linking to an explicit `target_id` first checks that the
  /// artefact exists. Off by default: explicit ids are stored as-is.
  pub fn with_strict_links(mut self, strict: bool) -> Self {
    self.strict_links = strict;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn require_factor(&self, id: Uuid) -> Result<Factor> {
    self
      .store
      .get_factor(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::FactorNotFound(id))
  }

  async fn require_deduction(&self, id: Uuid) -> Result<Deduction> {
    self
      .store
      .get_deduction(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::DeductionNotFound(id))
  }

  async fn require_conclusion(&self, id: Uuid) -> Result<Conclusion> {
    self
      .store
      .get_conclusion(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ConclusionNotFound(id))
  }

  async fn require_artefact(&self, kind: TargetKind, id: Uuid) -> Result<Artefact> {
    self
      .store
      .get_artefact(kind, id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ArtefactNotFound { kind, id })
  }

  // ── Factors ───────────────────────────────────────────────────────────────

  pub async fn create_factor(&self, input: FactorInput) -> Result<Factor> {
    let new = NewFactor::try_from(input)?;
    let factor = self.store.add_factor(new).await.map_err(Error::store)?;
    info!(
      factor_id = %factor.factor_id,
      plan_id = %factor.plan_id,
      domain = %factor.domain,
      "factor created"
    );
    Ok(factor)
  }

  pub async fn get_factor(&self, factor_id: Uuid) -> Result<Factor> {
    self.require_factor(factor_id).await
  }

  /// Factors of one plan, or of every plan when `plan_id` is `None`.
  pub async fn list_factors(&self, plan_id: Option<Uuid>) -> Result<Vec<Factor>> {
    self.store.list_factors(plan_id).await.map_err(Error::store)
  }

  pub async fn factor_detail(&self, factor_id: Uuid) -> Result<FactorDetail> {
    let factor = self.require_factor(factor_id).await?;
    let deductions = self
      .store
      .list_deductions(factor_id)
      .await
      .map_err(Error::store)?;

    let mut conclusions = Vec::new();
    for deduction in &deductions {
      conclusions.extend(
        self
          .store
          .list_conclusions(deduction.deduction_id)
          .await
          .map_err(Error::store)?,
      );
    }

    let mut links = Vec::new();
    for conclusion in &conclusions {
      links.extend(
        self
          .store
          .list_links(conclusion.conclusion_id)
          .await
          .map_err(Error::store)?,
      );
    }

    Ok(FactorDetail { factor, deductions, conclusions, links })
  }

  // ── Deductions ────────────────────────────────────────────────────────────

  pub async fn add_deduction(
    &self,
    factor_id: Uuid,
    input: DeductionInput,
  ) -> Result<Deduction> {
    let factor = self.require_factor(factor_id).await?;
    let new = NewDeduction {
      factor_id:  factor.factor_id,
      text:       non_blank("text", input.text)?,
      confidence: check_confidence(input.confidence)?,
    };

    let deduction = self.store.add_deduction(new).await.map_err(Error::store)?;
    info!(
      deduction_id = %deduction.deduction_id,
      factor_id = %deduction.factor_id,
      "deduction added"
    );
    Ok(deduction)
  }

  // ── Conclusions ───────────────────────────────────────────────────────────

  pub async fn get_conclusion(&self, conclusion_id: Uuid) -> Result<Conclusion> {
    self.require_conclusion(conclusion_id).await
  }

  pub async fn add_conclusion(
    &self,
    factor_id: Uuid,
    input: ConclusionInput,
  ) -> Result<Conclusion> {
    let factor = self.require_factor(factor_id).await?;
    let deduction = self.require_deduction(input.deduction_id).await?;
    if deduction.factor_id != factor.factor_id {
      return Err(Error::DeductionMismatch {
        factor_id:    factor.factor_id,
        deduction_id: deduction.deduction_id,
      });
    }

    let new = NewConclusion {
      factor_id:    deduction.factor_id,
      deduction_id: deduction.deduction_id,
      kind:         ConclusionType::parse(&input.kind)?,
      text:         non_blank("text", input.text)?,
      priority:     input.priority,
      owner:        input.owner,
    };

    let conclusion = self.store.add_conclusion(new).await.map_err(Error::store)?;
    info!(
      conclusion_id = %conclusion.conclusion_id,
      deduction_id = %conclusion.deduction_id,
      kind = %conclusion.kind,
      "conclusion added"
    );
    Ok(conclusion)
  }

  pub async fn update_conclusion_status(
    &self,
    conclusion_id: Uuid,
    status: &str,
  ) -> Result<Conclusion> {
    let conclusion = self.require_conclusion(conclusion_id).await?;
    let to = ConclusionStatus::parse(status)?;

    let link_count = if to == ConclusionStatus::Approved {
      self.list_links(conclusion_id).await?.len()
    } else {
      0
    };
    conclusion
      .status
      .check_transition(to, conclusion_id, link_count)?;

    if conclusion.status == to {
      return Ok(conclusion);
    }

    let updated = self
      .store
      .set_conclusion_status(conclusion_id, to)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ConclusionNotFound(conclusion_id))?;
    info!(
      %conclusion_id,
      from = %conclusion.status,
      to = %updated.status,
      "conclusion status changed"
    );
    Ok(updated)
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  pub async fn list_links(&self, conclusion_id: Uuid) -> Result<Vec<ConclusionLink>> {
    self.store.list_links(conclusion_id).await.map_err(Error::store)
  }

  /// Link a conclusion to an existing artefact id, or auto-create the
  /// artefact from `create_payload` and link to that.
  pub async fn link_conclusion(
    &self,
    conclusion_id: Uuid,
    input: LinkInput,
  ) -> Result<ConclusionLink> {
    let conclusion = self.require_conclusion(conclusion_id).await?;
    let entry = target::resolve(&input.target_kind)?;

    let target = match (input.target_id, input.create_payload) {
      (Some(target_id), _) => {
        if self.strict_links {
          self.require_artefact(entry.kind, target_id).await?;
        }
        LinkTarget::Existing(target_id)
      }
      (None, Some(payload)) if !payload.is_empty() => {
        let factor = self.require_factor(conclusion.factor_id).await?;
        LinkTarget::Create(autocreate::prepare(entry, &payload, &conclusion, &factor)?)
      }
      (None, _) => return Err(Error::MissingTarget),
    };

    let (link, created) = self
      .store
      .add_link(NewLink {
        conclusion_id,
        target_kind: entry.kind,
        target,
      })
      .await
      .map_err(Error::store)?;

    if let Some(artefact) = &created {
      info!(
        artefact_id = %artefact.artefact_id,
        kind = %artefact.kind(),
        plan_id = %artefact.plan_id,
        %conclusion_id,
        "artefact auto-created"
      );
    }
    info!(
      link_id = %link.link_id,
      %conclusion_id,
      target_kind = %link.target_kind,
      target_id = %link.target_id,
      "conclusion linked"
    );
    Ok(link)
  }

  // ── Trace ─────────────────────────────────────────────────────────────────

  pub async fn build_trace(&self, conclusion_id: Uuid) -> Result<TraceRecord> {
    trace::build(self.store.as_ref(), conclusion_id).await
  }

  // ── Cascading deletes ─────────────────────────────────────────────────────

  pub async fn delete_factor(&self, factor_id: Uuid) -> Result<CascadeDelete> {
    let factor = self.require_factor(factor_id).await?;
    let mut plan = CascadeDelete {
      factor: Some(factor.factor_id),
      ..Default::default()
    };

    let deductions = self
      .store
      .list_deductions(factor_id)
      .await
      .map_err(Error::store)?;
    for deduction in deductions {
      self.collect_deduction(deduction.deduction_id, &mut plan).await?;
    }

    self.apply(plan).await
  }

  pub async fn delete_deduction(&self, deduction_id: Uuid) -> Result<CascadeDelete> {
    self.require_deduction(deduction_id).await?;
    let mut plan = CascadeDelete::default();
    self.collect_deduction(deduction_id, &mut plan).await?;
    self.apply(plan).await
  }

  pub async fn delete_conclusion(&self, conclusion_id: Uuid) -> Result<CascadeDelete> {
    self.require_conclusion(conclusion_id).await?;
    let mut plan = CascadeDelete::default();
    self.collect_conclusion(conclusion_id, &mut plan).await?;
    self.apply(plan).await
  }

  async fn collect_deduction(
    &self,
    deduction_id: Uuid,
    plan: &mut CascadeDelete,
  ) -> Result<()> {
    let conclusions = self
      .store
      .list_conclusions(deduction_id)
      .await
      .map_err(Error::store)?;
    for conclusion in conclusions {
      self.collect_conclusion(conclusion.conclusion_id, plan).await?;
    }
    plan.deductions.push(deduction_id);
    Ok(())
  }

  async fn collect_conclusion(
    &self,
    conclusion_id: Uuid,
    plan: &mut CascadeDelete,
  ) -> Result<()> {
    let links = self.list_links(conclusion_id).await?;
    plan.links.extend(links.into_iter().map(|l| l.link_id));
    plan.conclusions.push(conclusion_id);
    Ok(())
  }

  async fn apply(&self, plan: CascadeDelete) -> Result<CascadeDelete> {
    debug!(?plan, "applying cascade");
    let outcome = self
      .store
      .delete_cascade(plan.clone())
      .await
      .map_err(Error::store)?;
    if let CascadeOutcome::Missing(node) = outcome {
      warn!(?node, "cascade target already gone, nothing deleted");
      return Err(Error::missing(node));
    }
    info!(
      links = plan.links.len(),
      conclusions = plan.conclusions.len(),
      deductions = plan.deductions.len(),
      factor = ?plan.factor,
      "cascade deleted"
    );
    Ok(plan)
  }
}
