//! Provenance records for a single conclusion.
//!
//! A trace walks backward from the conclusion to its deduction and factor, and
//! forward through its links to the artefacts they name. A link whose artefact
//! no longer exists still appears, with a placeholder summary.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
  Error, Result,
  conclusion::{Conclusion, ConclusionLink},
  factor::{Deduction, Factor, FactorDomain},
  store::LineageStore,
  target::TargetKind,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSummary {
  pub factor_id: Uuid,
  pub title:     String,
  pub domain:    FactorDomain,
}

impl From<&Factor> for FactorSummary {
  fn from(f: &Factor) -> Self {
    Self {
      factor_id: f.factor_id,
      title:     f.title.clone(),
      domain:    f.domain,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionSummary {
  pub deduction_id: Uuid,
  pub text:         String,
}

impl From<&Deduction> for DeductionSummary {
  fn from(d: &Deduction) -> Self {
    Self {
      deduction_id: d.deduction_id,
      text:         d.text.clone(),
    }
  }
}

/// One link of the traced conclusion, resolved against the artefact store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedEntity {
  pub link_id:     Uuid,
  pub target_kind: TargetKind,
  pub target_id:   Uuid,
  pub summary:     String,
  /// `false` when the link dangles and `summary` is a placeholder.
  pub found:       bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
  pub conclusion:      Conclusion,
  pub factor:          FactorSummary,
  pub deduction:       DeductionSummary,
  pub linked_entities: Vec<LinkedEntity>,
}

/// Summary used for a link whose artefact cannot be found.
pub fn missing_summary(kind: TargetKind, id: Uuid) -> String {
  format!("[missing {kind} {id}]")
}

pub(crate) async fn build<S: LineageStore>(
  store: &S,
  conclusion_id: Uuid,
) -> Result<TraceRecord> {
  let conclusion = store
    .get_conclusion(conclusion_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ConclusionNotFound(conclusion_id))?;

  let deduction = store
    .get_deduction(conclusion.deduction_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::DeductionNotFound(conclusion.deduction_id))?;

  let factor = store
    .get_factor(conclusion.factor_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::FactorNotFound(conclusion.factor_id))?;

  let links = store
    .list_links(conclusion_id)
    .await
    .map_err(Error::store)?;

  let mut linked_entities = Vec::with_capacity(links.len());
  for link in links {
    linked_entities.push(resolve_link(store, link).await?);
  }

  Ok(TraceRecord {
    factor: FactorSummary::from(&factor),
    deduction: DeductionSummary::from(&deduction),
    conclusion,
    linked_entities,
  })
}

async fn resolve_link<S: LineageStore>(
  store: &S,
  link: ConclusionLink,
) -> Result<LinkedEntity> {
  let artefact = store
    .get_artefact(link.target_kind, link.target_id)
    .await
    .map_err(Error::store)?;

  let summary = artefact
    .as_ref()
    .and_then(|a| link.target_kind.entry().summarize(&a.value));

  let (summary, found) = match summary {
    Some(summary) => (summary, true),
    None => {
      warn!(
        link_id = %link.link_id,
        target_kind = %link.target_kind,
        target_id = %link.target_id,
        "dangling conclusion link"
      );
      (missing_summary(link.target_kind, link.target_id), false)
    }
  };

  Ok(LinkedEntity {
    link_id: link.link_id,
    target_kind: link.target_kind,
    target_id: link.target_id,
    summary,
    found,
  })
}
