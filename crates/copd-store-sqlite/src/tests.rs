//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use copd_core::{
  ErrorClass,
  artefact::{ArtefactValue, CcirKind, CcirValue, NewArtefact, RiskValue},
  cascade::{CascadeDelete, CascadeNode, CascadeOutcome},
  conclusion::{ConclusionInput, ConclusionStatus, ConclusionType, LinkInput, NewConclusion},
  factor::{DeductionInput, FactorDomain, FactorInput, NewDeduction, NewFactor},
  graph::LineageGraph,
  store::{LineageStore, LinkTarget, NewLink},
  target::TargetKind,
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn risk(title: &str) -> ArtefactValue {
  ArtefactValue::Risk(RiskValue {
    title:       title.into(),
    severity:    Some("HIGH".into()),
    probability: None,
    mitigation:  None,
    owner:       None,
    phase_id:    None,
  })
}

/// Factor, deduction and conclusion rows written directly to the store.
async fn seed(s: &SqliteStore) -> (Uuid, Uuid, Uuid) {
  let mut new = NewFactor::new(Uuid::new_v4(), "Bridge at grid 1234 destroyed", FactorDomain::Infra);
  new.confidence = Some(0.7);
  let factor = s.add_factor(new).await.unwrap();

  let deduction = s
    .add_deduction(NewDeduction {
      factor_id:  factor.factor_id,
      text:       "Northern crossing unavailable".into(),
      confidence: Some(0.9),
    })
    .await
    .unwrap();

  let conclusion = s
    .add_conclusion(NewConclusion {
      factor_id:    factor.factor_id,
      deduction_id: deduction.deduction_id,
      kind:         ConclusionType::Dc,
      text:         "Secure the southern crossing".into(),
      priority:     Some(2),
      owner:        Some("S3".into()),
    })
    .await
    .unwrap();

  (factor.factor_id, deduction.deduction_id, conclusion.conclusion_id)
}

// ─── Factors ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_factor() {
  let s = store().await;
  let mut new = NewFactor::new(Uuid::new_v4(), "Fuel shortage", FactorDomain::Eco);
  new.source_ref = Some("LOGREP-12".into());
  new.confidence = Some(0.4);

  let factor = s.add_factor(new).await.unwrap();
  let fetched = s.get_factor(factor.factor_id).await.unwrap().unwrap();

  assert_eq!(fetched.factor_id, factor.factor_id);
  assert_eq!(fetched.domain, FactorDomain::Eco);
  assert_eq!(fetched.source_ref.as_deref(), Some("LOGREP-12"));
  assert_eq!(fetched.confidence, Some(0.4));
  assert_eq!(fetched.created_at, factor.created_at);
}

#[tokio::test]
async fn get_factor_missing_returns_none() {
  let s = store().await;
  assert!(s.get_factor(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_factors_by_plan_in_insertion_order() {
  let s = store().await;
  let plan = Uuid::new_v4();
  let first = s
    .add_factor(NewFactor::new(plan, "First", FactorDomain::Pol))
    .await
    .unwrap();
  s.add_factor(NewFactor::new(Uuid::new_v4(), "Elsewhere", FactorDomain::Soc))
    .await
    .unwrap();
  let second = s
    .add_factor(NewFactor::new(plan, "Second", FactorDomain::Legal))
    .await
    .unwrap();

  let mine = s.list_factors(Some(plan)).await.unwrap();
  let ids: Vec<_> = mine.iter().map(|f| f.factor_id).collect();
  assert_eq!(ids, vec![first.factor_id, second.factor_id]);

  assert_eq!(s.list_factors(None).await.unwrap().len(), 3);
}

// ─── Deductions and conclusions ──────────────────────────────────────────────

#[tokio::test]
async fn deduction_requires_factor() {
  let s = store().await;
  let err = s
    .add_deduction(NewDeduction {
      factor_id:  Uuid::new_v4(),
      text:       "orphan".into(),
      confidence: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn conclusion_round_trips_through_columns() {
  let s = store().await;
  let (factor_id, deduction_id, conclusion_id) = seed(&s).await;

  let conclusion = s.get_conclusion(conclusion_id).await.unwrap().unwrap();
  assert_eq!(conclusion.factor_id, factor_id);
  assert_eq!(conclusion.deduction_id, deduction_id);
  assert_eq!(conclusion.kind, ConclusionType::Dc);
  assert_eq!(conclusion.status, ConclusionStatus::Draft);
  assert_eq!(conclusion.priority, Some(2));

  let listed = s.list_conclusions(deduction_id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(s.list_deductions(factor_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn set_status_updates_row() {
  let s = store().await;
  let (.., conclusion_id) = seed(&s).await;

  let updated = s
    .set_conclusion_status(conclusion_id, ConclusionStatus::Reviewed)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.status, ConclusionStatus::Reviewed);

  let missing = s
    .set_conclusion_status(Uuid::new_v4(), ConclusionStatus::Reviewed)
    .await
    .unwrap();
  assert!(missing.is_none());
}

// ─── Links and artefacts ─────────────────────────────────────────────────────

#[tokio::test]
async fn link_to_existing_id_may_dangle() {
  let s = store().await;
  let (.., conclusion_id) = seed(&s).await;
  let target = Uuid::new_v4();

  let (link, created) = s
    .add_link(NewLink {
      conclusion_id,
      target_kind: TargetKind::DecisionPoint,
      target: LinkTarget::Existing(target),
    })
    .await
    .unwrap();
  assert!(created.is_none());
  assert_eq!(link.target_id, target);

  let links = s.list_links(conclusion_id).await.unwrap();
  assert_eq!(links, vec![link]);
}

#[tokio::test]
async fn link_with_create_writes_both_rows() {
  let s = store().await;
  let (factor_id, _, conclusion_id) = seed(&s).await;
  let plan_id = s.get_factor(factor_id).await.unwrap().unwrap().plan_id;

  let (link, created) = s
    .add_link(NewLink {
      conclusion_id,
      target_kind: TargetKind::Ccir,
      target: LinkTarget::Create(NewArtefact {
        plan_id,
        value: ArtefactValue::Ccir(CcirValue {
          kind:          CcirKind::Ffir,
          text:          "Status of engineer bridging assets".into(),
          linked_rfi_id: None,
        }),
        derived_from: vec![conclusion_id],
      }),
    })
    .await
    .unwrap();

  let created = created.expect("artefact created with the link");
  assert_eq!(link.target_id, created.artefact_id);

  let stored = s
    .get_artefact(TargetKind::Ccir, created.artefact_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.derived_from, vec![conclusion_id]);
  assert_eq!(stored.value, created.value);
  assert_eq!(stored.plan_id, plan_id);
}

#[tokio::test]
async fn failed_link_leaves_no_artefact() {
  let s = store().await;
  let plan_id = Uuid::new_v4();

  // The conclusion does not exist, so the link insert fails after the
  // artefact insert and the transaction rolls back.
  let err = s
    .add_link(NewLink {
      conclusion_id: Uuid::new_v4(),
      target_kind:   TargetKind::Risk,
      target:        LinkTarget::Create(NewArtefact {
        plan_id,
        value: risk("Flooding"),
        derived_from: Vec::new(),
      }),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
  assert!(s.list_artefacts(plan_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn artefacts_are_kind_scoped() {
  let s = store().await;
  let plan_id = Uuid::new_v4();
  let artefact = s
    .add_artefact(NewArtefact {
      plan_id,
      value: risk("Early contact"),
      derived_from: Vec::new(),
    })
    .await
    .unwrap();
  let id = artefact.artefact_id;

  assert!(s.get_artefact(TargetKind::Task, id).await.unwrap().is_none());
  assert_eq!(
    s.list_artefacts(plan_id, Some(TargetKind::Risk))
      .await
      .unwrap()
      .len(),
    1
  );
  assert!(
    s.list_artefacts(plan_id, Some(TargetKind::Task))
      .await
      .unwrap()
      .is_empty()
  );

  assert!(!s.delete_artefact(TargetKind::Task, id).await.unwrap());
  assert!(s.delete_artefact(TargetKind::Risk, id).await.unwrap());
  assert!(s.get_artefact(TargetKind::Risk, id).await.unwrap().is_none());
}

// ─── Cascades ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cascade_removes_named_rows() {
  let s = store().await;
  let (factor_id, deduction_id, conclusion_id) = seed(&s).await;
  let (link, _) = s
    .add_link(NewLink {
      conclusion_id,
      target_kind: TargetKind::Task,
      target: LinkTarget::Existing(Uuid::new_v4()),
    })
    .await
    .unwrap();

  let outcome = s
    .delete_cascade(CascadeDelete {
      links:       vec![link.link_id],
      conclusions: vec![conclusion_id],
      deductions:  vec![deduction_id],
      factor:      Some(factor_id),
    })
    .await
    .unwrap();
  assert_eq!(outcome, CascadeOutcome::Applied);

  assert!(s.get_factor(factor_id).await.unwrap().is_none());
  assert!(s.get_deduction(deduction_id).await.unwrap().is_none());
  assert!(s.get_conclusion(conclusion_id).await.unwrap().is_none());
  assert!(s.list_links(conclusion_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn incomplete_cascade_is_rolled_back() {
  let s = store().await;
  let (factor_id, deduction_id, conclusion_id) = seed(&s).await;
  s.add_link(NewLink {
    conclusion_id,
    target_kind: TargetKind::Task,
    target: LinkTarget::Existing(Uuid::new_v4()),
  })
  .await
  .unwrap();

  // The link is missing from the plan, so deleting its conclusion violates
  // the foreign key.
  let err = s
    .delete_cascade(CascadeDelete {
      links:       Vec::new(),
      conclusions: vec![conclusion_id],
      deductions:  vec![deduction_id],
      factor:      Some(factor_id),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));

  assert!(s.get_factor(factor_id).await.unwrap().is_some());
  assert!(s.get_conclusion(conclusion_id).await.unwrap().is_some());
  assert_eq!(s.list_links(conclusion_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stale_cascade_is_rolled_back() {
  let s = store().await;
  let (factor_id, deduction_id, conclusion_id) = seed(&s).await;
  let gone = Uuid::new_v4();

  // The real conclusion is deleted before the vanished one is reached.
  let outcome = s
    .delete_cascade(CascadeDelete {
      links:       Vec::new(),
      conclusions: vec![conclusion_id, gone],
      deductions:  vec![deduction_id],
      factor:      Some(factor_id),
    })
    .await
    .unwrap();
  assert_eq!(outcome, CascadeOutcome::Missing(CascadeNode::Conclusion(gone)));

  // The first conclusion delete was undone.
  assert!(s.get_conclusion(conclusion_id).await.unwrap().is_some());
  assert!(s.get_deduction(deduction_id).await.unwrap().is_some());
  assert!(s.get_factor(factor_id).await.unwrap().is_some());
}

#[tokio::test]
async fn replayed_cascade_reports_missing_row() {
  let s = store().await;
  let (factor_id, deduction_id, conclusion_id) = seed(&s).await;
  let plan = CascadeDelete {
    links:       Vec::new(),
    conclusions: vec![conclusion_id],
    deductions:  vec![deduction_id],
    factor:      Some(factor_id),
  };

  assert_eq!(s.delete_cascade(plan.clone()).await.unwrap(), CascadeOutcome::Applied);
  assert_eq!(
    s.delete_cascade(plan).await.unwrap(),
    CascadeOutcome::Missing(CascadeNode::Conclusion(conclusion_id))
  );
}

// ─── Through the graph ───────────────────────────────────────────────────────

#[tokio::test]
async fn graph_scenario_on_sqlite() {
  let graph = LineageGraph::new(Arc::new(store().await));

  let factor = graph
    .create_factor(FactorInput {
      plan_id:     Uuid::new_v4(),
      title:       "Enemy brigade deploying north".into(),
      description: None,
      domain:      "military".into(),
      source_ref:  None,
      confidence:  Some(0.85),
      created_by:  None,
    })
    .await
    .unwrap();
  let deduction = graph
    .add_deduction(factor.factor_id, DeductionInput {
      text:       "Northern flank exposed".into(),
      confidence: None,
    })
    .await
    .unwrap();
  let conclusion = graph
    .add_conclusion(factor.factor_id, ConclusionInput {
      deduction_id: deduction.deduction_id,
      kind:         "task".into(),
      text:         "Screen the northern flank".into(),
      priority:     None,
      owner:        None,
    })
    .await
    .unwrap();

  let err = graph
    .update_conclusion_status(conclusion.conclusion_id, "APPROVED")
    .await
    .unwrap_err();
  assert_eq!(err.class(), ErrorClass::InvariantViolation);

  let link = graph
    .link_conclusion(conclusion.conclusion_id, LinkInput {
      target_kind:    "TASK".into(),
      target_id:      None,
      create_payload: json!({ "name": "Screen north", "priority": "2" })
        .as_object()
        .cloned(),
    })
    .await
    .unwrap();

  graph
    .update_conclusion_status(conclusion.conclusion_id, "APPROVED")
    .await
    .unwrap();

  let trace = graph.build_trace(conclusion.conclusion_id).await.unwrap();
  assert_eq!(trace.factor.domain, FactorDomain::Mil);
  assert_eq!(trace.linked_entities.len(), 1);
  assert_eq!(trace.linked_entities[0].target_id, link.target_id);
  assert_eq!(trace.linked_entities[0].summary, "Screen north");

  let plan = graph.delete_factor(factor.factor_id).await.unwrap();
  assert_eq!(plan.len(), 4);
  assert!(graph.get_factor(factor.factor_id).await.is_err());
  assert!(graph.build_trace(conclusion.conclusion_id).await.is_err());
}

#[tokio::test]
async fn concurrent_factor_deletes_succeed_once() {
  let s = store().await;
  let (factor_id, _, conclusion_id) = seed(&s).await;
  s.add_link(NewLink {
    conclusion_id,
    target_kind: TargetKind::Risk,
    target: LinkTarget::Existing(Uuid::new_v4()),
  })
  .await
  .unwrap();
  let graph = LineageGraph::new(Arc::new(s));

  let (a, b) = tokio::join!(graph.delete_factor(factor_id), graph.delete_factor(factor_id));

  let (removed, err) = match (a, b) {
    (Ok(plan), Err(err)) | (Err(err), Ok(plan)) => (plan, err),
    (a, b) => panic!("expected exactly one delete to succeed: {a:?} / {b:?}"),
  };
  assert_eq!(removed.len(), 4);
  assert_eq!(err.class(), ErrorClass::NotFound);
  assert!(graph.get_factor(factor_id).await.is_err());
}
