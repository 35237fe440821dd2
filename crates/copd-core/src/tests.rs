//! Lineage graph tests against the in-memory store.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{
  Error, ErrorClass,
  artefact::{ArtefactValue, NewArtefact, TaskCategory, TaskValue},
  cascade::{CascadeNode, CascadeOutcome},
  conclusion::{ConclusionInput, ConclusionStatus, ConclusionType, LinkInput},
  factor::{DeductionInput, Factor, FactorDomain, FactorInput},
  graph::LineageGraph,
  memory::MemoryStore,
  store::LineageStore,
  target::TargetKind,
  trace::missing_summary,
};

fn graph() -> LineageGraph<MemoryStore> { LineageGraph::new(Arc::new(MemoryStore::new())) }

fn factor_input(plan_id: Uuid, domain: &str) -> FactorInput {
  FactorInput {
    plan_id,
    title: "Enemy armoured brigade deploying north".into(),
    description: None,
    domain: domain.into(),
    source_ref: Some("INTSUM-2024-045".into()),
    confidence: Some(0.85),
    created_by: Some("S2".into()),
  }
}

fn deduction_input(text: &str) -> DeductionInput {
  DeductionInput {
    text:       text.into(),
    confidence: None,
  }
}

fn conclusion_input(deduction_id: Uuid, kind: &str) -> ConclusionInput {
  ConclusionInput {
    deduction_id,
    kind: kind.into(),
    text: "Conduct recce of northern approaches".into(),
    priority: Some(1),
    owner: Some("S3".into()),
  }
}

fn payload(v: Value) -> Option<Map<String, Value>> { v.as_object().cloned() }

fn link_create(kind: &str, v: Value) -> LinkInput {
  LinkInput {
    target_kind:    kind.into(),
    target_id:      None,
    create_payload: payload(v),
  }
}

fn link_existing(kind: &str, id: Uuid) -> LinkInput {
  LinkInput {
    target_kind: kind.into(),
    target_id: Some(id),
    ..Default::default()
  }
}

/// Factor → deduction → conclusion, returning all three ids.
async fn chain(g: &LineageGraph<MemoryStore>) -> (Factor, Uuid, Uuid) {
  let factor = g
    .create_factor(factor_input(Uuid::new_v4(), "MIL"))
    .await
    .unwrap();
  let deduction = g
    .add_deduction(factor.factor_id, deduction_input("Northern axis is threatened"))
    .await
    .unwrap();
  let conclusion = g
    .add_conclusion(factor.factor_id, conclusion_input(deduction.deduction_id, "TASK"))
    .await
    .unwrap();
  (factor, deduction.deduction_id, conclusion.conclusion_id)
}

// ─── Scenario ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn factor_to_approved_task() {
  let g = graph();
  let (factor, deduction_id, conclusion_id) = chain(&g).await;
  assert_eq!(factor.domain, FactorDomain::Mil);
  assert_eq!(factor.confidence, Some(0.85));

  let conclusion = g.get_conclusion(conclusion_id).await.unwrap();
  assert_eq!(conclusion.kind, ConclusionType::Task);
  assert_eq!(conclusion.status, ConclusionStatus::Draft);
  assert_eq!(conclusion.factor_id, factor.factor_id);
  assert_eq!(conclusion.deduction_id, deduction_id);

  let err = g
    .update_conclusion_status(conclusion_id, "APPROVED")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ApprovalRequiresLink(id) if id == conclusion_id));
  assert_eq!(err.class(), ErrorClass::InvariantViolation);

  let link = g
    .link_conclusion(
      conclusion_id,
      link_create("task", json!({ "name": "Recce north", "category": "implied" })),
    )
    .await
    .unwrap();
  assert_eq!(link.target_kind, TargetKind::Task);

  let approved = g
    .update_conclusion_status(conclusion_id, "approved")
    .await
    .unwrap();
  assert_eq!(approved.status, ConclusionStatus::Approved);

  let trace = g.build_trace(conclusion_id).await.unwrap();
  assert_eq!(trace.factor.factor_id, factor.factor_id);
  assert_eq!(trace.deduction.deduction_id, deduction_id);
  assert_eq!(trace.conclusion.status, ConclusionStatus::Approved);
  assert_eq!(trace.linked_entities.len(), 1);
  let row = &trace.linked_entities[0];
  assert_eq!(row.target_kind, TargetKind::Task);
  assert_eq!(row.target_id, link.target_id);
  assert_eq!(row.summary, "Recce north");
  assert!(row.found);
}

// ─── Factors and deductions ──────────────────────────────────────────────────

#[tokio::test]
async fn unknown_domain_is_rejected() {
  let g = graph();
  let err = g
    .create_factor(factor_input(Uuid::new_v4(), "XYZ"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidDomain(ref d) if d == "XYZ"));
  assert_eq!(err.class(), ErrorClass::Validation);
  assert!(g.list_factors(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn domain_is_normalised() {
  let g = graph();
  let factor = g
    .create_factor(factor_input(Uuid::new_v4(), "infra"))
    .await
    .unwrap();
  assert_eq!(factor.domain, FactorDomain::Infra);
  assert_eq!(factor.domain.to_string(), "INFRA");
}

#[tokio::test]
async fn blank_title_is_rejected() {
  let g = graph();
  let mut input = factor_input(Uuid::new_v4(), "POL");
  input.title = "   ".into();
  let err = g.create_factor(input).await.unwrap_err();
  assert!(matches!(err, Error::BlankField("title")));
}

#[tokio::test]
async fn confidence_out_of_range_is_rejected() {
  let g = graph();
  let mut input = factor_input(Uuid::new_v4(), "ECO");
  input.confidence = Some(1.5);
  let err = g.create_factor(input).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Validation);
}

#[tokio::test]
async fn list_factors_filters_by_plan() {
  let g = graph();
  let plan = Uuid::new_v4();
  g.create_factor(factor_input(plan, "MIL")).await.unwrap();
  g.create_factor(factor_input(plan, "SOC")).await.unwrap();
  g.create_factor(factor_input(Uuid::new_v4(), "INF"))
    .await
    .unwrap();

  let mine = g.list_factors(Some(plan)).await.unwrap();
  assert_eq!(mine.len(), 2);
  assert!(mine.iter().all(|f| f.plan_id == plan));
  assert_eq!(mine[0].domain, FactorDomain::Mil);
  assert_eq!(g.list_factors(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn deduction_on_missing_factor_is_not_found() {
  let g = graph();
  let err = g
    .add_deduction(Uuid::new_v4(), deduction_input("orphan"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::FactorNotFound(_)));
  assert_eq!(err.class(), ErrorClass::NotFound);
}

// ─── Conclusions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn deduction_from_another_factor_is_rejected() {
  let g = graph();
  let (_, deduction_id, _) = chain(&g).await;
  let other = g
    .create_factor(factor_input(Uuid::new_v4(), "LEGAL"))
    .await
    .unwrap();

  let err = g
    .add_conclusion(other.factor_id, conclusion_input(deduction_id, "RISK"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DeductionMismatch { .. }));
  assert_eq!(err.class(), ErrorClass::InvariantViolation);
}

#[tokio::test]
async fn conclusion_with_missing_deduction_is_not_found() {
  let g = graph();
  let (factor, ..) = chain(&g).await;
  let err = g
    .add_conclusion(factor.factor_id, conclusion_input(Uuid::new_v4(), "TASK"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DeductionNotFound(_)));
}

#[tokio::test]
async fn unknown_conclusion_type_is_rejected() {
  let g = graph();
  let (factor, deduction_id, _) = chain(&g).await;
  let err = g
    .add_conclusion(factor.factor_id, conclusion_input(deduction_id, "hunch"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidConclusionType(_)));
}

#[tokio::test]
async fn status_transitions() {
  let g = graph();
  let (_, _, conclusion_id) = chain(&g).await;

  let reviewed = g
    .update_conclusion_status(conclusion_id, "Reviewed")
    .await
    .unwrap();
  assert_eq!(reviewed.status, ConclusionStatus::Reviewed);

  // Re-applying the current status is a no-op.
  let again = g
    .update_conclusion_status(conclusion_id, "REVIEWED")
    .await
    .unwrap();
  assert_eq!(again.status, ConclusionStatus::Reviewed);

  let err = g
    .update_conclusion_status(conclusion_id, "DRAFT")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTransition { .. }));

  let err = g
    .update_conclusion_status(conclusion_id, "done")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidConclusionStatus(_)));

  g.link_conclusion(conclusion_id, link_existing("risk", Uuid::new_v4()))
    .await
    .unwrap();
  g.update_conclusion_status(conclusion_id, "APPROVED")
    .await
    .unwrap();

  let err = g
    .update_conclusion_status(conclusion_id, "REVIEWED")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidTransition { from: ConclusionStatus::Approved, .. }
  ));
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auto_created_artefact_carries_provenance() {
  let g = graph();
  let (factor, _, conclusion_id) = chain(&g).await;

  let link = g
    .link_conclusion(
      conclusion_id,
      link_create("CCIR", json!({ "kind": "eefi", "text": "Own reserve location" })),
    )
    .await
    .unwrap();

  let artefact = g
    .store()
    .get_artefact(TargetKind::Ccir, link.target_id)
    .await
    .unwrap()
    .expect("auto-created artefact");
  assert_eq!(artefact.artefact_id, link.target_id);
  assert_eq!(artefact.plan_id, factor.plan_id);
  assert_eq!(artefact.derived_from, vec![conclusion_id]);
}

#[tokio::test]
async fn unknown_target_kind_is_rejected() {
  let g = graph();
  let (_, _, conclusion_id) = chain(&g).await;
  let err = g
    .link_conclusion(conclusion_id, link_existing("widget", Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownTargetKind(ref k) if k == "widget"));
  assert_eq!(err.class(), ErrorClass::Validation);
  assert!(g.list_links(conclusion_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn link_needs_id_or_payload() {
  let g = graph();
  let (_, _, conclusion_id) = chain(&g).await;

  let err = g
    .link_conclusion(conclusion_id, LinkInput {
      target_kind: "task".into(),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MissingTarget));

  let err = g
    .link_conclusion(conclusion_id, link_create("task", json!({})))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MissingTarget));
}

#[tokio::test]
async fn invalid_payload_writes_nothing() {
  let g = graph();
  let (factor, _, conclusion_id) = chain(&g).await;

  let err = g
    .link_conclusion(
      conclusion_id,
      link_create("task", json!({ "name": "Recce", "category": "optional" })),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidPayload { ref field, .. } if field == "category"));

  assert!(g.list_links(conclusion_id).await.unwrap().is_empty());
  let artefacts = g
    .store()
    .list_artefacts(factor.plan_id, None)
    .await
    .unwrap();
  assert!(artefacts.is_empty());
}

#[tokio::test]
async fn target_id_wins_over_payload() {
  let g = graph();
  let (factor, _, conclusion_id) = chain(&g).await;
  let target = Uuid::new_v4();

  let link = g
    .link_conclusion(conclusion_id, LinkInput {
      target_kind:    "assumption".into(),
      target_id:      Some(target),
      create_payload: payload(json!({ "text": "ignored" })),
    })
    .await
    .unwrap();
  assert_eq!(link.target_id, target);
  assert!(
    g.store()
      .list_artefacts(factor.plan_id, None)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn strict_links_require_existing_artefact() {
  let g = graph().with_strict_links(true);
  let (factor, _, conclusion_id) = chain(&g).await;

  let err = g
    .link_conclusion(conclusion_id, link_existing("task", Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ArtefactNotFound { kind: TargetKind::Task, .. }));

  let task = g
    .store()
    .add_artefact(NewArtefact {
      plan_id:      factor.plan_id,
      value:        ArtefactValue::Task(TaskValue {
        name:              "Screen the river line".into(),
        description:       None,
        category:          TaskCategory::Essential,
        force_orientation: None,
        service:           None,
        priority:          None,
        phase_id:          None,
        parent_id:         None,
      }),
      derived_from: Vec::new(),
    })
    .await
    .unwrap();

  // Right id, wrong kind.
  let err = g
    .link_conclusion(conclusion_id, link_existing("risk", task.artefact_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ArtefactNotFound { kind: TargetKind::Risk, .. }));

  let link = g
    .link_conclusion(conclusion_id, link_existing("TASK", task.artefact_id))
    .await
    .unwrap();
  assert_eq!(link.target_id, task.artefact_id);
}

// ─── Trace ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trace_keeps_dangling_links() {
  let g = graph();
  let (_, _, conclusion_id) = chain(&g).await;
  let dangling = Uuid::new_v4();

  g.link_conclusion(
    conclusion_id,
    link_create(
      "cog_item",
      json!({
        "actor_name": "Red",
        "cog_type": "Critical_Vulnerability",
        "description": "Single bridge carries all resupply",
      }),
    ),
  )
  .await
  .unwrap();
  g.link_conclusion(conclusion_id, link_existing("decision_point", dangling))
    .await
    .unwrap();

  let trace = g.build_trace(conclusion_id).await.unwrap();
  assert_eq!(trace.linked_entities.len(), 2);

  let found = &trace.linked_entities[0];
  assert!(found.found);
  assert_eq!(
    found.summary,
    "Red: critical_vulnerability - Single bridge carries all resupply"
  );

  let missing = &trace.linked_entities[1];
  assert!(!missing.found);
  assert_eq!(missing.target_id, dangling);
  assert_eq!(
    missing.summary,
    missing_summary(TargetKind::DecisionPoint, dangling)
  );
}

#[tokio::test]
async fn trace_marks_deleted_artefact_missing() {
  let g = graph();
  let (_, _, conclusion_id) = chain(&g).await;

  let task = g
    .link_conclusion(conclusion_id, link_create("task", json!({ "name": "A" })))
    .await
    .unwrap();
  g.link_conclusion(conclusion_id, link_create("risk", json!({ "title": "B" })))
    .await
    .unwrap();

  assert!(
    g.store()
      .delete_artefact(TargetKind::Task, task.target_id)
      .await
      .unwrap()
  );

  let trace = g.build_trace(conclusion_id).await.unwrap();
  let entries: Vec<_> = trace
    .linked_entities
    .iter()
    .map(|e| (e.summary.clone(), e.found))
    .collect();
  assert_eq!(entries, vec![
    (missing_summary(TargetKind::Task, task.target_id), false),
    ("B".to_owned(), true),
  ]);
}

#[tokio::test]
async fn trace_of_missing_conclusion_is_not_found() {
  let g = graph();
  let err = g.build_trace(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::ConclusionNotFound(_)));
}

// ─── Detail and cascades ─────────────────────────────────────────────────────

#[tokio::test]
async fn factor_detail_collects_the_subtree() {
  let g = graph();
  let (factor, deduction_id, conclusion_id) = chain(&g).await;
  g.add_conclusion(factor.factor_id, conclusion_input(deduction_id, "CONSTRAINT"))
    .await
    .unwrap();
  g.link_conclusion(conclusion_id, link_create("sync", json!({ "text": "Fires H-2" })))
    .await
    .unwrap();

  let detail = g.factor_detail(factor.factor_id).await.unwrap();
  assert_eq!(detail.factor.factor_id, factor.factor_id);
  assert_eq!(detail.deductions.len(), 1);
  assert_eq!(detail.conclusions.len(), 2);
  assert_eq!(detail.links.len(), 1);
  assert_eq!(detail.conclusions[1].kind, ConclusionType::Constraint);
}

#[tokio::test]
async fn deleting_a_factor_removes_descendants() {
  let g = graph();
  let (factor, deduction_id, conclusion_id) = chain(&g).await;
  let second = g
    .add_deduction(factor.factor_id, deduction_input("Southern axis is open"))
    .await
    .unwrap();
  let link = g
    .link_conclusion(conclusion_id, link_create("risk", json!({ "title": "Early contact" })))
    .await
    .unwrap();

  let plan = g.delete_factor(factor.factor_id).await.unwrap();
  assert_eq!(plan.factor, Some(factor.factor_id));
  assert_eq!(plan.links, vec![link.link_id]);
  assert_eq!(plan.conclusions, vec![conclusion_id]);
  assert_eq!(plan.deductions, vec![deduction_id, second.deduction_id]);
  assert_eq!(plan.len(), 5);

  assert!(matches!(
    g.get_factor(factor.factor_id).await.unwrap_err(),
    Error::FactorNotFound(_)
  ));
  assert!(matches!(
    g.get_conclusion(conclusion_id).await.unwrap_err(),
    Error::ConclusionNotFound(_)
  ));
  assert!(
    g.store()
      .get_deduction(second.deduction_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(g.list_links(conclusion_id).await.unwrap().is_empty());

  // Artefacts are not owned by links and survive the cascade.
  let artefact = g
    .store()
    .get_artefact(TargetKind::Risk, link.target_id)
    .await
    .unwrap();
  assert!(artefact.is_some());
}

#[tokio::test]
async fn deleting_a_deduction_keeps_its_factor() {
  let g = graph();
  let (factor, deduction_id, conclusion_id) = chain(&g).await;

  let plan = g.delete_deduction(deduction_id).await.unwrap();
  assert_eq!(plan.factor, None);
  assert_eq!(plan.conclusions, vec![conclusion_id]);

  assert!(g.get_factor(factor.factor_id).await.is_ok());
  let detail = g.factor_detail(factor.factor_id).await.unwrap();
  assert!(detail.deductions.is_empty());
  assert!(detail.conclusions.is_empty());
}

#[tokio::test]
async fn deleting_a_conclusion_removes_its_links() {
  let g = graph();
  let (_, deduction_id, conclusion_id) = chain(&g).await;
  g.link_conclusion(conclusion_id, link_existing("info_req", Uuid::new_v4()))
    .await
    .unwrap();

  let plan = g.delete_conclusion(conclusion_id).await.unwrap();
  assert_eq!(plan.links.len(), 1);
  assert!(g.list_links(conclusion_id).await.unwrap().is_empty());
  assert!(
    g.store()
      .list_conclusions(deduction_id)
      .await
      .unwrap()
      .is_empty()
  );

  let err = g.delete_conclusion(conclusion_id).await.unwrap_err();
  assert!(matches!(err, Error::ConclusionNotFound(_)));
}

#[tokio::test]
async fn concurrent_factor_deletes_succeed_once() {
  let g = graph();
  let (factor, _, conclusion_id) = chain(&g).await;
  g.link_conclusion(conclusion_id, link_create("risk", json!({ "title": "Early contact" })))
    .await
    .unwrap();

  let (a, b) = tokio::join!(
    g.delete_factor(factor.factor_id),
    g.delete_factor(factor.factor_id)
  );

  let (removed, err) = match (a, b) {
    (Ok(plan), Err(err)) | (Err(err), Ok(plan)) => (plan, err),
    (a, b) => panic!("expected exactly one delete to succeed: {a:?} / {b:?}"),
  };
  assert_eq!(removed.len(), 4);
  assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn stale_cascade_is_not_found() {
  let g = graph();
  let (factor, deduction_id, conclusion_id) = chain(&g).await;

  // Remove the conclusion behind the graph's back, then replay its cascade.
  let plan = g.delete_conclusion(conclusion_id).await.unwrap();
  let outcome = g.store().delete_cascade(plan).await.unwrap();
  assert_eq!(outcome, CascadeOutcome::Missing(CascadeNode::Conclusion(conclusion_id)));

  let err = Error::missing(CascadeNode::Conclusion(conclusion_id));
  assert_eq!(err.class(), ErrorClass::NotFound);
  assert!(g.get_factor(factor.factor_id).await.is_ok());
  assert!(g.store().get_deduction(deduction_id).await.unwrap().is_some());
}
