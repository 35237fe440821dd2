//! Dispatch of parsed commands onto the lineage graph. Every command yields a
//! JSON document for stdout.

use anyhow::Context as _;
use copd_core::{
  conclusion::{ConclusionInput, LinkInput},
  factor::{DeductionInput, FactorInput},
  graph::LineageGraph,
  store::LineageStore,
  target::TargetKind,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::{
  ArtefactCommand, Command, ConclusionCommand, DeductionCommand, FactorCommand,
};

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<Value> {
  serde_json::to_value(value).context("failed to encode output")
}

pub async fn run<S: LineageStore>(
  graph: &LineageGraph<S>,
  command: Command,
) -> anyhow::Result<Value> {
  match command {
    Command::Factor(cmd) => factor(graph, cmd).await,
    Command::Deduction(cmd) => deduction(graph, cmd).await,
    Command::Conclusion(cmd) => conclusion(graph, cmd).await,
    Command::Trace { conclusion_id } => {
      let trace = graph
        .build_trace(conclusion_id)
        .await
        .with_context(|| format!("failed to trace conclusion {conclusion_id}"))?;
      to_json(&trace)
    }
    Command::Artefact(cmd) => artefact(graph, cmd).await,
  }
}

async fn factor<S: LineageStore>(
  graph: &LineageGraph<S>,
  command: FactorCommand,
) -> anyhow::Result<Value> {
  match command {
    FactorCommand::Add(add) => {
      let factor = graph
        .create_factor(FactorInput {
          plan_id:     add.plan,
          title:       add.title,
          description: add.description,
          domain:      add.domain,
          source_ref:  add.source_ref,
          confidence:  add.confidence,
          created_by:  add.created_by,
        })
        .await
        .context("failed to create factor")?;
      to_json(&factor)
    }
    FactorCommand::List { plan } => {
      let factors = graph
        .list_factors(plan)
        .await
        .context("failed to list factors")?;
      to_json(&factors)
    }
    FactorCommand::Show { factor_id } => {
      let detail = graph
        .factor_detail(factor_id)
        .await
        .with_context(|| format!("failed to load factor {factor_id}"))?;
      to_json(&detail)
    }
    FactorCommand::Rm { factor_id } => {
      let removed = graph
        .delete_factor(factor_id)
        .await
        .with_context(|| format!("failed to delete factor {factor_id}"))?;
      to_json(&removed)
    }
  }
}

async fn deduction<S: LineageStore>(
  graph: &LineageGraph<S>,
  command: DeductionCommand,
) -> anyhow::Result<Value> {
  match command {
    DeductionCommand::Add { factor_id, text, confidence } => {
      let deduction = graph
        .add_deduction(factor_id, DeductionInput { text, confidence })
        .await
        .with_context(|| format!("failed to add deduction to factor {factor_id}"))?;
      to_json(&deduction)
    }
    DeductionCommand::Rm { deduction_id } => {
      let removed = graph
        .delete_deduction(deduction_id)
        .await
        .with_context(|| format!("failed to delete deduction {deduction_id}"))?;
      to_json(&removed)
    }
  }
}

async fn conclusion<S: LineageStore>(
  graph: &LineageGraph<S>,
  command: ConclusionCommand,
) -> anyhow::Result<Value> {
  match command {
    ConclusionCommand::Add(add) => {
      let factor_id = add.factor_id;
      let conclusion = graph
        .add_conclusion(factor_id, ConclusionInput {
          deduction_id: add.deduction,
          kind:         add.kind,
          text:         add.text,
          priority:     add.priority,
          owner:        add.owner,
        })
        .await
        .with_context(|| format!("failed to add conclusion to factor {factor_id}"))?;
      to_json(&conclusion)
    }
    ConclusionCommand::Show { conclusion_id } => {
      let conclusion = graph
        .get_conclusion(conclusion_id)
        .await
        .with_context(|| format!("failed to load conclusion {conclusion_id}"))?;
      to_json(&conclusion)
    }
    ConclusionCommand::Status { conclusion_id, status } => {
      let conclusion = graph
        .update_conclusion_status(conclusion_id, &status)
        .await
        .with_context(|| format!("failed to set status of conclusion {conclusion_id}"))?;
      to_json(&conclusion)
    }
    ConclusionCommand::Link(link) => {
      let conclusion_id = link.conclusion_id;
      let link = graph
        .link_conclusion(conclusion_id, LinkInput {
          target_kind:    link.kind,
          target_id:      link.target,
          create_payload: link.payload,
        })
        .await
        .with_context(|| format!("failed to link conclusion {conclusion_id}"))?;
      to_json(&link)
    }
    ConclusionCommand::Links { conclusion_id } => {
      let links = graph
        .list_links(conclusion_id)
        .await
        .with_context(|| format!("failed to list links of conclusion {conclusion_id}"))?;
      to_json(&links)
    }
    ConclusionCommand::Rm { conclusion_id } => {
      let removed = graph
        .delete_conclusion(conclusion_id)
        .await
        .with_context(|| format!("failed to delete conclusion {conclusion_id}"))?;
      to_json(&removed)
    }
  }
}

async fn artefact<S: LineageStore>(
  graph: &LineageGraph<S>,
  command: ArtefactCommand,
) -> anyhow::Result<Value> {
  match command {
    ArtefactCommand::List { plan, kind } => {
      let kind = kind.as_deref().map(TargetKind::parse).transpose()?;
      let artefacts = graph
        .store()
        .list_artefacts(plan, kind)
        .await
        .context("failed to list artefacts")?;
      to_json(&artefacts)
    }
    ArtefactCommand::Rm { kind, artefact_id } => {
      let kind = TargetKind::parse(&kind)?;
      let deleted = graph
        .store()
        .delete_artefact(kind, artefact_id)
        .await
        .with_context(|| format!("failed to delete {kind} {artefact_id}"))?;
      Ok(json!({ "deleted": deleted, "kind": kind, "artefact_id": artefact_id }))
    }
  }
}
