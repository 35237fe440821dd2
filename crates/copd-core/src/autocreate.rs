//! Turning a conclusion's raw create payload into a plan artefact.
//!
//! [`prepare`] validates the payload through the registry row for the target
//! kind and stamps the provenance. Persisting happens in the store's
//! [`add_link`](crate::store::LineageStore::add_link), so the artefact and the
//! link pointing at it are written together.

use serde_json::{Map, Value};

use crate::{
  Result, artefact::NewArtefact, conclusion::Conclusion, factor::Factor,
  payload::Payload, target::TargetEntry,
};

/// Build the artefact a conclusion asks for.
///
/// The artefact is scoped to the plan of the conclusion's factor and its
/// `derived_from` is exactly `[conclusion.conclusion_id]`.
pub fn prepare(
  entry: &TargetEntry,
  payload: &Map<String, Value>,
  conclusion: &Conclusion,
  factor: &Factor,
) -> Result<NewArtefact> {
  let value = entry.validate(&Payload::new(payload))?;
  Ok(entry.construct(factor.plan_id, value, vec![conclusion.conclusion_id]))
}
