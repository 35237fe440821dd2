//! Cascading deletes as explicit values.
//!
//! The graph gathers every descendant id through the store's parent → children
//! queries into a [`CascadeDelete`], and the store removes the whole set in one
//! transaction, in the order given by [`CascadeDelete::ordered`].

use serde::Serialize;
use uuid::Uuid;

/// One row removed by a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum CascadeNode {
  Link(Uuid),
  Conclusion(Uuid),
  Deduction(Uuid),
  Factor(Uuid),
}

/// Everything a single delete removes. Children always precede parents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeDelete {
  pub links:       Vec<Uuid>,
  pub conclusions: Vec<Uuid>,
  pub deductions:  Vec<Uuid>,
  pub factor:      Option<Uuid>,
}

impl CascadeDelete {
  /// Links first, then conclusions, then deductions, then the factor.
  pub fn ordered(&self) -> Vec<CascadeNode> {
    let links = self.links.iter().copied().map(CascadeNode::Link);
    let conclusions = self.conclusions.iter().copied().map(CascadeNode::Conclusion);
    let deductions = self.deductions.iter().copied().map(CascadeNode::Deduction);
    let factor = self.factor.into_iter().map(CascadeNode::Factor);

    links.chain(conclusions).chain(deductions).chain(factor).collect()
  }

  pub fn len(&self) -> usize {
    self.links.len()
      + self.conclusions.len()
      + self.deductions.len()
      + usize::from(self.factor.is_some())
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// What a store did with a [`CascadeDelete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
  /// Every named row was removed.
  Applied,
  /// The named row was already gone. Nothing was removed.
  Missing(CascadeNode),
}
