//! Core types and services for COPD factor lineage.
//!
//! A plan's analysis is a chain: a [`Factor`](factor::Factor) yields
//! [`Deduction`](factor::Deduction)s, each deduction yields
//! [`Conclusion`](conclusion::Conclusion)s, and each conclusion is linked to
//! the plan artefacts it justifies. [`LineageGraph`](graph::LineageGraph)
//! enforces the rules of that chain over any [`LineageStore`](store::LineageStore).
//!
//! This crate has no database dependency; `copd-store-sqlite` provides the
//! persistent backend and [`memory::MemoryStore`] an in-process one.

// Native `async fn` in traits; the store trait spells out its `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod artefact;
pub mod autocreate;
pub mod cascade;
pub mod conclusion;
pub mod error;
pub mod factor;
pub mod graph;
pub mod memory;
pub mod payload;
pub mod store;
pub mod target;
pub mod trace;

pub use error::{Error, ErrorClass, Result};

#[cfg(test)]
mod tests;
