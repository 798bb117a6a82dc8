// src/analyze/mod.rs
//! Evidence analysis: fixed vocabularies (normalizer) and the ordered scoring rules.

pub mod rules;
pub mod vocab;

// Re-export convenient types.
pub use crate::analyze::rules::{apply_rules, Rule, Tally, NO_RED_FLAGS, RULES};
pub use crate::analyze::vocab::{Folded, Vocabulary};
