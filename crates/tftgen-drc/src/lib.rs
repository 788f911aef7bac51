//! # tftgen DRC
//!
//! Design rule checking for generated test structures.
//! Rules are defined declaratively in TOML rule decks that reference layers
//! by name; a deck is resolved against a layer stack before checking.
//! Checks run on the flattened cell, with an R-tree per layer for
//! neighbourhood queries.

pub mod check;
pub mod error;
pub mod rules;
pub mod violation;

pub use check::{check_cell, DrcReport};
pub use error::DrcError;
pub use rules::{Check, Rule, RuleDeck, RuleKind, RuleSpec};
pub use violation::{DrcViolation, Severity, ViolationType};
