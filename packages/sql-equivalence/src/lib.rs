//! Clause-level semantic comparison of SQL parse trees.
//!
//! A parsed statement (the JSON parse tree emitted by the PostgreSQL parser) is turned into a
//! pruned [`Tree`]. Each statement is reduced to canonical per-clause records, and a candidate
//! is compared against a reference with an explainable [`ComparisonResult`]. A Zhang-Shasha
//! [`tree_edit_distance`] gives a structural similarity measure for any two trees.

mod clauses;
mod comparison;
mod condition;
mod diff;
mod display_helpers;
mod edit_distance;
mod error;
mod statement;
mod tree;

pub mod config;
pub mod log;

pub use crate::clauses::*;
pub use crate::comparison::*;
pub use crate::condition::*;
pub use crate::config::EquivalenceConfig;
pub use crate::diff::*;
pub use crate::display_helpers::Fmt;
pub use crate::edit_distance::*;
pub use crate::error::{ConfigError, Error};
pub use crate::log::init;
pub use crate::statement::*;
pub use crate::tree::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parses the parser's JSON output and builds a tree pruned with the default deny-list.
pub fn parse_document(json: &str) -> Result<Tree, Error> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    Ok(Tree::from_json(&document))
}

#[cfg(test)]
pub mod test_helpers;
