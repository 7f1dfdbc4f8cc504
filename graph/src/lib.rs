pub mod config;
pub mod core;
pub mod decor;
pub mod edits;
pub mod error;
pub mod git_backend;
pub mod heuristics;
pub mod layout;
pub mod segment;
pub mod tree;

#[cfg(test)]
mod testing;

pub use config::TreeConfig;
pub use crate::core::{CommitNode, CommitRecord, Dag, DagStats, GridPos, NodeIdx, Relation};
pub use decor::{resolve_start, RefIndex};
pub use edits::{EditList, EditLocation, EditStore};
pub use error::{GraphError, Result};
pub use git_backend::GitWalker;
pub use heuristics::{MergeEngine, MergeReport, RuleApplication};
pub use layout::{layout, LayoutSummary};
pub use segment::{segment, Branch, BranchId, BranchSet};
pub use tree::{TreeBuilder, TreeSnapshot};
