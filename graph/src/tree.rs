//! One-shot pipeline from a loaded history to a positioned tree.

use crate::config::TreeConfig;
use crate::core::{Dag, NodeIdx, Relation};
use crate::decor::{resolve_start, RefIndex};
use crate::edits::EditList;
use crate::error::Result;
use crate::heuristics::{MergeEngine, RuleApplication};
use crate::layout::layout;
use crate::segment::{segment, BranchId, BranchSet};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentEntry {
    pub id: String,
    pub relation: Relation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitEntry {
    pub id: String,
    pub branch: Option<BranchId>,
    pub x: Option<usize>,
    pub y: Option<usize>,
    pub parents: Vec<ParentEntry>,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branch_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchEntry {
    pub id: BranchId,
    pub len: usize,
    pub first: String,
    pub last: String,
    pub column: Option<usize>,
}

/// Everything a renderer needs, detached from the engine's arenas
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSnapshot {
    pub start: String,
    pub commits: Vec<CommitEntry>,
    pub branches: Vec<BranchEntry>,
    pub rules: Vec<RuleApplication>,
    pub iterations: usize,
    pub converged: bool,
    pub width: usize,
    pub height: usize,
    pub unplaced: Vec<BranchId>,
}

impl TreeSnapshot {
    pub fn commit(&self, id: &str) -> Option<&CommitEntry> {
        self.commits.iter().find(|c| c.id == id)
    }

    /// Placed commits from the top row down, left to right within a row
    pub fn rows(&self) -> Vec<&CommitEntry> {
        let mut rows: Vec<&CommitEntry> = self.commits.iter().filter(|c| c.y.is_some()).collect();
        rows.sort_by_key(|c| (c.y, c.x));
        rows
    }
}

pub struct TreeBuilder {
    config: TreeConfig,
}

impl TreeBuilder {
    pub fn new(config: TreeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    fn engine(&self) -> MergeEngine {
        MergeEngine::new()
            .trust_parent0_only(self.config.trust_parent0_only)
            .max_iterations(self.config.max_iterations)
    }

    /// Start commit from an explicit revision or the configured important
    /// branch patterns
    pub fn resolve_start(
        &self,
        dag: &Dag,
        refs: &RefIndex,
        explicit: Option<&str>,
    ) -> Result<NodeIdx> {
        resolve_start(dag, refs, explicit, &self.config.important_branches)
    }

    /// Segment, merge and lay out `dag` from scratch
    pub fn generate(
        &self,
        dag: &mut Dag,
        edits: &EditList,
        start: NodeIdx,
    ) -> Result<TreeSnapshot> {
        dag.compute_weights();
        let mut branches = segment(dag, edits, start)?;
        let report = self.engine().run(dag, &mut branches)?;
        let summary = layout(dag, &mut branches, start);

        Ok(TreeSnapshot {
            start: dag.node(start).id.clone(),
            commits: commit_entries(dag),
            branches: branch_entries(dag, &branches),
            rules: report.applications,
            iterations: report.iterations,
            converged: report.converged,
            width: summary.width,
            height: summary.height,
            unplaced: summary.unplaced,
        })
    }
}

fn commit_entries(dag: &Dag) -> Vec<CommitEntry> {
    dag.nodes()
        .map(|(_, node)| CommitEntry {
            id: node.id.clone(),
            branch: node.branch(),
            x: node.position().map(|p| p.x),
            y: node.position().map(|p| p.y),
            parents: node
                .parents()
                .iter()
                .enumerate()
                .map(|(i, &p)| ParentEntry {
                    id: dag.node(p).id.clone(),
                    relation: node.relation(i),
                })
                .collect(),
            author: node.author.clone(),
            message: node.message.clone(),
            timestamp: node.timestamp,
            tags: node.tags.clone(),
            branch_names: node.branch_names.clone(),
        })
        .collect()
}

fn branch_entries(dag: &Dag, branches: &BranchSet) -> Vec<BranchEntry> {
    branches
        .alive()
        .filter_map(|b| {
            let first = b.first()?;
            let last = b.last()?;
            Some(BranchEntry {
                id: b.id(),
                len: b.len(),
                first: dag.node(first).id.clone(),
                last: dag.node(last).id.clone(),
                column: dag.node(first).position().map(|p| p.x),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::testing::{dag_from, idx};
    use pretty_assertions::assert_eq;

    fn history() -> Dag {
        dag_from(&[
            ("r", ""),
            ("a", "r"),
            ("f1", "a"),
            ("b", "a"),
            ("m", "b f1"),
            ("c", "b"),
            ("g", "m"),
            ("lone", ""),
        ])
    }

    #[test]
    fn test_generate_is_deterministic() {
        let builder = TreeBuilder::new(TreeConfig::default());

        let mut dag = history();
        let start = idx(&dag, "c");
        let first = builder.generate(&mut dag, &EditList::new(), start).unwrap();
        let again = builder.generate(&mut dag, &EditList::new(), start).unwrap();

        let mut fresh = history();
        let other = builder.generate(&mut fresh, &EditList::new(), start).unwrap();

        assert_eq!(first, again);
        assert_eq!(first, other);
        assert!(first.converged);
        assert!(first.unplaced.is_empty());
        assert_eq!(first.rows().len(), 8);
    }

    #[test]
    fn test_trust_parent0_only_from_config() {
        let config = TreeConfig {
            trust_parent0_only: true,
            ..TreeConfig::default()
        };
        let mut dag = history();
        let start = idx(&dag, "c");
        let builder = TreeBuilder::new(config);
        assert!(builder.config().trust_parent0_only);
        let snapshot = builder.generate(&mut dag, &EditList::new(), start).unwrap();

        assert!(snapshot.rules.iter().all(|r| r.rule != "pull-request"));
        let m = snapshot.commit("m").unwrap();
        assert_eq!(m.parents[0].relation, Relation::BranchOut);
        assert_eq!(m.parents[1].relation, Relation::MergeIn);
    }

    #[test]
    fn test_start_falls_back_to_error() {
        let dag = history();
        let mut refs = RefIndex::new();
        refs.add_branch("c".to_string(), "develop".to_string());

        let builder = TreeBuilder::new(TreeConfig::default());
        let err = builder.resolve_start(&dag, &refs, None).unwrap_err();
        assert!(matches!(err, GraphError::NoStartCommit { .. }));

        refs.add_branch("g".to_string(), "main".to_string());
        assert_eq!(builder.resolve_start(&dag, &refs, None).unwrap(), idx(&dag, "g"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut dag = history();
        let start = idx(&dag, "c");
        let snapshot = TreeBuilder::new(TreeConfig::default())
            .generate(&mut dag, &EditList::new(), start)
            .unwrap();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["start"], "c");
        assert_eq!(json["commits"].as_array().unwrap().len(), 8);
        assert!(json["branches"][0]["id"].is_number());
        assert!(json["commits"][1]["parents"][0]["relation"].is_string());
    }
}
