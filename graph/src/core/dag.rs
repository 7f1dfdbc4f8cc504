use super::node::{CommitNode, CommitRecord, GridPos, NodeIdx};
use crate::error::GraphError;
use crate::segment::BranchId;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Directed Acyclic Graph representing commit history.
///
/// Nodes live in an arena and reference each other by [`NodeIdx`]. Branch
/// ownership is stored on the node as a [`BranchId`], so the branch arena
/// and the DAG never hold pointers into each other.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    nodes: Vec<CommitNode>,
    /// Quick lookup: commit ID -> arena index
    index: HashMap<String, NodeIdx>,
    edge_count: usize,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a DAG from a deduplicated commit log.
    ///
    /// Parents that are not part of `records` (shallow or truncated logs)
    /// are dropped.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CommitRecord>,
    {
        let mut dag = Dag::new();
        let mut pending = Vec::new();

        for record in records {
            let parents = record.parents.clone();
            let idx = dag.add_node(record);
            pending.push((idx, parents));
        }

        for (idx, parents) in pending {
            for parent_id in parents {
                match dag.find(&parent_id) {
                    Some(parent) => dag.add_parent_edge(idx, parent),
                    None => debug!(
                        commit = %dag.node(idx).id,
                        parent = %parent_id,
                        "dropping edge to commit outside the loaded history"
                    ),
                }
            }
        }

        dag.compute_weights();
        dag
    }

    /// Add a commit node to the DAG; a repeated commit id returns the
    /// existing node untouched
    pub fn add_node(&mut self, record: CommitRecord) -> NodeIdx {
        if let Some(&idx) = self.index.get(&record.id) {
            return idx;
        }

        let idx = NodeIdx(self.nodes.len());
        self.index.insert(record.id.clone(), idx);
        self.nodes.push(CommitNode::from_record(record));
        idx
    }

    /// Append `parent` to the parent list of `child` and register the
    /// reverse edge, keeping the child list ordered by commit time
    pub fn add_parent_edge(&mut self, child: NodeIdx, parent: NodeIdx) {
        if child == parent || self.nodes[child.0].parents.contains(&parent) {
            debug!(
                commit = %self.nodes[child.0].id,
                parent = %self.nodes[parent.0].id,
                "ignoring duplicate parent edge"
            );
            return;
        }

        let node = &mut self.nodes[child.0];
        node.parents.push(parent);
        node.relations.push(None);

        let key = (self.nodes[child.0].timestamp, child);
        let siblings = &self.nodes[parent.0].children;
        let at = siblings.partition_point(|&c| (self.nodes[c.0].timestamp, c) < key);
        self.nodes[parent.0].children.insert(at, child);

        self.edge_count += 1;
    }

    pub fn node(&self, idx: NodeIdx) -> &CommitNode {
        &self.nodes[idx.0]
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIdx) -> &mut CommitNode {
        &mut self.nodes[idx.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &CommitNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIdx(i), n))
    }

    pub fn indices(&self) -> impl Iterator<Item = NodeIdx> {
        (0..self.nodes.len()).map(NodeIdx)
    }

    /// Look up a commit by its full id
    pub fn find(&self, id: &str) -> Option<NodeIdx> {
        self.index.get(id).copied()
    }

    /// Look up a commit by full id or unique abbreviated id
    pub fn find_prefix(&self, prefix: &str) -> Result<NodeIdx, GraphError> {
        if let Some(idx) = self.find(prefix) {
            return Ok(idx);
        }

        let mut matches = self
            .nodes()
            .filter(|(_, node)| !prefix.is_empty() && node.id.starts_with(prefix))
            .map(|(idx, _)| idx);

        match (matches.next(), matches.next()) {
            (Some(idx), None) => Ok(idx),
            (Some(_), Some(_)) => Err(GraphError::AmbiguousCommit(prefix.to_string())),
            (None, _) => Err(GraphError::UnknownCommit(prefix.to_string())),
        }
    }

    pub fn annotate_tag(&mut self, idx: NodeIdx, name: impl Into<String>) {
        self.nodes[idx.0].tags.push(name.into());
    }

    pub fn annotate_branch(&mut self, idx: NodeIdx, name: impl Into<String>) {
        self.nodes[idx.0].branch_names.push(name.into());
    }

    /// Get all root commits (no parents)
    pub fn roots(&self) -> Vec<NodeIdx> {
        self.nodes()
            .filter(|(_, node)| node.is_root())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Get all leaf commits (no children)
    pub fn leaves(&self) -> Vec<NodeIdx> {
        self.nodes()
            .filter(|(_, node)| node.is_leaf())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Assign generation numbers: roots weigh 0, every other commit one
    /// more than its heaviest parent
    pub fn compute_weights(&mut self) {
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.parents.len()).collect();
        let mut queue: VecDeque<NodeIdx> = self.roots().into();

        for node in &mut self.nodes {
            node.weight = 0;
        }

        while let Some(idx) = queue.pop_front() {
            let weight = self.nodes[idx.0].weight;
            for i in 0..self.nodes[idx.0].children.len() {
                let child = self.nodes[idx.0].children[i];
                let slot = &mut self.nodes[child.0];
                slot.weight = slot.weight.max(weight + 1);
                pending[child.0] -= 1;
                if pending[child.0] == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    /// Clear every per-run annotation before a fresh segmentation pass.
    /// Parent/child structure, refs and weights are kept.
    pub fn reset_run(&mut self) {
        for node in &mut self.nodes {
            node.branch = None;
            node.visited = false;
            node.join_parent = 0;
            node.pinned = false;
            node.position = None;
            node.relations.iter_mut().for_each(|r| *r = None);
        }
    }

    /// Clear layout annotations only; discovery state stays intact
    pub fn reset_layout(&mut self) {
        for node in &mut self.nodes {
            node.position = None;
            node.relations.iter_mut().for_each(|r| *r = None);
        }
    }

    pub(crate) fn set_owner(&mut self, idx: NodeIdx, branch: BranchId) {
        self.nodes[idx.0].branch = Some(branch);
    }

    pub(crate) fn place(&mut self, idx: NodeIdx, x: usize, y: usize) {
        self.nodes[idx.0].position = Some(GridPos { x, y });
    }

    /// Count of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Count of edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if DAG contains disconnected histories
    pub fn has_orphan_branches(&self) -> bool {
        self.roots().len() > 1
    }

    /// Get statistics about the DAG
    pub fn stats(&self) -> DagStats {
        let merge_commits = self.nodes.iter().filter(|n| n.is_merge()).count();

        DagStats {
            total_commits: self.nodes.len(),
            total_edges: self.edge_count,
            merge_commits,
            root_commits: self.roots().len(),
            leaf_commits: self.leaves().len(),
            max_generation: self.nodes.iter().map(|n| n.weight).max().unwrap_or(0),
            has_orphans: self.has_orphan_branches(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DagStats {
    pub total_commits: usize,
    pub total_edges: usize,
    pub merge_commits: usize,
    pub root_commits: usize,
    pub leaf_commits: usize,
    pub max_generation: u32,
    pub has_orphans: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Relation;
    use crate::testing::{dag_from, record};

    #[test]
    fn test_add_node_is_idempotent() {
        let mut dag = Dag::new();
        let a = dag.add_node(record("aaa", "", 0));
        let again = dag.add_node(record("aaa", "", 5));

        assert_eq!(a, again);
        assert_eq!(dag.node_count(), 1);
    }

    #[test]
    fn test_children_sorted_by_time() {
        let mut dag = Dag::new();
        let root = dag.add_node(record("root", "", 0));
        let late = dag.add_node(record("late", "root", 30));
        let early = dag.add_node(record("early", "root", 10));
        let mid = dag.add_node(record("mid", "root", 20));

        dag.add_parent_edge(late, root);
        dag.add_parent_edge(early, root);
        dag.add_parent_edge(mid, root);

        assert_eq!(dag.node(root).children(), &[early, mid, late]);
        assert_eq!(dag.edge_count(), 3);
    }

    #[test]
    fn test_roots_leaves_and_stats() {
        let dag = dag_from(&[
            ("base", ""),
            ("b1", "base"),
            ("b2", "base"),
            ("merge", "b1 b2"),
            ("orphan", ""),
        ]);

        let roots: Vec<_> = dag.roots().into_iter().map(|i| dag.node(i).id.clone()).collect();
        let leaves: Vec<_> = dag.leaves().into_iter().map(|i| dag.node(i).id.clone()).collect();
        assert_eq!(roots, vec!["base", "orphan"]);
        assert_eq!(leaves, vec!["merge", "orphan"]);

        let stats = dag.stats();
        assert_eq!(stats.total_commits, 5);
        assert_eq!(stats.total_edges, 4);
        assert_eq!(stats.merge_commits, 1);
        assert_eq!(stats.max_generation, 2);
        assert!(stats.has_orphans);
    }

    #[test]
    fn test_missing_parents_are_dropped() {
        let dag = dag_from(&[("b", "a"), ("c", "b")]);
        let b = dag.find("b").unwrap();

        assert!(dag.node(b).is_root());
        assert_eq!(dag.edge_count(), 1);
    }

    #[test]
    fn test_weights_follow_longest_path() {
        let dag = dag_from(&[
            ("r", ""),
            ("a", "r"),
            ("b", "a"),
            ("m", "r b"),
        ]);
        let m = dag.find("m").unwrap();
        assert_eq!(dag.node(m).weight(), 3);
    }

    #[test]
    fn test_merge_relations_default() {
        let dag = dag_from(&[("r", ""), ("a", "r"), ("b", "r"), ("m", "a b")]);
        let m = dag.find("m").unwrap();

        let node = dag.node(m);
        assert_eq!(node.parents().len(), 2);
        assert_eq!(node.relation(0), Relation::Continuation);
        assert_eq!(node.relation(1), Relation::MergeIn);
        assert_eq!(node.parents()[1], dag.find("b").unwrap());
    }

    #[test]
    fn test_find_prefix() {
        let dag = dag_from(&[("abc123", ""), ("abd456", "abc123")]);

        assert_eq!(dag.find_prefix("abc").unwrap(), dag.find("abc123").unwrap());
        assert!(matches!(dag.find_prefix("ab"), Err(GraphError::AmbiguousCommit(_))));
        assert!(matches!(dag.find_prefix("zzz"), Err(GraphError::UnknownCommit(_))));
    }

    #[test]
    fn test_reset_run_keeps_structure() {
        let mut dag = dag_from(&[("a", ""), ("b", "a")]);
        let b = dag.find("b").unwrap();
        dag.node_mut(b).visited = true;
        dag.node_mut(b).join_parent = 0;
        dag.place(b, 3, 4);

        dag.reset_run();

        assert!(!dag.node(b).visited());
        assert!(dag.node(b).position().is_none());
        assert_eq!(dag.node(b).parents().len(), 1);
        assert_eq!(dag.node(b).weight(), 1);
    }
}
