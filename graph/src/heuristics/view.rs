use crate::core::{Dag, NodeIdx};
use crate::segment::{BranchId, BranchSet};

/// Read-only window on the DAG and its current branches, shared by all
/// rules
pub struct MergeView<'a> {
    pub dag: &'a Dag,
    pub branches: &'a BranchSet,
}

impl<'a> MergeView<'a> {
    pub fn new(dag: &'a Dag, branches: &'a BranchSet) -> Self {
        Self { dag, branches }
    }

    pub fn owner(&self, node: NodeIdx) -> Option<BranchId> {
        self.dag.node(node).branch()
    }

    pub fn first(&self, branch: BranchId) -> Option<NodeIdx> {
        self.branches.first(branch)
    }

    pub fn last(&self, branch: BranchId) -> Option<NodeIdx> {
        self.branches.last(branch)
    }

    pub fn len(&self, branch: BranchId) -> usize {
        self.branches.len_of(branch)
    }

    pub fn primary_parent(&self, node: NodeIdx) -> Option<NodeIdx> {
        self.dag.node(node).primary_parent()
    }

    pub fn is_pinned(&self, node: NodeIdx) -> bool {
        self.dag.node(node).is_pinned()
    }

    /// `node` is the newest commit of its branch
    pub fn is_tip(&self, node: NodeIdx) -> bool {
        self.owner(node).and_then(|b| self.last(b)) == Some(node)
    }

    /// `node` is the oldest commit of its branch
    pub fn is_first(&self, node: NodeIdx) -> bool {
        self.owner(node).and_then(|b| self.first(b)) == Some(node)
    }

    /// Parents of `node` other than its join parent
    pub fn side_parents(&self, node: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        let commit = self.dag.node(node);
        let join = commit.join_parent();
        commit
            .parents()
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != join)
            .map(|(_, &p)| p)
    }

    /// Branches starting at a child of `node`, whatever parent edge they
    /// start from
    pub fn branches_starting_at(&self, node: NodeIdx) -> Vec<BranchId> {
        let own = self.owner(node);
        self.dag
            .node(node)
            .children()
            .iter()
            .filter(|&&c| self.is_first(c) && self.owner(c) != own)
            .filter_map(|&c| self.owner(c))
            .collect()
    }

    /// Branches whose first commit has `tip` as its join parent; these are
    /// the branches that could continue the branch ending at `tip`
    pub fn candidates_at(&self, tip: NodeIdx) -> Vec<BranchId> {
        let own = self.owner(tip);
        self.dag
            .node(tip)
            .children()
            .iter()
            .filter(|&&c| {
                self.is_first(c) && self.owner(c) != own && self.primary_parent(c) == Some(tip)
            })
            .filter_map(|&c| self.owner(c))
            .collect()
    }

    /// Commit the branch forked from: join parent of its first commit
    pub fn fork_point(&self, branch: BranchId) -> Option<NodeIdx> {
        self.first(branch).and_then(|f| self.primary_parent(f))
    }

    pub fn fork_owner(&self, branch: BranchId) -> Option<BranchId> {
        self.fork_point(branch).and_then(|p| self.owner(p))
    }

    /// Both branches forked from the same commit or the same branch
    pub fn share_fork(&self, a: BranchId, b: BranchId) -> bool {
        match (self.fork_point(a), self.fork_point(b)) {
            (Some(x), Some(y)) => x == y || self.owner(x) == self.owner(y),
            _ => false,
        }
    }

    /// The tip of `from` has a child on `into`
    pub fn merges_into(&self, from: BranchId, into: BranchId) -> bool {
        self.last(from).is_some_and(|tip| {
            self.dag
                .node(tip)
                .children()
                .iter()
                .any(|&c| self.owner(c) == Some(into))
        })
    }
}
