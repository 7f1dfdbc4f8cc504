use chrono::{DateTime, Utc};
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

use super::edge::Relation;
use crate::segment::BranchId;

/// Index of a commit node inside a [`Dag`](super::Dag) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeIdx(pub usize);

impl fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A commit as handed over by the history loader
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Unique commit ID (SHA)
    pub id: String,
    /// Parent commit IDs, first parent first
    pub parents: Vec<String>,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
    /// Author name
    pub author: String,
    /// Commit message (short)
    pub message: String,
}

impl CommitRecord {
    pub fn new(
        id: String,
        parents: Vec<String>,
        timestamp: DateTime<Utc>,
        author: String,
        message: String,
    ) -> Self {
        Self {
            id,
            parents,
            timestamp,
            author,
            message,
        }
    }

    /// Check if this is a root commit (no parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Check if this is a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Grid cell assigned by the layout engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

/// A commit node in the DAG.
///
/// Identity and the parent/child structure are fixed once the DAG is
/// built. Everything else is per-run annotation owned by segmentation,
/// the merge engine and the layout engine.
#[derive(Debug, Clone)]
pub struct CommitNode {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub message: String,
    /// Display-only ref annotations
    pub tags: Vec<String>,
    pub branch_names: Vec<String>,

    pub(crate) parents: SmallVec<[NodeIdx; 2]>,
    pub(crate) children: Vec<NodeIdx>,

    pub(crate) branch: Option<BranchId>,
    pub(crate) visited: bool,
    pub(crate) join_parent: usize,
    pub(crate) pinned: bool,
    pub(crate) weight: u32,

    pub(crate) position: Option<GridPos>,
    pub(crate) relations: SmallVec<[Option<Relation>; 2]>,
}

impl CommitNode {
    pub(crate) fn from_record(record: CommitRecord) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp,
            author: record.author,
            message: record.message,
            tags: Vec::new(),
            branch_names: Vec::new(),
            parents: SmallVec::new(),
            children: Vec::new(),
            branch: None,
            visited: false,
            join_parent: 0,
            pinned: false,
            weight: 0,
            position: None,
            relations: SmallVec::new(),
        }
    }

    pub fn parents(&self) -> &[NodeIdx] {
        &self.parents
    }

    /// Children, oldest first
    pub fn children(&self) -> &[NodeIdx] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Branch currently owning this node
    pub fn branch(&self) -> Option<BranchId> {
        self.branch
    }

    pub fn visited(&self) -> bool {
        self.visited
    }

    /// Index into `parents()` of the parent continuing this node's branch
    pub fn join_parent(&self) -> usize {
        self.join_parent
    }

    pub fn primary_parent(&self) -> Option<NodeIdx> {
        self.parents.get(self.join_parent).copied()
    }

    /// True when the join parent comes from the edit list
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn position(&self) -> Option<GridPos> {
        self.position
    }

    /// Relation of the edge to `parents()[index]`.
    ///
    /// Falls back to `Continuation` for the join parent and `MergeIn` for the
    /// rest until the layout engine tags the edge.
    pub fn relation(&self, index: usize) -> Relation {
        match self.relations.get(index).copied().flatten() {
            Some(relation) => relation,
            None if index == self.join_parent => Relation::Continuation,
            None => Relation::MergeIn,
        }
    }

    pub(crate) fn parent_index(&self, parent: NodeIdx) -> Option<usize> {
        self.parents.iter().position(|&p| p == parent)
    }

    pub(crate) fn set_relation(&mut self, parent: NodeIdx, relation: Relation) {
        if let Some(index) = self.parent_index(parent) {
            if let Some(slot) = self.relations.get_mut(index) {
                *slot = Some(relation);
            }
        }
    }

    /// Short form of the commit id for logs and tables
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}
