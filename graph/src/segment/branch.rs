use crate::core::{Dag, NodeIdx};
use crate::error::{GraphError, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Identity of a branch inside a [`BranchSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// A maximal chain of commits drawn as one line.
///
/// Membership is a plain set; the ordered view (oldest first, tip last)
/// is rebuilt from the DAG whenever membership changes.
#[derive(Debug, Clone)]
pub struct Branch {
    id: BranchId,
    members: BTreeSet<NodeIdx>,
    ordered: Vec<NodeIdx>,
    dirty: bool,
    weight: u32,
    /// Scratch flag of the merge engine
    pub(crate) visited: bool,
    /// Set once the layout engine reserved a column for this branch
    pub(crate) laid_out: bool,
}

impl Branch {
    fn new(id: BranchId) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            ordered: Vec::new(),
            dirty: false,
            weight: 0,
            visited: false,
            laid_out: false,
        }
    }

    pub fn id(&self) -> BranchId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node: NodeIdx) -> bool {
        self.members.contains(&node)
    }

    pub fn members(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.members.iter().copied()
    }

    /// Members from the oldest commit to the tip
    pub fn ordered(&self) -> &[NodeIdx] {
        debug_assert!(!self.dirty, "ordered list of {} read before rebuild", self.id);
        &self.ordered
    }

    pub fn first(&self) -> Option<NodeIdx> {
        self.ordered().first().copied()
    }

    pub fn last(&self) -> Option<NodeIdx> {
        self.ordered().last().copied()
    }

    /// Smallest member weight
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn visited(&self) -> bool {
        self.visited
    }

    pub fn laid_out(&self) -> bool {
        self.laid_out
    }
}

/// Arena of branches. Ids are handed out by a counter owned by the set and
/// are never reused within one run, even after a branch dies.
#[derive(Debug, Clone, Default)]
pub struct BranchSet {
    branches: Vec<Branch>,
    next_id: usize,
}

impl BranchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new branch holding `node`
    pub fn create(&mut self, dag: &mut Dag, node: NodeIdx) -> BranchId {
        let id = BranchId(self.next_id);
        self.next_id += 1;
        self.branches.push(Branch::new(id));
        self.add(dag, id, node);
        id
    }

    pub fn add(&mut self, dag: &mut Dag, id: BranchId, node: NodeIdx) {
        let branch = &mut self.branches[id.0];
        branch.members.insert(node);
        branch.dirty = true;
        dag.set_owner(node, id);
    }

    pub fn get(&self, id: BranchId) -> &Branch {
        &self.branches[id.0]
    }

    /// Branches that still own at least one commit, by id
    pub fn alive(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| !b.is_empty())
    }

    pub fn alive_ids(&self) -> Vec<BranchId> {
        self.alive().map(|b| b.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn is_alive(&self, id: BranchId) -> bool {
        !self.branches[id.0].is_empty()
    }

    pub fn first(&self, id: BranchId) -> Option<NodeIdx> {
        self.get(id).first()
    }

    pub fn last(&self, id: BranchId) -> Option<NodeIdx> {
        self.get(id).last()
    }

    pub fn len_of(&self, id: BranchId) -> usize {
        self.get(id).len()
    }

    /// Rebuild every branch touched since its last rebuild
    pub fn rebuild_dirty(&mut self, dag: &Dag) -> Result<()> {
        for i in 0..self.branches.len() {
            if self.branches[i].dirty {
                self.rebuild(dag, BranchId(i))?;
            }
        }
        Ok(())
    }

    /// Recompute the ordered list by walking child links from the only
    /// member without a parent inside the branch
    pub fn rebuild(&mut self, dag: &Dag, id: BranchId) -> Result<()> {
        let branch = &self.branches[id.0];
        let expected = branch.members.len();

        let heads: Vec<NodeIdx> = branch
            .members()
            .filter(|&n| !dag.node(n).parents().iter().any(|p| branch.contains(*p)))
            .collect();

        let mut ordered = Vec::with_capacity(expected);
        let mut walked = HashSet::with_capacity(expected);

        if let Some(&head) = heads.first() {
            let mut cur = head;
            loop {
                ordered.push(cur);
                walked.insert(cur);
                let next = dag.node(cur).children().iter().copied().find(|&c| {
                    branch.contains(c)
                        && !walked.contains(&c)
                        && dag
                            .node(c)
                            .parents()
                            .iter()
                            .all(|p| !branch.contains(*p) || walked.contains(p))
                });
                match next {
                    Some(c) => cur = c,
                    None => break,
                }
            }
        }

        if heads.len() != 1 || ordered.len() != expected {
            return Err(GraphError::BrokenChain {
                branch: id,
                expected,
                actual: ordered.len(),
            });
        }

        let weight = ordered.iter().map(|&n| dag.node(n).weight()).min().unwrap_or(0);
        let branch = &mut self.branches[id.0];
        branch.ordered = ordered;
        branch.weight = weight;
        branch.dirty = false;
        Ok(())
    }

    /// Concatenate two branches where the tip of `upper` is a parent of the
    /// first commit of `lower`. The smaller id survives; the other dies.
    pub fn join(&mut self, dag: &mut Dag, upper: BranchId, lower: BranchId) -> Result<BranchId> {
        let (keep, drop) = if upper < lower { (upper, lower) } else { (lower, upper) };

        let moved = std::mem::take(&mut self.branches[drop.0].members);
        self.branches[drop.0].ordered.clear();
        self.branches[drop.0].dirty = false;

        for node in moved {
            self.add(dag, keep, node);
        }

        self.rebuild(dag, keep)?;
        Ok(keep)
    }

    /// Cut `id` right before `node`: the older part moves to a new branch,
    /// `node` and its descendants keep `id`. Returns the new branch.
    pub fn split_at(&mut self, dag: &mut Dag, id: BranchId, node: NodeIdx) -> Result<BranchId> {
        let ordered = self.get(id).ordered().to_vec();
        let cut = ordered.iter().position(|&n| n == node).unwrap_or(0);
        if cut == 0 {
            return Ok(id);
        }

        let prefix = self.create(dag, ordered[0]);
        for &n in &ordered[1..cut] {
            self.add(dag, prefix, n);
        }

        let branch = &mut self.branches[id.0];
        for n in &ordered[..cut] {
            branch.members.remove(n);
        }
        branch.dirty = true;

        self.rebuild(dag, prefix)?;
        self.rebuild(dag, id)?;
        Ok(prefix)
    }

    pub(crate) fn clear_visited(&mut self) {
        for branch in &mut self.branches {
            branch.visited = false;
        }
    }

    pub(crate) fn mark_visited(&mut self, id: BranchId) {
        self.branches[id.0].visited = true;
    }

    /// Forget layout state; merge-engine flags stay untouched
    pub fn reset_layout(&mut self) {
        for branch in &mut self.branches {
            branch.laid_out = false;
        }
    }

    pub(crate) fn mark_laid_out(&mut self, id: BranchId) {
        self.branches[id.0].laid_out = true;
    }
}
