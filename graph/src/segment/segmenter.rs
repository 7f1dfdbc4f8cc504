use super::branch::{BranchId, BranchSet};
use crate::core::{Dag, NodeIdx};
use crate::edits::EditList;
use crate::error::Result;
use smallvec::SmallVec;
use tracing::{info, warn};

/// Partition the DAG into chains, starting with the main branch through
/// `start`.
///
/// Three passes claim commits: the chain through `start`, then every
/// unclaimed merge commit, then every unclaimed leaf (oldest first in both
/// cases). Each pass runs the same chain-trace-and-fan-out walk, so every
/// commit ends up in exactly one branch.
pub fn segment(dag: &mut Dag, edits: &EditList, start: NodeIdx) -> Result<BranchSet> {
    dag.reset_run();
    apply_edits(dag, edits);

    let mut branches = BranchSet::new();
    trace_from(dag, &mut branches, start);

    for seed in unclaimed(dag, |node| node.is_merge()) {
        if dag.node(seed).branch().is_none() {
            trace_from(dag, &mut branches, seed);
        }
    }

    for seed in unclaimed(dag, |node| node.is_leaf()) {
        if dag.node(seed).branch().is_none() {
            trace_from(dag, &mut branches, seed);
        }
    }

    branches.rebuild_dirty(dag)?;

    info!(
        commits = dag.node_count(),
        branches = branches.alive_count(),
        "segmented history"
    );
    Ok(branches)
}

/// Copy edit-list overrides onto the join parent of each commit
fn apply_edits(dag: &mut Dag, edits: &EditList) {
    if edits.is_empty() {
        return;
    }

    for idx in dag.indices().collect::<Vec<_>>() {
        let node = dag.node(idx);
        let Some(index) = edits.get_primary_parent_index(&node.id) else {
            continue;
        };

        if index < node.parents().len() {
            let node = dag.node_mut(idx);
            node.join_parent = index;
            node.pinned = true;
        } else {
            warn!(
                commit = %node.id,
                index,
                parents = node.parents().len(),
                "ignoring edit entry pointing past the last parent"
            );
        }
    }
}

/// Unclaimed commits matching `filter`, oldest first
fn unclaimed<F>(dag: &Dag, filter: F) -> Vec<NodeIdx>
where
    F: Fn(&crate::core::CommitNode) -> bool,
{
    let mut seeds: Vec<NodeIdx> = dag
        .nodes()
        .filter(|(_, node)| node.branch().is_none() && filter(node))
        .map(|(idx, _)| idx)
        .collect();
    seeds.sort_by_key(|&idx| (dag.node(idx).timestamp, idx));
    seeds
}

/// Chain-trace-and-fan-out from `seed`.
///
/// The join parent of the current commit is absorbed into the current
/// branch while it is unclaimed; every other unclaimed parent opens a new
/// branch and is queued on the stack for its own trace.
fn trace_from(dag: &mut Dag, branches: &mut BranchSet, seed: NodeIdx) {
    let mut stack = vec![seed];

    while let Some(node) = stack.pop() {
        if dag.node(node).visited() {
            continue;
        }

        let branch: BranchId = match dag.node(node).branch() {
            Some(branch) => branch,
            None => branches.create(dag, node),
        };

        let mut cur = node;
        loop {
            dag.node_mut(cur).visited = true;

            let parents: SmallVec<[NodeIdx; 2]> = dag.node(cur).parents().into();
            let join = dag.node(cur).join_parent();
            let mut next = None;

            if let Some(&parent) = parents.get(join) {
                if dag.node(parent).branch().is_none() {
                    branches.add(dag, branch, parent);
                    next = Some(parent);
                }
            }

            for (i, &parent) in parents.iter().enumerate() {
                if i != join && dag.node(parent).branch().is_none() {
                    branches.create(dag, parent);
                    stack.push(parent);
                }
            }

            match next {
                Some(parent) => cur = parent,
                None => break,
            }
        }
    }
}
