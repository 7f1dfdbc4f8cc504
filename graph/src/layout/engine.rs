use super::occupancy::OccupancyMatrix;
use crate::core::{Dag, NodeIdx, Relation};
use crate::segment::{BranchId, BranchSet};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutSummary {
    pub width: usize,
    pub height: usize,
    /// Branches no anchor could reach
    pub unplaced: Vec<BranchId>,
}

/// Walk position inside one branch
#[derive(Debug, Clone, Copy)]
struct LayoutState {
    branch: BranchId,
    x: usize,
    row: usize,
    cursor: usize,
}

struct Placer {
    grid: OccupancyMatrix,
    stack: Vec<LayoutState>,
    height: usize,
}

impl Placer {
    /// Reserve a column for `branch` with its first commit on `start_row`
    /// and queue it for placement
    fn open(
        &mut self,
        branches: &mut BranchSet,
        branch: BranchId,
        from_x: usize,
        start_row: usize,
    ) {
        let rows = start_row..start_row + branches.len_of(branch);
        let x = self.grid.find_free_column(from_x, rows.clone());
        self.grid.reserve(x, rows);
        branches.mark_laid_out(branch);

        debug!(%branch, x, row = start_row, "opened branch column");
        self.stack.push(LayoutState {
            branch,
            x,
            row: start_row,
            cursor: 0,
        });
    }

    /// Drain the stack, placing every commit of every branch reached
    fn walk(&mut self, dag: &mut Dag, branches: &mut BranchSet) {
        while let Some(top) = self.stack.last_mut() {
            let Some(&node) = branches.get(top.branch).ordered().get(top.cursor) else {
                self.stack.pop();
                continue;
            };
            let LayoutState { branch, x, row, .. } = *top;
            top.cursor += 1;
            top.row += 1;

            dag.place(node, x, row);
            self.height = self.height.max(row + 1);

            let children = dag.node(node).children().to_vec();
            for child in children {
                let owner = dag.node(child).branch();
                let joins = dag.node(child).primary_parent() == Some(node);
                let relation = match (owner == Some(branch), joins) {
                    (true, true) => Relation::Continuation,
                    (false, true) => Relation::BranchOut,
                    (_, false) => Relation::MergeIn,
                };
                dag.node_mut(child).set_relation(node, relation);

                let Some(owner) = owner else {
                    continue;
                };
                if owner == branch || branches.get(owner).laid_out() {
                    continue;
                }

                // the child lands one row below its parent
                let offset = position_in(branches, owner, child);
                let start_row = (row + 1).saturating_sub(offset);
                self.open(branches, owner, x + 1, start_row);
            }
        }
    }
}

fn position_in(branches: &BranchSet, branch: BranchId, node: NodeIdx) -> usize {
    branches
        .get(branch)
        .ordered()
        .iter()
        .position(|&n| n == node)
        .unwrap_or(0)
}

/// Where to start the next disconnected piece: `(branch, from_x, start_row)`.
///
/// A branch feeding into something already placed sits right of that
/// commit, one row above it. Otherwise a branch starting at a root opens
/// at the top, right of the main column.
fn find_anchor(dag: &Dag, branches: &BranchSet) -> Option<(BranchId, usize, usize)> {
    let pending: Vec<BranchId> = branches
        .alive()
        .filter(|b| !b.laid_out())
        .map(|b| b.id())
        .collect();

    let fed = pending.iter().find_map(|&branch| {
        branches
            .get(branch)
            .ordered()
            .iter()
            .enumerate()
            .find_map(|(offset, &member)| {
                let placed = dag
                    .node(member)
                    .children()
                    .iter()
                    .find_map(|&c| dag.node(c).position())?;
                Some((branch, placed.x + 1, placed.y.saturating_sub(1 + offset)))
            })
    });

    fed.or_else(|| {
        pending
            .iter()
            .copied()
            .find(|&b| branches.first(b).is_some_and(|f| dag.node(f).is_root()))
            .map(|b| (b, 1, 0))
    })
}

/// Assign a grid cell to every commit reachable from the main branch and
/// tag every parent edge leaving a placed commit.
///
/// The main branch (owner of `start`) takes column 0 from row 0. Child
/// branches go to the first free column right of the commit they fork
/// from. Earlier layout results are discarded first; branch ownership and
/// discovery flags are not touched.
pub fn layout(dag: &mut Dag, branches: &mut BranchSet, start: NodeIdx) -> LayoutSummary {
    dag.reset_layout();
    branches.reset_layout();

    let mut placer = Placer {
        grid: OccupancyMatrix::new(),
        stack: Vec::new(),
        height: 0,
    };

    if let Some(main) = dag.node(start).branch() {
        placer.open(branches, main, 0, 0);
    }

    loop {
        placer.walk(dag, branches);
        match find_anchor(dag, branches) {
            Some((branch, from_x, row)) => {
                debug!(%branch, from_x, row, "anchoring disconnected branch");
                placer.open(branches, branch, from_x, row);
            }
            None => break,
        }
    }

    let unplaced: Vec<BranchId> = branches
        .alive()
        .filter(|b| !b.laid_out())
        .map(|b| b.id())
        .collect();

    info!(
        width = placer.grid.width(),
        height = placer.height,
        unplaced = unplaced.len(),
        "laid out branches"
    );
    LayoutSummary {
        width: placer.grid.width(),
        height: placer.height,
        unplaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GridPos;
    use crate::edits::EditList;
    use crate::heuristics::MergeEngine;
    use crate::segment::segment;
    use crate::testing::{dag_from, idx};
    use pretty_assertions::assert_eq;

    fn run(dag: &mut Dag, start: &str) -> (BranchSet, LayoutSummary) {
        let start = idx(dag, start);
        let mut branches = segment(dag, &EditList::new(), start).unwrap();
        MergeEngine::new().run(dag, &mut branches).unwrap();
        let summary = layout(dag, &mut branches, start);
        (branches, summary)
    }

    fn pos(dag: &Dag, id: &str) -> (usize, usize) {
        let GridPos { x, y } = dag.node(idx(dag, id)).position().unwrap();
        (x, y)
    }

    fn relation(dag: &Dag, child: &str, parent_index: usize) -> Relation {
        dag.node(idx(dag, child)).relation(parent_index)
    }

    #[test]
    fn test_linear_chain_in_first_column() {
        let mut dag = dag_from(&[("a", ""), ("b", "a"), ("c", "b"), ("d", "c"), ("e", "d")]);
        let (_, summary) = run(&mut dag, "e");

        for (row, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            assert_eq!(pos(&dag, id), (0, row));
        }
        assert_eq!(summary.width, 1);
        assert_eq!(summary.height, 5);
        assert!(summary.unplaced.is_empty());
    }

    #[test]
    fn test_feature_branch_opens_next_column() {
        let mut dag = dag_from(&[("r", ""), ("a", "r"), ("f", "r"), ("m", "a f")]);
        let (_, summary) = run(&mut dag, "m");

        assert_eq!(pos(&dag, "r"), (0, 0));
        assert_eq!(pos(&dag, "a"), (0, 1));
        assert_eq!(pos(&dag, "m"), (0, 2));
        assert_eq!(pos(&dag, "f"), (1, 1));
        assert_eq!(summary.width, 2);

        assert_eq!(relation(&dag, "a", 0), Relation::Continuation);
        assert_eq!(relation(&dag, "f", 0), Relation::BranchOut);
        assert_eq!(relation(&dag, "m", 0), Relation::Continuation);
        assert_eq!(relation(&dag, "m", 1), Relation::MergeIn);
    }

    #[test]
    fn test_sibling_branches_do_not_collide() {
        let mut dag = dag_from(&[
            ("r", ""),
            ("a", "r"),
            ("x1", "r"),
            ("y1", "r"),
            ("x2", "x1"),
            ("y2", "y1"),
            ("b", "a"),
        ]);
        let (branches, _) = run(&mut dag, "b");

        let spans: Vec<(usize, usize, usize)> = branches
            .alive()
            .map(|b| {
                let first = dag.node(b.first().unwrap()).position().unwrap();
                let last = dag.node(b.last().unwrap()).position().unwrap();
                (first.x, first.y, last.y)
            })
            .collect();

        for (i, a) in spans.iter().enumerate() {
            for b in &spans[i + 1..] {
                let overlap = a.1 <= b.2 && b.1 <= a.2;
                assert!(!(overlap && a.0 == b.0), "{:?} collides with {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_disconnected_root_is_anchored() {
        let mut dag = dag_from(&[("r", ""), ("a", "r"), ("z", ""), ("z2", "z")]);
        let (_, summary) = run(&mut dag, "a");

        assert_eq!(pos(&dag, "r"), (0, 0));
        assert_eq!(pos(&dag, "z"), (1, 0));
        assert_eq!(pos(&dag, "z2"), (1, 1));
        assert!(summary.unplaced.is_empty());
    }

    #[test]
    fn test_side_root_anchors_next_to_its_merge() {
        let mut dag = dag_from(&[("r", ""), ("a", "r"), ("z", ""), ("m", "a z")]);
        let (_, summary) = run(&mut dag, "m");

        assert_eq!(pos(&dag, "m"), (0, 2));
        assert_eq!(pos(&dag, "z"), (1, 1));
        assert_eq!(relation(&dag, "m", 1), Relation::MergeIn);
        assert!(summary.unplaced.is_empty());
    }

    #[test]
    fn test_layout_leaves_discovery_state_alone() {
        let mut dag = dag_from(&[
            ("r", ""),
            ("a", "r"),
            ("f", "r"),
            ("m", "a f"),
            ("z", ""),
        ]);
        let start = idx(&dag, "m");
        let mut branches = segment(&mut dag, &EditList::new(), start).unwrap();
        MergeEngine::new().run(&mut dag, &mut branches).unwrap();

        let snapshot = |dag: &Dag, branches: &BranchSet| {
            let nodes: Vec<_> = dag
                .nodes()
                .map(|(_, n)| (n.branch(), n.visited(), n.join_parent()))
                .collect();
            let merged: Vec<_> = branches.alive().map(|b| (b.id(), b.visited())).collect();
            (nodes, merged)
        };
        let before = snapshot(&dag, &branches);

        let first = layout(&mut dag, &mut branches, start);
        let second = layout(&mut dag, &mut branches, start);

        assert_eq!(snapshot(&dag, &branches), before);
        assert_eq!(first, second);
        assert!(dag.nodes().all(|(_, n)| n.visited()));
    }
}
