//! Pattern rules that coalesce over-split branches.
//!
//! Each rule looks at the dirty branches and proposes joins; it never
//! mutates anything itself. Rules run in [`RULES`] order and a later rule
//! sees the joins applied for earlier ones, so the order is part of the
//! behaviour.

use super::view::MergeView;
use crate::core::NodeIdx;
use crate::segment::BranchId;
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Never attributes a commit to the wrong line of history
    Safe,
    /// Better grouping at the cost of occasional misattribution
    Unsafe,
}

/// A structural change suggested by a rule, checked again when applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proposal {
    /// Append the branch starting at `child` to the branch ending at `parent`
    Join { parent: NodeIdx, child: NodeIdx },
    /// Re-route the branch through `parent` at merge commit `node`: the
    /// part below `node` is cut off and `node` continues `parent`'s branch
    Swap { node: NodeIdx, parent: NodeIdx },
}

impl Proposal {
    /// Commit at which the change happens
    pub fn node(&self) -> NodeIdx {
        match *self {
            Proposal::Join { child, .. } => child,
            Proposal::Swap { node, .. } => node,
        }
    }
}

pub type RuleFn = fn(&MergeView, &[BranchId]) -> Vec<Proposal>;

pub struct Rule {
    pub name: &'static str,
    pub tier: Tier,
    /// Follows a non-first parent; disabled when only parent 0 is trusted
    pub right_biased: bool,
    pub apply: RuleFn,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "single-child",
        tier: Tier::Safe,
        right_biased: false,
        apply: single_child,
    },
    Rule {
        name: "primary-parent",
        tier: Tier::Safe,
        right_biased: false,
        apply: primary_parent,
    },
    Rule {
        name: "converging-children",
        tier: Tier::Safe,
        right_biased: false,
        apply: converging_children,
    },
    Rule {
        name: "side-spur",
        tier: Tier::Safe,
        right_biased: false,
        apply: side_spur,
    },
    Rule {
        name: "diamond-left",
        tier: Tier::Safe,
        right_biased: false,
        apply: diamond_left,
    },
    Rule {
        name: "pull-request",
        tier: Tier::Safe,
        right_biased: true,
        apply: pull_request,
    },
    Rule {
        name: "diamond-right",
        tier: Tier::Safe,
        right_biased: true,
        apply: diamond_right,
    },
    Rule {
        name: "majority-children",
        tier: Tier::Unsafe,
        right_biased: false,
        apply: majority_children,
    },
    Rule {
        name: "longest-child",
        tier: Tier::Unsafe,
        right_biased: false,
        apply: longest_child,
    },
    Rule {
        name: "swap-parent",
        tier: Tier::Unsafe,
        right_biased: true,
        apply: swap_parent,
    },
];

/// The first commit's only parent is a tip with no other children
fn single_child(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    work.iter()
        .filter_map(|&branch| {
            let child = view.first(branch)?;
            let [parent] = view.dag.node(child).parents() else {
                return None;
            };
            let parent = *parent;
            (view.is_tip(parent) && view.dag.node(parent).children().len() == 1)
                .then_some(Proposal::Join { parent, child })
        })
        .collect()
}

/// The join parent of the first commit is a tip, and no other branch
/// competes to continue it
fn primary_parent(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    work.iter()
        .filter_map(|&branch| {
            let child = view.first(branch)?;
            let parent = view.primary_parent(child)?;
            (view.is_tip(parent) && view.candidates_at(parent) == [branch])
                .then_some(Proposal::Join { parent, child })
        })
        .collect()
}

/// Several branches could continue a tip, and all but one of them merge
/// back into that one: it is the trunk
fn converging_children(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    work.iter()
        .filter_map(|&branch| {
            let parent = view.last(branch)?;
            let candidates = view.candidates_at(parent);
            if candidates.len() < 2 {
                return None;
            }

            let trunks: Vec<BranchId> = candidates
                .iter()
                .copied()
                .filter(|&trunk| {
                    candidates
                        .iter()
                        .all(|&other| other == trunk || view.merges_into(other, trunk))
                })
                .collect();

            let [trunk] = trunks[..] else {
                return None;
            };
            Some(Proposal::Join { parent, child: view.first(trunk)? })
        })
        .collect()
}

/// Merge commit `child` closes a spur that forked off `trunk`
fn closes_spur(view: &MergeView, child: NodeIdx, trunk: BranchId) -> bool {
    view.side_parents(child).any(|q| {
        let spur = view.owner(q);
        view.is_tip(q)
            && spur != Some(trunk)
            && spur.and_then(|s| view.fork_owner(s)) == Some(trunk)
    })
}

/// Merge commit `child` reconverges two branches that forked together
fn closes_diamond(view: &MergeView, child: NodeIdx, left: BranchId) -> bool {
    view.side_parents(child).any(|q| match view.owner(q) {
        Some(right) => view.is_tip(q) && right != left && view.share_fork(left, right),
        None => false,
    })
}

/// Among the branches competing for the join parent tip, the only one whose
/// first commit satisfies `pattern` wins
fn unique_left_match<F>(view: &MergeView, work: &[BranchId], pattern: F) -> Vec<Proposal>
where
    F: Fn(&MergeView, NodeIdx, BranchId) -> bool,
{
    work.iter()
        .filter_map(|&branch| {
            let child = view.first(branch)?;
            if !view.dag.node(child).is_merge() {
                return None;
            }
            let parent = view.primary_parent(child)?;
            let left = view.owner(parent)?;
            if !view.is_tip(parent) || !pattern(view, child, left) {
                return None;
            }

            let matching = view
                .candidates_at(parent)
                .into_iter()
                .filter_map(|c| view.first(c))
                .filter(|&f| view.dag.node(f).is_merge() && pattern(view, f, left))
                .count();
            (matching == 1).then_some(Proposal::Join { parent, child })
        })
        .collect()
}

fn side_spur(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    unique_left_match(view, work, closes_spur)
}

fn diamond_left(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    unique_left_match(view, work, closes_diamond)
}

/// The join parent of merge commit `child` sits inside a branch that
/// carries on elsewhere, so `child` continues a side parent's branch
/// instead when `pattern` accepts that side branch
fn right_match<F>(view: &MergeView, work: &[BranchId], pattern: F) -> Vec<Proposal>
where
    F: Fn(&MergeView, BranchId, BranchId) -> bool,
{
    work.iter()
        .filter_map(|&branch| {
            let child = view.first(branch)?;
            if !view.dag.node(child).is_merge() || view.is_pinned(child) {
                return None;
            }
            let left_parent = view.primary_parent(child)?;
            if view.is_tip(left_parent) {
                return None;
            }
            let left = view.owner(left_parent)?;

            let parent = view.side_parents(child).find(|&q| {
                let Some(right) = view.owner(q) else {
                    return false;
                };
                view.is_tip(q)
                    && right != left
                    && right != branch
                    && pattern(view, left, right)
                    && view.branches_starting_at(q) == [branch]
            })?;
            Some(Proposal::Join { parent, child })
        })
        .collect()
}

/// A feature branch that forked off `left` pulled `left` back in and
/// continued
fn pull_request(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    right_match(view, work, |view, left, right| view.fork_owner(right) == Some(left))
}

fn diamond_right(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    right_match(view, work, |view, left, right| view.share_fork(left, right))
}

/// Three or more branches compete for a tip: the one most siblings merge
/// into wins, then the longest, then the oldest id
fn majority_children(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    work.iter()
        .filter_map(|&branch| {
            let parent = view.last(branch)?;
            let candidates = view.candidates_at(parent);
            if candidates.len() < 3 {
                return None;
            }

            let winner = candidates.iter().copied().max_by_key(|&c| {
                let votes = candidates
                    .iter()
                    .filter(|&&other| other != c && view.merges_into(other, c))
                    .count();
                (votes, view.len(c), Reverse(c))
            })?;
            Some(Proposal::Join { parent, child: view.first(winner)? })
        })
        .collect()
}

/// Two branches compete for a tip: the longer one wins, then the one that
/// started earlier
fn longest_child(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    work.iter()
        .filter_map(|&branch| {
            let parent = view.last(branch)?;
            let candidates = view.candidates_at(parent);
            if candidates.len() != 2 {
                return None;
            }

            let winner = candidates.iter().copied().max_by_key(|&c| {
                let started = view.first(c).map(|f| view.dag.node(f).timestamp);
                (view.len(c), Reverse(started), Reverse(c))
            })?;
            Some(Proposal::Join { parent, child: view.first(winner)? })
        })
        .collect()
}

/// A branch runs through a merge commit via a short spur while the other
/// parent ends a much longer branch: route the merge through the longer one
fn swap_parent(view: &MergeView, work: &[BranchId]) -> Vec<Proposal> {
    work.iter()
        .filter_map(|&branch| {
            let ordered = view.branches.get(branch).ordered();
            let head = *ordered.first()?;
            if view.dag.node(head).is_root() {
                return None;
            }

            ordered.iter().enumerate().skip(1).find_map(|(prefix_len, &node)| {
                let commit = view.dag.node(node);
                if !commit.is_merge() || commit.is_pinned() {
                    return None;
                }
                let parent = view.side_parents(node).find(|&q| {
                    view.is_tip(q)
                        && view.owner(q).is_some_and(|other| {
                            other != branch && view.len(other) > 2 * prefix_len
                        })
                })?;
                Some(Proposal::Swap { node, parent })
            })
        })
        .collect()
}
