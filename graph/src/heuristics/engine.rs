use super::rules::{Proposal, Rule, Tier, RULES};
use super::view::MergeView;
use crate::core::{Dag, NodeIdx};
use crate::error::Result;
use crate::segment::{BranchId, BranchSet};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// One successful rule application, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleApplication {
    pub commit: String,
    pub rule: &'static str,
    pub iteration: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub applications: Vec<RuleApplication>,
    pub iterations: usize,
    /// False when the iteration cap stopped a round early
    pub converged: bool,
}

/// Fixpoint driver for the rule set.
///
/// Round one applies the safe rules only, round two safe and unsafe ones.
/// Within a round each iteration runs every rule over the dirty branches;
/// whatever changed, plus its neighbours, is dirty for the next iteration.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    trust_parent0_only: bool,
    max_iterations: usize,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self {
            trust_parent0_only: false,
            max_iterations: 10_000,
        }
    }
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the rules that continue a branch through a non-first parent
    pub fn trust_parent0_only(mut self, trust: bool) -> Self {
        self.trust_parent0_only = trust;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    fn rules_for(&self, tiers: &[Tier]) -> Vec<&'static Rule> {
        RULES
            .iter()
            .filter(|rule| tiers.contains(&rule.tier))
            .filter(|rule| !(self.trust_parent0_only && rule.right_biased))
            .collect()
    }

    pub fn run(&self, dag: &mut Dag, branches: &mut BranchSet) -> Result<MergeReport> {
        let mut report = MergeReport {
            converged: true,
            ..MergeReport::default()
        };
        let before = branches.alive_count();

        for tiers in [&[Tier::Safe][..], &[Tier::Safe, Tier::Unsafe][..]] {
            let rules = self.rules_for(tiers);
            if !self.run_round(dag, branches, &rules, &mut report)? {
                report.converged = false;
            }
        }

        info!(
            before,
            after = branches.alive_count(),
            merges = report.applications.len(),
            iterations = report.iterations,
            "merged branches"
        );
        Ok(report)
    }

    /// Iterate until a sweep over every live branch changes nothing.
    /// Returns false if the iteration cap was hit first.
    fn run_round(
        &self,
        dag: &mut Dag,
        branches: &mut BranchSet,
        rules: &[&'static Rule],
        report: &mut MergeReport,
    ) -> Result<bool> {
        let mut dirty: BTreeSet<BranchId> = branches.alive_ids().into_iter().collect();
        let mut full_sweep = true;

        loop {
            if report.iterations >= self.max_iterations {
                warn!(
                    iterations = report.iterations,
                    "merge rules did not converge, leaving branches split"
                );
                return Ok(false);
            }
            report.iterations += 1;
            let iteration = report.iterations;

            branches.clear_visited();
            let work: Vec<BranchId> = dirty.iter().copied().collect();

            for rule in rules {
                let live: Vec<BranchId> =
                    work.iter().copied().filter(|&b| branches.is_alive(b)).collect();
                let proposals = (rule.apply)(&MergeView::new(dag, branches), &live);

                for proposal in proposals {
                    let touched = apply(dag, branches, proposal)?;
                    if touched.is_empty() {
                        continue;
                    }
                    for &branch in &touched {
                        branches.mark_visited(branch);
                    }

                    let commit = dag.node(proposal.node()).id.clone();
                    debug!(%commit, rule = rule.name, iteration, "rule applied");
                    report.applications.push(RuleApplication {
                        commit,
                        rule: rule.name,
                        iteration,
                    });
                }
            }

            let modified: Vec<BranchId> = branches
                .alive()
                .filter(|b| b.visited())
                .map(|b| b.id())
                .collect();

            if modified.is_empty() {
                if full_sweep {
                    return Ok(true);
                }
                dirty = branches.alive_ids().into_iter().collect();
                full_sweep = true;
            } else {
                dirty = expand(dag, branches, &modified);
                full_sweep = false;
            }
        }
    }
}

/// Modified branches plus the owners of their first commit's parents and
/// their tip's children
fn expand(dag: &Dag, branches: &BranchSet, modified: &[BranchId]) -> BTreeSet<BranchId> {
    let mut next = BTreeSet::new();

    for &branch in modified {
        next.insert(branch);
        if let Some(first) = branches.first(branch) {
            next.extend(dag.node(first).parents().iter().filter_map(|&p| dag.node(p).branch()));
        }
        if let Some(last) = branches.last(branch) {
            next.extend(dag.node(last).children().iter().filter_map(|&c| dag.node(c).branch()));
        }
    }

    next.retain(|&b| branches.is_alive(b));
    next
}

/// Re-check a proposal against the current branches and carry it out.
/// Returns the branches it changed; empty when the proposal went stale.
fn apply(dag: &mut Dag, branches: &mut BranchSet, proposal: Proposal) -> Result<Vec<BranchId>> {
    match proposal {
        Proposal::Join { parent, child } => {
            let (Some(upper), Some(lower)) = (dag.node(parent).branch(), dag.node(child).branch())
            else {
                return Ok(Vec::new());
            };
            if upper == lower
                || branches.last(upper) != Some(parent)
                || branches.first(lower) != Some(child)
                || !reroute(dag, child, parent)
            {
                return Ok(Vec::new());
            }

            Ok(vec![branches.join(dag, upper, lower)?])
        }
        Proposal::Swap { node, parent } => {
            let (Some(branch), Some(other)) = (dag.node(node).branch(), dag.node(parent).branch())
            else {
                return Ok(Vec::new());
            };
            if branch == other
                || branches.last(other) != Some(parent)
                || branches.first(branch) == Some(node)
                || !reroute(dag, node, parent)
            {
                return Ok(Vec::new());
            }

            let prefix = branches.split_at(dag, branch, node)?;
            let kept = branches.join(dag, other, branch)?;
            Ok(vec![kept, prefix])
        }
    }
}

/// Make `parent` the join parent of `node` unless the edit list pinned a
/// different one
fn reroute(dag: &mut Dag, node: NodeIdx, parent: NodeIdx) -> bool {
    let commit = dag.node_mut(node);
    match commit.parent_index(parent) {
        Some(index) if index == commit.join_parent => true,
        Some(_) if commit.pinned => false,
        Some(index) => {
            commit.join_parent = index;
            true
        }
        None => false,
    }
}
