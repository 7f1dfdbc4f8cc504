use chrono::{Duration, TimeZone, Utc};
use graph::{
    layout, segment, BranchSet, CommitRecord, Dag, EditList, MergeEngine, NodeIdx, Relation,
    TreeBuilder, TreeConfig,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

/// Each listed commit is one minute younger than the previous one
fn dag_from<S: AsRef<str>>(history: &[(S, S)]) -> Dag {
    let base = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    Dag::from_records(history.iter().enumerate().map(|(i, (id, parents))| {
        CommitRecord::new(
            id.as_ref().to_string(),
            parents.as_ref().split_whitespace().map(str::to_string).collect(),
            base + Duration::minutes(i as i64),
            "Test".to_string(),
            format!("commit {}", id.as_ref()),
        )
    }))
}

/// A few dozen commits with forks, merges and a second root
fn synthetic(n: usize) -> Dag {
    let name = |i: usize| format!("c{:03}", i);
    let history: Vec<(String, String)> = (0..n)
        .map(|i| {
            let parents = match i {
                0 => String::new(),
                _ if i % 17 == 0 => String::new(),
                _ if i % 5 == 0 && i >= 6 => format!("{} {}", name(i - 1), name(i - 6)),
                _ if i % 3 == 0 => name(i - 3),
                _ => name(i - 1),
            };
            (name(i), parents)
        })
        .collect();
    dag_from(&history)
}

fn idx(dag: &Dag, id: &str) -> NodeIdx {
    dag.find(id).unwrap()
}

fn run(dag: &mut Dag, start: &str, edits: &EditList) -> BranchSet {
    let start = idx(dag, start);
    let mut branches = segment(dag, edits, start).unwrap();
    MergeEngine::new().run(dag, &mut branches).unwrap();
    layout(dag, &mut branches, start);
    branches
}

fn chain(dag: &Dag, branches: &BranchSet, commit: &str) -> Vec<String> {
    let owner = dag.node(idx(dag, commit)).branch().unwrap();
    branches
        .get(owner)
        .ordered()
        .iter()
        .map(|&n| dag.node(n).id.clone())
        .collect()
}

fn pos(dag: &Dag, id: &str) -> (usize, usize) {
    let p = dag.node(idx(dag, id)).position().unwrap();
    (p.x, p.y)
}

#[test]
fn linear_chain_is_one_column() {
    let mut dag = dag_from(&[("A", ""), ("B", "A"), ("C", "B"), ("D", "C"), ("E", "D")]);
    let branches = run(&mut dag, "E", &EditList::new());

    assert_eq!(branches.alive_count(), 1);
    assert_eq!(chain(&dag, &branches, "A"), vec!["A", "B", "C", "D", "E"]);
    for (row, id) in ["A", "B", "C", "D", "E"].iter().enumerate() {
        assert_eq!(pos(&dag, id), (0, row));
    }
}

#[test]
fn lone_commit_after_merge_rejoins_its_parent() {
    let mut dag = dag_from(&[
        ("R", ""),
        ("P", "R"),
        ("F1", "R"),
        ("F2", "R"),
        ("M", "F1 F2"),
        ("T", "M"),
    ]);
    let start = idx(&dag, "P");
    let mut branches = segment(&mut dag, &EditList::new(), start).unwrap();
    assert_eq!(chain(&dag, &branches, "T"), vec!["T"]);

    let report = MergeEngine::new().run(&mut dag, &mut branches).unwrap();

    assert_eq!(report.applications[0].rule, "single-child");
    assert_eq!(report.applications[0].commit, "T");
    assert_eq!(chain(&dag, &branches, "T"), vec!["F1", "M", "T"]);
}

#[test]
fn diamond_keeps_left_side_on_the_merge_branch() {
    // S claims X as a side branch, so Z starts alone in the merge pass
    let mut dag = dag_from(&[
        ("R", ""),
        ("X", "R"),
        ("Y", "R"),
        ("P", "R"),
        ("Z", "X Y"),
        ("W", "X"),
        ("S", "P X"),
    ]);
    let start = idx(&dag, "S");
    let mut branches = segment(&mut dag, &EditList::new(), start).unwrap();
    assert_eq!(chain(&dag, &branches, "Z"), vec!["Z"]);
    assert_eq!(chain(&dag, &branches, "X"), vec!["X"]);

    let report = MergeEngine::new().run(&mut dag, &mut branches).unwrap();
    let log: Vec<(&str, &str, usize)> = report
        .applications
        .iter()
        .map(|a| (a.commit.as_str(), a.rule, a.iteration))
        .collect();
    assert_eq!(log, vec![("Z", "diamond-left", 1)]);
    assert_eq!(chain(&dag, &branches, "Z"), vec!["X", "Z"]);
    assert_eq!(chain(&dag, &branches, "Y"), vec!["Y"]);

    layout(&mut dag, &mut branches, start);
    let z = dag.node(idx(&dag, "Z"));
    assert_eq!(z.relation(0), Relation::Continuation);
    assert_eq!(z.relation(1), Relation::MergeIn);
    assert_eq!(dag.node(idx(&dag, "Y")).relation(0), Relation::BranchOut);
}

#[test]
fn edit_list_reroutes_main_branch() {
    let mut dag = dag_from(&[("R", ""), ("A", "R"), ("B", "R"), ("M", "A B")]);
    let mut edits = EditList::new();
    edits.set("M", 1);

    let branches = run(&mut dag, "M", &edits);

    assert_eq!(chain(&dag, &branches, "M"), vec!["R", "B", "M"]);
    assert_eq!(chain(&dag, &branches, "A"), vec!["A"]);
    assert_eq!(pos(&dag, "B").0, 0);
    assert_ne!(pos(&dag, "A").0, 0);
}

#[test]
fn disconnected_component_gets_its_own_column() {
    let mut dag = dag_from(&[
        ("R", ""),
        ("A", "R"),
        ("B", "A"),
        ("Q", ""),
        ("Q2", "Q"),
    ]);
    let start = idx(&dag, "B");
    let mut branches = segment(&mut dag, &EditList::new(), start).unwrap();
    MergeEngine::new().run(&mut dag, &mut branches).unwrap();
    let summary = layout(&mut dag, &mut branches, start);

    assert!(summary.unplaced.is_empty());
    assert_eq!(pos(&dag, "Q"), (1, 0));
    assert_eq!(pos(&dag, "Q2"), (1, 1));
    assert_eq!(summary.width, 2);
}

#[test]
fn every_commit_in_exactly_one_chain() {
    let mut dag = synthetic(60);
    let branches = run(&mut dag, "c059", &EditList::new());

    let mut seen = HashSet::new();
    for branch in branches.alive() {
        let ordered = branch.ordered();
        assert_eq!(ordered.len(), branch.len());

        for pair in ordered.windows(2) {
            assert!(
                dag.node(pair[0]).children().contains(&pair[1]),
                "{} does not continue {}",
                dag.node(pair[1]).id,
                dag.node(pair[0]).id
            );
        }
        for &n in ordered {
            assert!(seen.insert(n));
            assert_eq!(dag.node(n).branch(), Some(branch.id()));
        }
    }
    assert_eq!(seen.len(), dag.node_count());
}

#[test]
fn placed_branches_never_share_cells() {
    let mut dag = synthetic(60);
    let branches = run(&mut dag, "c059", &EditList::new());

    let mut cells = HashSet::new();
    for (_, node) in dag.nodes() {
        let p = node.position().expect("every commit is reachable by some anchor");
        assert!(cells.insert((p.x, p.y)), "{} lands on a taken cell", node.id);
    }

    let spans: Vec<(usize, usize, usize)> = branches
        .alive()
        .map(|b| {
            let first = dag.node(b.ordered()[0]).position().unwrap();
            (first.x, first.y, first.y + b.len() - 1)
        })
        .collect();
    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            if a.0 == b.0 {
                assert!(a.2 < b.1 || b.2 < a.1, "{:?} overlaps {:?}", a, b);
            }
        }
    }
}

#[test]
fn generation_is_deterministic() {
    let builder = TreeBuilder::new(TreeConfig::default());

    let mut first = synthetic(45);
    let start = idx(&first, "c044");
    let a = builder.generate(&mut first, &EditList::new(), start).unwrap();

    let mut second = synthetic(45);
    let b = builder.generate(&mut second, &EditList::new(), start).unwrap();

    assert_eq!(a, b);
}

#[test]
fn converged_branches_stay_put() {
    let mut dag = synthetic(50);
    let start = idx(&dag, "c049");
    let mut branches = segment(&mut dag, &EditList::new(), start).unwrap();
    MergeEngine::new().run(&mut dag, &mut branches).unwrap();

    let before = branches.alive_ids();
    let report = MergeEngine::new().run(&mut dag, &mut branches).unwrap();

    assert!(report.applications.is_empty());
    assert_eq!(branches.alive_ids(), before);
}
