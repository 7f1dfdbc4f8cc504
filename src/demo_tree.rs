use chrono::{Duration, TimeZone, Utc};
use graph::{CommitRecord, Dag, EditList, TreeBuilder, TreeConfig};

/// A small made-up history: a main line, a feature branch that pulls main
/// back in, a short-lived fix and an unrelated documentation root.
const HISTORY: &[(&str, &str, &str)] = &[
    ("a1", "", "Initial commit"),
    ("a2", "a1", "Add parser"),
    ("f1", "a2", "Start feature"),
    ("a3", "a2", "Fix typo"),
    ("x1", "a3", "Hotfix"),
    ("a4", "a3 x1", "Merge hotfix"),
    ("f2", "f1 a4", "Merge main into feature"),
    ("d1", "", "Docs site"),
    ("f3", "f2", "Finish feature"),
    ("a5", "a4 f3", "Merge feature"),
    ("d2", "d1", "Docs: usage"),
];

fn main() {
    println!("Git Tree Demo");
    println!("=============\n");

    let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().unwrap_or_default();
    let mut dag = Dag::from_records(HISTORY.iter().enumerate().map(|(i, (id, parents, msg))| {
        CommitRecord::new(
            id.to_string(),
            parents.split_whitespace().map(str::to_string).collect(),
            base + Duration::hours(i as i64),
            "Demo".to_string(),
            msg.to_string(),
        )
    }));

    let stats = dag.stats();
    println!("History statistics:");
    println!("  Total commits: {}", stats.total_commits);
    println!("  Merge commits: {}", stats.merge_commits);
    println!("  Root commits: {}", stats.root_commits);
    println!();

    let Some(start) = dag.find("a5") else {
        eprintln!("Start commit missing from demo history");
        return;
    };

    let builder = TreeBuilder::new(TreeConfig::default());
    let snapshot = match builder.generate(&mut dag, &EditList::new(), start) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error generating tree: {}", e);
            return;
        }
    };

    println!("Commit Tree ({} x {}):", snapshot.width, snapshot.height);
    println!("────────────────────");
    for commit in snapshot.rows() {
        let x = commit.x.unwrap_or(0);
        let lanes: String = (0..snapshot.width)
            .map(|i| if i == x { "o " } else { "  " })
            .collect();
        let branch = commit.branch.map(|b| b.to_string()).unwrap_or_default();
        println!("{}{:<3} {:<4} {}", lanes, commit.id, branch, commit.message);
    }

    println!("\nRules applied:");
    for applied in &snapshot.rules {
        println!("  #{} {} at {}", applied.iteration, applied.rule, applied.commit);
    }
}
