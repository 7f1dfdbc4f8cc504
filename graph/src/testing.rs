//! Fixtures shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::core::{CommitRecord, Dag, NodeIdx};

pub(crate) fn ts(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + minutes * 60, 0).unwrap()
}

/// `parents` is a whitespace separated list of commit ids, first parent first
pub(crate) fn record(id: &str, parents: &str, minutes: i64) -> CommitRecord {
    CommitRecord::new(
        id.to_string(),
        parents.split_whitespace().map(str::to_string).collect(),
        ts(minutes),
        "Test".to_string(),
        format!("commit {}", id),
    )
}

/// Build a DAG where each listed commit is one minute younger than the
/// previous one
pub(crate) fn dag_from(history: &[(&str, &str)]) -> Dag {
    Dag::from_records(
        history
            .iter()
            .enumerate()
            .map(|(i, (id, parents))| record(id, parents, i as i64)),
    )
}

pub(crate) fn idx(dag: &Dag, id: &str) -> NodeIdx {
    dag.find(id).unwrap()
}

pub(crate) fn ids(dag: &Dag, nodes: &[NodeIdx]) -> Vec<String> {
    nodes.iter().map(|&n| dag.node(n).id.clone()).collect()
}
