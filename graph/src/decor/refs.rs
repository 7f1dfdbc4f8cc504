use crate::core::{Dag, NodeIdx};
use crate::error::{GraphError, Result};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Ref names pointing at each commit. Display only; segmentation never
/// looks at names.
#[derive(Debug, Clone, Default)]
pub struct RefIndex {
    head: Option<String>,
    branches: HashMap<String, Vec<String>>,
    tags: HashMap<String, Vec<String>>,
}

impl RefIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_head(&mut self, commit_id: String) {
        self.head = Some(commit_id);
    }

    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    pub fn add_branch(&mut self, commit_id: String, branch: String) {
        self.branches.entry(commit_id).or_default().push(branch);
    }

    pub fn add_tag(&mut self, commit_id: String, tag: String) {
        self.tags.entry(commit_id).or_default().push(tag);
    }

    pub fn branches_of(&self, commit_id: &str) -> &[String] {
        self.branches.get(commit_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn tags_of(&self, commit_id: &str) -> &[String] {
        self.tags.get(commit_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// `(branch name, commit id)` pairs sorted by name
    pub fn branch_names(&self) -> Vec<(&str, &str)> {
        let mut names: Vec<(&str, &str)> = self
            .branches
            .iter()
            .flat_map(|(commit, names)| names.iter().map(move |n| (n.as_str(), commit.as_str())))
            .collect();
        names.sort_unstable();
        names
    }

    /// Commit a branch or tag name points at; `HEAD` is understood too
    pub fn find_ref(&self, name: &str) -> Option<&str> {
        if name == "HEAD" {
            return self.head();
        }

        fn lookup<'m>(map: &'m HashMap<String, Vec<String>>, name: &str) -> Option<&'m str> {
            map.iter()
                .filter(|(_, names)| names.iter().any(|n| n == name))
                .map(|(commit, _)| commit.as_str())
                .min()
        }
        lookup(&self.branches, name).or_else(|| lookup(&self.tags, name))
    }

    /// Copy names onto the DAG nodes they point at
    pub fn annotate(&self, dag: &mut Dag) {
        for (map, is_tag) in [(&self.branches, false), (&self.tags, true)] {
            let mut commits: Vec<&String> = map.keys().collect();
            commits.sort_unstable();

            for commit in commits {
                let Some(idx) = dag.find(commit) else {
                    continue;
                };
                for name in &map[commit] {
                    if is_tag {
                        dag.annotate_tag(idx, name.clone());
                    } else {
                        dag.annotate_branch(idx, name.clone());
                    }
                }
            }
        }
    }
}

/// Pick the commit the main branch is traced from.
///
/// An explicit revision is a ref name or a full or abbreviated commit id.
/// Without one, each pattern is matched in turn against the sorted branch
/// names and the first branch whose tip is loaded wins.
pub fn resolve_start(
    dag: &Dag,
    refs: &RefIndex,
    explicit: Option<&str>,
    patterns: &[String],
) -> Result<NodeIdx> {
    if let Some(rev) = explicit {
        if let Some(idx) = refs.find_ref(rev).and_then(|commit| dag.find(commit)) {
            return Ok(idx);
        }
        return dag.find_prefix(rev);
    }

    let names = refs.branch_names();
    for pattern in patterns {
        let re = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            GraphError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })?;

        let hit = names
            .iter()
            .filter(|(name, _)| re.is_match(name))
            .find_map(|&(name, commit)| dag.find(commit).map(|idx| (name, idx)));
        if let Some((name, idx)) = hit {
            debug!(branch = name, %pattern, "resolved start commit");
            return Ok(idx);
        }
    }

    Err(GraphError::NoStartCommit {
        patterns: patterns.to_vec(),
    })
}
