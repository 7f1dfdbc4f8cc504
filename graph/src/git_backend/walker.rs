use crate::core::{CommitRecord, Dag};
use crate::decor::RefIndex;
use crate::error::Result;
use chrono::{TimeZone, Utc};
use git2::{Commit, Repository, Sort};
use std::path::Path;
use tracing::{debug, info};

pub struct GitWalker {
    repo: Repository,
}

impl GitWalker {
    /// Open the repository containing `repo_path`, or the one named by the
    /// environment when no path is given
    pub fn new(repo_path: Option<&Path>) -> Result<Self> {
        let repo = match repo_path {
            Some(path) => Repository::discover(path)?,
            None => Repository::open_from_env()?,
        };

        Ok(Self { repo })
    }

    /// The `.git` directory
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Load history reachable from HEAD, every branch and every tag,
    /// newest first, with ref names attached to their commits
    pub fn into_dag(&self, limit: Option<usize>) -> Result<Dag> {
        let mut revwalk = self.repo.revwalk()?;

        // an unborn HEAD has nothing to walk
        if self.head().is_some() {
            revwalk.push_head()?;
        }
        for branch in self.repo.branches(None)? {
            let (branch, _) = branch?;
            if let Some(target) = branch.get().target() {
                revwalk.push(target)?;
            }
        }
        revwalk.push_glob("refs/tags")?;

        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut records = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            records.push(commit_to_record(&commit));

            if limit.is_some_and(|limit| records.len() >= limit) {
                debug!(limit = records.len(), "history truncated");
                break;
            }
        }

        let mut dag = Dag::from_records(records);
        self.ref_index()?.annotate(&mut dag);

        info!(
            commits = dag.node_count(),
            edges = dag.edge_count(),
            path = %self.git_dir().display(),
            "loaded history"
        );
        Ok(dag)
    }

    /// Branch and tag names per commit, plus HEAD
    pub fn ref_index(&self) -> Result<RefIndex> {
        let mut refs = RefIndex::new();

        if let Some(head) = self.head() {
            refs.set_head(head);
        }

        for branch in self.repo.branches(None)? {
            let (branch, _) = branch?;
            let Some(name) = branch.name()? else {
                continue;
            };
            if let Some(target) = branch.get().target() {
                refs.add_branch(target.to_string(), name.to_string());
            }
        }

        for reference in self.repo.references_glob("refs/tags/*")? {
            let reference = reference?;
            let Some(name) = reference.shorthand().map(str::to_string) else {
                continue;
            };
            // tags on trees or blobs have no place in the history
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            refs.add_tag(commit.id().to_string(), name);
        }

        Ok(refs)
    }

    /// Commit HEAD points at, if it is born
    pub fn head(&self) -> Option<String> {
        self.repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .map(|oid| oid.to_string())
    }
}

fn commit_to_record(commit: &Commit) -> CommitRecord {
    let id = commit.id().to_string();
    let parents: Vec<String> = commit.parent_ids().map(|oid| oid.to_string()).collect();

    let timestamp = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_default();

    let author = commit.author().name().unwrap_or("Unknown").to_string();

    let message = commit.summary().unwrap_or("").to_string();

    CommitRecord::new(id, parents, timestamp, author, message)
}
