use super::EditList;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const USER_FILE: &str = "edits";
const REPO_FILE: &str = ".gitree-edits";
const LOCAL_FILE: &str = "gitree-edits";

/// Where an edit list may live, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EditLocation {
    /// `<config dir>/gitree/edits`
    User,
    /// `<workdir>/.gitree-edits`, meant to be committed
    Repo,
    /// `<git dir>/gitree-edits`, private to this clone
    RepoLocal,
}

/// Candidate edit list files for one repository.
///
/// The highest-precedence file that can be read wins outright; files are
/// never merged entry by entry.
#[derive(Debug, Clone)]
pub struct EditStore {
    candidates: Vec<(EditLocation, PathBuf)>,
}

impl EditStore {
    pub fn for_repo(git_dir: &Path, workdir: Option<&Path>) -> Self {
        let mut candidates = Vec::new();

        if let Some(config) = dirs::config_dir() {
            candidates.push((EditLocation::User, config.join("gitree").join(USER_FILE)));
        }
        if let Some(workdir) = workdir {
            candidates.push((EditLocation::Repo, workdir.join(REPO_FILE)));
        }
        candidates.push((EditLocation::RepoLocal, git_dir.join(LOCAL_FILE)));

        Self::with_candidates(candidates)
    }

    pub fn with_candidates(mut candidates: Vec<(EditLocation, PathBuf)>) -> Self {
        candidates.sort_by_key(|(location, _)| *location);
        Self { candidates }
    }

    /// Read the winning edit list and report where it came from
    pub fn load(&self) -> (EditList, Option<EditLocation>) {
        for (location, path) in self.candidates.iter().rev() {
            if !path.is_file() {
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    debug!(?location, path = %path.display(), "using edit list");
                    return (EditList::parse(&text), Some(*location));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable edit list");
                }
            }
        }
        (EditList::new(), None)
    }

    /// Path edits are written to: the most specific candidate
    pub fn writable_path(&self) -> Option<&Path> {
        self.candidates.last().map(|(_, path)| path.as_path())
    }

    pub fn save(&self, edits: &EditList) -> Result<()> {
        match self.writable_path() {
            Some(path) => edits.save(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> EditStore {
        EditStore::with_candidates(vec![
            (EditLocation::RepoLocal, dir.path().join("local")),
            (EditLocation::User, dir.path().join("user")),
            (EditLocation::Repo, dir.path().join("repo")),
        ])
    }

    #[test]
    fn test_highest_precedence_file_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("user"), "aa = 1\nbb = 1\n").unwrap();
        std::fs::write(dir.path().join("repo"), "aa = 0\n").unwrap();

        let (edits, location) = store(&dir).load();
        assert_eq!(location, Some(EditLocation::Repo));
        assert_eq!(edits.get_primary_parent_index("aa"), Some(0));
        // no union with the user-level file
        assert_eq!(edits.get_primary_parent_index("bb"), None);
    }

    #[test]
    fn test_no_files_means_no_edits() {
        let dir = TempDir::new().unwrap();
        let (edits, location) = store(&dir).load();
        assert!(edits.is_empty());
        assert_eq!(location, None);
    }

    #[test]
    fn test_save_goes_to_repo_local() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut edits = EditList::new();
        edits.set("abc", 1);
        store.save(&edits).unwrap();

        assert_eq!(store.writable_path(), Some(dir.path().join("local").as_path()));
        let (loaded, location) = store.load();
        assert_eq!(location, Some(EditLocation::RepoLocal));
        assert_eq!(loaded, edits);
    }
}
