use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tracing::debug;

/// Knobs for one tree generation, read from `gitree.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Branch name patterns tried in order to pick the main branch
    pub important_branches: Vec<String>,
    /// Never continue a branch through a non-first parent
    pub trust_parent0_only: bool,
    /// Cap on merge-engine iterations across both rounds
    pub max_iterations: usize,
    /// Load at most this many commits
    pub max_commits: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            important_branches: vec!["master".into(), "main".into(), "gh-pages".into()],
            trust_parent0_only: false,
            max_iterations: 10_000,
            max_commits: None,
        }
    }
}

impl TreeConfig {
    pub const FILE_NAME: &'static str = "gitree.toml";

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`; a missing file means defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loaded configuration");
                Self::from_toml(&text)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// `<git dir>/gitree.toml`
    pub fn load_for_repo(git_dir: &Path) -> Result<Self> {
        Self::load(&git_dir.join(Self::FILE_NAME))
    }
}
