use crate::segment::BranchId;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Segmentation or merge bookkeeping produced a branch that is not a
    /// simple chain. Always a bug, never a property of the input.
    #[error("branch {branch} is not a simple chain: expected {expected} commits, walked {actual}")]
    BrokenChain {
        branch: BranchId,
        expected: usize,
        actual: usize,
    },

    #[error("no start commit given and no branch matches {patterns:?}")]
    NoStartCommit { patterns: Vec<String> },

    #[error("commit `{0}` not found")]
    UnknownCommit(String),

    #[error("commit prefix `{0}` is ambiguous")]
    AmbiguousCommit(String),

    #[error("invalid branch pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] git2::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
