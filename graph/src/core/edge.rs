use serde::Serialize;

/// How a parent edge is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Relation {
    /// Parent and child sit on the same branch
    Continuation,
    /// The child starts a new branch off the parent
    BranchOut,
    /// The parent's branch rejoins the child's branch
    MergeIn,
}
