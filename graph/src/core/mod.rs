pub mod node;
pub mod edge;
pub mod dag;

pub use node::{CommitNode, CommitRecord, GridPos, NodeIdx};
pub use edge::Relation;
pub use dag::{Dag, DagStats};
