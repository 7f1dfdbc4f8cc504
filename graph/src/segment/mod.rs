pub mod branch;
pub mod segmenter;

pub use branch::{Branch, BranchId, BranchSet};
pub use segmenter::segment;
