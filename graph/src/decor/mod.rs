pub mod refs;

pub use refs::{resolve_start, RefIndex};
