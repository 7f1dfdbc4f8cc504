pub mod engine;
pub mod occupancy;

pub use engine::{layout, LayoutSummary};
pub use occupancy::OccupancyMatrix;
