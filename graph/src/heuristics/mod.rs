pub mod engine;
pub mod rules;
pub mod view;

pub use engine::{MergeEngine, MergeReport, RuleApplication};
pub use rules::{Proposal, Rule, Tier, RULES};
pub use view::MergeView;
