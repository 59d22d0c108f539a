// Cricket fantasy-points prediction: typed match records, per-player
// aggregation, archetype-based run/wicket prediction, scoring and reports.

pub mod aggregate;
pub mod features;
pub mod head_to_head;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod roster;
pub mod scoring;
