// Learning primitives shared by the sport-specific crates: categorical
// encoding, seeded k-means (linfa), random forests (smartcore) and stable
// ranking.

pub mod encoding;
pub mod forest;
pub mod kmeans;
pub mod ranking;
