//! Criterion benchmark result extraction, normalization with documented
//! fallback estimation, and report figure composition/rendering.

pub mod chart;
pub mod error;
pub mod estimate;
pub mod fallback;
pub mod figures;
pub mod key;
pub mod render;
pub mod report;
pub mod resultset;
