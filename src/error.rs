//! Error taxonomy for the extraction pipeline.
//!
//! Record-level faults (`MalformedRecord`) are fatal for the whole run: a
//! corrupt statistic cannot be safely propagated. Figure-level faults
//! (`NotFound`, `FigureSkipped`) are isolated per figure and never abort
//! sibling figures. Degraded-but-continuing conditions (a key that cannot
//! be resolved against the harness root, a missing results directory) are
//! logged where they occur and carry no error variant.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The estimate file is unreadable, lacks the required point-estimate or
    /// confidence-interval fields, or carries inconsistent bounds.
    #[error("malformed estimate record at {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    /// A figure requested a key with no measurement and no applicable
    /// estimation rule.
    #[error("no measurement or estimation rule for key {key}")]
    NotFound { key: String },

    /// One figure could not be composed; the rest of the batch continues.
    #[error("figure {figure} skipped: {reason}")]
    FigureSkipped { figure: String, reason: String },
}
