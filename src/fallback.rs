//! Fallback Estimator: deterministic substitutes for measurements that a
//! figure needs but the harness never produced.
//!
//! Every rule is a pure function of already-available real measurements and
//! is reported (logged + tagged with provenance) whenever it fires, so
//! report consumers can always tell measured numbers from modeled ones.

use log::warn;
use serde::Serialize;

use crate::error::PipelineError;
use crate::resultset::ResultSet;

/// How a resolved value was obtained. Ordered from most to least trusted;
/// a series' provenance is the maximum over its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Read from a real estimate file.
    Measured,
    /// Derived from a related real measurement via a documented rule.
    Estimated,
    /// Hard-coded illustrative value with no measured basis.
    Placeholder,
    /// Closed-form analytical model, labeled as such.
    Model,
}

/// A resolved `(mean, error)` pair in milliseconds, tagged with provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub mean_ms: f64,
    pub error_ms: f64,
    pub provenance: Provenance,
}

impl Resolved {
    pub fn placeholder(mean_ms: f64, error_ms: f64) -> Self {
        Resolved { mean_ms, error_ms, provenance: Provenance::Placeholder }
    }
}

/// A documented estimation rule for one absent key.
///
/// The multipliers these rules carry are rough extrapolations inherited from
/// the report, not principled models; they are preserved verbatim and
/// surfaced as `Estimated` rather than re-derived.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Linear scale-up from a measurement at a smaller sample size
    /// (e.g. a 5K-row measurement x2 approximates 10K).
    ScaleFrom { base: &'static str, factor: f64 },
    /// Flat carry-forward from an adjacent scale when no functional
    /// relationship is known.
    CarryForward { base: &'static str },
}

/// Resolve `key` against the result set, falling back to `rule` when the
/// key is absent.
///
/// Resolution order: exact key, then the rule applied to its base
/// measurement, then `NotFound` (the figure-level caller decides between
/// skipping and last-resort placeholders).
pub fn lookup_or_estimate(
    rs: &ResultSet,
    key: &str,
    rule: Option<Rule>,
) -> Result<Resolved, PipelineError> {
    if let Some(record) = rs.get_joined(key) {
        return Ok(Resolved {
            mean_ms: record.mean_ms(),
            error_ms: record.error_ms(),
            provenance: Provenance::Measured,
        });
    }

    let not_found = || PipelineError::NotFound { key: key.to_string() };
    match rule {
        Some(Rule::ScaleFrom { base, factor }) => {
            let record = rs.get_joined(base).ok_or_else(not_found)?;
            warn!("no measurement for {key}; scaling {base} x{factor}");
            Ok(Resolved {
                mean_ms: record.mean_ms() * factor,
                error_ms: record.error_ms() * factor,
                provenance: Provenance::Estimated,
            })
        }
        Some(Rule::CarryForward { base }) => {
            let record = rs.get_joined(base).ok_or_else(not_found)?;
            warn!("no measurement for {key}; carrying {base} forward");
            Ok(Resolved {
                mean_ms: record.mean_ms(),
                error_ms: record.error_ms(),
                provenance: Provenance::Estimated,
            })
        }
        None => Err(not_found()),
    }
}

/// Shorthand for a rule-less exact lookup.
pub fn lookup(rs: &ResultSet, key: &str) -> Result<Resolved, PipelineError> {
    lookup_or_estimate(rs, key, None)
}
