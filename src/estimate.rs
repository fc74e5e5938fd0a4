//! Estimate Record Reader: parses one Criterion `estimates.json` into a
//! typed statistical record.
//!
//! All stored fields are in nanoseconds, as produced by the harness.
//! Millisecond views are derived accessors, never stored, so the two units
//! cannot drift apart.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PipelineError;

const NS_PER_MS: f64 = 1e6;

#[derive(Debug, Deserialize)]
struct RawEstimates {
    mean: RawStat,
    std_dev: Option<RawStat>,
    median: Option<RawStat>,
}

#[derive(Debug, Deserialize)]
struct RawStat {
    point_estimate: f64,
    confidence_interval: Option<RawInterval>,
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    lower_bound: f64,
    upper_bound: f64,
}

/// One benchmark's statistics for one run.
///
/// Invariant (enforced on read): all fields are non-negative and
/// `ci_lower_ns <= mean_ns <= ci_upper_ns`.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRecord {
    pub mean_ns: f64,
    pub ci_lower_ns: f64,
    pub ci_upper_ns: f64,
    pub std_dev_ns: Option<f64>,
    pub median_ns: Option<f64>,
}

impl EstimateRecord {
    pub fn mean_ms(&self) -> f64 {
        self.mean_ns / NS_PER_MS
    }

    pub fn ci_lower_ms(&self) -> f64 {
        self.ci_lower_ns / NS_PER_MS
    }

    pub fn ci_upper_ms(&self) -> f64 {
        self.ci_upper_ns / NS_PER_MS
    }

    /// Half-width of the confidence interval, in milliseconds.
    pub fn error_ms(&self) -> f64 {
        (self.ci_upper_ns - self.ci_lower_ns) / 2.0 / NS_PER_MS
    }

    pub fn std_dev_ms(&self) -> Option<f64> {
        self.std_dev_ns.map(|v| v / NS_PER_MS)
    }

    pub fn median_ms(&self) -> Option<f64> {
        self.median_ns.map(|v| v / NS_PER_MS)
    }
}

/// Read and validate one estimate file.
///
/// Any failure here is fatal for the run: a silently-wrong record would
/// corrupt every downstream statistic.
pub fn read_estimate(path: &Path) -> Result<EstimateRecord, PipelineError> {
    let malformed = |reason: String| PipelineError::MalformedRecord {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|e| malformed(format!("unreadable: {e}")))?;
    let raw: RawEstimates =
        serde_json::from_str(&text).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let ci = raw
        .mean
        .confidence_interval
        .ok_or_else(|| malformed("mean has no confidence interval".to_string()))?;

    let record = EstimateRecord {
        mean_ns: raw.mean.point_estimate,
        ci_lower_ns: ci.lower_bound,
        ci_upper_ns: ci.upper_bound,
        std_dev_ns: raw.std_dev.map(|s| s.point_estimate),
        median_ns: raw.median.map(|s| s.point_estimate),
    };

    if record.mean_ns < 0.0
        || record.ci_lower_ns < 0.0
        || record.std_dev_ns.is_some_and(|v| v < 0.0)
        || record.median_ns.is_some_and(|v| v < 0.0)
    {
        return Err(malformed("negative statistic".to_string()));
    }
    if record.ci_lower_ns > record.ci_upper_ns {
        return Err(malformed(format!(
            "inconsistent confidence interval: lower {} > upper {}",
            record.ci_lower_ns, record.ci_upper_ns
        )));
    }
    if record.mean_ns < record.ci_lower_ns || record.mean_ns > record.ci_upper_ns {
        return Err(malformed(format!(
            "mean {} outside confidence interval [{}, {}]",
            record.mean_ns, record.ci_lower_ns, record.ci_upper_ns
        )));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn estimates_json(mean: f64, lo: f64, hi: f64) -> String {
        format!(
            r#"{{"mean":{{"point_estimate":{mean},"confidence_interval":{{"lower_bound":{lo},"upper_bound":{hi},"confidence_level":0.95}},"standard_error":100.0}},"std_dev":{{"point_estimate":500000.0,"confidence_interval":{{"lower_bound":400000.0,"upper_bound":600000.0,"confidence_level":0.95}},"standard_error":50.0}},"median":{{"point_estimate":{mean},"confidence_interval":{{"lower_bound":{lo},"upper_bound":{hi},"confidence_level":0.95}},"standard_error":100.0}}}}"#
        )
    }

    #[test]
    fn unit_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "estimates.json", &estimates_json(42e6, 41e6, 43e6));
        let rec = read_estimate(&path).unwrap();
        assert_eq!(rec.mean_ms(), 42.0);
        assert_eq!(rec.ci_lower_ms(), 41.0);
        assert_eq!(rec.ci_upper_ms(), 43.0);
        assert_eq!(rec.error_ms(), 1.0);
        assert_eq!(rec.std_dev_ms(), Some(0.5));
        assert_eq!(rec.median_ms(), Some(42.0));
    }

    #[test]
    fn optional_stats_absent() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"mean":{"point_estimate":1000000.0,"confidence_interval":{"lower_bound":900000.0,"upper_bound":1100000.0}}}"#;
        let path = write_file(&dir, "estimates.json", json);
        let rec = read_estimate(&path).unwrap();
        assert_eq!(rec.mean_ms(), 1.0);
        assert_eq!(rec.std_dev_ns, None);
        assert_eq!(rec.median_ns, None);
    }

    #[test]
    fn missing_mean_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "estimates.json", r#"{"median":{"point_estimate":1.0}}"#);
        let err = read_estimate(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { .. }));
    }

    #[test]
    fn missing_interval_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "estimates.json", r#"{"mean":{"point_estimate":1.0}}"#);
        let err = read_estimate(&path).unwrap_err();
        assert!(err.to_string().contains("no confidence interval"));
    }

    #[test]
    fn inverted_interval_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "estimates.json", &estimates_json(42e6, 43e6, 41e6));
        let err = read_estimate(&path).unwrap_err();
        assert!(err.to_string().contains("inconsistent confidence interval"));
    }

    #[test]
    fn mean_outside_interval_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "estimates.json", &estimates_json(50e6, 41e6, 43e6));
        assert!(read_estimate(&path).is_err());
    }

    #[test]
    fn negative_statistic_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"mean":{"point_estimate":-5.0,"confidence_interval":{"lower_bound":-6.0,"upper_bound":-4.0}}}"#;
        let path = write_file(&dir, "estimates.json", json);
        assert!(read_estimate(&path).is_err());
    }

    #[test]
    fn unreadable_file_is_malformed() {
        let err = read_estimate(Path::new("/nonexistent/estimates.json")).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { .. }));
    }
}
