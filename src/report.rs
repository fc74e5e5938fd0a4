//! Grouped Reporter: orders the result set by group for console and CSV
//! presentation.
//!
//! A result set is already validated by construction, so nothing here can
//! fail beyond plain I/O on the output sink.

use std::io::{self, Write};

use anyhow::Result;

use crate::estimate::EstimateRecord;
use crate::key::BenchmarkKey;
use crate::resultset::ResultSet;

/// `(group, entries)` pairs: groups lexicographic, entries ordered by key.
pub type Grouped<'a> = Vec<(&'a str, Vec<(&'a BenchmarkKey, &'a EstimateRecord)>)>;

/// True if the group matches an optional case-insensitive substring filter.
pub fn group_matches(group: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(pat) => group.to_lowercase().contains(&pat.to_lowercase()),
        None => true,
    }
}

/// Group the result set by first key segment.
///
/// The backing map is already ordered by key and the group is the first
/// segment, so a single pass chunks adjacent entries.
pub fn group_results<'a>(rs: &'a ResultSet, filter: Option<&str>) -> Grouped<'a> {
    let mut groups: Grouped<'a> = Vec::new();
    for (key, record) in rs.iter() {
        if !group_matches(key.group(), filter) {
            continue;
        }
        match groups.last_mut() {
            Some((group, entries)) if *group == key.group() => entries.push((key, record)),
            _ => groups.push((key.group(), vec![(key, record)])),
        }
    }
    groups
}

fn fmt_opt_ms(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "-".to_string(),
    }
}

/// Console table: `group, benchmark, mean_ms, error_ms, std_dev_ms`.
/// Returns the number of rows written.
pub fn write_table(out: &mut impl Write, groups: &Grouped<'_>) -> io::Result<usize> {
    writeln!(
        out,
        "{:<40} {:<30} {:>12} {:>12} {:>12}",
        "Group", "Benchmark", "Mean (ms)", "Error", "Std Dev"
    )?;
    writeln!(out, "{}", "-".repeat(110))?;
    let mut rows = 0;
    for (group, entries) in groups {
        for (key, record) in entries {
            writeln!(
                out,
                "{:<40} {:<30} {:>12.3} {:>12.3} {:>12}",
                group,
                key.benchmark(),
                record.mean_ms(),
                record.error_ms(),
                fmt_opt_ms(record.std_dev_ms()),
            )?;
            rows += 1;
        }
    }
    Ok(rows)
}

/// Tabular interchange output with the full set of millisecond columns.
pub fn write_csv(out: impl Write, groups: &Grouped<'_>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "group",
        "benchmark",
        "mean_ms",
        "ci_lower_ms",
        "ci_upper_ms",
        "error_ms",
        "std_dev_ms",
        "median_ms",
    ])?;
    for (group, entries) in groups {
        for (key, record) in entries {
            wtr.write_record([
                group.to_string(),
                key.benchmark(),
                record.mean_ms().to_string(),
                record.ci_lower_ms().to_string(),
                record.ci_upper_ms().to_string(),
                record.error_ms().to_string(),
                record.std_dev_ms().map(|v| v.to_string()).unwrap_or_default(),
                record.median_ms().map(|v| v.to_string()).unwrap_or_default(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Grouped plain-text summary used by the export command.
pub fn write_summary(out: &mut impl Write, groups: &Grouped<'_>) -> io::Result<()> {
    for (group, entries) in groups {
        writeln!(out, "## {group}")?;
        for (key, record) in entries {
            writeln!(
                out,
                "  {}: {:.3} +/- {:.3} ms",
                key.benchmark(),
                record.mean_ms(),
                record.error_ms()
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}
