//! Figure Composer: one operation per report figure.
//!
//! Each figure declares the exact keys it needs, resolves them through the
//! fallback estimator, derives composite series (stacked bands, synthetic
//! models), and emits a `ChartSpec`. A figure whose required keys cannot be
//! resolved at all is skipped; the rest of the batch continues. Composition
//! is stateless and idempotent.

use log::warn;

use crate::chart::{AxisScale, ChartSpec, Legend, Marker, Series, SeriesKind};
use crate::error::PipelineError;
use crate::fallback::{Provenance, Resolved, Rule, lookup, lookup_or_estimate};
use crate::resultset::ResultSet;

pub const COLOR_DAG_CRR: &str = "#2E86AB";
pub const COLOR_CRSQLITE: &str = "#A23B72";
pub const COLOR_HLC: &str = "#F18F01";
pub const COLOR_AUTOMERGE: &str = "#C73E1D";

// Scale-up multipliers inherited from the report; rough extrapolations,
// preserved verbatim and surfaced as estimated data.
const AUTOMERGE_5K_TO_10K: f64 = 2.0;
const AUTOMERGE_5K_TO_100K: f64 = 20.0;
const CRSQLITE_5K_TO_10K: f64 = 2.0;

/// Illustrative (mean, error) for HLC-LWW at 1K rows, which the harness
/// never measures.
const HLC_1K_PLACEHOLDER_MS: (f64, f64) = (20.0, 1.0);

/// Coordinated GC spends two network round trips per cycle.
const GC_ROUND_TRIPS_PER_CYCLE: f64 = 2.0;

// History-query break-even model: a DAG keeps history inline (flat cost plus
// a cheap per-query lookup) while LWW reconstructs it from an audit log.
const DAG_HISTORY_BASE_MS: f64 = 5.0;
const DAG_HISTORY_PER_QUERY_MS: f64 = 0.1;
const LWW_AUDIT_PER_QUERY_MS: f64 = 2.0;
const HISTORY_BREAK_EVEN_RATE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Figure {
    InsertComparison,
    MergeComparison,
    Scalability,
    SensitivityConflict,
    SensitivityColumns,
    SensitivityValueSize,
    Memory,
    BreakevenGc,
    BreakevenQuery,
}

impl Figure {
    pub const ALL: [Figure; 9] = [
        Figure::InsertComparison,
        Figure::MergeComparison,
        Figure::Scalability,
        Figure::SensitivityConflict,
        Figure::SensitivityColumns,
        Figure::SensitivityValueSize,
        Figure::Memory,
        Figure::BreakevenGc,
        Figure::BreakevenQuery,
    ];

    /// Identifier used for output file names.
    pub fn id(&self) -> &'static str {
        match self {
            Figure::InsertComparison => "fig_insert_comparison",
            Figure::MergeComparison => "fig_merge_comparison",
            Figure::Scalability => "fig_scalability",
            Figure::SensitivityConflict => "fig_sensitivity_conflict",
            Figure::SensitivityColumns => "fig_sensitivity_columns",
            Figure::SensitivityValueSize => "fig_sensitivity_valuesize",
            Figure::Memory => "fig_memory",
            Figure::BreakevenGc => "fig_breakeven_gc",
            Figure::BreakevenQuery => "fig_breakeven_query",
        }
    }
}

/// Compose one figure. `NotFound` from key resolution surfaces as
/// `FigureSkipped` so the caller can continue with the remaining figures.
pub fn compose(figure: Figure, rs: &ResultSet) -> Result<ChartSpec, PipelineError> {
    let result = match figure {
        Figure::InsertComparison => insert_comparison(rs),
        Figure::MergeComparison => merge_comparison(rs),
        Figure::Scalability => Ok(scalability(rs)),
        Figure::SensitivityConflict => Ok(sensitivity_conflict(rs)),
        Figure::SensitivityColumns => Ok(sensitivity_columns(rs)),
        Figure::SensitivityValueSize => Ok(sensitivity_valuesize(rs)),
        Figure::Memory => Ok(memory_breakdown()),
        Figure::BreakevenGc => Ok(breakeven_gc()),
        Figure::BreakevenQuery => Ok(breakeven_query()),
    };
    result.map_err(|e| {
        warn!("figure {} skipped: {e}", figure.id());
        PipelineError::FigureSkipped {
            figure: figure.id().to_string(),
            reason: e.to_string(),
        }
    })
}

/// Compose every figure, isolating per-figure failures.
pub fn compose_all(rs: &ResultSet) -> Vec<(Figure, Result<ChartSpec, PipelineError>)> {
    Figure::ALL.iter().map(|&f| (f, compose(f, rs))).collect()
}

fn provenance_of(points: &[Resolved]) -> Provenance {
    points
        .iter()
        .map(|p| p.provenance)
        .max()
        .unwrap_or(Provenance::Measured)
}

fn line_series(
    label: &str,
    color: &str,
    marker: Marker,
    dashed: bool,
    xs: &[f64],
    points: &[Resolved],
) -> Series {
    Series {
        label: label.to_string(),
        xs: xs.to_vec(),
        ys: points.iter().map(|p| p.mean_ms).collect(),
        y_errors: points.iter().map(|p| p.error_ms).collect(),
        color: color.to_string(),
        kind: SeriesKind::Line { marker, dashed },
        provenance: provenance_of(points),
    }
}

fn bar_series(
    label: &str,
    color: &str,
    slot: usize,
    slots: usize,
    points: &[Resolved],
) -> Series {
    Series {
        label: label.to_string(),
        xs: (0..points.len()).map(|i| i as f64).collect(),
        ys: points.iter().map(|p| p.mean_ms).collect(),
        y_errors: points.iter().map(|p| p.error_ms).collect(),
        color: color.to_string(),
        kind: SeriesKind::Bar { slot, slots },
        provenance: provenance_of(points),
    }
}

/// Resolve every key, or `None` as soon as any is missing.
fn try_all(rs: &ResultSet, keys: &[String]) -> Option<Vec<Resolved>> {
    keys.iter().map(|k| lookup(rs, k).ok()).collect()
}

fn placeholders(means: &[f64], errors: &[f64]) -> Vec<Resolved> {
    means
        .iter()
        .zip(errors)
        .map(|(&m, &e)| Resolved::placeholder(m, e))
        .collect()
}

/// Insert performance across scales for all four systems (log/log).
fn insert_comparison(rs: &ResultSet) -> Result<ChartSpec, PipelineError> {
    let scales = [1000.0, 10000.0, 100000.0];

    let dag = [
        lookup(rs, "Insert/DAG-CRR/1000")?,
        lookup(rs, "Insert/DAG-CRR/10000")?,
        lookup(rs, "Insert/DAG-CRR/100000")?,
    ];
    let cr = [
        lookup(rs, "Insert/CR-SQLite/1000")?,
        lookup(rs, "Insert/CR-SQLite/10000")?,
        lookup(rs, "Insert/CR-SQLite/100000")?,
    ];

    // HLC-LWW is never benchmarked at 1K; the report carries an illustrative
    // point there.
    warn!(
        "no benchmark for HLC-LWW at 1K rows; using illustrative {} +/- {} ms",
        HLC_1K_PLACEHOLDER_MS.0, HLC_1K_PLACEHOLDER_MS.1
    );
    let hlc = [
        Resolved::placeholder(HLC_1K_PLACEHOLDER_MS.0, HLC_1K_PLACEHOLDER_MS.1),
        lookup(rs, "HLC_Insert/HLC-LWW/10000")?,
        lookup(rs, "HLC_Insert/HLC-LWW/100000")?,
    ];

    // Automerge is only measured up to 5K rows; 10K and 100K are linear
    // scale-ups of the 5K measurement.
    let am_base = "Automerge_Insert/Automerge/5000";
    let am = [
        lookup(rs, "Automerge_Insert/Automerge/1000")?,
        lookup_or_estimate(
            rs,
            "Automerge_Insert/Automerge/10000",
            Some(Rule::ScaleFrom { base: am_base, factor: AUTOMERGE_5K_TO_10K }),
        )?,
        lookup_or_estimate(
            rs,
            "Automerge_Insert/Automerge/100000",
            Some(Rule::ScaleFrom { base: am_base, factor: AUTOMERGE_5K_TO_100K }),
        )?,
    ];

    Ok(ChartSpec {
        id: Figure::InsertComparison.id().to_string(),
        x_label: "Database Size (rows)".to_string(),
        y_label: "Insert Time (ms)".to_string(),
        x_scale: AxisScale::Log,
        y_scale: AxisScale::Log,
        legend: Legend::UpperLeft,
        x_ticks: None,
        series: vec![
            line_series("DAG-CRR", COLOR_DAG_CRR, Marker::Circle, false, &scales, &dag),
            line_series("CR-SQLite", COLOR_CRSQLITE, Marker::Square, false, &scales, &cr),
            line_series("HLC-LWW", COLOR_HLC, Marker::Triangle, false, &scales, &hlc),
            line_series("Automerge", COLOR_AUTOMERGE, Marker::Diamond, false, &scales, &am),
        ],
    })
}

/// Merge performance by changeset size, DAG-CRR vs CR-SQLite (bars, log y).
fn merge_comparison(rs: &ResultSet) -> Result<ChartSpec, PipelineError> {
    let dag = [
        lookup(rs, "Merge/DAG-CRR/1000")?,
        lookup(rs, "Merge/DAG-CRR/5000")?,
        // The 10K merge runs in its own large-scale group.
        lookup(rs, "MergeLargeScale/10000")?,
    ];
    let cr = [
        lookup(rs, "Merge/CR-SQLite/1000")?,
        lookup(rs, "Merge/CR-SQLite/5000")?,
        lookup_or_estimate(
            rs,
            "Merge/CR-SQLite/10000",
            Some(Rule::ScaleFrom { base: "Merge/CR-SQLite/5000", factor: CRSQLITE_5K_TO_10K }),
        )?,
    ];

    Ok(ChartSpec {
        id: Figure::MergeComparison.id().to_string(),
        x_label: "Changeset Size".to_string(),
        y_label: "Merge Time (ms)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Log,
        legend: Legend::UpperLeft,
        x_ticks: Some(vec!["1K".to_string(), "5K".to_string(), "10K".to_string()]),
        series: vec![
            bar_series("DAG-CRR", COLOR_DAG_CRR, 0, 2, &dag),
            bar_series("CR-SQLite", COLOR_CRSQLITE, 1, 2, &cr),
        ],
    })
}

/// Full-mesh vs pairwise sync time against peer count.
fn scalability(rs: &ResultSet) -> ChartSpec {
    const PEERS: [u32; 5] = [5, 10, 20, 30, 50];
    const FULL_MESH_MS: [f64; 5] = [40.0, 77.0, 157.0, 237.0, 400.0];
    const PAIRWISE_MS: [f64; 5] = [39.0, 77.0, 157.0, 237.0, 402.0];
    const SYNC_ERR_MS: [f64; 5] = [1.0, 1.0, 1.0, 1.0, 2.0];

    let fm_keys: Vec<String> = PEERS.iter().map(|p| format!("ScalabilityFullMesh/{p}")).collect();
    let pw_keys: Vec<String> = PEERS.iter().map(|p| format!("ScalabilityPairwise/{p}")).collect();

    let (full_mesh, pairwise) = match (try_all(rs, &fm_keys), try_all(rs, &pw_keys)) {
        (Some(fm), Some(pw)) => (fm, pw),
        _ => {
            warn!("incomplete scalability measurements; using illustrative series");
            (
                placeholders(&FULL_MESH_MS, &SYNC_ERR_MS),
                placeholders(&PAIRWISE_MS, &SYNC_ERR_MS),
            )
        }
    };

    let xs: Vec<f64> = PEERS.iter().map(|&p| f64::from(p)).collect();
    ChartSpec {
        id: Figure::Scalability.id().to_string(),
        x_label: "Number of Peers".to_string(),
        y_label: "Sync Time (ms)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
        legend: Legend::UpperLeft,
        x_ticks: None,
        series: vec![
            line_series("Full mesh", COLOR_DAG_CRR, Marker::Circle, false, &xs, &full_mesh),
            line_series("Pairwise", COLOR_CRSQLITE, Marker::Square, true, &xs, &pairwise),
        ],
    }
}

/// Merge time against conflict rate (single bar series).
fn sensitivity_conflict(rs: &ResultSet) -> ChartSpec {
    const RATES: [u32; 6] = [0, 10, 25, 50, 75, 100];
    const MERGE_MS: [f64; 6] = [7.1, 6.6, 6.1, 5.2, 4.3, 3.9];
    const MERGE_ERR_MS: [f64; 6] = [0.03, 0.02, 0.01, 0.02, 0.04, 0.7];

    let keys: Vec<String> = RATES.iter().map(|r| format!("SensitivityConflictRate/{r}")).collect();
    let points = try_all(rs, &keys).unwrap_or_else(|| {
        warn!("incomplete conflict-rate measurements; using illustrative series");
        placeholders(&MERGE_MS, &MERGE_ERR_MS)
    });

    ChartSpec {
        id: Figure::SensitivityConflict.id().to_string(),
        x_label: "Conflict Rate".to_string(),
        y_label: "Merge Time (ms)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
        legend: Legend::Hidden,
        x_ticks: Some(RATES.iter().map(|r| format!("{r}%")).collect()),
        series: vec![bar_series("", COLOR_DAG_CRR, 0, 1, &points)],
    }
}

/// Insert/merge time against column count (grouped bars). The two series are
/// replaced together: a half-measured pair would invite apples-to-oranges
/// comparisons.
fn sensitivity_columns(rs: &ResultSet) -> ChartSpec {
    const COLUMNS: [u32; 5] = [2, 6, 12, 24, 48];
    const INSERT_MS: [f64; 5] = [16.0, 49.0, 99.0, 200.0, 403.0];
    const INSERT_ERR_MS: [f64; 5] = [0.07, 0.17, 0.26, 0.2, 0.55];
    const MERGE_MS: [f64; 5] = [13.0, 40.0, 81.0, 164.0, 333.0];
    const MERGE_ERR_MS: [f64; 5] = [0.02, 0.08, 0.16, 0.21, 0.66];

    let insert_keys: Vec<String> =
        COLUMNS.iter().map(|c| format!("SensitivityColumns/insert/{c}")).collect();
    let merge_keys: Vec<String> =
        COLUMNS.iter().map(|c| format!("SensitivityColumns/merge/{c}")).collect();

    let (insert, merge) = match (try_all(rs, &insert_keys), try_all(rs, &merge_keys)) {
        (Some(i), Some(m)) => (i, m),
        _ => {
            warn!("incomplete column-count measurements; using illustrative series");
            (
                placeholders(&INSERT_MS, &INSERT_ERR_MS),
                placeholders(&MERGE_MS, &MERGE_ERR_MS),
            )
        }
    };

    ChartSpec {
        id: Figure::SensitivityColumns.id().to_string(),
        x_label: "Column Count".to_string(),
        y_label: "Time (ms)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
        legend: Legend::UpperLeft,
        x_ticks: Some(COLUMNS.iter().map(|c| c.to_string()).collect()),
        series: vec![
            bar_series("Insert", COLOR_DAG_CRR, 0, 2, &insert),
            bar_series("Merge", COLOR_CRSQLITE, 1, 2, &merge),
        ],
    }
}

/// Insert/merge time against value size (grouped bars).
fn sensitivity_valuesize(rs: &ResultSet) -> ChartSpec {
    const SIZES: [u32; 4] = [10, 100, 1000, 10000];
    const SIZE_LABELS: [&str; 4] = ["10B", "100B", "1KB", "10KB"];
    const INSERT_MS: [f64; 4] = [7.6, 8.3, 14.3, 26.9];
    const INSERT_ERR_MS: [f64; 4] = [0.025, 0.008, 0.026, 0.15];
    const MERGE_MS: [f64; 4] = [6.6, 6.9, 12.3, 30.5];
    const MERGE_ERR_MS: [f64; 4] = [0.012, 0.1, 0.16, 0.23];

    let insert_keys: Vec<String> =
        SIZES.iter().map(|s| format!("SensitivityValueSize/insert/{s}")).collect();
    let merge_keys: Vec<String> =
        SIZES.iter().map(|s| format!("SensitivityValueSize/merge/{s}")).collect();

    let (insert, merge) = match (try_all(rs, &insert_keys), try_all(rs, &merge_keys)) {
        (Some(i), Some(m)) => (i, m),
        _ => {
            warn!("incomplete value-size measurements; using illustrative series");
            (
                placeholders(&INSERT_MS, &INSERT_ERR_MS),
                placeholders(&MERGE_MS, &MERGE_ERR_MS),
            )
        }
    };

    ChartSpec {
        id: Figure::SensitivityValueSize.id().to_string(),
        x_label: "Value Size".to_string(),
        y_label: "Time (ms)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
        legend: Legend::UpperLeft,
        x_ticks: Some(SIZE_LABELS.iter().map(|s| s.to_string()).collect()),
        series: vec![
            bar_series("Insert", COLOR_DAG_CRR, 0, 2, &insert),
            bar_series("Merge", COLOR_CRSQLITE, 1, 2, &merge),
        ],
    }
}

/// Memory breakdown by component, stacked bands over row counts (log y).
///
/// Closed-form model for a 12-column table with 50 B values: 8 B per
/// version, 50 B per value, ~15 B per key, hash-map overhead dominating.
fn memory_breakdown() -> ChartSpec {
    const ROW_LABELS: [&str; 4] = ["1K", "10K", "100K", "1M"];
    const VERSIONS_MB: [f64; 4] = [0.09, 0.9, 9.0, 90.0];
    const VALUES_MB: [f64; 4] = [0.6, 6.0, 60.0, 600.0];
    const KEYS_MB: [f64; 4] = [0.18, 1.8, 18.0, 180.0];
    const OVERHEAD_MB: [f64; 4] = [0.8, 8.0, 80.0, 800.0];

    let bands: [(&str, &str, &[f64; 4]); 4] = [
        ("Versions (8B/col)", "#3498db", &VERSIONS_MB),
        ("Values", "#2ecc71", &VALUES_MB),
        ("Keys", "#f39c12", &KEYS_MB),
        ("HashMap", "#e74c3c", &OVERHEAD_MB),
    ];

    // Each band sits on the cumulative sum of the bands below it.
    let mut baselines = [0.0; 4];
    let mut series = Vec::with_capacity(bands.len());
    for (label, color, values) in bands {
        series.push(Series {
            label: label.to_string(),
            xs: (0..values.len()).map(|i| i as f64).collect(),
            ys: values.to_vec(),
            y_errors: vec![0.0; values.len()],
            color: color.to_string(),
            kind: SeriesKind::StackedBar { baselines: baselines.to_vec() },
            provenance: Provenance::Model,
        });
        for (b, v) in baselines.iter_mut().zip(values) {
            *b += v;
        }
    }

    ChartSpec {
        id: Figure::Memory.id().to_string(),
        x_label: "Number of Rows".to_string(),
        y_label: "Memory (MB)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Log,
        legend: Legend::UpperLeft,
        x_ticks: Some(ROW_LABELS.iter().map(|s| s.to_string()).collect()),
        series,
    }
}

/// GC coordination cost against network RTT.
///
/// Synthetic break-even model (frequency x round trips x RTT), not derived
/// from measured data.
fn breakeven_gc() -> ChartSpec {
    const RTTS_MS: [f64; 5] = [10.0, 25.0, 50.0, 100.0, 200.0];
    const GC_PER_HOUR: [f64; 3] = [1.0, 5.0, 10.0];
    const LINE_COLORS: [&str; 3] = ["#3498db", "#e74c3c", "#2ecc71"];

    let mut series: Vec<Series> = GC_PER_HOUR
        .iter()
        .zip(LINE_COLORS)
        .map(|(&freq, color)| {
            let costs: Vec<Resolved> = RTTS_MS
                .iter()
                .map(|rtt| Resolved {
                    mean_ms: freq * GC_ROUND_TRIPS_PER_CYCLE * rtt,
                    error_ms: 0.0,
                    provenance: Provenance::Model,
                })
                .collect();
            line_series(
                &format!("{freq:.0} GC/hr"),
                color,
                Marker::Circle,
                false,
                &RTTS_MS,
                &costs,
            )
        })
        .collect();

    // Uncoordinated GC pays no round trips at any RTT.
    series.push(Series {
        label: "DAG-CRR".to_string(),
        xs: vec![],
        ys: vec![0.0],
        y_errors: vec![],
        color: "#000000".to_string(),
        kind: SeriesKind::HRef { dashed: true },
        provenance: Provenance::Model,
    });

    ChartSpec {
        id: Figure::BreakevenGc.id().to_string(),
        x_label: "Network RTT (ms)".to_string(),
        y_label: "Coordination Overhead (ms/hr)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
        legend: Legend::UpperLeft,
        x_ticks: None,
        series,
    }
}

/// History-query overhead break-even between inline history and an audit
/// log. Synthetic model; the vertical marker sits at the break-even rate.
fn breakeven_query() -> ChartSpec {
    const QUERY_RATES: [f64; 6] = [0.0, 1.0, 5.0, 10.0, 20.0, 50.0];

    let model_points = |per_query: f64, base: f64| -> Vec<Resolved> {
        QUERY_RATES
            .iter()
            .map(|r| Resolved {
                mean_ms: base + r * per_query,
                error_ms: 0.0,
                provenance: Provenance::Model,
            })
            .collect()
    };
    let dag = model_points(DAG_HISTORY_PER_QUERY_MS, DAG_HISTORY_BASE_MS);
    let lww = model_points(LWW_AUDIT_PER_QUERY_MS, 0.0);

    let mut series = vec![
        line_series("DAG-CRR", COLOR_DAG_CRR, Marker::Circle, false, &QUERY_RATES, &dag),
        line_series("LWW+Audit", COLOR_CRSQLITE, Marker::Square, true, &QUERY_RATES, &lww),
    ];
    series.push(Series {
        label: String::new(),
        xs: vec![HISTORY_BREAK_EVEN_RATE],
        ys: vec![],
        y_errors: vec![],
        color: "#808080".to_string(),
        kind: SeriesKind::VRef,
        provenance: Provenance::Model,
    });

    ChartSpec {
        id: Figure::BreakevenQuery.id().to_string(),
        x_label: "History Queries per 100 Ops".to_string(),
        y_label: "Overhead (ms)".to_string(),
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
        legend: Legend::UpperLeft,
        x_ticks: None,
        series,
    }
}
