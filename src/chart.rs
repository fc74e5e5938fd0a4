//! ChartSpec: the rendering-agnostic description of one figure's data and
//! axis configuration.
//!
//! Produced by the figure composer, serialized to JSON next to the rendered
//! images, and consumed by the rendering backend. Serialization is
//! deterministic: re-composing from the same result set yields byte-identical
//! output.

use serde::Serialize;

use crate::fallback::Provenance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScale {
    Linear,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Legend {
    UpperLeft,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Circle,
    Square,
    Triangle,
    Diamond,
}

/// How a series is drawn. Bars at one x position are placed side by side via
/// `slot`/`slots`; stacked bars carry their baselines pre-computed by the
/// composer (cumulative sum of the bands below).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Line { marker: Marker, dashed: bool },
    Bar { slot: usize, slots: usize },
    StackedBar { baselines: Vec<f64> },
    /// Horizontal reference line at `ys[0]`.
    HRef { dashed: bool },
    /// Vertical reference line at `xs[0]`.
    VRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub y_errors: Vec<f64>,
    /// Hex color such as `#2E86AB`.
    pub color: String,
    pub kind: SeriesKind,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: String,
    pub x_label: String,
    pub y_label: String,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
    pub legend: Legend,
    /// Labels for categorical x axes; positions are 0..n.
    pub x_ticks: Option<Vec<String>>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// True if any series carries non-measured data. Break-even and memory
    /// figures are models by construction and always report true.
    pub fn used_fallback(&self) -> bool {
        self.series.iter().any(|s| s.provenance != Provenance::Measured)
    }

    /// Deterministic JSON rendering of the spec.
    pub fn to_json(&self) -> String {
        let mut text = serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| "{}".to_string());
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(provenance: Provenance) -> Series {
        Series {
            label: "DAG-CRR".to_string(),
            xs: vec![1.0, 2.0],
            ys: vec![5.0, 10.0],
            y_errors: vec![0.5, 1.0],
            color: "#2E86AB".to_string(),
            kind: SeriesKind::Line { marker: Marker::Circle, dashed: false },
            provenance,
        }
    }

    fn spec(series: Vec<Series>) -> ChartSpec {
        ChartSpec {
            id: "fig_test".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            x_scale: AxisScale::Linear,
            y_scale: AxisScale::Log,
            legend: Legend::UpperLeft,
            x_ticks: None,
            series,
        }
    }

    #[test]
    fn fallback_flag_reflects_series_provenance() {
        assert!(!spec(vec![line(Provenance::Measured)]).used_fallback());
        assert!(spec(vec![line(Provenance::Measured), line(Provenance::Estimated)]).used_fallback());
    }

    #[test]
    fn json_is_deterministic() {
        let s = spec(vec![line(Provenance::Measured)]);
        assert_eq!(s.to_json(), s.to_json());
        assert!(s.to_json().ends_with('\n'));
    }

    #[test]
    fn json_carries_axis_and_provenance_fields() {
        let text = spec(vec![line(Provenance::Model)]).to_json();
        assert!(text.contains("\"y_scale\": \"log\""));
        assert!(text.contains("\"provenance\": \"model\""));
    }
}
