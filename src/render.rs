//! Rendering backend: draws a `ChartSpec` to SVG and PNG.
//!
//! Thin collaborator over plotters; all data selection and series derivation
//! happens in the figure composer. Non-measured series are labeled in the
//! legend so rendered figures keep the measured/modeled distinction visible.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use log::warn;
use plotters::coord::Shift;
use plotters::coord::ranged1d::{AsRangedCoord, Ranged, ValueFormatter};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::chart::{AxisScale, ChartSpec, Legend, Marker, Series, SeriesKind};
use crate::fallback::Provenance;

const CHART_SIZE: (u32, u32) = (900, 600);
const FONT: &str = "sans-serif";

/// Fraction of one categorical x slot covered by its bar group.
const BAR_GROUP_WIDTH: f64 = 0.7;
const STACKED_BAR_WIDTH: f64 = 0.6;

/// Candidate font files for the pure-Rust glyph backend.
const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Register a system font with the glyph backend, once per process.
///
/// Returns false when no candidate font exists; rendering then fails per
/// figure with a clear error instead of aborting the whole batch.
pub fn ensure_font() -> bool {
    static LOADED: OnceLock<bool> = OnceLock::new();
    *LOADED.get_or_init(|| {
        for path in FONT_PATHS {
            if let Ok(bytes) = std::fs::read(path) {
                let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                if plotters::style::register_font(FONT, plotters::style::FontStyle::Normal, bytes)
                    .is_ok()
                {
                    return true;
                }
            }
        }
        warn!("no usable system font found; figure rendering will fail");
        false
    })
}

/// Render the spec as a vector image.
pub fn render_svg(spec: &ChartSpec, path: &Path) -> Result<()> {
    ensure_font();
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_chart(spec, &root).map_err(|e| anyhow!("failed to render {}: {e}", spec.id))
}

/// Render the spec as a raster image.
pub fn render_png(spec: &ChartSpec, path: &Path) -> Result<()> {
    ensure_font();
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_chart(spec, &root).map_err(|e| anyhow!("failed to render {}: {e}", spec.id))
}

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn draw_chart<DB: DrawingBackend>(spec: &ChartSpec, root: &DrawingArea<DB, Shift>) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let ((x0, x1), (y0, y1)) = bounds(spec);
    match (spec.x_scale, spec.y_scale) {
        (AxisScale::Linear, AxisScale::Linear) => draw_on(spec, root, x0..x1, y0..y1, y0),
        (AxisScale::Log, AxisScale::Linear) => {
            draw_on(spec, root, (x0..x1).log_scale(), y0..y1, y0)
        }
        (AxisScale::Linear, AxisScale::Log) => {
            draw_on(spec, root, x0..x1, (y0..y1).log_scale(), y0)
        }
        (AxisScale::Log, AxisScale::Log) => {
            draw_on(spec, root, (x0..x1).log_scale(), (y0..y1).log_scale(), y0)
        }
    }
}

fn draw_on<DB, XS, YS>(
    spec: &ChartSpec,
    root: &DrawingArea<DB, Shift>,
    x_range: XS,
    y_range: YS,
    y_base: f64,
) -> DrawResult<DB>
where
    DB: DrawingBackend,
    XS: AsRangedCoord<Value = f64>,
    XS::CoordDescType: Ranged<ValueType = f64> + ValueFormatter<f64>,
    YS: AsRangedCoord<Value = f64>,
    YS::CoordDescType: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let ((x_min, x_max), _) = bounds(spec);

    let mut chart = ChartBuilder::on(root)
        .margin(12)
        .x_label_area_size(44)
        .y_label_area_size(58)
        .build_cartesian_2d(x_range, y_range)?;

    let ticks = spec.x_ticks.clone();
    let tick_formatter = |x: &f64| -> String {
        let Some(labels) = &ticks else { return String::new() };
        let idx = x.round();
        if (x - idx).abs() < 0.05 && idx >= 0.0 && (idx as usize) < labels.len() {
            labels[idx as usize].clone()
        } else {
            String::new()
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .disable_y_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .label_style((FONT, 13))
        .axis_desc_style((FONT, 15));
    if let Some(labels) = &spec.x_ticks {
        mesh.x_labels(labels.len()).x_label_formatter(&tick_formatter);
    }
    mesh.draw()?;

    for series in &spec.series {
        let color = parse_color(&series.color);
        let label = legend_label(series);

        match &series.kind {
            SeriesKind::Line { marker, dashed } => {
                let pts: Vec<(f64, f64)> =
                    series.xs.iter().copied().zip(series.ys.iter().copied()).collect();
                let anno = if *dashed {
                    chart.draw_series(DashedLineSeries::new(
                        pts.iter().copied(),
                        6,
                        4,
                        color.stroke_width(2),
                    ))?
                } else {
                    chart.draw_series(LineSeries::new(pts.iter().copied(), color.stroke_width(2)))?
                };
                if !label.is_empty() {
                    anno.label(label).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                    });
                }
                draw_markers(&mut chart, &pts, *marker, color)?;
                draw_error_bars(&mut chart, series, 0.0, y_base, color)?;
            }
            SeriesKind::Bar { slot, slots } => {
                let bar_w = BAR_GROUP_WIDTH / *slots as f64;
                let offset = -BAR_GROUP_WIDTH / 2.0 + *slot as f64 * bar_w;
                let anno = chart.draw_series(series.xs.iter().zip(&series.ys).map(|(&x, &y)| {
                    Rectangle::new(
                        [(x + offset, y_base), (x + offset + bar_w, y.max(y_base))],
                        color.filled(),
                    )
                }))?;
                if !label.is_empty() {
                    anno.label(label).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                    });
                }
                draw_error_bars(&mut chart, series, offset + bar_w / 2.0, y_base, color)?;
            }
            SeriesKind::StackedBar { baselines } => {
                let half = STACKED_BAR_WIDTH / 2.0;
                let anno = chart.draw_series(
                    series
                        .xs
                        .iter()
                        .zip(&series.ys)
                        .zip(baselines)
                        .map(|((&x, &y), &base)| {
                            let lo = base.max(y_base);
                            Rectangle::new([(x - half, lo), (x + half, base + y)], color.filled())
                        }),
                )?;
                if !label.is_empty() {
                    anno.label(label).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                    });
                }
            }
            SeriesKind::HRef { dashed } => {
                let y = series.ys.first().copied().unwrap_or(0.0);
                let pts = [(x_min, y), (x_max, y)];
                let anno = if *dashed {
                    chart.draw_series(DashedLineSeries::new(
                        pts.iter().copied(),
                        8,
                        5,
                        color.stroke_width(2),
                    ))?
                } else {
                    chart.draw_series(LineSeries::new(pts.iter().copied(), color.stroke_width(2)))?
                };
                if !label.is_empty() {
                    anno.label(label).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                    });
                }
            }
            SeriesKind::VRef => {
                let x = series.xs.first().copied().unwrap_or(0.0);
                let (_, (yb0, yb1)) = bounds(spec);
                chart.draw_series(DashedLineSeries::new(
                    [(x, yb0), (x, yb1)].iter().copied(),
                    4,
                    4,
                    color.mix(0.7).stroke_width(1),
                ))?;
            }
        }
    }

    if spec.legend == Legend::UpperLeft && spec.series.iter().any(|s| !s.label.is_empty()) {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.3))
            .label_font((FONT, 13))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_markers<DB, X, Y>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<X, Y>>,
    pts: &[(f64, f64)],
    marker: Marker,
    color: RGBColor,
) -> DrawResult<DB>
where
    DB: DrawingBackend,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    match marker {
        Marker::Circle => {
            chart.draw_series(
                pts.iter().map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
            )?;
        }
        Marker::Triangle => {
            chart.draw_series(
                pts.iter().map(|&(x, y)| TriangleMarker::new((x, y), 5, color.filled())),
            )?;
        }
        Marker::Square => {
            chart.draw_series(pts.iter().map(|&(x, y)| {
                EmptyElement::at((x, y)) + Rectangle::new([(-4, -4), (4, 4)], color.filled())
            }))?;
        }
        Marker::Diamond => {
            chart.draw_series(pts.iter().map(|&(x, y)| {
                EmptyElement::at((x, y))
                    + Polygon::new(vec![(0, -5), (5, 0), (0, 5), (-5, 0)], color.filled())
            }))?;
        }
    }
    Ok(())
}

fn draw_error_bars<DB, X, Y>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<X, Y>>,
    series: &Series,
    x_offset: f64,
    y_base: f64,
    color: RGBColor,
) -> DrawResult<DB>
where
    DB: DrawingBackend,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    if !series.y_errors.iter().any(|&e| e > 0.0) {
        return Ok(());
    }
    chart.draw_series(
        series
            .xs
            .iter()
            .zip(&series.ys)
            .zip(&series.y_errors)
            .map(|((&x, &y), &e)| {
                // Keep the lower whisker inside a log axis.
                let lo = (y - e).max(y_base);
                ErrorBar::new_vertical(x + x_offset, lo, y, y + e, color.stroke_width(1), 6)
            }),
    )?;
    Ok(())
}

/// Legend label carrying the provenance hint for non-measured series.
fn legend_label(series: &Series) -> String {
    if series.label.is_empty() {
        return String::new();
    }
    match series.provenance {
        Provenance::Measured => series.label.clone(),
        Provenance::Estimated => format!("{} (est.)", series.label),
        Provenance::Placeholder => format!("{} (illustrative)", series.label),
        Provenance::Model => format!("{} (model)", series.label),
    }
}

fn parse_color(hex: &str) -> RGBColor {
    let h = hex.trim_start_matches('#');
    if h.len() == 6 {
        let channels = (
            u8::from_str_radix(&h[0..2], 16),
            u8::from_str_radix(&h[2..4], 16),
            u8::from_str_radix(&h[4..6], 16),
        );
        if let (Ok(r), Ok(g), Ok(b)) = channels {
            return RGBColor(r, g, b);
        }
    }
    RGBColor(0, 0, 0)
}

/// Axis bounds: `((x_min, x_max), (y_min, y_max))`, padded per scale.
fn bounds(spec: &ChartSpec) -> ((f64, f64), (f64, f64)) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    let mut y_min_pos = f64::INFINITY;

    let mut cover_y = |y: f64| {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
        if y > 0.0 {
            y_min_pos = y_min_pos.min(y);
        }
    };

    for series in &spec.series {
        match &series.kind {
            SeriesKind::Line { .. } | SeriesKind::Bar { .. } => {
                for &x in &series.xs {
                    x_min = x_min.min(x);
                    x_max = x_max.max(x);
                }
                for (&y, &e) in series.ys.iter().zip(&series.y_errors) {
                    cover_y(y - e);
                    cover_y(y + e);
                }
            }
            SeriesKind::StackedBar { baselines } => {
                for &x in &series.xs {
                    x_min = x_min.min(x);
                    x_max = x_max.max(x);
                }
                for (&y, &base) in series.ys.iter().zip(baselines) {
                    cover_y(base + y);
                    if base > 0.0 {
                        cover_y(base);
                    }
                }
            }
            SeriesKind::HRef { .. } => {
                if let Some(&y) = series.ys.first() {
                    cover_y(y);
                }
            }
            SeriesKind::VRef => {
                if let Some(&x) = series.xs.first() {
                    x_min = x_min.min(x);
                    x_max = x_max.max(x);
                }
            }
        }
    }

    if !x_min.is_finite() || !x_max.is_finite() {
        (x_min, x_max) = (0.0, 1.0);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        (y_min, y_max) = (0.0, 1.0);
    }
    if !y_min_pos.is_finite() {
        y_min_pos = 0.1;
    }

    let x_bounds = if spec.x_ticks.is_some() {
        (x_min - 0.7, x_max + 0.7)
    } else {
        match spec.x_scale {
            AxisScale::Linear => {
                let pad = ((x_max - x_min) * 0.05).max(0.5);
                (x_min - pad, x_max + pad)
            }
            AxisScale::Log => (x_min / 1.5, x_max * 1.5),
        }
    };

    let y_bounds = match spec.y_scale {
        AxisScale::Linear => {
            let top = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
            (y_min.min(0.0), top)
        }
        AxisScale::Log => (y_min_pos / 1.8, y_max * 1.8),
    };

    (x_bounds, y_bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figures::{self, Figure};
    use crate::resultset::ResultSet;

    #[test]
    fn color_parsing() {
        assert_eq!(parse_color("#2E86AB"), RGBColor(0x2E, 0x86, 0xAB));
        assert_eq!(parse_color("bogus"), RGBColor(0, 0, 0));
    }

    #[test]
    fn legend_labels_flag_provenance() {
        let spec = figures::compose(Figure::BreakevenQuery, &ResultSet::default()).unwrap();
        let labeled = &spec.series[0];
        assert_eq!(legend_label(labeled), "DAG-CRR (model)");
        // The vertical break-even marker stays unlabeled.
        assert_eq!(legend_label(spec.series.last().unwrap()), "");
    }

    #[test]
    fn bounds_cover_errors_and_stacks() {
        let spec = figures::compose(Figure::Memory, &ResultSet::default()).unwrap();
        let ((x0, x1), (_, y1)) = bounds(&spec);
        assert!(x0 < 0.0 && x1 > 3.0);
        // Top of the tallest stack: 90 + 600 + 180 + 800, padded.
        assert!(y1 > 1670.0);
    }

    #[test]
    fn svg_render_smoke() {
        if !ensure_font() {
            return; // no system font available in this environment
        }
        let dir = tempfile::tempdir().unwrap();
        for figure in [Figure::Scalability, Figure::Memory, Figure::BreakevenGc] {
            let spec = figures::compose(figure, &ResultSet::default()).unwrap();
            let path = dir.path().join(format!("{}.svg", figure.id()));
            render_svg(&spec, &path).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(text.contains("<svg"), "{} produced no svg", figure.id());
        }
    }
}
