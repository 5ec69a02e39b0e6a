//! SVG line charts for scalar metric series
//!
//! The run logger uses this to draw the training loss curve next to the
//! raw `scalars.jsonl` records, so a run can be inspected without extra tooling.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Chart styling constants
const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

pub const COLOR_PRIMARY: &str = "#3498db";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// A data point for a line chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

/// A named data series
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

/// Render a line chart as an SVG document
///
/// The Y range is derived from the data (padded by 5%), so the chart works for
/// both losses and percentages.
pub fn render_line_chart(title: &str, x_label: &str, y_label: &str, series: &[DataSeries]) -> String {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (x_min, x_max, y_min, y_max) = padded_ranges(series);
    let scale_x = |x: f64| MARGIN_LEFT + (x - x_min) / (x_max - x_min) * plot_width;
    let scale_y = |y: f64| MARGIN_TOP + plot_height - (y - y_min) / (y_max - y_min) * plot_height;

    let mut svg = String::new();

    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">"#,
        w = CHART_WIDTH,
        h = CHART_HEIGHT
    );
    let _ = write!(
        svg,
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        CHART_WIDTH, CHART_HEIGHT
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        CHART_WIDTH / 2.0,
        COLOR_TEXT,
        escape_xml(title)
    );

    // Horizontal grid with Y tick labels
    for i in 0..=5 {
        let value = y_min + (i as f64 / 5.0) * (y_max - y_min);
        let y = scale_y(value);
        let _ = write!(
            svg,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT,
            y,
            MARGIN_LEFT + plot_width,
            y,
            COLOR_GRID
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.3}</text>"#,
            MARGIN_LEFT - 10.0,
            y + 4.0,
            COLOR_TEXT,
            value
        );
    }

    // Axes
    let _ = write!(
        svg,
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT,
        MARGIN_TOP + plot_height,
        MARGIN_LEFT + plot_width,
        MARGIN_TOP + plot_height,
        COLOR_AXIS
    );
    let _ = write!(
        svg,
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        MARGIN_TOP + plot_height,
        COLOR_AXIS
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.0}</text>"#,
        MARGIN_LEFT,
        MARGIN_TOP + plot_height + 20.0,
        COLOR_TEXT,
        x_min
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.0}</text>"#,
        MARGIN_LEFT + plot_width,
        MARGIN_TOP + plot_height + 20.0,
        COLOR_TEXT,
        x_max
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        CHART_HEIGHT - 20.0,
        COLOR_TEXT,
        escape_xml(x_label)
    );
    let _ = write!(
        svg,
        r#"<text x="20" y="{y}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {y})">{}</text>"#,
        COLOR_TEXT,
        escape_xml(y_label),
        y = CHART_HEIGHT / 2.0
    );

    for series_data in series.iter().filter(|s| !s.points.is_empty()) {
        let mut path = String::new();
        for (i, point) in series_data.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(path, "{} {:.2} {:.2}", cmd, scale_x(point.x), scale_y(point.y));
        }
        let _ = write!(
            svg,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            path, series_data.color
        );
    }

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series_data in series {
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            CHART_WIDTH - MARGIN_RIGHT - 140.0,
            legend_y,
            series_data.color
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            CHART_WIDTH - MARGIN_RIGHT - 120.0,
            legend_y + 12.0,
            COLOR_TEXT,
            escape_xml(&series_data.name)
        );
        legend_y += 25.0;
    }

    svg.push_str("</svg>");
    svg
}

/// Render a line chart and write it to `output_path`
pub fn generate_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    output_path: &Path,
) -> std::io::Result<()> {
    fs::write(output_path, render_line_chart(title, x_label, y_label, series))
}

fn padded_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for p in series.iter().flat_map(|s| s.points.iter()) {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }

    if !x_min.is_finite() {
        return (0.0, 1.0, 0.0, 1.0);
    }

    // Degenerate ranges would divide by zero when scaling
    if x_max - x_min < f64::EPSILON {
        x_max = x_min + 1.0;
    }
    if y_max - y_min < f64::EPSILON {
        y_max = y_min + 1.0;
    }

    let pad = (y_max - y_min) * 0.05;
    (x_min, x_max, y_min - pad, y_max + pad)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
