//! Minimal SVG line charts for the dashboard series.

use super::models::{ChartPoint, Metric, Notice};

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Value range with some headroom; a flat series gets ±1 around its value
fn value_range(points: &[ChartPoint]) -> (f64, f64) {
    let min = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

#[allow(clippy::cast_precision_loss)]
fn plot_coordinates(points: &[ChartPoint]) -> Vec<(f64, f64)> {
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let micros: Vec<i64> = points
        .iter()
        .map(|p| p.recording_at.and_utc().timestamp_micros())
        .collect();
    let first = micros.iter().copied().min().unwrap_or_default();
    let last = micros.iter().copied().max().unwrap_or_default();
    let span = (last - first) as f64;
    let (low, high) = value_range(points);

    points
        .iter()
        .zip(&micros)
        .map(|(point, ts)| {
            let x = if span > 0.0 {
                MARGIN_LEFT + (*ts - first) as f64 / span * plot_width
            } else {
                MARGIN_LEFT + plot_width / 2.0
            };
            let y = MARGIN_TOP + (high - point.value) / (high - low) * plot_height;
            (x, y)
        })
        .collect()
}

/// Render one metric as an SVG document. An empty series yields the empty
/// frame with the notice text (or "No data") in the middle.
pub fn render_line_chart(
    metric: Metric,
    plant: Option<&str>,
    points: &[ChartPoint],
    notice: Option<&Notice>,
) -> String {
    let title = match plant {
        Some(plant) => format!("{} ({}) for {}", metric.title(), metric.unit(), plant),
        None => format!("{} ({})", metric.title(), metric.unit()),
    };

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\" font-family=\"sans-serif\" font-size=\"12\">\n"
    );
    svg.push_str(&format!(
        "<text x=\"{MARGIN_LEFT}\" y=\"24\" font-size=\"16\">{}</text>\n",
        escape_xml(&title)
    ));
    svg.push_str(&format!(
        "<rect x=\"{MARGIN_LEFT}\" y=\"{MARGIN_TOP}\" width=\"{}\" height=\"{}\" fill=\"none\" stroke=\"#999\"/>\n",
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    ));

    if points.is_empty() {
        let message = notice.map_or("No data", |n| n.message.as_str());
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" fill=\"#666\">{}</text>\n",
            WIDTH / 2.0,
            HEIGHT / 2.0,
            escape_xml(message)
        ));
        svg.push_str("</svg>\n");
        return svg;
    }

    let (low, high) = value_range(points);
    let bottom = HEIGHT - MARGIN_BOTTOM;
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{high:.1}</text>\n",
        MARGIN_LEFT - 6.0,
        MARGIN_TOP + 4.0
    ));
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{bottom}\" text-anchor=\"end\">{low:.1}</text>\n",
        MARGIN_LEFT - 6.0
    ));

    let coordinates = plot_coordinates(points);
    let polyline: Vec<String> = coordinates
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect();
    svg.push_str(&format!(
        "<polyline fill=\"none\" stroke=\"#2a7f62\" stroke-width=\"2\" points=\"{}\"/>\n",
        polyline.join(" ")
    ));

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        svg.push_str(&format!(
            "<text x=\"{MARGIN_LEFT}\" y=\"{}\">{}</text>\n",
            bottom + 18.0,
            first.recording_at.format("%Y-%m-%d %H:%M")
        ));
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{}</text>\n",
            WIDTH - MARGIN_RIGHT,
            bottom + 18.0,
            last.recording_at.format("%Y-%m-%d %H:%M")
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
