//! Box plots and histogram grids.

use crate::color::rgb;
use anyhow::Result;
use clonal_common::{BoxPlot, HistogramGrid};
use plotters::coord::Shift;
use plotters::prelude::*;

const BOX_HALF_WIDTH: f64 = 0.3;
const BOX_COLOR: &str = "#1B2ACC";
const BAR_COLOR: &str = "#089FFF";

/// Quantile with linear interpolation between closest ranks. `sorted` must be non-empty.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

/// Five-number summary with whiskers at the furthest samples within 1.5 IQR.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn of(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let reach = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - reach, q3 + reach);

        let inside = sorted.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
        let lower_whisker = inside.clone().fold(q1, f64::min);
        let upper_whisker = inside.fold(q3, f64::max);
        let outliers = sorted.iter().copied().filter(|v| *v < low_fence || *v > high_fence).collect();

        Some(BoxStats { lower_whisker, q1, median, q3, upper_whisker, outliers })
    }
}

/// Equal-width bins over the sample range as `(low, high, count)`. The last bin
/// includes its upper edge.
pub fn histogram(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi - lo < f64::EPSILON {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in finite {
        let index = (((v - lo) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, count))
        .collect()
}

/// Draws one box per week, weeks spaced evenly along x.
pub fn draw_box_plot<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, plot: &BoxPlot) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let boxes: Vec<(i64, BoxStats)> = plot
        .groups
        .iter()
        .filter_map(|(week, values)| BoxStats::of(values).map(|stats| (*week, stats)))
        .collect();
    if boxes.is_empty() {
        anyhow::bail!("box plot '{}' has no samples", plot.title);
    }

    let y_hi = boxes
        .iter()
        .flat_map(|(_, s)| s.outliers.iter().copied().chain(std::iter::once(s.upper_whisker)))
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.1;
    let weeks: Vec<i64> = boxes.iter().map(|(week, _)| *week).collect();
    let x_hi = boxes.len() as f64 - 0.5;

    area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(area)
        .caption(&plot.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..x_hi, 0.0..y_hi)?;

    let week_label = |x: &f64| -> String {
        let index = x.round();
        if (x - index).abs() > 1e-6 || index < 0.0 {
            return String::new();
        }
        weeks.get(index as usize).map(|w| w.to_string()).unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(boxes.len() * 2 + 1)
        .x_label_formatter(&week_label)
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.y_label.as_str())
        .draw()?;

    let color = rgb(BOX_COLOR);
    let style = color.stroke_width(2);
    for (i, (_, stats)) in boxes.iter().enumerate() {
        let x = i as f64;
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
        let cap = BOX_HALF_WIDTH / 2.0;

        chart.draw_series(std::iter::once(Rectangle::new([(left, stats.q1), (right, stats.q3)], style)))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(left, stats.median), (right, stats.median)],
            RED.stroke_width(2),
        )))?;
        for (from, to) in [(stats.q1, stats.lower_whisker), (stats.q3, stats.upper_whisker)] {
            chart.draw_series(std::iter::once(PathElement::new(vec![(x, from), (x, to)], style)))?;
            chart.draw_series(std::iter::once(PathElement::new(vec![(x - cap, to), (x + cap, to)], style)))?;
        }
        chart.draw_series(stats.outliers.iter().map(|&y| Circle::new((x, y), 3, color.stroke_width(1))))?;
    }
    Ok(())
}

/// Draws each panel's histogram into a grid of two columns under a shared title.
pub fn draw_histograms<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, grid: &HistogramGrid) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if grid.panels.is_empty() {
        anyhow::bail!("histogram grid '{}' has no panels", grid.title);
    }

    area.fill(&WHITE)?;
    let body = area.titled(&grid.title, ("sans-serif", 28))?;
    let cols = grid.panels.len().min(2);
    let rows = grid.panels.len().div_ceil(cols);
    let cells = body.split_evenly((rows, cols));
    let color = rgb(BAR_COLOR);

    for (cell, (panel_title, values)) in cells.iter().zip(&grid.panels) {
        let bins = histogram(values, grid.bins);
        let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
            continue;
        };
        let top = bins.iter().map(|(_, _, c)| *c).max().unwrap_or(0).max(1) as f64 * 1.1;

        let mut chart = ChartBuilder::on(cell)
            .caption(panel_title, ("sans-serif", 18))
            .margin(8)
            .x_label_area_size(36)
            .y_label_area_size(50)
            .build_cartesian_2d(first.0..last.1, 0.0..top)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(grid.x_label.as_str())
            .y_desc(grid.y_label.as_str())
            .draw()?;

        chart.draw_series(
            bins.iter()
                .map(|&(lo, hi, count)| Rectangle::new([(lo, 0.0), (hi, count as f64)], color.mix(0.6).filled())),
        )?;
        chart.draw_series(
            bins.iter()
                .map(|&(lo, hi, count)| Rectangle::new([(lo, 0.0), (hi, count as f64)], BLACK.stroke_width(1))),
        )?;
    }
    Ok(())
}
