use crate::color::rgb;
use anyhow::Result;
use clonal_common::{ErrorMode, LineKind, LinePlot, Marker, Series};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

/// Dash and gap lengths in pixels.
const DASH: i32 = 10;
const GAP: i32 = 6;
const MARKER_RADIUS: i32 = 4;

/// Smallest and largest x over every series, widened when degenerate.
pub(crate) fn x_range(plot: &LinePlot) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for x in plot.series.iter().flat_map(|s| s.x.iter().copied()) {
        lo = lo.min(x);
        hi = hi.max(x);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    (lo, hi)
}

/// Top of the y axis: highest `y + std` with some headroom. The axis always starts at 0.
pub(crate) fn y_upper(plot: &LinePlot) -> f64 {
    let top = plot
        .series
        .iter()
        .flat_map(|s| {
            s.y.iter()
                .enumerate()
                .map(move |(i, y)| y + s.stdev.get(i).copied().unwrap_or(0.0))
        })
        .fold(0.0_f64, f64::max);
    if top > 0.0 {
        top * 1.1
    } else {
        1.0
    }
}

fn points(series: &Series) -> Vec<(f64, f64)> {
    series.x.iter().copied().zip(series.y.iter().copied()).collect()
}

fn draw_spread<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    series: &Series,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if series.stdev.len() != series.y.len() {
        return Ok(());
    }
    let edge = rgb(&series.edge_color);
    let fill = rgb(&series.fill_color);
    let upper: Vec<(f64, f64)> = series.x.iter().zip(&series.y).zip(&series.stdev).map(|((x, y), s)| (*x, y + s)).collect();
    let lower: Vec<(f64, f64)> = series.x.iter().zip(&series.y).zip(&series.stdev).map(|((x, y), s)| (*x, y - s)).collect();

    match series.error_mode {
        ErrorMode::Shaded if series.x.len() >= 2 => {
            let mut band = upper.clone();
            band.extend(lower.iter().rev().copied());
            chart.draw_series(std::iter::once(Polygon::new(band, fill.mix(0.3).filled())))?;
            chart.draw_series(std::iter::once(PathElement::new(upper, edge.mix(0.6))))?;
            chart.draw_series(std::iter::once(PathElement::new(lower, edge.mix(0.6))))?;
        }
        // A band needs two points; a lone point gets a bar
        ErrorMode::Shaded | ErrorMode::Bar => {
            let (lo, hi) = x_span(&series.x);
            let cap = (hi - lo).max(1.0) * 0.01;
            for (top, bottom) in upper.iter().zip(&lower) {
                let x = top.0;
                chart.draw_series(std::iter::once(PathElement::new(vec![*bottom, *top], edge.stroke_width(1))))?;
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(x - cap, top.1), (x + cap, top.1)],
                    edge.stroke_width(1),
                )))?;
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(x - cap, bottom.1), (x + cap, bottom.1)],
                    edge.stroke_width(1),
                )))?;
            }
        }
        ErrorMode::None => {}
    }
    Ok(())
}

fn x_span(xs: &[f64]) -> (f64, f64) {
    xs.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

/// Draws a line chart with one entry per series into `area`.
pub fn draw_line_plot<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, plot: &LinePlot) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) = x_range(plot);
    let y_hi = y_upper(plot);

    area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(area)
        .caption(&plot.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

    chart
        .configure_mesh()
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.y_label.as_str())
        .draw()?;

    for series in &plot.series {
        draw_spread(&mut chart, series)?;

        let color = rgb(&series.style.color);
        let line = points(series);
        match series.style.line {
            LineKind::Solid => {
                chart.draw_series(LineSeries::new(line.iter().copied(), color.stroke_width(2)))?;
            }
            LineKind::Dashed => {
                chart.draw_series(DashedLineSeries::new(line.iter().copied(), DASH, GAP, color.stroke_width(2)))?;
            }
            LineKind::None => {}
        }
        if series.style.marker == Marker::Circle {
            chart.draw_series(line.iter().map(|&p| Circle::new(p, MARKER_RADIUS, color.filled())))?;
        }

        // Legend entry
        chart
            .draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), color))?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if plot.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}
