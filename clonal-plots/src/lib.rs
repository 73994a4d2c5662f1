pub mod color;
pub mod distribution;
pub mod line;

pub use color::parse_color;
pub use distribution::{histogram, BoxStats};

use anyhow::{Context, Result};
use clonal_common::Figure;
use log::{debug, info};
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;

/// Pixel size of every rendered figure.
pub const FIGURE_SIZE: (u32, u32) = (1024, 768);

/// Renders one figure to the PNG file it names, creating parent directories.
pub fn render(figure: &Figure) -> Result<()> {
    let output = figure.output();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory '{}'", parent.display()))?;
    }

    let size = match figure {
        Figure::Histograms(grid) if grid.panels.len() > 4 => {
            let rows = grid.panels.len().div_ceil(2) as u32;
            (FIGURE_SIZE.0, FIGURE_SIZE.1 / 2 * rows)
        }
        _ => FIGURE_SIZE,
    };

    let root = BitMapBackend::new(output, size).into_drawing_area();
    let drawn = match figure {
        Figure::Line(plot) => line::draw_line_plot(&root, plot),
        Figure::Box(plot) => distribution::draw_box_plot(&root, plot),
        Figure::Histograms(grid) => distribution::draw_histograms(&root, grid),
    };
    drawn.with_context(|| format!("Failed to draw '{}'", figure.title()))?;
    root.present()
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    info!("Saved '{}' to {}", figure.title(), output.display());
    Ok(())
}

/// Renders every figure in order, stopping at the first failure.
pub fn render_all(figures: &[Figure]) -> Result<usize> {
    for figure in figures {
        debug!("Rendering {}", figure.output().display());
        render(figure)?;
    }
    Ok(figures.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonal_common::{BoxPlot, ErrorMode, HistogramGrid, LineKind, LinePlot, Marker, Series, SeriesStyle};
    use std::path::Path;

    fn series(label: &str, line: LineKind, marker: Marker, error_mode: ErrorMode) -> Series {
        Series {
            label: label.to_string(),
            x: vec![0.0, 10.0, 20.0],
            y: vec![1.0, 3.0, 2.0],
            stdev: vec![0.5, 0.2, 0.0],
            style: SeriesStyle::new(line, marker, "black"),
            edge_color: "#1B2ACC".to_string(),
            fill_color: "#089FFF".to_string(),
            error_mode,
        }
    }

    fn figures(dir: &Path) -> Vec<Figure> {
        vec![
            Figure::Line(LinePlot {
                series: vec![
                    series("solid", LineKind::Solid, Marker::Circle, ErrorMode::Shaded),
                    series("dashed", LineKind::Dashed, Marker::None, ErrorMode::Bar),
                ],
                x_label: "Weeks".to_string(),
                y_label: "cells".to_string(),
                title: "line".to_string(),
                output: dir.join("nested").join("line.png"),
            }),
            Figure::Box(BoxPlot {
                groups: vec![(20, vec![1.0, 2.0, 3.0, 9.0]), (40, vec![4.0])],
                x_label: "Week".to_string(),
                y_label: "Clone size".to_string(),
                title: "box".to_string(),
                output: dir.join("box.png"),
            }),
            Figure::Histograms(HistogramGrid {
                panels: vec![("week 10".to_string(), vec![40.0, 55.0, 60.0]), ("week 30".to_string(), vec![70.0])],
                bins: 5,
                x_label: "% local density".to_string(),
                y_label: "frequency".to_string(),
                title: "hist".to_string(),
                output: dir.join("hist.png"),
            }),
        ]
    }

    #[test]
    fn renders_every_figure_kind_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let figures = figures(dir.path());
        assert_eq!(render_all(&figures).unwrap(), 3);
        for figure in &figures {
            assert!(figure.output().is_file(), "{} missing", figure.output().display());
        }
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn empty_box_plot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let figure = Figure::Box(BoxPlot {
            groups: vec![(20, Vec::new())],
            x_label: "Week".to_string(),
            y_label: "Clone size".to_string(),
            title: "empty".to_string(),
            output: dir.path().join("empty.png"),
        });
        assert!(render(&figure).is_err());
    }
}
