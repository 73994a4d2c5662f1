use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the stdev band of a series is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorMode {
    /// Translucent band between `y - std` and `y + std`.
    Shaded,
    /// Vertical error bars with caps.
    Bar,
    None,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Solid,
    Dashed,
    /// Markers only.
    None,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Circle,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub line: LineKind,
    pub marker: Marker,
    /// Hex (`#1B2ACC`) or a CSS colour name.
    pub color: String,
}

impl SeriesStyle {
    pub fn new(line: LineKind, marker: Marker, color: &str) -> Self {
        SeriesStyle { line, marker, color: color.to_string() }
    }
}

/// One named y-series with its x values and spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Empty when the series carries no spread.
    pub stdev: Vec<f64>,
    pub style: SeriesStyle,
    pub edge_color: String,
    pub fill_color: String,
    pub error_mode: ErrorMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePlot {
    pub series: Vec<Series>,
    pub x_label: String,
    pub y_label: String,
    pub title: String,
    pub output: PathBuf,
}

/// Box-and-whisker plot, one box per week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxPlot {
    pub groups: Vec<(i64, Vec<f64>)>,
    pub x_label: String,
    pub y_label: String,
    pub title: String,
    pub output: PathBuf,
}

/// Grid of histograms, one panel per sampling week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramGrid {
    pub panels: Vec<(String, Vec<f64>)>,
    pub bins: usize,
    pub x_label: String,
    pub y_label: String,
    pub title: String,
    pub output: PathBuf,
}

/// A figure the renderer knows how to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Figure {
    Line(LinePlot),
    Box(BoxPlot),
    Histograms(HistogramGrid),
}

impl Figure {
    pub fn output(&self) -> &PathBuf {
        match self {
            Figure::Line(plot) => &plot.output,
            Figure::Box(plot) => &plot.output,
            Figure::Histograms(grid) => &grid.output,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Figure::Line(plot) => &plot.title,
            Figure::Box(plot) => &plot.title,
            Figure::Histograms(grid) => &grid.title,
        }
    }
}
