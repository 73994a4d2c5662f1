//! Turns accumulated week statistics into plot descriptors.

use crate::aggregate::{CloneSizes, CloneSurvival, DensitySeries, Fragmentation, MutantShare, PopulationSeries, RhoSeries};
use crate::pipeline::WeekStatistics;
use clonal_common::{
    summarize, BoxPlot, ErrorMode, Figure, HistogramGrid, LineKind, LinePlot, Marker, Series, SeriesStyle, WeekSeries,
};
use log::debug;
use std::path::{Path, PathBuf};

/// Bins per local-statistics histogram panel.
pub const HISTOGRAM_BINS: usize = 10;

const WEEKS: &str = "Weeks";
const MODEL_LABEL: &str = "CA model";

/// How the spread around a series is drawn.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Band<'c> {
    pub edge: &'c str,
    pub fill: &'c str,
    pub mode: ErrorMode,
}

impl<'c> Band<'c> {
    pub const fn shaded(edge: &'c str, fill: &'c str) -> Self {
        Band { edge, fill, mode: ErrorMode::Shaded }
    }
}

const BLUE_BAND: Band<'static> = Band::shaded("#1B2ACC", "#089FFF");

/// Mean and stdev per week of `data` as a plottable series. `None` when no week has observations.
pub fn week_series(label: &str, data: &WeekSeries, style: SeriesStyle, band: Band<'_>) -> Option<Series> {
    let summary = summarize(data);
    if summary.is_empty() {
        return None;
    }
    Some(Series {
        label: label.to_string(),
        x: summary.iter().map(|(week, _)| *week as f64).collect(),
        y: summary.iter().map(|(_, s)| s.mean).collect(),
        stdev: summary.iter().map(|(_, s)| s.std).collect(),
        style,
        edge_color: band.edge.to_string(),
        fill_color: band.fill.to_string(),
        error_mode: band.mode,
    })
}

/// Builds the figures for a set of week statistics.
pub struct Report<'a> {
    output_dir: &'a Path,
    local_weeks: &'a [i64],
    figures: Vec<Figure>,
}

impl<'a> Report<'a> {
    pub fn new(output_dir: &'a Path, local_weeks: &'a [i64]) -> Self {
        Report { output_dir, local_weeks, figures: Vec::new() }
    }

    /// Every figure the selected accumulators can produce.
    pub fn build(mut self, stats: &WeekStatistics) -> Vec<Figure> {
        if let Some(sizes) = &stats.clone_sizes {
            self.average_clone_size(sizes);
        }
        if let Some(survival) = &stats.clone_survival {
            self.clone_survival(survival);
        }
        if let Some(populations) = &stats.populations {
            self.populations(populations);
        }
        if let Some(share) = &stats.mutant_share {
            self.mutant_share(share);
        }
        if let Some(density) = &stats.density {
            self.density(density);
        }
        if let Some(rho) = &stats.rho {
            self.rho(rho);
        }
        if let Some(fragmentation) = &stats.fragmentation {
            self.fragmentation(fragmentation);
        }
        self.figures
    }

    fn path(&self, file_name: String) -> PathBuf {
        self.output_dir.join(file_name)
    }

    fn line(&mut self, series: Vec<Series>, y_label: &str, title: String, file_name: String) {
        if series.is_empty() {
            debug!("No data for '{}', skipping figure", title);
            return;
        }
        let output = self.path(file_name);
        self.figures.push(Figure::Line(LinePlot {
            series,
            x_label: WEEKS.to_string(),
            y_label: y_label.to_string(),
            title,
            output,
        }));
    }

    fn histograms(&mut self, local: &WeekSeries, x_label: &str, title: &str, file_name: &str) {
        let panels: Vec<(String, Vec<f64>)> = self
            .local_weeks
            .iter()
            .filter_map(|week| local.get(week).filter(|v| !v.is_empty()).map(|v| (format!("week {}", week), v.clone())))
            .collect();
        if panels.is_empty() {
            debug!("No local samples for '{}', skipping histograms", title);
            return;
        }
        let output = self.path(file_name.to_string());
        self.figures.push(Figure::Histograms(HistogramGrid {
            panels,
            bins: HISTOGRAM_BINS,
            x_label: x_label.to_string(),
            y_label: "frequency".to_string(),
            title: title.to_string(),
            output,
        }));
    }

    fn average_clone_size(&mut self, sizes: &CloneSizes) {
        for (label, data) in &sizes.by_lineage {
            let style = SeriesStyle::new(LineKind::None, Marker::Circle, "black");
            let series = week_series(MODEL_LABEL, data, style, BLUE_BAND);
            self.line(
                series.into_iter().collect(),
                "Average clone size",
                format!("{} average clone size over time", label),
                format!("{}_average_clone_size_per_week_std.png", label),
            );
        }
    }

    fn clone_survival(&mut self, survival: &CloneSurvival) {
        for (label, counts) in &survival.clone_counts {
            let style = SeriesStyle::new(LineKind::Solid, Marker::None, "blue");
            let series = week_series(&format!("{} model", label), counts, style, BLUE_BAND);
            self.line(
                series.into_iter().collect(),
                "Number of clones",
                format!("{} surviving clones over time", label),
                format!("{}_average_clone_surv_per_week_std.png", label),
            );

            let groups: Vec<(i64, Vec<f64>)> = survival.sizes_by_week(label).into_iter().collect();
            if groups.is_empty() {
                debug!("No {} clone size samples, skipping box plot", label);
                continue;
            }
            let output = self.path(format!("boxplot_{}_clone_size.png", label));
            self.figures.push(Figure::Box(BoxPlot {
                groups,
                x_label: "Week".to_string(),
                y_label: "Clone size".to_string(),
                title: label.clone(),
                output,
            }));
        }
    }

    fn populations(&mut self, populations: &PopulationSeries) {
        let cells = [
            ("Proliferating Cells", &populations.alpha, "black"),
            ("Differentiating Cells", &populations.beta, "blue"),
        ];
        let series = cells
            .iter()
            .filter_map(|(label, data, color)| {
                week_series(label, data, SeriesStyle::new(LineKind::Solid, Marker::Circle, color), Band::shaded(color, color))
            })
            .collect();
        self.line(
            series,
            "Number of cells",
            "Average population size over time".to_string(),
            "cell_populations_per_week_std.png".to_string(),
        );

        let events = [("Doubles", &populations.doubles, "green"), ("Empties", &populations.empties, "black")];
        let series = events
            .iter()
            .filter_map(|(label, data, color)| {
                week_series(label, data, SeriesStyle::new(LineKind::Solid, Marker::Circle, color), Band::shaded(color, color))
            })
            .collect();
        self.line(
            series,
            "Number of cells",
            "Average crowding / extinction events over time".to_string(),
            "doubles_empties_per_week_std.png".to_string(),
        );
    }

    fn mutant_share(&mut self, share: &MutantShare) {
        for (label, data) in &share.by_label {
            let style = SeriesStyle::new(LineKind::Dashed, Marker::None, "black");
            let series = week_series(MODEL_LABEL, data, style, BLUE_BAND);
            self.line(
                series.into_iter().collect(),
                &format!("% Proportion of {} cells", label),
                "Tissue take over".to_string(),
                format!("{}_percentage_std.png", label),
            );
        }
    }

    fn density(&mut self, density: &DensitySeries) {
        let style = SeriesStyle::new(LineKind::Dashed, Marker::None, "black");
        let series = week_series(MODEL_LABEL, &density.global, style, BLUE_BAND);
        self.line(
            series.into_iter().collect(),
            "Density %",
            "Tissue cell density".to_string(),
            "cell_density_std.png".to_string(),
        );
        self.histograms(&density.local, "% local density", "Local Cell Density", "local_density_hist.png");
    }

    fn rho(&mut self, rho: &RhoSeries) {
        let style = SeriesStyle::new(LineKind::Dashed, Marker::None, "black");
        let series = week_series(MODEL_LABEL, &rho.global, style, BLUE_BAND);
        self.line(
            series.into_iter().collect(),
            "rho",
            "Proportion of proliferating cells".to_string(),
            "rho_std.png".to_string(),
        );
        self.histograms(&rho.local, "local rho", "Local rho", "local_rho_hist.png");
    }

    fn fragmentation(&mut self, fragmentation: &Fragmentation) {
        for (label, data) in &fragmentation.by_lineage {
            let style = SeriesStyle::new(LineKind::Solid, Marker::Circle, "black");
            let series = week_series(MODEL_LABEL, data, style, Band { mode: ErrorMode::Bar, ..BLUE_BAND });
            self.line(
                series.into_iter().collect(),
                "Fraction of fragmented clones",
                format!("{} fragmented clones over time", label),
                format!("{}_fragmented_clones_std.png", label),
            );
        }
    }
}
