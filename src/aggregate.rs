//! Week-keyed accumulators. Each one folds a single snapshot into its series
//! and is serialized whole when the run caches its results.

use crate::clones::{classify_clones, group_clones, CloneGroup};
use crate::graph::{clone_graph, is_fragmented};
use crate::metrics::{self, CellPopulations};
use clonal_common::{record, Agent, AnalysisConfig, ModelConfig, Snapshot, WeekSeries};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Clones of one snapshot keyed by lineage label, then clone id.
pub type LineageClones<'a> = BTreeMap<String, BTreeMap<u32, CloneGroup<'a>>>;

/// Groups a snapshot's clones and files them under lineage labels.
///
/// Without mutant tracking every clone is filed under the wild-type label.
/// With it, the wild-type entry is always present (possibly empty) and mutant
/// entries exist only for labels that have clones.
pub fn lineage_clones<'a>(snapshot: &'a Snapshot, model: &ModelConfig, config: &AnalysisConfig) -> LineageClones<'a> {
    let clones = group_clones(snapshot);
    let wild_type = config.lineages.wild_type.clone();
    let mut lineages = LineageClones::new();

    if model.tracks_mutants() {
        let partition = classify_clones(clones, &config.lineages);
        debug!(
            "{} clone(s) classified, {} left out of lineage buckets",
            partition.classified(),
            partition.unrecognized
        );
        lineages.insert(wild_type, partition.wild_type);
        lineages.extend(partition.mutants);
    } else {
        lineages.insert(wild_type, clones);
    }
    lineages
}

/// Everything the accumulators may need from one snapshot.
pub struct Observation<'a> {
    pub week: i64,
    pub snapshot: &'a Snapshot,
    /// Present when a selected workflow looks at clones.
    pub lineages: Option<&'a LineageClones<'a>>,
    /// Present on sampling weeks when a selected workflow needs local statistics.
    pub chunks: Option<&'a [Vec<&'a Agent>]>,
}

/// Clone sizes (in cells) per lineage and week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloneSizes {
    pub by_lineage: BTreeMap<String, WeekSeries>,
}

impl CloneSizes {
    pub const CACHE_KEY: &'static str = "clone_sizes";

    pub fn observe(&mut self, week: i64, lineages: &LineageClones<'_>) {
        for (label, clones) in lineages {
            let series = self.by_lineage.entry(label.clone()).or_default();
            series.entry(week).or_default();
            for clone in clones.values() {
                record(series, week, clone.cell_count() as f64);
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneSizeSample {
    pub week: i64,
    pub size: u32,
}

/// Surviving clone counts per replicate, plus clone size samples on distribution weeks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloneSurvival {
    pub clone_counts: BTreeMap<String, WeekSeries>,
    pub size_samples: BTreeMap<String, Vec<CloneSizeSample>>,
}

impl CloneSurvival {
    pub const CACHE_KEY: &'static str = "clone_survival";

    pub fn observe(&mut self, week: i64, lineages: &LineageClones<'_>, sample_sizes: bool) {
        for (label, clones) in lineages {
            record(self.clone_counts.entry(label.clone()).or_default(), week, clones.len() as f64);
            if sample_sizes {
                let samples = self.size_samples.entry(label.clone()).or_default();
                samples.extend(clones.values().map(|c| CloneSizeSample { week, size: c.cell_count() }));
            }
        }
    }

    /// Size samples of one lineage grouped by week.
    pub fn sizes_by_week(&self, label: &str) -> BTreeMap<i64, Vec<f64>> {
        let mut by_week: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for sample in self.size_samples.get(label).into_iter().flatten() {
            by_week.entry(sample.week).or_default().push(sample.size as f64);
        }
        by_week
    }
}

/// Population counts of the whole tissue per replicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationSeries {
    pub alpha: WeekSeries,
    pub beta: WeekSeries,
    pub doubles: WeekSeries,
    pub empties: WeekSeries,
}

impl PopulationSeries {
    pub const CACHE_KEY: &'static str = "cell_populations";

    pub fn observe(&mut self, week: i64, snapshot: &Snapshot) {
        let populations = CellPopulations::of(snapshot.agents());
        record(&mut self.alpha, week, populations.alpha as f64);
        record(&mut self.beta, week, populations.beta as f64);
        record(&mut self.doubles, week, populations.doubles as f64);
        record(&mut self.empties, week, populations.empties as f64);
    }
}

/// Percentage of cells carrying each mutation label present in the tissue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutantShare {
    pub by_label: BTreeMap<String, WeekSeries>,
}

impl MutantShare {
    pub const CACHE_KEY: &'static str = "mutant_percentage";

    pub fn observe(&mut self, week: i64, snapshot: &Snapshot) {
        for label in metrics::mutation_labels(snapshot.agents()) {
            match metrics::mutant_percentage(snapshot.agents(), label) {
                Some(share) => record(self.by_label.entry(label.to_string()).or_default(), week, share),
                None => debug!("Week {}: no cells, skipping '{}' percentage", week, label),
            }
        }
    }
}

/// Global density per replicate and local density per chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensitySeries {
    pub global: WeekSeries,
    pub local: WeekSeries,
}

impl DensitySeries {
    pub const CACHE_KEY: &'static str = "cell_density";

    pub fn observe(&mut self, week: i64, snapshot: &Snapshot, chunks: Option<&[Vec<&Agent>]>) {
        let sites: Vec<&Agent> = snapshot.agents().iter().collect();
        match metrics::density(&sites) {
            Some(density) => record(&mut self.global, week, density),
            None => debug!("Week {}: empty snapshot, skipping density", week),
        }

        if let Some(chunks) = chunks {
            let mut skipped = 0;
            for chunk in chunks {
                match metrics::density(chunk) {
                    Some(density) => record(&mut self.local, week, density),
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                debug!("Week {}: skipped {} empty chunk(s) for local density", week, skipped);
            }
        }
    }
}

/// Global rho per replicate and local rho per chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RhoSeries {
    pub global: WeekSeries,
    pub local: WeekSeries,
}

impl RhoSeries {
    pub const CACHE_KEY: &'static str = "rho";

    pub fn observe(&mut self, week: i64, snapshot: &Snapshot, chunks: Option<&[Vec<&Agent>]>) {
        match metrics::rho(snapshot.agents()) {
            Some(rho) => record(&mut self.global, week, rho),
            None => debug!("Week {}: no typed cells, skipping rho", week),
        }

        if let Some(chunks) = chunks {
            let mut skipped = 0;
            for chunk in chunks {
                match metrics::rho(chunk.iter().copied()) {
                    Some(rho) => record(&mut self.local, week, rho),
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                debug!("Week {}: skipped {} chunk(s) without typed cells for local rho", week, skipped);
            }
        }
    }
}

/// Fraction of clones whose lineage-slot graph is disconnected, per lineage and replicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragmentation {
    pub by_lineage: BTreeMap<String, WeekSeries>,
}

impl Fragmentation {
    pub const CACHE_KEY: &'static str = "clone_fragmentation";

    pub fn observe(&mut self, week: i64, lineages: &LineageClones<'_>) {
        for (label, clones) in lineages {
            if clones.is_empty() {
                continue;
            }
            let fragmented = clones
                .values()
                .filter(|clone| {
                    let split = is_fragmented(&clone_graph(clone));
                    if split {
                        trace!("Week {}: {} clone {} is fragmented", week, label, clone.id);
                    }
                    split
                })
                .count();
            record(
                self.by_lineage.entry(label.clone()).or_default(),
                week,
                fragmented as f64 / clones.len() as f64,
            );
        }
    }
}
