use crate::aggregate::{
    lineage_clones, CloneSizes, CloneSurvival, DensitySeries, Fragmentation, MutantShare, Observation,
    PopulationSeries, RhoSeries,
};
use crate::cache::DiskCache;
use crate::graph::grid_component_count;
use crate::grid::grid_chunks;
use crate::scan::{list_snapshots, SnapshotFile};
use anyhow::{Context, Result};
use clap::ValueEnum;
use clonal_common::{Agent, AnalysisConfig, ModelConfig, Snapshot};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::Path;

/// Analysis workflows selectable on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Workflow {
    AverageCloneSize,
    CloneSizeDistribution,
    /// Population counts and mutant percentage.
    CellPopulations,
    CellDensity,
    Rho,
    CloneFragmentation,
}

impl Workflow {
    pub fn all() -> Vec<Workflow> {
        Workflow::value_variants().to_vec()
    }

    /// Name as typed on the command line, e.g. `cell-density`.
    pub fn name(self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_else(|| format!("{:?}", self))
    }

    fn needs_clones(self) -> bool {
        matches!(
            self,
            Workflow::AverageCloneSize | Workflow::CloneSizeDistribution | Workflow::CloneFragmentation
        )
    }

    fn needs_chunks(self) -> bool {
        matches!(self, Workflow::CellDensity | Workflow::Rho)
    }
}

/// What to do with the on-disk cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CacheMode {
    /// Scan snapshots and write the aggregates to the cache.
    Save,
    /// Load the aggregates from the cache instead of scanning.
    Use,
}

/// Accumulators for the selected workflows. Unselected ones stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekStatistics {
    pub clone_sizes: Option<CloneSizes>,
    pub clone_survival: Option<CloneSurvival>,
    pub populations: Option<PopulationSeries>,
    pub mutant_share: Option<MutantShare>,
    pub density: Option<DensitySeries>,
    pub rho: Option<RhoSeries>,
    pub fragmentation: Option<Fragmentation>,
}

impl WeekStatistics {
    pub fn new(workflows: &[Workflow]) -> Self {
        let mut stats = WeekStatistics::default();
        for workflow in workflows {
            match workflow {
                Workflow::AverageCloneSize => stats.clone_sizes = Some(CloneSizes::default()),
                Workflow::CloneSizeDistribution => stats.clone_survival = Some(CloneSurvival::default()),
                Workflow::CellPopulations => {
                    stats.populations = Some(PopulationSeries::default());
                    stats.mutant_share = Some(MutantShare::default());
                }
                Workflow::CellDensity => stats.density = Some(DensitySeries::default()),
                Workflow::Rho => stats.rho = Some(RhoSeries::default()),
                Workflow::CloneFragmentation => stats.fragmentation = Some(Fragmentation::default()),
            }
        }
        stats
    }

    /// Folds one snapshot into every selected accumulator.
    pub fn observe(&mut self, observation: &Observation<'_>, config: &AnalysisConfig) {
        let week = observation.week;

        if let Some(lineages) = observation.lineages {
            if let Some(sizes) = self.clone_sizes.as_mut() {
                sizes.observe(week, lineages);
            }
            if let Some(survival) = self.clone_survival.as_mut() {
                survival.observe(week, lineages, config.is_distribution_week(week));
            }
            if let Some(fragmentation) = self.fragmentation.as_mut() {
                fragmentation.observe(week, lineages);
            }
        }
        if let Some(populations) = self.populations.as_mut() {
            populations.observe(week, observation.snapshot);
        }
        if let Some(share) = self.mutant_share.as_mut() {
            share.observe(week, observation.snapshot);
        }
        if let Some(density) = self.density.as_mut() {
            density.observe(week, observation.snapshot, observation.chunks);
        }
        if let Some(rho) = self.rho.as_mut() {
            rho.observe(week, observation.snapshot, observation.chunks);
        }
    }

    /// Writes every selected accumulator under its cache key.
    pub fn save(&self, cache: &DiskCache) -> Result<()> {
        if let Some(v) = &self.clone_sizes {
            cache.write(CloneSizes::CACHE_KEY, v)?;
        }
        if let Some(v) = &self.clone_survival {
            cache.write(CloneSurvival::CACHE_KEY, v)?;
        }
        if let Some(v) = &self.populations {
            cache.write(PopulationSeries::CACHE_KEY, v)?;
        }
        if let Some(v) = &self.mutant_share {
            cache.write(MutantShare::CACHE_KEY, v)?;
        }
        if let Some(v) = &self.density {
            cache.write(DensitySeries::CACHE_KEY, v)?;
        }
        if let Some(v) = &self.rho {
            cache.write(RhoSeries::CACHE_KEY, v)?;
        }
        if let Some(v) = &self.fragmentation {
            cache.write(Fragmentation::CACHE_KEY, v)?;
        }
        Ok(())
    }

    /// Reads every selected accumulator back from the cache. Any missing key fails the load.
    pub fn load(workflows: &[Workflow], cache: &DiskCache) -> Result<Self> {
        let mut stats = WeekStatistics::new(workflows);
        if stats.clone_sizes.is_some() {
            stats.clone_sizes = Some(cache.read(CloneSizes::CACHE_KEY)?);
        }
        if stats.clone_survival.is_some() {
            stats.clone_survival = Some(cache.read(CloneSurvival::CACHE_KEY)?);
        }
        if stats.populations.is_some() {
            stats.populations = Some(cache.read(PopulationSeries::CACHE_KEY)?);
        }
        if stats.mutant_share.is_some() {
            stats.mutant_share = Some(cache.read(MutantShare::CACHE_KEY)?);
        }
        if stats.density.is_some() {
            stats.density = Some(cache.read(DensitySeries::CACHE_KEY)?);
        }
        if stats.rho.is_some() {
            stats.rho = Some(cache.read(RhoSeries::CACHE_KEY)?);
        }
        if stats.fragmentation.is_some() {
            stats.fragmentation = Some(cache.read(Fragmentation::CACHE_KEY)?);
        }
        Ok(stats)
    }
}

/// Summary of one directory scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub folded: usize,
    pub skipped: usize,
}

/// Loads one snapshot file and folds it into `stats`.
pub fn fold_snapshot(
    file: &SnapshotFile,
    workflows: &[Workflow],
    model: &ModelConfig,
    config: &AnalysisConfig,
    stats: &mut WeekStatistics,
) -> Result<()> {
    let snapshot = Snapshot::load(&file.path)?;
    debug!(
        "Week {} seed {}: {} agents from {}",
        file.week,
        file.seed,
        snapshot.len(),
        file.path.display()
    );
    fold(file.week, &snapshot, workflows, model, config, stats);
    Ok(())
}

/// Folds an in-memory snapshot into `stats`.
pub fn fold(
    week: i64,
    snapshot: &Snapshot,
    workflows: &[Workflow],
    model: &ModelConfig,
    config: &AnalysisConfig,
    stats: &mut WeekStatistics,
) {
    let lineages = workflows
        .iter()
        .any(|w| w.needs_clones())
        .then(|| lineage_clones(snapshot, model, config));

    let chunks: Option<Vec<Vec<&Agent>>> =
        if config.is_local_week(week) && workflows.iter().any(|w| w.needs_chunks()) {
            match grid_chunks(snapshot) {
                Ok(chunks) => {
                    debug!(
                        "Week {}: {}x{} grid in chunks of side {}",
                        week,
                        chunks.grid_side(),
                        chunks.grid_side(),
                        chunks.chunk_side()
                    );
                    Some(chunks.collect())
                }
                Err(e) => {
                    warn!("Week {}: no local statistics: {}", week, e);
                    None
                }
            }
        } else {
            None
        };

    if log::log_enabled!(log::Level::Debug) {
        debug!("Week {}: whole grid splits into {} region(s)", week, grid_component_count(snapshot));
    }

    let observation = Observation {
        week,
        snapshot,
        lineages: lineages.as_ref(),
        chunks: chunks.as_deref(),
    };
    stats.observe(&observation, config);
}

/// Scans every snapshot in `worlds_dir` once, feeding all selected workflows.
pub fn scan_directory<P: AsRef<Path>>(
    worlds_dir: P,
    workflows: &[Workflow],
    model: &ModelConfig,
    config: &AnalysisConfig,
) -> Result<(WeekStatistics, ScanReport)> {
    let files = list_snapshots(worlds_dir.as_ref())?;
    info!("Scanning {} snapshot file(s) in {}", files.len(), worlds_dir.as_ref().display());

    let mut stats = WeekStatistics::new(workflows);
    let mut report = ScanReport::default();

    let progress_bar = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} snapshots ({percent}%) [{eta}]")
    {
        progress_bar.set_style(style.progress_chars("#>-"));
    }

    for file in &files {
        if file.week < 0 || file.week > i64::from(model.weeks) {
            warn!(
                "'{}' is for week {}, outside the simulated 0..={} weeks",
                file.path.display(),
                file.week,
                model.weeks
            );
        }

        match fold_snapshot(file, workflows, model, config, &mut stats) {
            Ok(()) => report.folded += 1,
            Err(e) if config.scan.skip_malformed => {
                warn!("Skipping snapshot: {:#}", e);
                report.skipped += 1;
            }
            Err(e) => {
                progress_bar.abandon();
                return Err(e).context("Snapshot scan aborted");
            }
        }
        progress_bar.inc(1);
    }
    progress_bar.finish_with_message(format!("Folded {} snapshots", report.folded));

    info!("Scan complete: {} folded, {} skipped.", report.folded, report.skipped);
    Ok((stats, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonal_common::CacheFormat;
    use std::fs;

    const HEADER: &str = r#""who","xcor","ycor","six-neighbors","cell-type","state","time","cloneid","creation-time","mutation-status""#;

    /// 10x10 export with one WT clone in column 0 and a p53 pair elsewhere.
    fn world_export() -> String {
        let mut text = String::from("\"GLOBALS\"\n\n\"TURTLES\"\n");
        text.push_str(HEADER);
        text.push('\n');
        for x in 0..10u32 {
            for y in 0..10u32 {
                let who = x * 10 + y;
                let mut neighbors = Vec::new();
                if y > 0 {
                    neighbors.push(who - 1);
                }
                if y < 9 {
                    neighbors.push(who + 1);
                }
                let list: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
                let (state, cell_type, clone, status) = match (x, y) {
                    (0, _) => ("single", "A", 1, "WT"),
                    (5, 0) | (5, 9) => ("double", "AB", 2, "p53"),
                    _ => ("empty", "", 0, "0"),
                };
                text.push_str(&format!(
                    "\"{}\",\"{}\",\"{}\",\"{{turtles {}}}\",\"\"\"{}\"\"\",\"\"\"{}\"\"\",\"1\",\"{}\",\"0\",\"\"\"{}\"\"\"\n",
                    who,
                    x,
                    y,
                    list.join(" "),
                    cell_type,
                    state,
                    clone,
                    status
                ));
            }
        }
        text.push_str("\n\"PATCHES\"\n");
        text
    }

    fn model(induction_level: f64) -> ModelConfig {
        ModelConfig { weeks: 40, induction_level }
    }

    #[test]
    fn parsed_export_feeds_every_workflow() {
        let snapshot = Snapshot::parse(&world_export()).unwrap();
        assert_eq!(snapshot.len(), 100);

        let workflows = Workflow::all();
        let mut config = AnalysisConfig::default();
        config.sampling.local_weeks = vec![20];
        let mut stats = WeekStatistics::new(&workflows);
        fold(20, &snapshot, &workflows, &model(0.5), &config, &mut stats);

        let sizes = stats.clone_sizes.as_ref().unwrap();
        assert_eq!(sizes.by_lineage["WT"][&20], vec![10.0]);
        assert_eq!(sizes.by_lineage["p53"][&20], vec![4.0]);

        let survival = stats.clone_survival.as_ref().unwrap();
        assert_eq!(survival.sizes_by_week("WT")[&20], vec![10.0]);

        let fragmentation = stats.fragmentation.as_ref().unwrap();
        assert_eq!(fragmentation.by_lineage["WT"][&20], vec![0.0]);
        assert_eq!(fragmentation.by_lineage["p53"][&20], vec![1.0]);

        // A 10x10 grid splits into 100 one-site chunks
        let density = stats.density.as_ref().unwrap();
        assert_eq!(density.local[&20].len(), 100);
        assert!((density.global[&20][0] - 14.0).abs() < 1e-9);

        let share = stats.mutant_share.as_ref().unwrap();
        assert_eq!(share.by_label.keys().cloned().collect::<Vec<_>>(), vec!["WT", "p53"]);
    }

    #[test]
    fn local_statistics_only_on_sampling_weeks() {
        let snapshot = Snapshot::parse(&world_export()).unwrap();
        let workflows = [Workflow::Rho];
        let config = AnalysisConfig::default();
        let mut stats = WeekStatistics::new(&workflows);
        fold(20, &snapshot, &workflows, &model(0.0), &config, &mut stats);

        let rho = stats.rho.as_ref().unwrap();
        assert_eq!(rho.global[&20].len(), 1);
        assert!(rho.local.is_empty());
        assert!(stats.clone_sizes.is_none());
    }

    #[test]
    fn scan_skips_malformed_files_and_round_trips_the_cache() {
        let model_dir = tempfile::tempdir().unwrap();
        let worlds = model_dir.path().join("worlds");
        fs::create_dir(&worlds).unwrap();
        fs::write(worlds.join("world_20_1.csv"), world_export()).unwrap();
        fs::write(worlds.join("world_20_2.csv"), world_export()).unwrap();
        fs::write(worlds.join("world_40_1.csv"), "\"TURTLES\"\nno patches here\n").unwrap();

        let workflows = vec![Workflow::AverageCloneSize, Workflow::CellPopulations];
        let config = AnalysisConfig::default();
        let (stats, report) = scan_directory(&worlds, &workflows, &model(0.0), &config).unwrap();
        assert_eq!(report, ScanReport { folded: 2, skipped: 1 });
        // Ten A singles plus one alpha cell in each AB double
        assert_eq!(stats.populations.as_ref().unwrap().alpha[&20], vec![12.0, 12.0]);
        assert_eq!(stats.clone_sizes.as_ref().unwrap().by_lineage["WT"][&20].len(), 4);

        let cache = DiskCache::new(model_dir.path(), CacheFormat::Json);
        stats.save(&cache).unwrap();
        let loaded = WeekStatistics::load(&workflows, &cache).unwrap();
        assert_eq!(loaded, stats);
        assert!(WeekStatistics::load(&[Workflow::Rho], &cache).is_err());
    }

    #[test]
    fn strict_scan_fails_on_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("world_20_1.csv"), "garbage").unwrap();
        let mut config = AnalysisConfig::default();
        config.scan.skip_malformed = false;
        assert!(scan_directory(dir.path(), &[Workflow::Rho], &model(0.0), &config).is_err());
    }
}
