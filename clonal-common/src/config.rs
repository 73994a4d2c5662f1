use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use log::warn;
use std::path::Path;

// Model settings read from the NetLogo `config.nls`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Total simulated weeks (`set sims-duration`).
    pub weeks: u32,
    /// Mutation induction level (`set induction`). Positive values switch on mutant/WT tracking.
    pub induction_level: f64,
}

impl ModelConfig {
    /// Reads the model settings from a NetLogo `config.nls` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let source = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read model config '{}'", path_ref.display()))?;
        Self::parse(&source).with_context(|| format!("Invalid model config '{}'", path_ref.display()))
    }

    /// Scans NetLogo source for `set sims-duration N` and `set induction X`. First occurrence wins.
    pub fn parse(source: &str) -> Result<Self> {
        let mut weeks: Option<u32> = None;
        let mut induction_level: Option<f64> = None;

        for (number, line) in source.lines().enumerate() {
            if let Some(value) = set_statement(line, "sims-duration") {
                match weeks {
                    None => {
                        weeks = Some(value.parse().with_context(|| format!("sims-duration '{}' is not a whole number", value))?)
                    }
                    Some(kept) => warn!("Ignoring 'set sims-duration {}' on line {}; keeping {}", value, number + 1, kept),
                }
            }
            if let Some(value) = set_statement(line, "induction") {
                match induction_level {
                    None => {
                        induction_level = Some(value.parse().with_context(|| format!("induction '{}' is not a number", value))?)
                    }
                    Some(kept) => warn!("Ignoring 'set induction {}' on line {}; keeping {}", value, number + 1, kept),
                }
            }
        }

        let weeks = weeks.ok_or_else(|| anyhow::anyhow!("no 'set sims-duration' statement found"))?;
        let induction_level = induction_level.ok_or_else(|| anyhow::anyhow!("no 'set induction' statement found"))?;
        if induction_level < 0.0 {
            anyhow::bail!("induction must not be negative (got {}).", induction_level);
        }

        Ok(ModelConfig { weeks, induction_level })
    }

    /// True when clones have to be split into wild-type and mutant lineages.
    pub fn tracks_mutants(&self) -> bool {
        self.induction_level > 0.0
    }
}

/// Returns the value token of `set <name> <value>` if the line holds that statement.
fn set_statement<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let code = line.split(';').next().unwrap_or("");
    let mut tokens = code.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "set" {
            if tokens.next() == Some(name) {
                return tokens.next();
            }
        }
    }
    None
}

// Weeks sampled for local statistics and clone size distributions
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    #[serde(default = "default_local_weeks")]
    pub local_weeks: Vec<i64>,
    #[serde(default = "default_distribution_interval")]
    pub distribution_interval: i64,
}

// Recognized mutation-status vocabulary
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LineageConfig {
    #[serde(default = "default_wild_type")]
    pub wild_type: String,
    #[serde(default = "default_mutants")]
    pub mutants: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFormat {
    Bincode,
    Json,
    MessagePack,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_format")]
    pub format: CacheFormat,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Skip unreadable snapshots with a warning instead of failing the run.
    #[serde(default = "default_skip_malformed")]
    pub skip_malformed: bool,
}

// Analysis settings, loaded from an optional analysis.toml
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub lineages: LineageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            local_weeks: default_local_weeks(),
            distribution_interval: default_distribution_interval(),
        }
    }
}

impl Default for LineageConfig {
    fn default() -> Self {
        LineageConfig {
            wild_type: default_wild_type(),
            mutants: default_mutants(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { format: default_cache_format() }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig { skip_malformed: default_skip_malformed() }
    }
}

impl AnalysisConfig {
    /// Loads the analysis configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config: AnalysisConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling.distribution_interval <= 0 {
            anyhow::bail!("distribution_interval must be positive.");
        }
        if self.lineages.wild_type.is_empty() {
            anyhow::bail!("wild_type label must not be empty.");
        }
        if self.lineages.mutants.iter().any(|m| m == &self.lineages.wild_type) {
            anyhow::bail!("'{}' cannot be both the wild-type and a mutant label.", self.lineages.wild_type);
        }
        Ok(())
    }

    /// Weeks whose clone sizes feed the distribution box plots.
    pub fn is_distribution_week(&self, week: i64) -> bool {
        week != 0 && week % self.sampling.distribution_interval == 0
    }

    /// Weeks whose grid is partitioned for local statistics.
    pub fn is_local_week(&self, week: i64) -> bool {
        self.sampling.local_weeks.contains(&week)
    }
}

fn default_local_weeks() -> Vec<i64> {
    vec![10, 30, 50, 70]
}

fn default_distribution_interval() -> i64 {
    20
}

fn default_wild_type() -> String {
    "WT".to_string()
}

fn default_mutants() -> Vec<String> {
    vec!["p53".to_string(), "N".to_string()]
}

fn default_cache_format() -> CacheFormat {
    CacheFormat::Bincode
}

fn default_skip_malformed() -> bool {
    true
}
