pub mod agent;
pub mod config;
pub mod plot;
pub mod snapshot;
pub mod stats;

// Re-export key types for easier use by dependent crates
pub use agent::{normalize_field, parse_neighbor_list, Agent, CellState, CellType};
pub use config::{AnalysisConfig, CacheConfig, CacheFormat, LineageConfig, ModelConfig, SamplingConfig, ScanConfig};
pub use plot::{BoxPlot, ErrorMode, Figure, HistogramGrid, LineKind, LinePlot, Marker, Series, SeriesStyle};
pub use snapshot::Snapshot;
pub use stats::{record, summarize, Summary, WeekSeries};
