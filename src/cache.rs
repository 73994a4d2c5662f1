use anyhow::{Context, Result};
use clonal_common::CacheFormat;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Directory under the analysis output that holds cached variables.
pub const CACHE_DIR: &str = "dump_vars";

/// Whole-object store of aggregated variables, one file per key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    format: CacheFormat,
}

impl DiskCache {
    pub fn new<P: AsRef<Path>>(analysis_output: P, format: CacheFormat) -> Self {
        DiskCache {
            dir: analysis_output.as_ref().join(CACHE_DIR),
            format,
        }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Serializes `value` under `key`, replacing any previous entry.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory '{}'", self.dir.display()))?;
        let path = self.path(key);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create cache file '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);

        match self.format {
            CacheFormat::Json => serde_json::to_writer(&mut writer, value)
                .with_context(|| format!("Failed to serialize '{}' to JSON", key))?,
            CacheFormat::Bincode => bincode::serialize_into(&mut writer, value)
                .with_context(|| format!("Failed to serialize '{}' to bincode", key))?,
            CacheFormat::MessagePack => rmp_serde::encode::write(&mut writer, value)
                .with_context(|| format!("Failed to serialize '{}' to MessagePack", key))?,
        }
        writer.flush()?;

        info!("Cached '{}' to {} ({:?} format)", key, path.display(), self.format);
        Ok(())
    }

    /// Reads back the value stored under `key`. A missing or undecodable entry is an error.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let path = self.path(key);
        let file = File::open(&path).with_context(|| {
            format!("Cached variable '{}' not found at '{}'; rerun with 'save'", key, path.display())
        })?;
        let reader = BufReader::new(file);

        let value = match self.format {
            CacheFormat::Json => serde_json::from_reader(reader)
                .with_context(|| format!("Corrupt JSON cache entry '{}'", path.display()))?,
            CacheFormat::Bincode => bincode::deserialize_from(reader)
                .with_context(|| format!("Corrupt bincode cache entry '{}'", path.display()))?,
            CacheFormat::MessagePack => rmp_serde::decode::from_read(reader)
                .with_context(|| format!("Corrupt MessagePack cache entry '{}'", path.display()))?,
        };
        info!("Loaded cached '{}' from {}", key, path.display());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonal_common::WeekSeries;
    use std::collections::BTreeMap;

    fn sample() -> BTreeMap<String, WeekSeries> {
        let mut series = WeekSeries::new();
        series.insert(-1, vec![0.5]);
        series.insert(10, vec![1.0, 2.5]);
        let mut by_label = BTreeMap::new();
        by_label.insert("p53".to_string(), series);
        by_label
    }

    #[test]
    fn every_format_reads_back_what_it_wrote() {
        for format in [CacheFormat::Bincode, CacheFormat::Json, CacheFormat::MessagePack] {
            let dir = tempfile::tempdir().unwrap();
            let cache = DiskCache::new(dir.path(), format);
            cache.write("mutant_percentage", &sample()).unwrap();
            assert!(dir.path().join("dump_vars").join("mutant_percentage").is_file());

            let back: BTreeMap<String, WeekSeries> = cache.read("mutant_percentage").unwrap();
            assert_eq!(back, sample(), "{:?}", format);
        }
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), CacheFormat::Bincode);
        assert!(cache.read::<WeekSeries>("rho").is_err());
    }

    #[test]
    fn truncated_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), CacheFormat::Bincode);
        cache.write("rho", &sample()).unwrap();
        let path = cache.path("rho");
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(cache.read::<BTreeMap<String, WeekSeries>>("rho").is_err());
    }
}
