use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// A world export located on disk, with the week and seed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub week: i64,
    pub seed: i64,
}

/// Every signed integer in `text`, in order (a `-` directly before digits is a sign).
pub fn extract_integers(text: &str) -> Vec<i64> {
    let bytes = text.as_bytes();
    let mut numbers = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let negative = bytes[i] == b'-' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit();
        if negative || bytes[i].is_ascii_digit() {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            // Saturate absurdly long digit runs rather than fail the whole scan
            let value = text[start..i].parse::<i64>().unwrap_or(if negative { i64::MIN } else { i64::MAX });
            numbers.push(value);
        } else {
            i += 1;
        }
    }
    numbers
}

/// Week and seed embedded in a snapshot file name.
pub fn week_and_seed(file_name: &str) -> Result<(i64, i64)> {
    match extract_integers(file_name).as_slice() {
        [week, seed] => Ok((*week, *seed)),
        other => anyhow::bail!(
            "file name '{}' holds {} integers, expected week and seed",
            file_name,
            other.len()
        ),
    }
}

/// Lists the snapshot files of a directory, sorted by name.
/// Entries whose names do not carry a week and seed are skipped with a warning.
pub fn list_snapshots<P: AsRef<Path>>(dir: P) -> Result<Vec<SnapshotFile>> {
    let dir_ref = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir_ref)
        .with_context(|| format!("Failed to list snapshot directory '{}'", dir_ref.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match week_and_seed(&name) {
            Ok((week, seed)) => {
                debug!("Found snapshot '{}' (week {}, seed {})", name, week, seed);
                files.push(SnapshotFile { path, week, seed });
            }
            Err(e) => warn!("Skipping '{}': {}", path.display(), e),
        }
    }
    Ok(files)
}
