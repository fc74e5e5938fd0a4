//! Result Set Builder: walks the harness output tree and assembles the
//! mapping from benchmark key to statistical record.
//!
//! Built once per run, read-only afterwards; this is the single source of
//! truth for every downstream step (reporting, fallback estimation, figure
//! composition).

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::estimate::{EstimateRecord, read_estimate};
use crate::key::{BenchmarkKey, DEFAULT_ROOT_COMPONENT, KeyPolicy, resolve_key};

/// Immutable mapping from benchmark key to estimate record.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResultSet {
    entries: BTreeMap<BenchmarkKey, EstimateRecord>,
}

impl ResultSet {
    pub fn get(&self, key: &BenchmarkKey) -> Option<&EstimateRecord> {
        self.entries.get(key)
    }

    /// Lookup by a slash-joined key such as `Insert/DAG-CRR/10000`.
    pub fn get_joined(&self, joined: &str) -> Option<&EstimateRecord> {
        self.entries.get(&BenchmarkKey::from_joined(joined))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BenchmarkKey, &EstimateRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn from_entries<K: AsRef<str>>(
        entries: impl IntoIterator<Item = (K, EstimateRecord)>,
    ) -> Self {
        ResultSet {
            entries: entries
                .into_iter()
                .map(|(k, v)| (BenchmarkKey::from_joined(k.as_ref()), v))
                .collect(),
        }
    }
}

/// Discover every `*/new/estimates.json` under `root`, resolve its key under
/// `policy`, and read its record.
///
/// A missing or empty root directory is a normal "no benchmarks yet" state
/// and yields an empty set. A malformed record aborts the build. Duplicate
/// keys are last-writer-wins (the harness never legitimately produces them
/// for a single run).
pub fn build(root: &Path, policy: KeyPolicy) -> Result<ResultSet> {
    let mut entries = BTreeMap::new();

    if !root.is_dir() {
        info!("{} does not exist; returning empty result set", root.display());
        return Ok(ResultSet { entries });
    }

    let root_component = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_ROOT_COMPONENT)
        .to_string();

    let pattern = root.join("**").join("new").join("estimates.json");
    let pattern = pattern.to_string_lossy().into_owned();
    let paths = glob::glob(&pattern)
        .with_context(|| format!("invalid discovery pattern: {pattern}"))?;

    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };
        let key = resolve_key(&path, &root_component, policy);
        let record = read_estimate(&path)?;
        entries.insert(key, record);
    }

    info!("loaded {} benchmark records from {}", entries.len(), root.display());
    Ok(ResultSet { entries })
}
