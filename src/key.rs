//! Key Resolver: derives a stable hierarchical benchmark identifier from
//! the path of an estimate file within the harness output tree.
//!
//! The harness wraps each run in a fixed two-level suffix, a current-run
//! marker directory (`new`) plus the estimate file itself, so the key
//! segments are the path components between the harness root component and
//! that suffix, e.g. `.../criterion/Insert/DAG-CRR/10000/new/estimates.json`
//! resolves to `Insert/DAG-CRR/10000`.

use std::fmt;
use std::path::Path;

use log::warn;

/// Name of the harness root directory component.
pub const DEFAULT_ROOT_COMPONENT: &str = "criterion";

/// Current-run marker directory plus the estimate file name.
const RUN_SUFFIX_LEN: usize = 2;

/// Group used when a path cannot be resolved against the harness root.
const UNKNOWN_GROUP: &str = "unknown";

/// How many key segments to keep from a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Exactly group + benchmark; deeper nesting is truncated to the first
    /// two segments. Used for tabular reporting.
    Strict,
    /// Every segment between the root component and the run suffix,
    /// including intermediate sub-parameters such as
    /// `SensitivityColumns/insert/12`. Used for figure composition.
    FullPath,
}

/// A slash-joined, ordered sequence of path segments identifying one
/// benchmark. The first segment is the group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BenchmarkKey {
    segments: Vec<String>,
}

impl BenchmarkKey {
    pub fn new(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty());
        BenchmarkKey { segments }
    }

    /// Parse a slash-joined key such as `Insert/DAG-CRR/10000`.
    pub fn from_joined(joined: &str) -> Self {
        BenchmarkKey::new(joined.split('/').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment, used for reporting and fallback scaling decisions.
    pub fn group(&self) -> &str {
        &self.segments[0]
    }

    /// Everything after the group, slash-joined.
    pub fn benchmark(&self) -> String {
        self.segments[1..].join("/")
    }
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Resolve the key for one estimate file.
///
/// If `root_component` cannot be located in the path, degrades to a key
/// under group `unknown` named after the directory that holds the run
/// marker (logged, not fatal).
pub fn resolve_key(path: &Path, root_component: &str, policy: KeyPolicy) -> BenchmarkKey {
    let parts: Vec<&str> = path
        .iter()
        .filter_map(|c| c.to_str())
        .collect();

    let Some(root_idx) = parts.iter().position(|&c| c == root_component) else {
        warn!(
            "harness root component {root_component:?} not found in {}; using degraded key",
            path.display()
        );
        return degraded_key(&parts);
    };

    let end = parts.len().saturating_sub(RUN_SUFFIX_LEN);
    let window = if root_idx + 1 < end {
        &parts[root_idx + 1..end]
    } else {
        &[][..]
    };

    let mut segments: Vec<String> = window.iter().map(|s| s.to_string()).collect();
    match policy {
        KeyPolicy::Strict => {
            if segments.len() < 2 {
                warn!(
                    "path {} yields fewer than two key segments; using degraded key",
                    path.display()
                );
                return degraded_key(&parts);
            }
            segments.truncate(2);
        }
        KeyPolicy::FullPath => {
            if segments.is_empty() {
                warn!("path {} yields no key segments; using degraded key", path.display());
                return degraded_key(&parts);
            }
        }
    }
    BenchmarkKey::new(segments)
}

/// Single-benchmark key under group `unknown`, named after the directory
/// two levels above the estimate file.
fn degraded_key(parts: &[&str]) -> BenchmarkKey {
    let name = parts
        .len()
        .checked_sub(RUN_SUFFIX_LEN + 1)
        .and_then(|i| parts.get(i).copied())
        .unwrap_or(UNKNOWN_GROUP);
    BenchmarkKey::new(vec![UNKNOWN_GROUP.to_string(), name.to_string()])
}
