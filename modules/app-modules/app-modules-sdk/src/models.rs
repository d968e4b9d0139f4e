//! Topology models shared by the client trait and both backends.

use std::collections::{BTreeMap, btree_map};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Module every application starts with; used when no module is known.
pub const DEFAULT_MODULE: &str = "default";

/// Serving status of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    Stopped,
}

impl ServingStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serving => "SERVING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for ServingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SERVING" => Ok(Self::Serving),
            "STOPPED" => Ok(Self::Stopped),
            other => Err(format!("unknown serving status '{other}'")),
        }
    }
}

/// Scaling mode of a version. Only manual scaling has addressable instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    Manual { instances: u32 },
    Automatic,
    Basic,
}

impl Scaling {
    #[must_use]
    pub const fn manual_instances(self) -> Option<u32> {
        match self {
            Self::Manual { instances } => Some(instances),
            Self::Automatic | Self::Basic => None,
        }
    }
}

/// A single version as reported with its full view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDetails {
    pub module: String,
    pub version: String,
    pub scaling: Scaling,
}

/// Traffic split of a module: version name to allocation fraction.
///
/// Entries that are not finite or are negative are dropped on insert, so
/// every stored allocation is comparable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, f64>",
    into = "BTreeMap<String, f64>"
)]
pub struct TrafficSplit {
    allocations: BTreeMap<String, f64>,
}

impl TrafficSplit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an allocation. Returns `false` when the value was rejected.
    pub fn insert(&mut self, version: impl Into<String>, allocation: f64) -> bool {
        if !allocation.is_finite() || allocation < 0.0 {
            return false;
        }
        self.allocations.insert(version.into(), allocation);
        true
    }

    #[must_use]
    pub fn get(&self, version: &str) -> Option<f64> {
        self.allocations.get(version).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// Entries in ascending version-name order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.allocations.iter())
    }
}

/// Iterator over `(version, allocation)` pairs of a [`TrafficSplit`].
pub struct Iter<'a>(btree_map::Iter<'a, String, f64>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(v, a)| (v.as_str(), *a))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a> IntoIterator for &'a TrafficSplit {
    type Item = (&'a str, f64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<BTreeMap<String, f64>> for TrafficSplit {
    fn from(allocations: BTreeMap<String, f64>) -> Self {
        allocations.into_iter().collect()
    }
}

impl From<TrafficSplit> for BTreeMap<String, f64> {
    fn from(split: TrafficSplit) -> Self {
        split.allocations
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for TrafficSplit {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut split = Self::new();
        for (version, allocation) in iter {
            split.insert(version, allocation);
        }
        split
    }
}

/// Arguments of a hostname lookup. Unset fields fall back to the caller's
/// execution identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostnameRequest {
    pub module: Option<String>,
    pub version: Option<String>,
    /// Raw instance index; parsed as a non-negative integer before any
    /// backend is contacted.
    pub instance: Option<String>,
}

impl HostnameRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn instance(mut self, instance: impl ToString) -> Self {
        self.instance = Some(instance.to_string());
        self
    }
}
