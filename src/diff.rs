//! Field-level differences between two device snapshots.
//!
//! The camera only exposes full-state snapshots, so every semantic event the
//! library emits is derived from comparing the previous snapshot with the
//! current one.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::Snapshot;

/// Before/after values of one changed key. `None` means the key was absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Changed keys between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Differences {
    changes: BTreeMap<String, Change>,
}

impl Differences {
    /// Number of changed keys.
    pub fn count(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Change> {
        self.changes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    /// Changed keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Compute the keys of `baseline` and `candidate` whose values differ.
///
/// Values are compared deeply (`serde_json::Value` equality recurses through
/// objects and arrays). A key missing on one side never equals a present
/// value, even `null` or `false`. Keys in `excluded` are never reported.
pub fn diff(baseline: &Snapshot, candidate: &Snapshot, excluded: &[&str]) -> Differences {
    let mut changes = BTreeMap::new();

    let keys: HashSet<&String> = baseline.keys().chain(candidate.keys()).collect();
    for key in keys {
        if excluded.contains(&key.as_str()) {
            continue;
        }
        let before = baseline.get(key);
        let after = candidate.get(key);
        if before != after {
            changes.insert(
                key.clone(),
                Change {
                    before: before.cloned(),
                    after: after.cloned(),
                },
            );
        }
    }

    Differences { changes }
}

/// Returns true if any of `keys` changed. False when either side is absent.
pub fn any_changed(keys: Option<&[&str]>, differences: Option<&Differences>) -> bool {
    match (keys, differences) {
        (Some(keys), Some(differences)) => keys.iter().any(|k| differences.contains(k)),
        _ => false,
    }
}
