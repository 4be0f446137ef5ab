//! Structured Difference Types

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One value observed on each side of a divergent field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePair {
    /// What the reference decoder produced.
    pub reference: Value,
    /// What the candidate decoder produced.
    pub candidate: Value,
}

/// The value recorded under one difference key.
///
/// Keys carry heterogeneous payloads: `file_info.<field>` holds a value
/// pair, `tracks_only_in_*` holds a name list, and `track.<name>` holds a
/// per-field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Difference {
    /// A single divergent value.
    Pair(ValuePair),
    /// Track names present on one side only.
    Names(Vec<String>),
    /// Divergent fields of one track.
    Fields(BTreeMap<String, ValuePair>),
}

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// True when no differences were recorded.
    pub is_match: bool,
    /// Names of tracks that differ in any way (including set membership).
    pub mismatched_tracks: BTreeSet<String>,
    /// Dotted field path -> recorded difference.
    pub differences: BTreeMap<String, Difference>,
}
