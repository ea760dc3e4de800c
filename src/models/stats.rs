use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of studies referencing a tag. Tags without studies report zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagStudyCount {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub study_count: i64,
}

/// Studies per flag, keyed by the flag's display name.
///
/// Only flags carried by at least one study appear; a missing key reads as zero.
pub type FlagStudyCounts = BTreeMap<String, i64>;
