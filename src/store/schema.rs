use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Last known position of one episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayheadRecord {
    /// Seconds into the episode.
    pub playhead: f64,
    /// Unix seconds of the last update.
    pub timestamp: i64,
    #[serde(default)]
    pub completed: bool,
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// On-disk watch history: series access times and per-episode playheads, keyed by
/// history ids (`CR-<id>`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub item_history: BTreeMap<String, i64>,
    #[serde(default)]
    pub playhead: BTreeMap<String, PlayheadRecord>,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            item_history: BTreeMap::new(),
            playhead: BTreeMap::new(),
        }
    }
}

impl HistoryData {
    pub fn needs_upgrade(&self) -> bool {
        self.schema_version < SCHEMA_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_document_loads() {
        let data: HistoryData = serde_json::from_str(r#"{"item_history": {}, "playhead": {}}"#).unwrap();
        assert_eq!(data, HistoryData::default());
        assert!(!data.needs_upgrade());
    }

    #[test]
    fn test_record_without_completed_flag() {
        let data: HistoryData = serde_json::from_str(
            r#"{"playhead": {"CR-1": {"playhead": 12.5, "timestamp": 1600000000}}}"#,
        )
        .unwrap();
        let record = &data.playhead["CR-1"];
        assert_eq!(record.playhead, 12.5);
        assert!(!record.completed);
    }
}
