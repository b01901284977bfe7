use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::store::schema::{HistoryData, PlayheadRecord, SCHEMA_VERSION};

/// Episodes with less than this many seconds left count as watched.
pub const COMPLETION_THRESHOLD_SECS: f64 = 180.0;

/// Whether stopping at `playhead` of an episode `total` seconds long finishes it.
pub fn is_completed(playhead: f64, total: Option<f64>) -> bool {
    match total {
        Some(total) if total > 0.0 => total - playhead < COMPLETION_THRESHOLD_SECS,
        _ => false,
    }
}

/// Watch history backed by a single JSON document.
///
/// A store without a path lives only in memory; that is what `open` falls back to when
/// the file cannot be read or created.
#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    data: HistoryData,
}

impl HistoryStore {
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crunsuck")
            .join("history.json")
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: HistoryData::default(),
        }
    }

    /// Load the history at `path`, creating an empty document if it does not exist yet.
    pub fn open(path: &Path) -> Self {
        match Self::load(path) {
            Ok(data) => Self {
                path: Some(path.to_path_buf()),
                data,
            },
            Err(err) => {
                log::error!("History file error ({err:#}), keeping history in memory only");
                Self::in_memory()
            }
        }
    }

    fn load(path: &Path) -> Result<HistoryData> {
        if !path.exists() {
            log::info!("History file ({}) doesn't exist, creating one", path.display());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let data = HistoryData::default();
            write_atomic(path, &data)?;
            return Ok(data);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut data: HistoryData = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        if data.needs_upgrade() {
            log::info!(
                "Upgrading history file from version {} to {SCHEMA_VERSION}",
                data.schema_version
            );
            data.schema_version = SCHEMA_VERSION;
        }
        Ok(data)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => write_atomic(path, &self.data),
            None => Ok(()),
        }
    }

    /// Save, or on failure log the error once and keep the history in memory from then on.
    pub fn persist(&mut self) {
        if let Err(err) = self.save() {
            log::error!("Couldn't save history ({err:#}), keeping history in memory only");
            self.path = None;
        }
    }

    pub fn record_history(&mut self, episode: &str, playhead: f64, total: Option<f64>) {
        self.record_history_at(episode, playhead, total, Utc::now().timestamp());
    }

    pub fn record_history_at(&mut self, episode: &str, playhead: f64, total: Option<f64>, timestamp: i64) {
        self.data.playhead.insert(
            episode.to_string(),
            PlayheadRecord {
                playhead,
                timestamp,
                completed: is_completed(playhead, total),
            },
        );
    }

    pub fn playhead(&self, episode: &str) -> f64 {
        self.data.playhead.get(episode).map_or(0.0, |r| r.playhead)
    }

    pub fn completed(&self, episode: &str) -> bool {
        self.data.playhead.get(episode).is_some_and(|r| r.completed)
    }

    pub fn last_accessed(&self, episode: &str) -> i64 {
        self.data.playhead.get(episode).map_or(0, |r| r.timestamp)
    }

    /// Note that a series was just opened.
    pub fn touch_item(&mut self, item: &str) {
        self.touch_item_at(item, Utc::now().timestamp());
    }

    pub fn touch_item_at(&mut self, item: &str, timestamp: i64) {
        self.data.item_history.insert(item.to_string(), timestamp);
    }

    pub fn item_last_accessed(&self, item: &str) -> i64 {
        self.data.item_history.get(item).copied().unwrap_or(0)
    }
}

fn write_atomic(path: &Path, data: &HistoryData) -> Result<()> {
    let tmp_path = path.with_extension("tmp");

    let json = serde_json::to_string_pretty(data)?;
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;

    fs::rename(&tmp_path, path)?;
    Ok(())
}
