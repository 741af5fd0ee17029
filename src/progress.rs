use std::path::PathBuf;

use bevy::log::{info, warn};
use serde::{Deserialize, Serialize};

/// Level index stored for a finished story.
pub const COMPLETED_SENTINEL: i64 = -1;

/// Where the player is in the story.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Level(usize),
    Completed,
}

/// On-disk shape: `{"level": <index or -1>, "timestamp": <unix ms>}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub level: i64,
    #[serde(default, alias = "ts")]
    pub timestamp: u64,
}

impl ProgressRecord {
    pub fn new(progress: Progress) -> Self {
        let level = match progress {
            Progress::Level(index) => index as i64,
            Progress::Completed => COMPLETED_SENTINEL,
        };
        Self {
            level,
            timestamp: unix_ms_now(),
        }
    }

    /// `None` for anything that is neither a level index nor the sentinel.
    pub fn progress(&self) -> Option<Progress> {
        match self.level {
            COMPLETED_SENTINEL => Some(Progress::Completed),
            n if n >= 0 => usize::try_from(n).ok().map(Progress::Level),
            _ => None,
        }
    }
}

pub fn unix_ms_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Durable home for the single progress value.
pub trait ProgressStore {
    fn save(&mut self, progress: Progress) -> Result<(), String>;
    /// Missing or unreadable saves both come back as `None`.
    fn load(&self) -> Option<Progress>;
}

/// JSON file store.
pub struct JsonFileProgressStore {
    path: PathBuf,
}

impl JsonFileProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ProgressStore for JsonFileProgressStore {
    fn save(&mut self, progress: Progress) -> Result<(), String> {
        let record = ProgressRecord::new(progress);
        let json = serde_json::to_string(&record)
            .map_err(|e| format!("Failed to encode progress: {e}"))?;
        std::fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write {}: {e}", self.path.display()))?;
        info!("[WayHome save] Saved {:?} to {}", progress, self.path.display());
        Ok(())
    }

    fn load(&self) -> Option<Progress> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<ProgressRecord>(&contents) {
            Ok(record) => record.progress(),
            Err(e) => {
                warn!(
                    "[WayHome save] Ignoring unreadable save {}: {e}",
                    self.path.display()
                );
                None
            }
        }
    }
}

/// Keeps the record in memory; used for tests and targets without a
/// filesystem.
#[derive(Default)]
pub struct MemoryProgressStore {
    record: Option<ProgressRecord>,
}

impl MemoryProgressStore {
    pub fn with_record(record: ProgressRecord) -> Self {
        Self {
            record: Some(record),
        }
    }
}

impl ProgressStore for MemoryProgressStore {
    fn save(&mut self, progress: Progress) -> Result<(), String> {
        self.record = Some(ProgressRecord::new(progress));
        Ok(())
    }

    fn load(&self) -> Option<Progress> {
        self.record.as_ref().and_then(ProgressRecord::progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "wayhome_{name}_{}_{}.json",
            std::process::id(),
            unix_ms_now()
        ))
    }

    #[test]
    fn record_maps_sentinel_and_indices() {
        assert_eq!(
            ProgressRecord::new(Progress::Completed).level,
            COMPLETED_SENTINEL
        );
        assert_eq!(
            ProgressRecord { level: 3, timestamp: 0 }.progress(),
            Some(Progress::Level(3))
        );
        assert_eq!(ProgressRecord { level: -7, timestamp: 0 }.progress(), None);
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let path = temp_path("roundtrip");
        let mut store = JsonFileProgressStore::new(&path);
        assert_eq!(store.load(), None);
        store.save(Progress::Level(2)).expect("save should succeed");
        assert_eq!(store.load(), Some(Progress::Level(2)));

        let raw = std::fs::read_to_string(&path).expect("file written");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(value["level"], 2);
        assert!(value["timestamp"].as_u64().is_some());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_reads_as_no_save() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").expect("write fixture");
        let store = JsonFileProgressStore::new(&path);
        assert_eq!(store.load(), None);
        std::fs::write(&path, r#"{"level":"two"}"#).expect("write fixture");
        assert_eq!(store.load(), None);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn legacy_ts_field_is_accepted() {
        let record: ProgressRecord =
            serde_json::from_str(r#"{"level":-1,"ts":1700000000000}"#).expect("valid record");
        assert_eq!(record.progress(), Some(Progress::Completed));
        assert_eq!(record.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn memory_store_keeps_latest_value() {
        let mut store = MemoryProgressStore::default();
        assert_eq!(store.load(), None);
        store.save(Progress::Level(1)).expect("memory save");
        store.save(Progress::Completed).expect("memory save");
        assert_eq!(store.load(), Some(Progress::Completed));
    }
}
