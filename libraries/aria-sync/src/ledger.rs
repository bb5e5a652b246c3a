use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fixed ledger filename, one per library root
pub const LEDGER_FILE: &str = "sync-ledger.json";

/// Last-known sync fingerprint for one library folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub path: PathBuf,
    pub song_count: u32,
    pub last_synced: Option<DateTime<Utc>>,
}

/// Persisted record of the last sync session for a library root.
///
/// The fingerprint is song-count equality only; a folder that replaces one
/// song with another while keeping the same count is invisible to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLedger {
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub folders: BTreeMap<String, FolderRecord>,
}

/// Loads and persists the per-library sync ledger
pub struct LedgerStore;

impl LedgerStore {
    /// Load the ledger for a library root.
    ///
    /// A missing or corrupt ledger file is never fatal; it degrades to an
    /// empty ledger, which makes every local folder look changed.
    pub fn load(library_root: &Path) -> SyncLedger {
        let path = library_root.join(LEDGER_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No ledger at {} ({}), starting empty", path.display(), e);
                return SyncLedger::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(
                    "Corrupt ledger at {} ({}), starting empty",
                    path.display(),
                    e
                );
                SyncLedger::default()
            }
        }
    }

    /// Rewrite the ledger document for a library root
    pub fn save(library_root: &Path, ledger: &SyncLedger) -> Result<()> {
        let path = library_root.join(LEDGER_FILE);
        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| SyncError::Persistence(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| SyncError::Persistence(e.to_string()))?;
        debug!("Ledger saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_ledger_loads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = LedgerStore::load(dir.path());
        assert!(ledger.last_sync.is_none());
        assert!(ledger.folders.is_empty());
    }

    #[test]
    fn corrupt_ledger_loads_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), "{not json").unwrap();
        let ledger = LedgerStore::load(dir.path());
        assert!(ledger.folders.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();

        let mut ledger = SyncLedger {
            last_sync: Some(Utc::now()),
            ..SyncLedger::default()
        };
        ledger.folders.insert(
            "Favorites".to_string(),
            FolderRecord {
                path: PathBuf::from("/music/Favorites"),
                song_count: 12,
                last_synced: Some(Utc::now()),
            },
        );
        ledger.folders.insert(
            "Workout".to_string(),
            FolderRecord {
                path: PathBuf::from("/music/Workout"),
                song_count: 4,
                last_synced: None,
            },
        );

        LedgerStore::save(dir.path(), &ledger).unwrap();
        let loaded = LedgerStore::load(dir.path());
        assert_eq!(loaded.folders, ledger.folders);
    }

    #[test]
    fn ledger_uses_camel_case_wire_shape() {
        let mut ledger = SyncLedger::default();
        ledger.folders.insert(
            "A".to_string(),
            FolderRecord {
                path: PathBuf::from("/music/A"),
                song_count: 5,
                last_synced: None,
            },
        );
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("\"lastSync\""));
        assert!(json.contains("\"songCount\":5"));
        assert!(json.contains("\"lastSynced\""));
    }
}
