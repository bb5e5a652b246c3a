use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One folder of the local library, as reported by the library indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFolder {
    pub name: String,
    pub path: PathBuf,
    pub song_count: u32,
}

/// Per-session plan computed by diffing local folders, remote folders and the
/// ledger. Ephemeral; recomputed on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Remote folder names with no local counterpart
    pub to_delete: Vec<String>,
    /// Local folders whose fingerprint changed or is unrecorded
    pub to_push: Vec<String>,
    /// Local folders whose recorded song count matches
    pub to_skip: Vec<String>,
}

/// A folder that failed during reconciliation; the batch continues past it
#[derive(Debug, Clone, Serialize)]
pub struct FolderFailure {
    pub folder: String,
    pub message: String,
}

/// Per-folder status events pushed to the caller during reconciliation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Started { to_push: usize, to_delete: usize },
    FolderSyncing { folder: String },
    FolderSkipped { folder: String },
    FolderDeleted { folder: String },
    FolderCompleted { folder: String },
    FolderError { folder: String, message: String },
    Finished { success: bool },
}

/// Summary of a completed sync session
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub pushed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failures: Vec<FolderFailure>,
}

impl SyncSummary {
    /// Overall success: true only when no folder failed
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}
