use crate::error::Result;
use crate::ledger::{FolderRecord, LedgerStore, SyncLedger};
use crate::types::{FolderFailure, LibraryFolder, SyncEvent, SyncPlan, SyncSummary};
use aria_device::{ConnectionProbe, DeviceCommander};
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Diff the ledger, the local folder list and the remote folder names into a
/// per-session plan.
///
/// A local folder is skipped only when the ledger records the same song count
/// under the same name; anything else is pushed. Remote folders with no local
/// counterpart are deleted unconditionally.
pub fn compute_plan(
    ledger: &SyncLedger,
    local: &[LibraryFolder],
    remote: &[String],
) -> SyncPlan {
    let local_names: HashSet<&str> = local.iter().map(|f| f.name.as_str()).collect();

    let mut plan = SyncPlan::default();

    for name in remote {
        if !local_names.contains(name.as_str()) {
            plan.to_delete.push(name.clone());
        }
    }

    for folder in local {
        let unchanged = ledger
            .folders
            .get(&folder.name)
            .is_some_and(|record| record.song_count == folder.song_count);
        if unchanged {
            plan.to_skip.push(folder.name.clone());
        } else {
            plan.to_push.push(folder.name.clone());
        }
    }

    plan
}

/// Executes a full reconciliation session against one paired device.
///
/// The session is bounded by a single connection probe and processes folders
/// strictly in sequence: all deletions first, then all pushes. Per-folder
/// failures are collected, never propagated, so one bad folder cannot abort
/// the batch. The ledger is rewritten at the end regardless of failures.
pub struct SyncEngine {
    commander: Arc<dyn DeviceCommander>,
    remote_root: String,
}

impl SyncEngine {
    pub fn new(commander: Arc<dyn DeviceCommander>, remote_root: impl Into<String>) -> Self {
        Self {
            commander,
            remote_root: remote_root.into(),
        }
    }

    pub async fn sync(
        &self,
        library_root: &Path,
        folders: &[LibraryFolder],
        events: mpsc::Sender<SyncEvent>,
    ) -> Result<SyncSummary> {
        let probe = ConnectionProbe::new(&*self.commander, &self.remote_root)
            .run()
            .await?;
        info!("Syncing to device {}", probe.serial);

        let mut ledger = LedgerStore::load(library_root);
        let remote = self.list_remote_folders().await;
        let plan = compute_plan(&ledger, folders, &remote);

        info!(
            "Sync plan: {} to push, {} to skip, {} to delete",
            plan.to_push.len(),
            plan.to_skip.len(),
            plan.to_delete.len()
        );
        events
            .send(SyncEvent::Started {
                to_push: plan.to_push.len(),
                to_delete: plan.to_delete.len(),
            })
            .await
            .ok();

        let mut failures = Vec::new();
        let mut deleted = 0usize;
        let mut pushed = 0usize;

        // All deletions first, then all pushes, strictly in sequence.
        for name in &plan.to_delete {
            let remote_path = format!("{}/{}", self.remote_root, name);
            match self.commander.delete_remote(&remote_path).await {
                Ok(()) => {
                    deleted += 1;
                    ledger.folders.remove(name);
                    events
                        .send(SyncEvent::FolderDeleted {
                            folder: name.clone(),
                        })
                        .await
                        .ok();
                }
                Err(e) => {
                    error!("Failed to delete remote folder {}: {}", name, e);
                    failures.push(FolderFailure {
                        folder: name.clone(),
                        message: e.to_string(),
                    });
                    events
                        .send(SyncEvent::FolderError {
                            folder: name.clone(),
                            message: e.to_string(),
                        })
                        .await
                        .ok();
                }
            }
        }

        for name in &plan.to_skip {
            events
                .send(SyncEvent::FolderSkipped {
                    folder: name.clone(),
                })
                .await
                .ok();
        }

        for folder in folders.iter().filter(|f| plan.to_push.contains(&f.name)) {
            events
                .send(SyncEvent::FolderSyncing {
                    folder: folder.name.clone(),
                })
                .await
                .ok();

            let remote_path = format!("{}/{}", self.remote_root, folder.name);
            match self.commander.push(&folder.path, &remote_path).await {
                Ok(()) => {
                    pushed += 1;
                    ledger.folders.insert(
                        folder.name.clone(),
                        FolderRecord {
                            path: folder.path.clone(),
                            song_count: folder.song_count,
                            last_synced: Some(Utc::now()),
                        },
                    );
                    events
                        .send(SyncEvent::FolderCompleted {
                            folder: folder.name.clone(),
                        })
                        .await
                        .ok();
                }
                Err(e) => {
                    error!("Failed to push folder {}: {}", folder.name, e);
                    failures.push(FolderFailure {
                        folder: folder.name.clone(),
                        message: e.to_string(),
                    });
                    events
                        .send(SyncEvent::FolderError {
                            folder: folder.name.clone(),
                            message: e.to_string(),
                        })
                        .await
                        .ok();
                }
            }
        }

        // The ledger is rewritten even after partial failure so the folders
        // that did sync are not pushed again next time.
        ledger.last_sync = Some(Utc::now());
        if let Err(e) = LedgerStore::save(library_root, &ledger) {
            warn!("Could not save sync ledger: {}", e);
        }

        let summary = SyncSummary {
            pushed,
            skipped: plan.to_skip.len(),
            deleted,
            failures,
        };
        events
            .send(SyncEvent::Finished {
                success: summary.success(),
            })
            .await
            .ok();

        info!(
            "Sync finished: {} pushed, {} skipped, {} deleted, {} failed",
            summary.pushed,
            summary.skipped,
            summary.deleted,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// One listing call for the whole session
    async fn list_remote_folders(&self) -> Vec<String> {
        match self
            .commander
            .shell(&format!("ls \"{}\"", self.remote_root))
            .await
        {
            Ok(stdout) => stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!("Could not list remote folders ({}), assuming none", e);
                Vec::new()
            }
        }
    }
}
