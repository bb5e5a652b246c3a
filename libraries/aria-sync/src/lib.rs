//! Aria Sync - mirror a local music library onto a paired device
//!
//! Reconciles the set of folders on the device against the local library using
//! a persisted per-library ledger. Folders whose recorded song count matches
//! are skipped, changed or new folders are pushed, and remote folders with no
//! local counterpart are deleted. Folders are processed strictly in sequence
//! over a single device connection, and one bad folder never aborts the batch.

mod error;
mod ledger;
mod reconciler;
mod types;

// Public exports
pub use error::{Result, SyncError};
pub use ledger::{FolderRecord, LedgerStore, SyncLedger, LEDGER_FILE};
pub use reconciler::{compute_plan, SyncEngine};
pub use types::{FolderFailure, LibraryFolder, SyncEvent, SyncPlan, SyncSummary};
