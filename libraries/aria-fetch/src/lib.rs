//! Aria Fetch - media acquisition from an external resolver tool
//!
//! Drives a two-phase download pipeline against an external resolver such as
//! `yt-dlp`: a metadata-only probe that produces one structured document,
//! then an acquire phase that fetches the audio payload while streaming
//! percentage progress to the caller. Live subprocesses are tracked by an
//! injectable [`ProcessSupervisor`] so that cancellation can cut across an
//! in-flight job at any point; a killed download resolves as
//! [`FetchOutcome::Cancelled`], never as a failure.

mod error;
mod fetcher;
mod normalize;
mod process;
mod progress;
mod sanitize;
mod types;

// Re-export public API
pub use error::{FetchError, Result};
pub use fetcher::MediaFetcher;
pub use normalize::normalize;
pub use process::{KillListener, KillSwitch, ProcessHandle, ProcessSupervisor};
pub use progress::{ProgressParser, YtDlpProgressParser};
pub use sanitize::sanitize_title;
pub use types::{
    DownloadEvent, DownloadJob, DownloadPhase, DownloadRequest, DownloadedTrack, FetchConfig,
    FetchOutcome, LibraryIndexer, MediaMetadata,
};
