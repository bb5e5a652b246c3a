use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the external resolver tool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_tool_path")]
    pub tool_path: PathBuf,

    /// Target audio container; also the extension of the final artifact
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Tool-specific quality selector ("0" = best for yt-dlp)
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,
}

fn default_tool_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "0".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            tool_path: default_tool_path(),
            audio_format: default_audio_format(),
            audio_quality: default_audio_quality(),
        }
    }
}

/// A request to acquire one track
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Source identifier understood by the tool (URL or video id)
    pub source_id: String,
    /// User-supplied title override; the probed title is used when absent
    pub title: Option<String>,
    /// Directory the final artifact lands in
    pub destination_dir: PathBuf,
}

/// Lifecycle phase of a download job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPhase {
    Probing,
    Acquiring,
    Done,
    Failed,
    Cancelled,
}

/// Bookkeeping for one in-flight download. Owned by the fetcher for the job's
/// lifetime and discarded on completion.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub source_id: String,
    pub title: Option<String>,
    pub destination_dir: PathBuf,
    pub phase: DownloadPhase,
    pub last_progress_percent: f32,
}

impl DownloadJob {
    pub fn new(request: &DownloadRequest) -> Self {
        Self {
            source_id: request.source_id.clone(),
            title: request.title.clone(),
            destination_dir: request.destination_dir.clone(),
            phase: DownloadPhase::Probing,
            last_progress_percent: 0.0,
        }
    }
}

/// Events pushed to the caller during a download. Delivery is best-effort
/// with no backpressure; a slow observer misses intermediate percentages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    PhaseChanged { phase: DownloadPhase },
    Progress { percent: f32 },
}

/// Canonical metadata record produced from the probe document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub uploader: String,
    pub duration_secs: u64,
    pub duration_display: String,
    /// Raw upload date as reported by the tool (YYYYMMDD)
    pub upload_date: Option<String>,
    pub upload_date_display: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    /// Reference into the thumbnail cache, not ownership
    pub thumbnail: Option<PathBuf>,
}

/// Final artifact of a successful acquisition
#[derive(Debug, Clone)]
pub struct DownloadedTrack {
    pub local_path: PathBuf,
    pub metadata: MediaMetadata,
}

/// Outcome of a download. Cancellation is a first-class outcome, not an
/// error; callers render it as a neutral status.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Complete(DownloadedTrack),
    Cancelled,
}

/// Narrow seam to the library indexer collaborator, invoked after each
/// successful acquisition so the new track lands in the app's own cache.
#[async_trait]
pub trait LibraryIndexer: Send + Sync {
    async fn track_acquired(&self, path: &Path, metadata: &MediaMetadata);
}
