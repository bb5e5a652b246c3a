use crate::error::{FetchError, Result};
use crate::normalize::normalize;
use crate::process::{KillSwitch, ProcessSupervisor};
use crate::progress::{ProgressParser, YtDlpProgressParser};
use crate::sanitize::sanitize_title;
use crate::types::{
    DownloadEvent, DownloadJob, DownloadPhase, DownloadRequest, DownloadedTrack, FetchConfig,
    FetchOutcome, LibraryIndexer,
};
use aria_artwork::ThumbnailCache;
use serde_json::Value;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Result of one supervised external invocation
enum RunExit {
    Exited(ExitStatus),
    Killed,
}

/// Orchestrates the two-phase probe/acquire flow against the external
/// resolver tool.
///
/// The probe runs the tool in metadata-only mode and must fully succeed
/// before the acquire phase starts; a job holds at most one live subprocess
/// at a time. Every subprocess is registered with the [`ProcessSupervisor`]
/// for its whole lifetime, so a concurrent `cancel_all` terminates whatever
/// is currently running and the job resolves [`FetchOutcome::Cancelled`].
#[derive(Clone)]
pub struct MediaFetcher {
    config: FetchConfig,
    supervisor: Arc<ProcessSupervisor>,
    parser: Arc<dyn ProgressParser>,
    thumbnails: Arc<ThumbnailCache>,
    indexer: Option<Arc<dyn LibraryIndexer>>,
}

impl MediaFetcher {
    pub fn new(
        config: FetchConfig,
        supervisor: Arc<ProcessSupervisor>,
        thumbnails: Arc<ThumbnailCache>,
    ) -> Self {
        Self {
            config,
            supervisor,
            parser: Arc::new(YtDlpProgressParser::new()),
            thumbnails,
            indexer: None,
        }
    }

    /// Swap the progress-line parser (tool output formats drift)
    pub fn with_parser(mut self, parser: Arc<dyn ProgressParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Attach the library-indexer collaborator, called after each success
    pub fn with_indexer(mut self, indexer: Arc<dyn LibraryIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    /// Run the full two-phase download for one track.
    ///
    /// Progress and phase changes are pushed to `events` without
    /// backpressure. Cancellation via the supervisor resolves as
    /// `Ok(FetchOutcome::Cancelled)`.
    pub async fn download(
        &self,
        request: DownloadRequest,
        events: mpsc::Sender<DownloadEvent>,
    ) -> Result<FetchOutcome> {
        let mut job = DownloadJob::new(&request);
        info!("Probing {}", job.source_id);
        publish(&events, DownloadEvent::PhaseChanged {
            phase: DownloadPhase::Probing,
        });

        let document = match self.probe(&job.source_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                job.phase = DownloadPhase::Cancelled;
                publish(&events, DownloadEvent::PhaseChanged {
                    phase: DownloadPhase::Cancelled,
                });
                return Ok(FetchOutcome::Cancelled);
            }
            Err(e) => {
                // Probe failure short-circuits; the acquire phase never runs.
                job.phase = DownloadPhase::Failed;
                publish(&events, DownloadEvent::PhaseChanged {
                    phase: DownloadPhase::Failed,
                });
                return Err(e);
            }
        };

        let title = job
            .title
            .clone()
            .or_else(|| {
                document
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "untitled".to_string());
        let file_name = format!("{}.{}", sanitize_title(&title), self.config.audio_format);
        let output_path = job.destination_dir.join(file_name);

        tokio::fs::create_dir_all(&job.destination_dir).await?;

        info!("Acquiring {} -> {}", job.source_id, output_path.display());
        job.phase = DownloadPhase::Acquiring;
        publish(&events, DownloadEvent::PhaseChanged {
            phase: DownloadPhase::Acquiring,
        });

        let source_id = job.source_id.clone();
        match self.acquire(&source_id, &output_path, &events, &mut job).await {
            Ok(RunExit::Killed) => {
                job.phase = DownloadPhase::Cancelled;
                publish(&events, DownloadEvent::PhaseChanged {
                    phase: DownloadPhase::Cancelled,
                });
                info!("Download of {} cancelled", job.source_id);
                return Ok(FetchOutcome::Cancelled);
            }
            Ok(RunExit::Exited(_)) => {}
            Err(e) => {
                job.phase = DownloadPhase::Failed;
                publish(&events, DownloadEvent::PhaseChanged {
                    phase: DownloadPhase::Failed,
                });
                return Err(e);
            }
        }

        // Tool-reported success and on-disk existence are independent
        // conditions; both are required. One check, not retried.
        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            job.phase = DownloadPhase::Failed;
            publish(&events, DownloadEvent::PhaseChanged {
                phase: DownloadPhase::Failed,
            });
            return Err(FetchError::Verification(output_path));
        }

        let thumbnail = match self.thumbnails.get_or_extract(&output_path) {
            Ok(t) => t,
            Err(e) => {
                warn!("Thumbnail extraction failed for {}: {}", output_path.display(), e);
                None
            }
        };

        let mut metadata = normalize(&document);
        metadata.title = title;
        metadata.thumbnail = thumbnail;

        if let Some(indexer) = &self.indexer {
            indexer.track_acquired(&output_path, &metadata).await;
        }

        job.phase = DownloadPhase::Done;
        publish(&events, DownloadEvent::PhaseChanged {
            phase: DownloadPhase::Done,
        });
        info!("Downloaded {} to {}", job.source_id, output_path.display());

        Ok(FetchOutcome::Complete(DownloadedTrack {
            local_path: output_path,
            metadata,
        }))
    }

    /// Phase 1: metadata-only probe. `Ok(None)` means the probe was killed.
    async fn probe(&self, source_id: &str) -> Result<Option<Value>> {
        let mut cmd = Command::new(&self.config.tool_path);
        cmd.arg("--dump-single-json")
            .arg("--no-playlist")
            .arg(source_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let (exit, stdout, stderr) = self.run_captured(cmd).await?;
        match exit {
            RunExit::Killed => Ok(None),
            RunExit::Exited(status) if status.success() => {
                let document = serde_json::from_str(&stdout)?;
                Ok(Some(document))
            }
            RunExit::Exited(status) => Err(FetchError::Tool {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            }),
        }
    }

    /// Phase 2: fetch and transcode the payload, streaming progress lines
    async fn acquire(
        &self,
        source_id: &str,
        output_path: &Path,
        events: &mpsc::Sender<DownloadEvent>,
        job: &mut DownloadJob,
    ) -> Result<RunExit> {
        let mut cmd = Command::new(&self.config.tool_path);
        cmd.arg("--extract-audio")
            .arg("--audio-format")
            .arg(&self.config.audio_format)
            .arg("--audio-quality")
            .arg(&self.config.audio_quality)
            .arg("--newline")
            .arg("--no-playlist")
            .arg("--output")
            .arg(output_path)
            .arg(source_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let id = self.supervisor.next_id();
        let (switch, mut listener) = KillSwitch::new(id);
        self.supervisor.register(Arc::new(switch));

        let result = async {
            let stderr_task = tokio::spawn(read_all(child.stderr.take()));

            let mut killed = false;
            if let Some(stdout) = child.stdout.take() {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    tokio::select! {
                        line = lines.next_line() => match line {
                            Ok(Some(line)) => {
                                if let Some(percent) = self.parser.parse_line(&line) {
                                    job.last_progress_percent = percent;
                                    publish(events, DownloadEvent::Progress { percent });
                                }
                            }
                            Ok(None) | Err(_) => break,
                        },
                        () = listener.terminated() => {
                            debug!("Kill requested for process {}", id);
                            let _ = child.start_kill();
                            killed = true;
                            break;
                        }
                    }
                }
            }

            let status = child.wait().await?;

            // Exit by signal (no code) resolves as Cancelled, never Failed.
            // Orphaned grandchildren can keep the pipe open, so do not wait
            // for the reader on this path.
            if status.code().is_none() || (killed && !status.success()) {
                stderr_task.abort();
                return Ok(RunExit::Killed);
            }

            let stderr = stderr_task.await.unwrap_or_default();
            if !status.success() {
                return Err(FetchError::Tool {
                    code: status.code(),
                    stderr: stderr.trim().to_string(),
                });
            }
            Ok(RunExit::Exited(status))
        }
        .await;

        self.supervisor.unregister(id);
        result
    }

    /// Run a supervised command to completion, capturing both streams
    async fn run_captured(&self, mut cmd: Command) -> Result<(RunExit, String, String)> {
        let mut child = cmd.spawn()?;
        let id = self.supervisor.next_id();
        let (switch, mut listener) = KillSwitch::new(id);
        self.supervisor.register(Arc::new(switch));

        let result = async {
            let stdout_task = tokio::spawn(read_all(child.stdout.take()));
            let stderr_task = tokio::spawn(read_all(child.stderr.take()));

            let (status, killed) = wait_or_kill(&mut child, &mut listener).await?;

            if status.code().is_none() || (killed && !status.success()) {
                stdout_task.abort();
                stderr_task.abort();
                return Ok((RunExit::Killed, String::new(), String::new()));
            }

            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok((RunExit::Exited(status), stdout, stderr))
        }
        .await;

        self.supervisor.unregister(id);
        result
    }
}

/// Wait for exit, terminating the child if the kill switch fires first
async fn wait_or_kill(
    child: &mut Child,
    listener: &mut crate::process::KillListener,
) -> std::io::Result<(ExitStatus, bool)> {
    tokio::select! {
        status = child.wait() => Ok((status?, false)),
        () = listener.terminated() => {
            let _ = child.start_kill();
            Ok((child.wait().await?, true))
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Push-based delivery with no backpressure; full or closed channels drop
/// the event rather than stall the pipeline.
fn publish(events: &mpsc::Sender<DownloadEvent>, event: DownloadEvent) {
    let _ = events.try_send(event);
}
