#![cfg(unix)]
/// Integration tests for the two-phase download pipeline
///
/// The external resolver is faked with small shell scripts so the tests
/// exercise real process spawning, progress streaming and kill handling.
use aria_artwork::ThumbnailCache;
use aria_fetch::{
    DownloadEvent, DownloadPhase, DownloadRequest, FetchConfig, FetchError, FetchOutcome,
    LibraryIndexer, MediaFetcher, MediaMetadata, ProcessSupervisor,
};
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-tool");
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Script that answers the probe with a fixed document and, in acquire mode,
/// emits two progress lines and writes the output file.
const HAPPY_TOOL: &str = r#"#!/bin/sh
mode=probe
out=""
prev=""
for a in "$@"; do
  [ "$a" = "--extract-audio" ] && mode=acquire
  [ "$prev" = "--output" ] && out="$a"
  prev="$a"
done
if [ "$mode" = "probe" ]; then
  printf '%s\n' '{"title":"Test Song","uploader":"Tester","duration":61,"view_count":5}'
  exit 0
fi
echo "[download]  10.0% of ~3.0MiB"
echo "[download] 100% of ~3.0MiB"
: > "$out"
exit 0
"#;

fn fetcher(tool: PathBuf, work: &Path) -> (MediaFetcher, Arc<ProcessSupervisor>) {
    let supervisor = Arc::new(ProcessSupervisor::new());
    let thumbnails = Arc::new(ThumbnailCache::new(work.join("thumbs")));
    let config = FetchConfig {
        tool_path: tool,
        ..FetchConfig::default()
    };
    (
        MediaFetcher::new(config, supervisor.clone(), thumbnails),
        supervisor,
    )
}

fn request(dest: &Path) -> DownloadRequest {
    DownloadRequest {
        source_id: "abc123".to_string(),
        title: None,
        destination_dir: dest.to_path_buf(),
    }
}

async fn drain(rx: &mut mpsc::Receiver<DownloadEvent>) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

#[tokio::test]
async fn successful_download_runs_both_phases() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let tool = write_script(dir.path(), HAPPY_TOOL);
    let (fetcher, supervisor) = fetcher(tool, dir.path());

    let (tx, mut rx) = mpsc::channel(64);
    let dest = dir.path().join("library");
    let outcome = fetcher.download(request(&dest), tx).await.unwrap();

    let FetchOutcome::Complete(track) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(track.local_path, dest.join("Test Song.mp3"));
    assert!(track.local_path.exists());
    assert_eq!(track.metadata.title, "Test Song");
    assert_eq!(track.metadata.uploader, "Tester");
    assert_eq!(track.metadata.duration_display, "1:01");
    assert_eq!(track.metadata.view_count, 5);

    // Both progress lines came through, in order.
    let events = drain(&mut rx).await;
    let percents: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            DownloadEvent::Progress { percent } => Some(*percent),
            DownloadEvent::PhaseChanged { .. } => None,
        })
        .collect();
    assert_eq!(percents, vec![10.0, 100.0]);
    assert!(events
        .iter()
        .any(|e| matches!(e, DownloadEvent::PhaseChanged { phase: DownloadPhase::Done })));

    // Registry is empty once the job is over.
    assert_eq!(supervisor.cancel_all(), 0);
}

#[tokio::test]
async fn user_title_overrides_probed_title() {
    let dir = tempfile::TempDir::new().unwrap();
    let tool = write_script(dir.path(), HAPPY_TOOL);
    let (fetcher, _supervisor) = fetcher(tool, dir.path());

    let (tx, _rx) = mpsc::channel(64);
    let dest = dir.path().join("library");
    let mut req = request(&dest);
    req.title = Some("My: Custom/Name".to_string());
    let outcome = fetcher.download(req, tx).await.unwrap();

    let FetchOutcome::Complete(track) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(track.local_path, dest.join("My CustomName.mp3"));
    assert_eq!(track.metadata.title, "My: Custom/Name");
}

#[tokio::test]
async fn probe_failure_never_starts_acquisition() {
    let dir = tempfile::TempDir::new().unwrap();
    let marker = dir.path().join("acquire-ran");
    let body = format!(
        r#"#!/bin/sh
for a in "$@"; do
  if [ "$a" = "--extract-audio" ]; then
    : > "{marker}"
    exit 0
  fi
done
echo "ERROR: video unavailable" >&2
exit 3
"#,
        marker = marker.display()
    );
    let tool = write_script(dir.path(), &body);
    let (fetcher, _supervisor) = fetcher(tool, dir.path());

    let (tx, _rx) = mpsc::channel(64);
    let err = fetcher
        .download(request(&dir.path().join("library")), tx)
        .await
        .unwrap_err();

    match err {
        FetchError::Tool { code, stderr } => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("video unavailable"));
        }
        other => panic!("expected tool error, got {other:?}"),
    }
    assert!(!marker.exists(), "acquire phase must not run after probe failure");
}

#[tokio::test]
async fn malformed_probe_document_is_a_parse_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let tool = write_script(
        dir.path(),
        "#!/bin/sh\necho 'this is not json'\nexit 0\n",
    );
    let (fetcher, _supervisor) = fetcher(tool, dir.path());

    let (tx, _rx) = mpsc::channel(64);
    let err = fetcher
        .download(request(&dir.path().join("library")), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn killed_acquisition_resolves_cancelled() {
    let dir = tempfile::TempDir::new().unwrap();
    let body = r#"#!/bin/sh
mode=probe
for a in "$@"; do
  [ "$a" = "--extract-audio" ] && mode=acquire
done
if [ "$mode" = "probe" ]; then
  printf '%s\n' '{"title":"Slow Song"}'
  exit 0
fi
echo "[download]   5.0% of ~9.9MiB"
sleep 30
exit 0
"#;
    let tool = write_script(dir.path(), body);
    let (fetcher, supervisor) = fetcher(tool, dir.path());

    let (tx, mut rx) = mpsc::channel(64);
    let dest = dir.path().join("library");
    let req = request(&dest);
    let task = tokio::spawn(async move { fetcher.download(req, tx).await });

    // Wait until the acquire process has reported progress, then cancel.
    loop {
        match rx.recv().await {
            Some(DownloadEvent::Progress { .. }) => break,
            Some(_) => {}
            None => panic!("pipeline ended before any progress"),
        }
    }
    assert_eq!(supervisor.cancel_all(), 1);

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, FetchOutcome::Cancelled));
    assert_eq!(supervisor.cancel_all(), 0);
}

#[tokio::test]
async fn missing_artifact_despite_success_is_verification_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let body = r#"#!/bin/sh
mode=probe
for a in "$@"; do
  [ "$a" = "--extract-audio" ] && mode=acquire
done
if [ "$mode" = "probe" ]; then
  printf '%s\n' '{"title":"Ghost Song"}'
  exit 0
fi
echo "[download] 100% of ~1.0MiB"
exit 0
"#;
    let tool = write_script(dir.path(), body);
    let (fetcher, _supervisor) = fetcher(tool, dir.path());

    let (tx, _rx) = mpsc::channel(64);
    let err = fetcher
        .download(request(&dir.path().join("library")), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Verification(_)));
}

#[tokio::test]
async fn indexer_is_notified_after_success() {
    struct RecordingIndexer {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl LibraryIndexer for RecordingIndexer {
        async fn track_acquired(&self, path: &Path, _metadata: &MediaMetadata) {
            self.seen.lock().unwrap().push(path.to_path_buf());
        }
    }

    let dir = tempfile::TempDir::new().unwrap();
    let tool = write_script(dir.path(), HAPPY_TOOL);
    let (fetcher, _supervisor) = fetcher(tool, dir.path());
    let indexer = Arc::new(RecordingIndexer {
        seen: Mutex::new(Vec::new()),
    });
    let fetcher = fetcher.with_indexer(indexer.clone());

    let (tx, _rx) = mpsc::channel(64);
    let dest = dir.path().join("library");
    fetcher.download(request(&dest), tx).await.unwrap();

    let seen = indexer.seen.lock().unwrap();
    assert_eq!(*seen, vec![dest.join("Test Song.mp3")]);
}
