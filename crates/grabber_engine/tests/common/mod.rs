#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use grabber_engine::{
    BackendError, DownloadRequest, DownloadSpec, ErrorKind, JobError, JobEvent, JobId, JobKind,
    JobRunner, MediaBackend, MediaInfo, ProgressSink, RawFormat, RunnerSettings,
    StreamDescriptor, TargetCodec,
};
use serde_json::Value;

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub enum Resolve {
    Info(MediaInfo),
    Fail(&'static str),
    Hang,
}

pub enum DownloadEnd {
    Written,
    Fail(&'static str),
    Hang,
    Panic,
}

/// Scripted stand-in for yt-dlp that counts how often it is called.
pub struct FakeBackend {
    pub resolve_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    /// Set once a hanging download future has been dropped.
    pub download_dropped: Arc<AtomicBool>,
    resolve: Resolve,
    progress: Vec<(Option<u64>, Option<u64>)>,
    end: DownloadEnd,
    missing_tool: Option<&'static str>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            resolve_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            download_dropped: Arc::new(AtomicBool::new(false)),
            resolve: Resolve::Info(MediaInfo::default()),
            progress: Vec::new(),
            end: DownloadEnd::Written,
            missing_tool: None,
        }
    }

    pub fn resolving(mut self, resolve: Resolve) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn with_progress(mut self, ticks: &[(Option<u64>, Option<u64>)]) -> Self {
        self.progress = ticks.to_vec();
        self
    }

    pub fn ending(mut self, end: DownloadEnd) -> Self {
        self.end = end;
        self
    }

    pub fn without_tool(mut self, tool: &'static str) -> Self {
        self.missing_tool = Some(tool);
        self
    }

    pub fn resolves(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MediaBackend for FakeBackend {
    fn check_tools(&self, kind: JobKind) -> Result<(), JobError> {
        match self.missing_tool {
            Some("ffmpeg") if kind == JobKind::Probe => Ok(()),
            Some(tool) => Err(JobError::new(
                ErrorKind::MissingDependency,
                format!("{tool} is not installed"),
            )),
            None => Ok(()),
        }
    }

    async fn resolve(&self, _url: &str) -> Result<MediaInfo, BackendError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        match &self.resolve {
            Resolve::Info(info) => Ok(info.clone()),
            Resolve::Fail(message) => Err(BackendError::Failed(message.to_string())),
            Resolve::Hang => std::future::pending().await,
        }
    }

    async fn download(
        &self,
        spec: &DownloadSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, BackendError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = DropFlag(self.download_dropped.clone());
        for (downloaded, total) in &self.progress {
            progress.bytes(*downloaded, *total);
        }
        match &self.end {
            DownloadEnd::Written => Ok(spec.output_path.clone()),
            DownloadEnd::Fail(message) => Err(BackendError::Failed(message.to_string())),
            DownloadEnd::Hang => std::future::pending().await,
            DownloadEnd::Panic => panic!("fake backend exploded"),
        }
    }
}

pub fn format(id: &str, acodec: &str, abr: Value) -> RawFormat {
    RawFormat {
        format_id: id.to_string(),
        acodec: Some(acodec.to_string()),
        abr,
        ext: Some("webm".to_string()),
    }
}

pub fn stream(id: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: id.to_string(),
        bitrate_kbps: Some(128.0),
        container: Some("webm".to_string()),
        codec: Some("opus".to_string()),
    }
}

pub fn download_request(dir: &Path, title: &str) -> DownloadRequest {
    DownloadRequest {
        url: VIDEO_URL.to_string(),
        title: title.to_string(),
        stream: Some(stream("251")),
        codec: TargetCodec::Mp3,
        destination: Some(dir.to_path_buf()),
    }
}

pub fn runner_with(backend: Arc<FakeBackend>) -> JobRunner {
    init_logging();
    JobRunner::new(RunnerSettings::default(), backend)
}

/// Every event of `job_id` up to and including its terminal one. Also checks
/// nothing follows the terminal event.
pub fn events_of(runner: &JobRunner, job_id: JobId) -> Vec<JobEvent> {
    let mut events = Vec::new();
    loop {
        let event = runner
            .recv_timeout(Duration::from_secs(5))
            .expect("job produced no terminal event");
        assert_eq!(event.job_id, job_id);
        let terminal = event.event.is_terminal();
        events.push(event.event);
        if terminal {
            break;
        }
    }
    assert!(runner.recv_timeout(Duration::from_millis(100)).is_none());
    events
}

pub fn failure_kind(event: &JobEvent) -> ErrorKind {
    match event {
        JobEvent::Failed(err) => err.kind,
        other => panic!("expected Failed, got {other:?}"),
    }
}

pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}
