use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio::sync::Semaphore;

use crate::backend::{DownloadSpec, MediaBackend};
use crate::job::{Envelope, JobControl, JobEmitter, JobHandle};
use crate::ytdlp::{YtDlpBackend, YtDlpSettings};
use crate::{download, probe, EngineEvent, ErrorKind, JobError, JobOutcome, JobRequest};

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Upper bound for one resolve call.
    pub probe_timeout: Duration,
    /// `None` means unbounded.
    pub max_concurrent_probes: Option<usize>,
    /// `None` means unbounded.
    pub max_concurrent_downloads: Option<usize>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(15),
            max_concurrent_probes: None,
            max_concurrent_downloads: Some(1),
        }
    }
}

enum Work {
    Probe { url: String },
    Download(DownloadSpec),
}

struct PreparedJob {
    control: Arc<JobControl>,
    emitter: Arc<JobEmitter>,
    work: Work,
}

enum EngineCommand {
    Start(PreparedJob),
}

#[derive(Clone)]
struct Limits {
    probes: Option<Arc<Semaphore>>,
    downloads: Option<Arc<Semaphore>>,
}

impl Limits {
    fn new(settings: &RunnerSettings) -> Self {
        // Config files can ask for anything; tokio rejects more than
        // MAX_PERMITS.
        let limit = |max: Option<usize>| {
            max.map(|n| Arc::new(Semaphore::new(n.clamp(1, Semaphore::MAX_PERMITS))))
        };
        Self {
            probes: limit(settings.max_concurrent_probes),
            downloads: limit(settings.max_concurrent_downloads),
        }
    }

    fn for_work(&self, work: &Work) -> Option<Arc<Semaphore>> {
        match work {
            Work::Probe { .. } => self.probes.clone(),
            Work::Download(_) => self.downloads.clone(),
        }
    }
}

/// Runs probe and download jobs off the caller's thread.
///
/// Jobs execute on a tokio runtime owned by a background thread. Their events
/// queue up in a channel that the owning thread drains with [`try_recv`] or
/// [`recv_timeout`], so consumer code only ever sees events on its own thread.
///
/// [`try_recv`]: JobRunner::try_recv
/// [`recv_timeout`]: JobRunner::recv_timeout
pub struct JobRunner {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_tx: mpsc::Sender<Envelope>,
    event_rx: mpsc::Receiver<Envelope>,
    backend: Arc<dyn MediaBackend>,
    next_id: AtomicU64,
}

impl JobRunner {
    /// Runner backed by the yt-dlp executable.
    pub fn with_ytdlp(settings: RunnerSettings, ytdlp: YtDlpSettings) -> Self {
        Self::new(settings, Arc::new(YtDlpBackend::new(ytdlp)))
    }

    pub fn new(settings: RunnerSettings, backend: Arc<dyn MediaBackend>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let limits = Limits::new(&settings);
        let worker_backend = backend.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("grabber-worker")
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("job runtime failed to start: {}", err);
                    while let Ok(EngineCommand::Start(job)) = cmd_rx.recv() {
                        job.emitter.finish(Err(JobError::new(
                            ErrorKind::ExternalToolError,
                            format!("job runtime unavailable: {err}"),
                        )));
                    }
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Start(job) => {
                        let backend = worker_backend.clone();
                        let limits = limits.clone();
                        let settings = settings.clone();
                        runtime.spawn(supervise(job, backend, limits, settings));
                    }
                }
            }
            engine_debug!("job runner stopped");
        });

        Self {
            cmd_tx,
            event_tx,
            event_rx,
            backend,
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts a job and returns at once. Validation failures are not returned
    /// here; they arrive as the job's only event, a `Failed`.
    pub fn submit(&self, request: JobRequest) -> JobHandle {
        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = request.kind();
        let control = Arc::new(JobControl::new());
        let emitter = Arc::new(JobEmitter::new(
            job_id,
            kind,
            control.clone(),
            self.event_tx.clone(),
        ));
        let handle = JobHandle::new(job_id, kind, control.clone());
        engine_info!(job = job_id; "{} submitted for {}", kind, request.url().trim());

        let prepared = match &request {
            JobRequest::Probe(req) => {
                probe::prepare(req, self.backend.as_ref()).map(|url| Work::Probe { url })
            }
            JobRequest::Download(req) => {
                download::prepare(req, self.backend.as_ref()).map(Work::Download)
            }
        };

        let work = match prepared {
            Ok(work) => work,
            Err(err) => {
                engine_warn!(job = job_id; "rejected before start: {}", err);
                emitter.finish(Err(err));
                return handle;
            }
        };

        let job = PreparedJob {
            control,
            emitter,
            work,
        };
        if let Err(mpsc::SendError(EngineCommand::Start(job))) =
            self.cmd_tx.send(EngineCommand::Start(job))
        {
            job.emitter.finish(Err(JobError::new(
                ErrorKind::ExternalToolError,
                "job runner is not running",
            )));
        }
        handle
    }

    /// Next deliverable event, without blocking.
    pub fn try_recv(&self) -> Option<EngineEvent> {
        while let Ok(envelope) = self.event_rx.try_recv() {
            if let Some(event) = self.admit(envelope) {
                return Some(event);
            }
        }
        None
    }

    /// Next deliverable event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let envelope = self.event_rx.recv_timeout(remaining).ok()?;
            if let Some(event) = self.admit(envelope) {
                return Some(event);
            }
        }
    }

    /// Drops events of cancelled jobs and settles the lifecycle state when a
    /// terminal event goes out.
    fn admit(&self, envelope: Envelope) -> Option<EngineEvent> {
        let Envelope { control, event } = envelope;
        if control.is_cancelled() {
            engine_debug!(job = event.job_id; "discarding {:?} after cancel", event.event);
            return None;
        }
        if event.event.is_terminal() && !control.deliver_terminal(&event.event) {
            engine_debug!(job = event.job_id; "terminal event lost the race with cancel");
            return None;
        }
        Some(event)
    }
}

/// Runs one job and guarantees it a terminal event, even if the job panics.
async fn supervise(
    job: PreparedJob,
    backend: Arc<dyn MediaBackend>,
    limits: Limits,
    settings: RunnerSettings,
) {
    let emitter = job.emitter.clone();
    let job_id = emitter.job_id();
    let worker = tokio::spawn(execute(job, backend, limits, settings));
    match worker.await {
        Ok(()) => {}
        Err(err) if err.is_panic() => {
            engine_error!(job = job_id; "worker panicked");
            emitter.finish(Err(JobError::new(
                ErrorKind::ExternalToolError,
                "internal error: job worker panicked",
            )));
        }
        Err(err) => {
            emitter.finish(Err(JobError::new(
                ErrorKind::ExternalToolError,
                format!("job worker aborted: {err}"),
            )));
        }
    }
}

async fn execute(
    job: PreparedJob,
    backend: Arc<dyn MediaBackend>,
    limits: Limits,
    settings: RunnerSettings,
) {
    let PreparedJob {
        control,
        emitter,
        work,
    } = job;
    let job_id = emitter.job_id();
    let limiter = limits.for_work(&work);

    // Dropping the work future on cancel also drops the backend future, which
    // kills a spawned child process.
    let result = tokio::select! {
        biased;
        _ = control.token().cancelled() => Err(JobError::cancelled()),
        result = run_work(&control, &emitter, &work, limiter, backend.as_ref(), &settings) => result,
    };

    match &result {
        Ok(_) => engine_info!(job = job_id; "finished"),
        Err(err) if err.kind == ErrorKind::Cancelled => {
            engine_info!(job = job_id; "stopped after cancel")
        }
        Err(err) => engine_warn!(job = job_id; "failed: {}", err),
    }
    emitter.finish(result);
}

async fn run_work(
    control: &JobControl,
    emitter: &Arc<JobEmitter>,
    work: &Work,
    limiter: Option<Arc<Semaphore>>,
    backend: &dyn MediaBackend,
    settings: &RunnerSettings,
) -> Result<JobOutcome, JobError> {
    let _permit = match limiter {
        Some(semaphore) => Some(
            semaphore
                .acquire_owned()
                .await
                .map_err(|_| JobError::new(ErrorKind::ExternalToolError, "job limiter closed"))?,
        ),
        None => None,
    };
    control.mark_running();
    engine_debug!(job = emitter.job_id(); "running");
    match work {
        Work::Probe { url } => {
            probe::run(emitter.job_id(), url, backend, settings.probe_timeout).await
        }
        Work::Download(spec) => download::run(spec, backend, emitter.clone()).await,
    }
}
