//! Per-job shared state: the consumer's handle and the worker's emitter.

use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU8, Ordering};
use std::sync::{mpsc, Arc};

use engine_logging::{engine_debug, engine_info};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, JobError, JobEvent, JobId, JobKind, JobOutcome, JobState};

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const FAILED: u8 = 3;
const CANCELLED: u8 = 4;

fn decode(raw: u8) -> JobState {
    match raw {
        QUEUED => JobState::Queued,
        RUNNING => JobState::Running,
        FINISHED => JobState::Finished,
        FAILED => JobState::Failed,
        _ => JobState::Cancelled,
    }
}

#[derive(Debug)]
pub(crate) struct JobControl {
    state: AtomicU8,
    cancel: CancellationToken,
}

impl JobControl {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(QUEUED),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn state(&self) -> JobState {
        decode(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    pub(crate) fn mark_running(&self) {
        let _ = self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Moves a live job into `to`. Fails if the job already ended.
    fn settle(&self, to: u8) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current != QUEUED && current != RUNNING {
                return false;
            }
            match self
                .state
                .compare_exchange(current, to, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn cancel(&self) -> bool {
        let cancelled = self.settle(CANCELLED);
        if cancelled {
            self.cancel.cancel();
        }
        cancelled
    }

    /// Records delivery of the terminal event; false if cancel won the race.
    pub(crate) fn deliver_terminal(&self, event: &JobEvent) -> bool {
        let to = match event {
            JobEvent::Finished(_) => FINISHED,
            _ => FAILED,
        };
        self.settle(to)
    }
}

/// Consumer-side view of one submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    kind: JobKind,
    control: Arc<JobControl>,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, kind: JobKind, control: Arc<JobControl>) -> Self {
        Self { id, kind, control }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn state(&self) -> JobState {
        self.control.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Requests cancellation. Once this returns, no further event for the job
    /// is delivered by the runner. The running external call is aborted at
    /// its next await point; a child process is killed, although processes it
    /// spawned itself may run on unobserved.
    ///
    /// Returns false if the job had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        let cancelled = self.control.cancel();
        if cancelled {
            engine_info!(job = self.id; "{} cancelled", self.kind);
        }
        cancelled
    }
}

/// What travels through the runner's event channel.
pub(crate) struct Envelope {
    pub(crate) control: Arc<JobControl>,
    pub(crate) event: EngineEvent,
}

/// Worker-side producer for one job. Enforces the event discipline: progress
/// only rises, and exactly one terminal event is ever sent.
pub(crate) struct JobEmitter {
    job_id: JobId,
    kind: JobKind,
    control: Arc<JobControl>,
    tx: mpsc::Sender<Envelope>,
    last_percent: AtomicI16,
    terminated: AtomicBool,
}

impl JobEmitter {
    pub(crate) fn new(
        job_id: JobId,
        kind: JobKind,
        control: Arc<JobControl>,
        tx: mpsc::Sender<Envelope>,
    ) -> Self {
        Self {
            job_id,
            kind,
            control,
            tx,
            last_percent: AtomicI16::new(-1),
            terminated: AtomicBool::new(false),
        }
    }

    pub(crate) fn job_id(&self) -> JobId {
        self.job_id
    }

    pub(crate) fn progress(&self, percent: u8) {
        if self.terminated.load(Ordering::Acquire) || self.control.is_cancelled() {
            return;
        }
        let percent = i16::from(percent.min(100));
        let previous = self.last_percent.fetch_max(percent, Ordering::AcqRel);
        if previous >= percent {
            return;
        }
        self.send(JobEvent::Progress(percent as u8));
    }

    pub(crate) fn finish(&self, result: Result<JobOutcome, JobError>) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            engine_debug!(job = self.job_id; "extra terminal event suppressed");
            return;
        }
        let event = match result {
            Ok(outcome) => JobEvent::Finished(outcome),
            Err(err) => JobEvent::Failed(err),
        };
        self.send(event);
    }

    fn send(&self, event: JobEvent) {
        let envelope = Envelope {
            control: self.control.clone(),
            event: EngineEvent {
                job_id: self.job_id,
                kind: self.kind,
                event,
            },
        };
        if self.tx.send(envelope).is_err() {
            engine_debug!(job = self.job_id; "runner gone, event dropped");
        }
    }
}
