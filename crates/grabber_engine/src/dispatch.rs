use std::collections::HashMap;

use engine_logging::engine_trace;

use crate::{JobEvent, JobHandle, JobId, JobRequest, JobRunner};

type Handler = Box<dyn FnMut(&JobEvent)>;

/// Per-job event handlers, owned and pumped by the consumer thread.
///
/// Handlers are plain `FnMut` closures: they never cross threads and run
/// one at a time inside [`JobDispatcher::pump`].
#[derive(Default)]
pub struct JobDispatcher {
    handlers: HashMap<JobId, (JobHandle, Handler)>,
}

impl JobDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit<F>(&mut self, runner: &JobRunner, request: JobRequest, handler: F) -> JobHandle
    where
        F: FnMut(&JobEvent) + 'static,
    {
        let handle = runner.submit(request);
        self.handlers
            .insert(handle.id(), (handle.clone(), Box::new(handler)));
        handle
    }

    /// Delivers every pending event to its handler and returns how many were
    /// delivered. Handlers are dropped after their job's terminal event, or
    /// once the job was cancelled.
    pub fn pump(&mut self, runner: &JobRunner) -> usize {
        let mut delivered = 0;
        while let Some(event) = runner.try_recv() {
            let Some((_, handler)) = self.handlers.get_mut(&event.job_id) else {
                engine_trace!(job = event.job_id; "no handler registered");
                continue;
            };
            handler(&event.event);
            delivered += 1;
            if event.event.is_terminal() {
                self.handlers.remove(&event.job_id);
            }
        }
        self.handlers.retain(|_, (handle, _)| !handle.is_finished());
        delivered
    }

    /// Jobs that still have a handler waiting.
    pub fn pending(&self) -> usize {
        self.handlers.len()
    }
}
