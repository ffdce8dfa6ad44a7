use std::path::PathBuf;

use grabber_engine::{DownloadRequest, JobId};

/// `job_id` values are assigned by the core; the runner's own ids never reach
/// it. Events for a job come back tagged with the same id.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartProbe { job_id: JobId, url: String },
    StartDownload { job_id: JobId, request: DownloadRequest },
    CancelProbe,
    CancelDownload,
    /// Persist the folder so the next session starts with it.
    RememberDestination(PathBuf),
}
