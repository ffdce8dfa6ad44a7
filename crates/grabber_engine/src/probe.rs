use std::time::Duration;

use engine_logging::engine_info;

use crate::backend::{BackendError, MediaBackend};
use crate::filename::PLACEHOLDER_TITLE;
use crate::streams::select_audio_streams;
use crate::youtube_url::validate_youtube_url;
use crate::{ErrorKind, JobError, JobId, JobKind, JobOutcome, ProbeRequest, ProbeResult};

/// Synchronous checks done before a probe is handed to a worker.
pub(crate) fn prepare(request: &ProbeRequest, backend: &dyn MediaBackend) -> Result<String, JobError> {
    validate_youtube_url(&request.url)?;
    backend.check_tools(JobKind::Probe)?;
    Ok(request.url.trim().to_string())
}

pub(crate) async fn run(
    job_id: JobId,
    url: &str,
    backend: &dyn MediaBackend,
    timeout: Duration,
) -> Result<JobOutcome, JobError> {
    let info = match tokio::time::timeout(timeout, backend.resolve(url)).await {
        Ok(Ok(info)) => info,
        Ok(Err(err)) => return Err(classify(err)),
        Err(_) => {
            return Err(JobError::new(
                ErrorKind::NetworkError,
                format!("no answer from resolver within {:.1}s", timeout.as_secs_f64()),
            ))
        }
    };

    let total = info.formats.len();
    let streams = select_audio_streams(info.formats);
    if streams.is_empty() {
        return Err(JobError::new(
            ErrorKind::NoAudioStreams,
            format!("none of {total} formats carries audio"),
        ));
    }

    let title = info
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());
    engine_info!(job = job_id; "{} audio streams of {} formats for {:?}", streams.len(), total, title);

    Ok(JobOutcome::Probed(ProbeResult { title, streams }))
}

fn classify(err: BackendError) -> JobError {
    if err.is_missing_tool() {
        JobError::new(ErrorKind::MissingDependency, err.to_string())
    } else {
        JobError::new(ErrorKind::NetworkError, err.to_string())
    }
}
