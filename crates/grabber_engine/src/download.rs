use std::sync::Arc;

use engine_logging::engine_info;

use crate::backend::{DownloadSpec, MediaBackend};
use crate::filename::output_path;
use crate::job::JobEmitter;
use crate::preflight::{check_destination, check_output_free};
use crate::progress::ByteProgress;
use crate::youtube_url::validate_youtube_url;
use crate::{DownloadRequest, ErrorKind, JobError, JobKind, JobOutcome};

/// Synchronous checks done before a download is handed to a worker. Nothing
/// here touches the network; an existing output file stops the job before
/// the external tool is ever started.
pub(crate) fn prepare(
    request: &DownloadRequest,
    backend: &dyn MediaBackend,
) -> Result<DownloadSpec, JobError> {
    validate_youtube_url(&request.url)?;
    let stream = request
        .stream
        .as_ref()
        .ok_or_else(|| JobError::invalid_input("no stream selected"))?;
    let destination = request
        .destination
        .as_ref()
        .ok_or_else(|| JobError::invalid_input("no destination folder chosen"))?;

    check_destination(destination)?;
    let output_path = output_path(destination, &request.title, request.codec);
    check_output_free(&output_path)?;
    backend.check_tools(JobKind::Download)?;

    Ok(DownloadSpec {
        url: request.url.trim().to_string(),
        format_id: stream.format_id.clone(),
        codec: request.codec,
        destination: destination.clone(),
        output_path,
    })
}

pub(crate) async fn run(
    spec: &DownloadSpec,
    backend: &dyn MediaBackend,
    emitter: Arc<JobEmitter>,
) -> Result<JobOutcome, JobError> {
    let job_id = emitter.job_id();
    let sink = ByteProgress::new(emitter);
    match backend.download(spec, &sink).await {
        Ok(output_path) => {
            engine_info!(job = job_id; "wrote {}", output_path.display());
            Ok(JobOutcome::Downloaded { output_path })
        }
        Err(err) if err.is_missing_tool() => {
            Err(JobError::new(ErrorKind::MissingDependency, err.to_string()))
        }
        Err(err) => Err(JobError::new(ErrorKind::ExternalToolError, err.to_string())),
    }
}
