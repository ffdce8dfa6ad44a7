use std::path::PathBuf;

use grabber_engine::{JobEvent, JobId, TargetCodec};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the URL input.
    UrlEdited(String),
    /// User asked to look the URL up.
    ProbeClicked,
    /// User picked a stream by its row index.
    StreamSelected(usize),
    CodecSelected(TargetCodec),
    DestinationChosen(PathBuf),
    DownloadClicked,
    CancelClicked,
    /// Event of a probe job; ignored unless `job_id` is the current probe.
    Probe { job_id: JobId, event: JobEvent },
    /// Event of a download job; ignored unless `job_id` is the current
    /// download.
    Download { job_id: JobId, event: JobEvent },
    /// Fallback for placeholder wiring.
    NoOp,
}
