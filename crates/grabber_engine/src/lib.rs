//! Grabber engine: background probe and download jobs for YouTube audio.
//!
//! A [`JobRunner`] executes jobs on worker tasks and queues their
//! [`JobEvent`]s for the thread that owns it. Each job yields zero or more
//! `Progress` events followed by exactly one `Finished` or `Failed`.
mod backend;
mod dispatch;
mod download;
mod filename;
mod job;
mod preflight;
mod probe;
mod progress;
mod runner;
mod streams;
mod tools;
mod types;
mod youtube_url;
mod ytdlp;

pub use backend::{BackendError, DownloadSpec, MediaBackend, MediaInfo, ProgressSink, RawFormat};
pub use dispatch::JobDispatcher;
pub use filename::{output_path, sanitize_title, PLACEHOLDER_TITLE};
pub use job::JobHandle;
pub use preflight::{check_destination, check_output_free};
pub use progress::percent_of;
pub use runner::{JobRunner, RunnerSettings};
pub use streams::select_audio_streams;
pub use tools::{locate, Tool, ToolSettings};
pub use types::{
    DownloadRequest, EngineEvent, ErrorKind, JobError, JobEvent, JobId, JobKind, JobOutcome,
    JobRequest, JobState, ProbeRequest, ProbeResult, StreamDescriptor, TargetCodec, UnknownCodec,
};
pub use youtube_url::validate_youtube_url;
pub use ytdlp::{YtDlpBackend, YtDlpSettings};
