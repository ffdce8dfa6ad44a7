use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Probe,
    Download,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Probe => write!(f, "probe"),
            JobKind::Download => write!(f, "download"),
        }
    }
}

/// One selectable audio rendition of a video, as resolved by a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub format_id: String,
    /// Advertised audio bitrate in kbps, when the resolver gave a usable one.
    pub bitrate_kbps: Option<f64>,
    /// Container extension reported by the resolver (`webm`, `m4a`, ...).
    pub container: Option<String>,
    /// Audio codec reported by the resolver (`opus`, `mp4a.40.2`, ...).
    pub codec: Option<String>,
}

impl StreamDescriptor {
    /// Human readable label for a quality selector.
    pub fn label(&self) -> String {
        let bitrate = match self.bitrate_kbps {
            Some(kbps) if kbps.fract() == 0.0 => format!("{kbps:.0} kbps"),
            Some(kbps) => format!("{kbps:.1} kbps"),
            None => "unknown bitrate".to_string(),
        };
        let hints: Vec<&str> = [self.codec.as_deref(), self.container.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if hints.is_empty() {
            bitrate
        } else {
            format!("{bitrate} ({})", hints.join(", "))
        }
    }
}

/// Audio format the downloaded stream is transcoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetCodec {
    #[default]
    Mp3,
    Wav,
    Flac,
    M4a,
    Opus,
}

impl TargetCodec {
    pub const ALL: [TargetCodec; 5] = [
        TargetCodec::Mp3,
        TargetCodec::Wav,
        TargetCodec::Flac,
        TargetCodec::M4a,
        TargetCodec::Opus,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            TargetCodec::Mp3 => "mp3",
            TargetCodec::Wav => "wav",
            TargetCodec::Flac => "flac",
            TargetCodec::M4a => "m4a",
            TargetCodec::Opus => "opus",
        }
    }

    /// Value passed to yt-dlp's `--audio-format`.
    pub fn tool_arg(self) -> &'static str {
        self.extension()
    }
}

impl fmt::Display for TargetCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target codec {0:?}")]
pub struct UnknownCodec(pub String);

impl FromStr for TargetCodec {
    type Err = UnknownCodec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TargetCodec::ALL
            .into_iter()
            .find(|codec| codec.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCodec(wanted.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub url: String,
}

/// Everything a download needs. Missing pieces are reported back as
/// `Failed(InvalidInput)` through the event channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    /// Title from the probe; used to name the output file.
    pub title: String,
    pub stream: Option<StreamDescriptor>,
    pub codec: TargetCodec,
    pub destination: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Probe(ProbeRequest),
    Download(DownloadRequest),
}

impl JobRequest {
    pub fn probe(url: impl Into<String>) -> Self {
        JobRequest::Probe(ProbeRequest { url: url.into() })
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Probe(_) => JobKind::Probe,
            JobRequest::Download(_) => JobKind::Download,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            JobRequest::Probe(req) => &req.url,
            JobRequest::Download(req) => &req.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub title: String,
    /// Audio-bearing streams, highest bitrate first, unknown bitrates last.
    pub streams: Vec<StreamDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Probed(ProbeResult),
    Downloaded { output_path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// Cumulative percent, 0..=100, non-decreasing within a job.
    Progress(u8),
    Finished(JobOutcome),
    Failed(JobError),
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }
}

/// A job event as delivered to the consumer thread.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub job_id: JobId,
    pub kind: JobKind,
    pub event: JobEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NoAudioStreams,
    NetworkError,
    AlreadyExists,
    MissingDependency,
    ExternalToolError,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "invalid input"),
            ErrorKind::NoAudioStreams => write!(f, "no audio streams"),
            ErrorKind::NetworkError => write!(f, "network error"),
            ErrorKind::AlreadyExists => write!(f, "already exists"),
            ErrorKind::MissingDependency => write!(f, "missing dependency"),
            ErrorKind::ExternalToolError => write!(f, "external tool error"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "cancelled by request")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Failed | JobState::Cancelled
        )
    }
}
