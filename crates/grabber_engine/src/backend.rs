//! Seam between the job runner and whatever resolves and downloads media.

use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{JobError, JobKind, TargetCodec};

/// Metadata returned by a resolve call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// One format entry exactly as the resolver reported it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    #[serde(default)]
    pub acodec: Option<String>,
    /// Kept raw: resolvers report numbers, numeric strings, or nothing.
    #[serde(default)]
    pub abr: Value,
    #[serde(default)]
    pub ext: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSpec {
    pub url: String,
    pub format_id: String,
    pub codec: TargetCodec,
    pub destination: PathBuf,
    /// Path the transcoded file is expected at; the tool is told to write it
    /// there and nowhere else.
    pub output_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{tool} exited with {code:?}: {stderr}")]
    Exited {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unreadable resolver output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Failed(String),
}

impl BackendError {
    pub(crate) fn is_missing_tool(&self) -> bool {
        matches!(self, BackendError::Launch { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Receives cumulative byte counts from a running download.
pub trait ProgressSink: Send + Sync {
    fn bytes(&self, downloaded: Option<u64>, total: Option<u64>);
}

#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    /// Confirms the external tools a job of `kind` relies on are present.
    fn check_tools(&self, kind: JobKind) -> Result<(), JobError>;

    async fn resolve(&self, url: &str) -> Result<MediaInfo, BackendError>;

    /// Downloads and transcodes, returning the path actually written.
    async fn download(
        &self,
        spec: &DownloadSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, BackendError>;
}
