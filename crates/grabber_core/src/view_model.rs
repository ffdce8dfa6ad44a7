use std::path::PathBuf;

use grabber_engine::TargetCodec;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub url: String,
    pub title: Option<String>,
    pub streams: Vec<StreamRowView>,
    pub codec: TargetCodec,
    pub destination: Option<PathBuf>,
    pub probing: bool,
    /// The download action is disabled while a download runs.
    pub download_enabled: bool,
    pub progress: Option<u8>,
    pub last_output: Option<PathBuf>,
    pub status: String,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRowView {
    pub index: usize,
    pub label: String,
    pub selected: bool,
}
