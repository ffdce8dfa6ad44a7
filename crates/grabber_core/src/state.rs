use std::path::PathBuf;

use grabber_engine::{DownloadRequest, JobId, StreamDescriptor, TargetCodec, PLACEHOLDER_TITLE};

use crate::view_model::{AppViewModel, StreamRowView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePhase {
    #[default]
    Idle,
    Running,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    Idle,
    Running {
        percent: Option<u8>,
    },
    Done {
        output_path: PathBuf,
    },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    url_input: String,
    probed_url: Option<String>,
    probe: ProbePhase,
    title: Option<String>,
    streams: Vec<StreamDescriptor>,
    selected: Option<usize>,
    codec: TargetCodec,
    destination: Option<PathBuf>,
    download: DownloadPhase,
    status: String,
    dirty: bool,
    last_job_id: JobId,
    probe_job: Option<JobId>,
    download_job: Option<JobId>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting point restored from saved settings.
    pub fn with_preferences(destination: Option<PathBuf>, codec: TargetCodec) -> Self {
        Self {
            destination,
            codec,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let downloading = self.is_downloading();
        AppViewModel {
            url: self.url_input.clone(),
            title: self.title.clone(),
            streams: self
                .streams
                .iter()
                .enumerate()
                .map(|(index, stream)| StreamRowView {
                    index,
                    label: stream.label(),
                    selected: self.selected == Some(index),
                })
                .collect(),
            codec: self.codec,
            destination: self.destination.clone(),
            probing: self.probe == ProbePhase::Running,
            download_enabled: !downloading && !self.streams.is_empty(),
            progress: match &self.download {
                DownloadPhase::Running { percent } => *percent,
                DownloadPhase::Done { .. } => Some(100),
                _ => None,
            },
            last_output: match &self.download {
                DownloadPhase::Done { output_path } => Some(output_path.clone()),
                _ => None,
            },
            status: self.status.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn probe_phase(&self) -> ProbePhase {
        self.probe
    }

    pub fn download_phase(&self) -> &DownloadPhase {
        &self.download
    }

    pub(crate) fn is_downloading(&self) -> bool {
        matches!(self.download, DownloadPhase::Running { .. })
    }

    /// True only for events of the probe the state is waiting on.
    pub(crate) fn is_current_probe(&self, job_id: JobId) -> bool {
        self.probe == ProbePhase::Running && self.probe_job == Some(job_id)
    }

    pub(crate) fn is_current_download(&self, job_id: JobId) -> bool {
        self.is_downloading() && self.download_job == Some(job_id)
    }

    fn next_job_id(&mut self) -> JobId {
        self.last_job_id += 1;
        self.last_job_id
    }

    pub(crate) fn url_input(&self) -> &str {
        &self.url_input
    }

    pub(crate) fn set_url_input(&mut self, url: String) {
        if self.url_input != url {
            self.url_input = url;
            self.dirty = true;
        }
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.dirty = true;
    }

    pub(crate) fn begin_probe(&mut self, url: String) -> JobId {
        let job_id = self.next_job_id();
        self.probe_job = Some(job_id);
        self.probed_url = Some(url);
        self.probe = ProbePhase::Running;
        self.title = None;
        self.streams.clear();
        self.selected = None;
        self.dirty = true;
        job_id
    }

    pub(crate) fn probe_succeeded(&mut self, title: String, streams: Vec<StreamDescriptor>) {
        self.probe = ProbePhase::Ready;
        self.probe_job = None;
        self.selected = if streams.is_empty() { None } else { Some(0) };
        self.title = Some(title);
        self.streams = streams;
        self.dirty = true;
    }

    pub(crate) fn probe_failed(&mut self) {
        self.probe = ProbePhase::Failed;
        self.probe_job = None;
        self.dirty = true;
    }

    pub(crate) fn probe_stopped(&mut self) {
        self.probe = ProbePhase::Idle;
        self.probe_job = None;
        self.dirty = true;
    }

    pub(crate) fn select_stream(&mut self, index: usize) -> bool {
        if index >= self.streams.len() || self.selected == Some(index) {
            return false;
        }
        self.selected = Some(index);
        self.dirty = true;
        true
    }

    pub(crate) fn set_codec(&mut self, codec: TargetCodec) {
        if self.codec != codec {
            self.codec = codec;
            self.dirty = true;
        }
    }

    pub(crate) fn set_destination(&mut self, dir: PathBuf) {
        self.destination = Some(dir);
        self.dirty = true;
    }

    /// Download of the current probe with whatever the user picked so far.
    pub(crate) fn download_request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self
                .probed_url
                .clone()
                .unwrap_or_else(|| self.url_input.trim().to_string()),
            title: self
                .title
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
            stream: self.selected.and_then(|i| self.streams.get(i).cloned()),
            codec: self.codec,
            destination: self.destination.clone(),
        }
    }

    pub(crate) fn begin_download(&mut self) -> JobId {
        let job_id = self.next_job_id();
        self.download_job = Some(job_id);
        self.download = DownloadPhase::Running { percent: None };
        self.dirty = true;
        job_id
    }

    pub(crate) fn download_progressed(&mut self, percent: u8) {
        if let DownloadPhase::Running { percent: current } = &mut self.download {
            if *current != Some(percent) {
                *current = Some(percent);
                self.dirty = true;
            }
        }
    }

    pub(crate) fn download_finished(&mut self, output_path: PathBuf) {
        self.download = DownloadPhase::Done { output_path };
        self.download_job = None;
        self.dirty = true;
    }

    pub(crate) fn download_failed(&mut self) {
        self.download = DownloadPhase::Failed;
        self.download_job = None;
        self.dirty = true;
    }

    pub(crate) fn download_stopped(&mut self) {
        self.download = DownloadPhase::Idle;
        self.download_job = None;
        self.dirty = true;
    }
}
