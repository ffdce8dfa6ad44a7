use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::engine_info;
use grabber_engine::{RunnerSettings, TargetCodec, ToolSettings, YtDlpSettings};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "audiograb.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] ron::Error),
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Everything the app reads from `audiograb.ron`. Missing fields take their
/// defaults, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Last folder a download went to.
    pub destination: Option<PathBuf>,
    pub codec: TargetCodec,
    pub audio_quality: String,
    pub probe_timeout_secs: u64,
    pub socket_timeout_secs: u64,
    pub max_concurrent_probes: Option<usize>,
    pub max_concurrent_downloads: Option<usize>,
    pub ytdlp_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub log_level: String,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        let runner = RunnerSettings::default();
        let ytdlp = YtDlpSettings::default();
        Self {
            destination: None,
            codec: TargetCodec::default(),
            audio_quality: ytdlp.audio_quality,
            probe_timeout_secs: runner.probe_timeout.as_secs(),
            socket_timeout_secs: ytdlp.socket_timeout.as_secs(),
            max_concurrent_probes: runner.max_concurrent_probes,
            max_concurrent_downloads: runner.max_concurrent_downloads,
            ytdlp_path: None,
            ffmpeg_path: None,
            log_level: "info".to_string(),
            log_destination: LogDestination::default(),
        }
    }
}

impl AppConfig {
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs.max(1)),
            max_concurrent_probes: self.max_concurrent_probes,
            max_concurrent_downloads: self.max_concurrent_downloads,
        }
    }

    pub fn ytdlp_settings(&self) -> YtDlpSettings {
        YtDlpSettings {
            tools: ToolSettings {
                ytdlp_path: self.ytdlp_path.clone(),
                ffmpeg_path: self.ffmpeg_path.clone(),
            },
            socket_timeout: Duration::from_secs(self.socket_timeout_secs.max(1)),
            audio_quality: self.audio_quality.clone(),
        }
    }
}

/// Picks the config path from `--config <path>`, falling back to
/// `audiograb.ron` in the working directory.
pub fn config_path_from_args<I>(args: I) -> Result<PathBuf, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut path = PathBuf::from(DEFAULT_CONFIG_FILE);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(value) => path = PathBuf::from(value),
                None => return Err("--config needs a path".to_string()),
            },
            other => {
                if let Some(value) = other.strip_prefix("--config=") {
                    path = PathBuf::from(value);
                } else {
                    return Err(format!("unknown argument {other:?}"));
                }
            }
        }
    }
    Ok(path)
}

/// Reads the config; a missing file is not an error.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the config through a temp file in the same folder, then renames it
/// over the old one.
pub fn save(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let content = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::new())?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|err| write_err(err.error))?;
    engine_info!("saved settings to {:?}", path);
    Ok(())
}
