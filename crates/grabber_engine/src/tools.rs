use std::path::{Path, PathBuf};

use engine_logging::engine_debug;

use crate::{ErrorKind, JobError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    YtDlp,
    Ffmpeg,
}

impl Tool {
    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
        }
    }
}

/// Explicit tool locations; `None` means look the tool up on PATH.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSettings {
    pub ytdlp_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
}

impl ToolSettings {
    pub fn override_for(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::YtDlp => self.ytdlp_path.as_deref(),
            Tool::Ffmpeg => self.ffmpeg_path.as_deref(),
        }
    }

    pub fn locate(&self, tool: Tool) -> Result<PathBuf, JobError> {
        locate(tool, self.override_for(tool))
    }
}

pub fn locate(tool: Tool, configured: Option<&Path>) -> Result<PathBuf, JobError> {
    if let Some(path) = configured {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(JobError::new(
                ErrorKind::MissingDependency,
                format!(
                    "{} not found at configured path {}",
                    tool.binary_name(),
                    path.display()
                ),
            ))
        };
    }

    match which::which(tool.binary_name()) {
        Ok(path) => {
            engine_debug!("{} found at {}", tool.binary_name(), path.display());
            Ok(path)
        }
        Err(err) => Err(JobError::new(
            ErrorKind::MissingDependency,
            format!("{} is not installed or not on PATH ({err})", tool.binary_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn configured_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("ffmpeg");
        let err = locate(Tool::Ffmpeg, Some(&missing)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingDependency);

        std::fs::write(&missing, "").unwrap();
        assert_eq!(locate(Tool::Ffmpeg, Some(&missing)).unwrap(), missing);
    }

    #[test]
    fn settings_pick_the_matching_override() {
        let settings = ToolSettings {
            ytdlp_path: Some(PathBuf::from("/opt/yt-dlp")),
            ffmpeg_path: None,
        };
        assert_eq!(
            settings.override_for(Tool::YtDlp),
            Some(Path::new("/opt/yt-dlp"))
        );
        assert_eq!(settings.override_for(Tool::Ffmpeg), None);
    }
}
