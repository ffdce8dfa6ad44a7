use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::backend::{BackendError, DownloadSpec, MediaBackend, MediaInfo, ProgressSink};
use crate::tools::{Tool, ToolSettings};
use crate::{JobError, JobKind};

const TOOL: &str = "yt-dlp";
const PROGRESS_MARKER: &str = "grab-progress:";
const OUTPUT_MARKER: &str = "grab-output:";
const STDERR_TAIL_LINES: usize = 8;

#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub tools: ToolSettings,
    pub socket_timeout: Duration,
    /// Transcoder quality passed to `--audio-quality` (bitrate like "192",
    /// or a VBR level "0".."10").
    pub audio_quality: String,
}

impl Default for YtDlpSettings {
    fn default() -> Self {
        Self {
            tools: ToolSettings::default(),
            socket_timeout: Duration::from_secs(15),
            audio_quality: "192".to_string(),
        }
    }
}

/// Resolves and downloads through the `yt-dlp` executable, which in turn
/// drives `ffmpeg` for the audio extraction.
#[derive(Debug, Clone, Default)]
pub struct YtDlpBackend {
    settings: YtDlpSettings,
}

impl YtDlpBackend {
    pub fn new(settings: YtDlpSettings) -> Self {
        Self { settings }
    }

    fn command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUTF8", "1");
        cmd
    }

    fn launch_path(&self, tool: Tool) -> Result<PathBuf, BackendError> {
        self.settings
            .tools
            .locate(tool)
            .map_err(|err| BackendError::Launch {
                tool: tool.binary_name(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, err.message),
            })
    }

    fn download_args(&self, spec: &DownloadSpec, ffmpeg: &Path) -> Vec<String> {
        let stem = spec
            .output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        // `%` starts a template field in yt-dlp output templates.
        let template = spec
            .destination
            .join(format!("{}.%(ext)s", stem.replace('%', "%%")));

        vec![
            "--format".to_string(),
            spec.format_id.clone(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            spec.codec.tool_arg().to_string(),
            "--audio-quality".to_string(),
            self.settings.audio_quality.clone(),
            "--ffmpeg-location".to_string(),
            ffmpeg.to_string_lossy().into_owned(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--no-overwrites".to_string(),
            "--no-playlist".to_string(),
            "--no-cache-dir".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.settings.socket_timeout.as_secs().max(1).to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{PROGRESS_MARKER}%(progress.downloaded_bytes)s:%(progress.total_bytes)s"
            ),
            "--no-simulate".to_string(),
            "--print".to_string(),
            format!("after_move:{OUTPUT_MARKER}%(filepath)s"),
            "--".to_string(),
            spec.url.clone(),
        ]
    }
}

#[async_trait::async_trait]
impl MediaBackend for YtDlpBackend {
    fn check_tools(&self, kind: JobKind) -> Result<(), JobError> {
        self.settings.tools.locate(Tool::YtDlp)?;
        if kind == JobKind::Download {
            self.settings.tools.locate(Tool::Ffmpeg)?;
        }
        Ok(())
    }

    async fn resolve(&self, url: &str) -> Result<MediaInfo, BackendError> {
        let program = self.launch_path(Tool::YtDlp)?;
        let output = self
            .command(&program)
            .args([
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--socket-timeout",
            ])
            .arg(self.settings.socket_timeout.as_secs().max(1).to_string())
            .arg("--")
            .arg(url)
            .output()
            .await
            .map_err(|source| BackendError::Launch { tool: TOOL, source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Exited {
                tool: TOOL,
                code: output.status.code(),
                stderr: last_error_line(&stderr),
            });
        }

        let info: MediaInfo = serde_json::from_slice(&output.stdout)?;
        engine_debug!(
            "resolved {} ({} formats)",
            info.title.as_deref().unwrap_or("<untitled>"),
            info.formats.len()
        );
        Ok(info)
    }

    async fn download(
        &self,
        spec: &DownloadSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, BackendError> {
        let program = self.launch_path(Tool::YtDlp)?;
        let ffmpeg = self.launch_path(Tool::Ffmpeg)?;
        let args = self.download_args(spec, &ffmpeg);
        engine_trace!("{} {}", program.display(), args.join(" "));

        let mut child = self
            .command(&program)
            .args(&args)
            .spawn()
            .map_err(|source| BackendError::Launch { tool: TOOL, source })?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Failed("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BackendError::Failed("yt-dlp stderr unavailable".into()))?;
        tokio::spawn(forward_lines(stdout, line_tx.clone()));
        tokio::spawn(forward_lines(stderr, line_tx));

        // Progress can land on either stream depending on quiet mode, so both
        // are parsed in one place. The channel closes once both pipes do.
        let mut written: Option<PathBuf> = None;
        let mut tail: Vec<String> = Vec::new();
        while let Some(line) = line_rx.recv().await {
            match parse_line(&line) {
                ToolLine::Progress { downloaded, total } => progress.bytes(downloaded, total),
                ToolLine::Output(path) => written = Some(path),
                ToolLine::Other(text) => {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(text.to_string());
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(BackendError::Exited {
                tool: TOOL,
                code: status.code(),
                stderr: last_error_line(&tail.join("\n")),
            });
        }

        Ok(written.unwrap_or_else(|| spec.output_path.clone()))
    }
}

/// Forwards lines until the pipe closes. Bytes that are not UTF-8 are
/// replaced rather than ending the read, so the pipe stays drained.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&buf);
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(err) => {
                engine_debug!("stopped reading {} output: {}", TOOL, err);
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[derive(Debug, PartialEq)]
enum ToolLine<'a> {
    Progress {
        downloaded: Option<u64>,
        total: Option<u64>,
    },
    Output(PathBuf),
    Other(&'a str),
}

fn parse_line(line: &str) -> ToolLine<'_> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix(PROGRESS_MARKER) {
        let mut parts = rest.splitn(2, ':');
        let downloaded = parts.next().and_then(parse_byte_count);
        let total = parts.next().and_then(parse_byte_count);
        return ToolLine::Progress { downloaded, total };
    }
    if let Some(path) = trimmed.strip_prefix(OUTPUT_MARKER) {
        if !path.is_empty() {
            return ToolLine::Output(PathBuf::from(path));
        }
    }
    ToolLine::Other(trimmed)
}

/// yt-dlp prints `NA` for missing fields and sometimes floats for counts.
fn parse_byte_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}

/// Prefers the last `ERROR:` line, otherwise the last non-empty line.
fn last_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|line| line.to_string())
        .unwrap_or_else(|| "no diagnostic output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TargetCodec;

    #[test]
    fn parses_progress_lines() {
        assert_eq!(
            parse_line("grab-progress:50:200"),
            ToolLine::Progress {
                downloaded: Some(50),
                total: Some(200)
            }
        );
        assert_eq!(
            parse_line("  grab-progress:1024.0:NA"),
            ToolLine::Progress {
                downloaded: Some(1024),
                total: None
            }
        );
    }

    #[test]
    fn parses_output_marker_and_passes_other_lines_through() {
        assert_eq!(
            parse_line("grab-output:/music/Song.mp3"),
            ToolLine::Output(PathBuf::from("/music/Song.mp3"))
        );
        assert_eq!(
            parse_line("[ExtractAudio] Destination: x.mp3"),
            ToolLine::Other("[ExtractAudio] Destination: x.mp3")
        );
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_stop_line_forwarding() {
        let input: &[u8] = b"[download] \xff\xfe title\r\ngrab-progress:5:10\nERROR: last";
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_lines(input, tx).await;

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[download] "));
        assert!(lines[0].contains('\u{FFFD}'));
        assert_eq!(lines[1], "grab-progress:5:10");
        assert_eq!(lines[2], "ERROR: last");
    }

    #[test]
    fn error_summary_prefers_error_lines() {
        let stderr = "WARNING: slow\nERROR: [youtube] abc: Video unavailable\n\n";
        assert_eq!(
            last_error_line(stderr),
            "ERROR: [youtube] abc: Video unavailable"
        );
        assert_eq!(last_error_line("just noise\n"), "just noise");
        assert_eq!(last_error_line(""), "no diagnostic output");
    }

    #[test]
    fn download_args_pin_the_output_stem_and_codec() {
        let backend = YtDlpBackend::default();
        let spec = DownloadSpec {
            url: "https://youtu.be/abc".to_string(),
            format_id: "251".to_string(),
            codec: TargetCodec::Flac,
            destination: PathBuf::from("/music"),
            output_path: PathBuf::from("/music/100% Song.flac"),
        };
        let args = backend.download_args(&spec, Path::new("/usr/bin/ffmpeg"));

        let value_after = |flag: &str| {
            let idx = args.iter().position(|a| a == flag).unwrap();
            args[idx + 1].clone()
        };
        assert_eq!(value_after("--format"), "251");
        assert_eq!(value_after("--audio-format"), "flac");
        assert_eq!(value_after("--audio-quality"), "192");
        assert_eq!(value_after("--ffmpeg-location"), "/usr/bin/ffmpeg");
        assert_eq!(
            PathBuf::from(value_after("--output")),
            PathBuf::from("/music").join("100%% Song.%(ext)s")
        );
        assert!(args.contains(&"--no-overwrites".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
    }
}
