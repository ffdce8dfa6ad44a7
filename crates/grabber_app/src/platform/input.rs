use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use engine_logging::engine_debug;
use grabber_core::Msg;
use grabber_engine::TargetCodec;
use thiserror::Error;

use super::app::AppMsg;

pub const HELP: &str = "\
commands:
  url <text>      set the video URL
  probe [url]     look the URL up and list its audio streams
  streams         show the audio streams again
  select <n>      pick stream number n
  codec <name>    target format: mp3, wav, flac, m4a, opus
  dest <dir>      folder the file goes to
  download        start the download
  cancel          stop the running download or lookup
  help            this text
  quit            leave";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command {0:?}, type help for the list")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("stream number must be 1 or higher, got {0:?}")]
    BadIndex(String),
    #[error("unknown codec {0:?}")]
    BadCodec(String),
}

/// Parses one line of user input. Blank lines yield no messages.
pub fn parse_line(line: &str) -> Result<Vec<AppMsg>, InputError> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let msgs = match command.to_ascii_lowercase().as_str() {
        "" => Vec::new(),
        "url" => vec![AppMsg::Core(Msg::UrlEdited(rest.to_string()))],
        "probe" if rest.is_empty() => vec![AppMsg::Core(Msg::ProbeClicked)],
        "probe" => vec![
            AppMsg::Core(Msg::UrlEdited(rest.to_string())),
            AppMsg::Core(Msg::ProbeClicked),
        ],
        "streams" | "status" => vec![AppMsg::ShowStreams],
        "select" => {
            let number = required(rest, "select")?;
            match number.parse::<usize>() {
                Ok(n) if n >= 1 => vec![AppMsg::Core(Msg::StreamSelected(n - 1))],
                _ => return Err(InputError::BadIndex(number.to_string())),
            }
        }
        "codec" => {
            let name = required(rest, "codec")?;
            let codec = name
                .parse::<TargetCodec>()
                .map_err(|_| InputError::BadCodec(name.to_string()))?;
            vec![AppMsg::Core(Msg::CodecSelected(codec))]
        }
        "dest" => {
            let dir = required(rest, "dest")?;
            vec![AppMsg::Core(Msg::DestinationChosen(PathBuf::from(dir)))]
        }
        "download" => vec![AppMsg::Core(Msg::DownloadClicked)],
        "cancel" => vec![AppMsg::Core(Msg::CancelClicked)],
        "help" | "?" => vec![AppMsg::Help],
        "quit" | "exit" => vec![AppMsg::Quit],
        _ => return Err(InputError::Unknown(command.to_string())),
    };
    Ok(msgs)
}

fn required<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, InputError> {
    if rest.is_empty() {
        Err(InputError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

/// Reads stdin line by line on its own thread. End of input quits the app.
pub fn spawn_reader(msg_tx: mpsc::Sender<AppMsg>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let msgs = match parse_line(&line) {
                Ok(msgs) => msgs,
                Err(err) => vec![AppMsg::Rejected(err.to_string())],
            };
            for msg in msgs {
                if msg_tx.send(msg).is_err() {
                    return;
                }
            }
        }
        engine_debug!("stdin closed");
        let _ = msg_tx.send(AppMsg::Quit);
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn probe_with_url_edits_then_probes() {
        let msgs = parse_line("probe  https://youtu.be/dQw4w9WgXcQ ").unwrap();
        assert_eq!(
            msgs,
            vec![
                AppMsg::Core(Msg::UrlEdited("https://youtu.be/dQw4w9WgXcQ".to_string())),
                AppMsg::Core(Msg::ProbeClicked),
            ]
        );
        assert_eq!(parse_line("PROBE").unwrap(), vec![AppMsg::Core(Msg::ProbeClicked)]);
    }

    #[test]
    fn stream_numbers_are_one_based() {
        assert_eq!(
            parse_line("select 2").unwrap(),
            vec![AppMsg::Core(Msg::StreamSelected(1))]
        );
        assert_eq!(parse_line("select 0"), Err(InputError::BadIndex("0".to_string())));
        assert_eq!(parse_line("select"), Err(InputError::MissingArgument("select")));
    }

    #[test]
    fn codec_and_destination() {
        assert_eq!(
            parse_line("codec FLAC").unwrap(),
            vec![AppMsg::Core(Msg::CodecSelected(TargetCodec::Flac))]
        );
        assert_eq!(parse_line("codec ogg"), Err(InputError::BadCodec("ogg".to_string())));
        assert_eq!(
            parse_line("dest /home/me/My Music").unwrap(),
            vec![AppMsg::Core(Msg::DestinationChosen(PathBuf::from(
                "/home/me/My Music"
            )))]
        );
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_line("   ").unwrap(), Vec::new());
        assert_eq!(parse_line("play"), Err(InputError::Unknown("play".to_string())));
        assert_eq!(parse_line("quit").unwrap(), vec![AppMsg::Quit]);
    }
}
