use std::path::PathBuf;

use grabber_core::{update, AppState, DownloadPhase, Effect, Msg};
use grabber_engine::{
    DownloadRequest, ErrorKind, JobError, JobEvent, JobId, JobOutcome, ProbeResult,
    StreamDescriptor, TargetCodec,
};
use pretty_assertions::assert_eq;

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn stream(id: &str, kbps: f64) -> StreamDescriptor {
    StreamDescriptor {
        format_id: id.to_string(),
        bitrate_kbps: Some(kbps),
        container: Some("m4a".to_string()),
        codec: Some("mp4a.40.2".to_string()),
    }
}

fn ready_state() -> AppState {
    let state = AppState::with_preferences(Some(PathBuf::from("/music")), TargetCodec::Flac);
    let (state, _) = update(state, Msg::UrlEdited(URL.to_string()));
    let (state, effects) = update(state, Msg::ProbeClicked);
    let job_id = match &effects[..] {
        [Effect::StartProbe { job_id, .. }] => *job_id,
        other => panic!("unexpected effects {other:?}"),
    };
    let (state, _) = update(
        state,
        Msg::Probe {
            job_id,
            event: JobEvent::Finished(JobOutcome::Probed(ProbeResult {
                title: "Song".to_string(),
                streams: vec![stream("140", 128.0), stream("139", 48.0)],
            })),
        },
    );
    state
}

fn start_download(state: AppState) -> (AppState, JobId) {
    let (state, effects) = update(state, Msg::DownloadClicked);
    match &effects[..] {
        [Effect::StartDownload { job_id, .. }] => (state, *job_id),
        other => panic!("unexpected effects {other:?}"),
    }
}

fn downloading() -> (AppState, JobId) {
    start_download(ready_state())
}

fn finished(path: &str) -> JobEvent {
    JobEvent::Finished(JobOutcome::Downloaded {
        output_path: PathBuf::from(path),
    })
}

#[test]
fn download_click_sends_the_selection() {
    let (state, _) = update(ready_state(), Msg::StreamSelected(1));
    let (state, _) = update(state, Msg::CodecSelected(TargetCodec::Wav));
    let (state, effects) = update(state, Msg::DownloadClicked);

    match &effects[..] {
        [Effect::StartDownload { request, .. }] => assert_eq!(
            request,
            &DownloadRequest {
                url: URL.to_string(),
                title: "Song".to_string(),
                stream: Some(stream("139", 48.0)),
                codec: TargetCodec::Wav,
                destination: Some(PathBuf::from("/music")),
            }
        ),
        other => panic!("unexpected effects {other:?}"),
    }
    let view = state.view();
    assert!(!view.download_enabled);
    assert_eq!(view.status, "Downloading...");
}

#[test]
fn second_click_while_downloading_does_nothing() {
    let (state, _) = downloading();
    let (next, effects) = update(state.clone(), Msg::DownloadClicked);
    assert!(effects.is_empty());
    assert_eq!(next, state);
}

#[test]
fn download_without_a_probe_still_goes_to_the_runner() {
    let (state, _) = update(AppState::new(), Msg::UrlEdited(URL.to_string()));
    let (_, effects) = update(state, Msg::DownloadClicked);
    match &effects[..] {
        [Effect::StartDownload { request, .. }] => {
            assert_eq!(request.url, URL);
            assert_eq!(request.stream, None);
            assert_eq!(request.destination, None);
        }
        other => panic!("unexpected effects {other:?}"),
    }
}

#[test]
fn progress_then_finish_updates_the_view() {
    let (state, job_id) = downloading();
    let progress = |percent| Msg::Download {
        job_id,
        event: JobEvent::Progress(percent),
    };
    let (mut state, _) = update(state, progress(42));
    assert_eq!(state.view().progress, Some(42));
    assert!(state.consume_dirty());

    let (mut state, _) = update(state, progress(42));
    assert!(!state.consume_dirty());

    let (state, _) = update(
        state,
        Msg::Download {
            job_id,
            event: finished("/music/Song.flac"),
        },
    );
    let view = state.view();
    assert_eq!(view.progress, Some(100));
    assert_eq!(view.last_output, Some(PathBuf::from("/music/Song.flac")));
    assert!(view.download_enabled);
    assert_eq!(view.status, "Download finished: /music/Song.flac");
}

#[test]
fn failure_shows_the_message_and_reenables_download() {
    let (state, job_id) = downloading();
    let (state, _) = update(
        state,
        Msg::Download {
            job_id,
            event: JobEvent::Failed(JobError::new(
                ErrorKind::AlreadyExists,
                "file '/music/Song.flac' already exists",
            )),
        },
    );
    assert_eq!(state.download_phase(), &DownloadPhase::Failed);
    let view = state.view();
    assert_eq!(view.status, "Error: file '/music/Song.flac' already exists");
    assert!(view.download_enabled);
}

#[test]
fn cancel_prefers_the_download_and_ignores_late_events() {
    let (state, job_id) = downloading();
    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects, vec![Effect::CancelDownload]);
    assert_eq!(state.download_phase(), &DownloadPhase::Idle);

    let (next, _) = update(
        state.clone(),
        Msg::Download {
            job_id,
            event: JobEvent::Progress(80),
        },
    );
    assert_eq!(next, state);
}

#[test]
fn events_of_a_cancelled_download_do_not_touch_its_replacement() {
    let (state, first) = downloading();
    let (state, _) = update(state, Msg::CancelClicked);
    let (state, second) = start_download(state);
    assert_ne!(first, second);

    // The first job's result was already queued behind the two clicks.
    let (state, effects) = update(
        state,
        Msg::Download {
            job_id: first,
            event: finished("/music/A.flac"),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.download_phase(),
        &DownloadPhase::Running { percent: None }
    );
    assert!(!state.view().download_enabled);

    let (state, _) = update(
        state,
        Msg::Download {
            job_id: second,
            event: finished("/music/B.flac"),
        },
    );
    assert_eq!(state.view().last_output, Some(PathBuf::from("/music/B.flac")));
    assert!(state.view().download_enabled);
}

#[test]
fn choosing_a_destination_is_remembered() {
    let dir = PathBuf::from("/tmp/out");
    let (state, effects) = update(AppState::new(), Msg::DestinationChosen(dir.clone()));
    assert_eq!(effects, vec![Effect::RememberDestination(dir.clone())]);
    assert_eq!(state.view().destination, Some(dir));
}
