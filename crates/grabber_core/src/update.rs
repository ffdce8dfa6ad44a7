use grabber_engine::{ErrorKind, JobError, JobEvent, JobId, JobOutcome};

use crate::{AppState, Effect, Msg, ProbePhase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UrlEdited(url) => {
            state.set_url_input(url);
            Vec::new()
        }
        Msg::ProbeClicked => {
            let url = state.url_input().trim().to_string();
            if url.is_empty() {
                state.set_status("Please enter a YouTube URL");
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(2);
            if state.probe_phase() == ProbePhase::Running {
                effects.push(Effect::CancelProbe);
            }
            let job_id = state.begin_probe(url.clone());
            state.set_status("Waiting for yt-dlp response...");
            effects.push(Effect::StartProbe { job_id, url });
            effects
        }
        Msg::StreamSelected(index) => {
            state.select_stream(index);
            Vec::new()
        }
        Msg::CodecSelected(codec) => {
            state.set_codec(codec);
            Vec::new()
        }
        Msg::DestinationChosen(dir) => {
            state.set_destination(dir.clone());
            vec![Effect::RememberDestination(dir)]
        }
        Msg::DownloadClicked => {
            // The action is disabled while a download runs.
            if state.is_downloading() {
                return (state, Vec::new());
            }
            // Missing choices are reported back by the runner as InvalidInput.
            let request = state.download_request();
            let job_id = state.begin_download();
            state.set_status("Downloading...");
            vec![Effect::StartDownload { job_id, request }]
        }
        Msg::CancelClicked => {
            if state.is_downloading() {
                state.download_stopped();
                state.set_status("Download cancelled");
                vec![Effect::CancelDownload]
            } else if state.probe_phase() == ProbePhase::Running {
                state.probe_stopped();
                state.set_status("Lookup cancelled");
                vec![Effect::CancelProbe]
            } else {
                Vec::new()
            }
        }
        Msg::Probe { job_id, event } => {
            apply_probe_event(&mut state, job_id, event);
            Vec::new()
        }
        Msg::Download { job_id, event } => {
            apply_download_event(&mut state, job_id, event);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Events of a cancelled or replaced job can still be queued behind the
/// click that replaced it; only the current job's events count.
fn apply_probe_event(state: &mut AppState, job_id: JobId, event: JobEvent) {
    if !state.is_current_probe(job_id) {
        return;
    }
    match event {
        JobEvent::Progress(_) => {}
        JobEvent::Finished(JobOutcome::Probed(result)) => {
            state.probe_succeeded(result.title, result.streams);
            state.set_status("URL Found");
        }
        JobEvent::Finished(JobOutcome::Downloaded { .. }) => {}
        JobEvent::Failed(err) => {
            state.probe_failed();
            state.set_status(probe_failure_text(&err));
        }
    }
}

fn apply_download_event(state: &mut AppState, job_id: JobId, event: JobEvent) {
    if !state.is_current_download(job_id) {
        return;
    }
    match event {
        JobEvent::Progress(percent) => state.download_progressed(percent),
        JobEvent::Finished(JobOutcome::Downloaded { output_path }) => {
            state.set_status(format!("Download finished: {}", output_path.display()));
            state.download_finished(output_path);
        }
        JobEvent::Finished(JobOutcome::Probed(_)) => {}
        JobEvent::Failed(err) => {
            state.download_failed();
            state.set_status(format!("Error: {}", err.message));
        }
    }
}

fn probe_failure_text(err: &JobError) -> String {
    match err.kind {
        ErrorKind::InvalidInput => "Invalid YouTube URL. Please enter a valid URL.".to_string(),
        ErrorKind::NoAudioStreams => "No audio streams found".to_string(),
        ErrorKind::MissingDependency => format!("Missing dependency: {}", err.message),
        _ => format!("Error getting video info: {}", err.message),
    }
}
