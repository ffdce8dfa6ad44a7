use std::path::PathBuf;
use std::sync::mpsc;

use engine_logging::{engine_info, engine_warn};
use grabber_core::{Effect, Msg};
use grabber_engine::{JobDispatcher, JobEvent, JobHandle, JobRequest, JobRunner};

use super::app::AppMsg;
use super::config::{self, AppConfig};

/// Turns core effects into runner submissions and routes job events back
/// into the app's message queue.
pub struct EffectRunner {
    runner: JobRunner,
    dispatcher: JobDispatcher,
    msg_tx: mpsc::Sender<AppMsg>,
    probe: Option<JobHandle>,
    download: Option<JobHandle>,
    config: AppConfig,
    config_path: PathBuf,
}

impl EffectRunner {
    pub fn new(config: AppConfig, config_path: PathBuf, msg_tx: mpsc::Sender<AppMsg>) -> Self {
        let runner = JobRunner::with_ytdlp(config.runner_settings(), config.ytdlp_settings());
        Self::with_runner(runner, config, config_path, msg_tx)
    }

    pub fn with_runner(
        runner: JobRunner,
        config: AppConfig,
        config_path: PathBuf,
        msg_tx: mpsc::Sender<AppMsg>,
    ) -> Self {
        Self {
            runner,
            dispatcher: JobDispatcher::new(),
            msg_tx,
            probe: None,
            download: None,
            config,
            config_path,
        }
    }

    pub fn enqueue(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartProbe { job_id, url } => {
                    // A probe handle left over here belongs to a lookup the
                    // core no longer waits for.
                    if let Some(old) = self.probe.take() {
                        old.cancel();
                    }
                    let tx = self.msg_tx.clone();
                    let handle = self.dispatcher.submit(
                        &self.runner,
                        JobRequest::probe(url),
                        move |event: &JobEvent| {
                            let _ = tx.send(AppMsg::Core(Msg::Probe {
                                job_id,
                                event: event.clone(),
                            }));
                        },
                    );
                    self.probe = Some(handle);
                }
                Effect::StartDownload { job_id, request } => {
                    let tx = self.msg_tx.clone();
                    let handle = self.dispatcher.submit(
                        &self.runner,
                        JobRequest::Download(request),
                        move |event: &JobEvent| {
                            let _ = tx.send(AppMsg::Core(Msg::Download {
                                job_id,
                                event: event.clone(),
                            }));
                        },
                    );
                    self.download = Some(handle);
                }
                Effect::CancelProbe => {
                    if let Some(handle) = self.probe.take() {
                        engine_info!(job = handle.id(); "cancelling lookup");
                        handle.cancel();
                    }
                }
                Effect::CancelDownload => {
                    if let Some(handle) = self.download.take() {
                        engine_info!(job = handle.id(); "cancelling download");
                        handle.cancel();
                    }
                }
                Effect::RememberDestination(dir) => {
                    self.config.destination = Some(dir);
                    if let Err(err) = config::save(&self.config_path, &self.config) {
                        engine_warn!("destination not remembered: {}", err);
                    }
                }
            }
        }
    }

    /// Hands queued job events to their handlers. Call on the main thread.
    pub fn pump(&mut self) {
        self.dispatcher.pump(&self.runner);
        if self.probe.as_ref().is_some_and(JobHandle::is_finished) {
            self.probe = None;
        }
        if self.download.as_ref().is_some_and(JobHandle::is_finished) {
            self.download = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use grabber_engine::{DownloadRequest, ErrorKind, TargetCodec};

    use super::*;

    fn runner_for(dir: &std::path::Path) -> (EffectRunner, mpsc::Receiver<AppMsg>) {
        let (tx, rx) = mpsc::channel();
        let effects = EffectRunner::new(AppConfig::default(), dir.join("audiograb.ron"), tx);
        (effects, rx)
    }

    fn next_core_msg(effects: &mut EffectRunner, rx: &mpsc::Receiver<AppMsg>) -> Msg {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            effects.pump();
            if let Ok(AppMsg::Core(msg)) = rx.try_recv() {
                return msg;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("no job event arrived");
    }

    #[test]
    fn rejected_probe_comes_back_as_probe_message() {
        let dir = tempfile::tempdir().unwrap();
        let (mut effects, rx) = runner_for(dir.path());

        effects.enqueue(vec![Effect::StartProbe {
            job_id: 7,
            url: "https://example.com/watch?v=abc".to_string(),
        }]);

        match next_core_msg(&mut effects, &rx) {
            Msg::Probe {
                job_id: 7,
                event: JobEvent::Failed(err),
            } => assert_eq!(err.kind, ErrorKind::InvalidInput),
            other => panic!("unexpected message {other:?}"),
        }
        assert!(effects.probe.is_none());
    }

    #[test]
    fn download_without_stream_comes_back_as_download_message() {
        let dir = tempfile::tempdir().unwrap();
        let (mut effects, rx) = runner_for(dir.path());

        effects.enqueue(vec![Effect::StartDownload {
            job_id: 3,
            request: DownloadRequest {
                url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                title: "Song".to_string(),
                stream: None,
                codec: TargetCodec::Mp3,
                destination: Some(dir.path().to_path_buf()),
            },
        }]);

        match next_core_msg(&mut effects, &rx) {
            Msg::Download {
                job_id: 3,
                event: JobEvent::Failed(err),
            } => assert_eq!(err.kind, ErrorKind::InvalidInput),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn remembered_destination_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let (mut effects, _rx) = runner_for(dir.path());
        let music = dir.path().join("music");

        effects.enqueue(vec![Effect::RememberDestination(music.clone())]);

        let saved = config::load(&dir.path().join("audiograb.ron")).unwrap();
        assert_eq!(saved.destination, Some(music));
    }
}
