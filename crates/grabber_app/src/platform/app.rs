use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use grabber_core::{update, AppState, AppViewModel, Msg};

use super::config::{self, AppConfig};
use super::effects::EffectRunner;
use super::input::{self, HELP};
use super::logging;
use super::ui::render;

const TICK_INTERVAL: Duration = Duration::from_millis(75);

/// Everything the main loop reacts to. Only the main thread consumes these.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMsg {
    Core(Msg),
    /// Time to hand queued job events to their handlers.
    Tick,
    ShowStreams,
    Help,
    /// A line that did not parse, with the reason.
    Rejected(String),
    Quit,
}

pub fn run_app() -> anyhow::Result<()> {
    let config_path =
        config::config_path_from_args(std::env::args().skip(1)).map_err(anyhow::Error::msg)?;
    let (app_config, load_error) = match config::load(&config_path) {
        Ok(app_config) => (app_config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };

    logging::initialize(
        app_config.log_destination,
        logging::parse_level(&app_config.log_level),
    );
    if let Some(err) = load_error {
        engine_warn!("using default settings: {}", err);
    }
    engine_info!("audiograb starting with settings from {:?}", config_path);

    let (msg_tx, msg_rx) = mpsc::channel::<AppMsg>();
    let mut state = AppState::with_preferences(app_config.destination.clone(), app_config.codec);
    let mut effects = EffectRunner::new(app_config, config_path, msg_tx.clone());

    input::spawn_reader(msg_tx.clone());

    // Background tick so job events get pumped on this thread.
    let tick_tx = msg_tx;
    thread::spawn(move || {
        while tick_tx.send(AppMsg::Tick).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });

    println!("{HELP}");
    let mut shown = state.view();
    print_lines(render::render(&shown));

    while let Ok(msg) = msg_rx.recv() {
        match msg {
            AppMsg::Tick => effects.pump(),
            AppMsg::Core(msg) => {
                let (next, new_effects) = update(state, msg);
                state = next;
                effects.enqueue(new_effects);
            }
            AppMsg::ShowStreams => print_lines(render::render_streams(&state.view())),
            AppMsg::Help => println!("{HELP}"),
            AppMsg::Rejected(reason) => println!("! {reason}"),
            AppMsg::Quit => break,
        }

        if state.consume_dirty() {
            let view = state.view();
            print_lines(render::render(&view));
            if streams_changed(&shown, &view) {
                print_lines(render::render_streams(&view));
            }
            shown = view;
        }
    }

    engine_info!("audiograb exiting");
    Ok(())
}

fn streams_changed(before: &AppViewModel, after: &AppViewModel) -> bool {
    !after.streams.is_empty()
        && (before.title != after.title || before.streams.len() != after.streams.len())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
