//! Terminal host: stdin commands in, text out, jobs on the engine.
mod app;
mod config;
mod effects;
mod input;
mod logging;
mod ui;

pub use app::run_app;
