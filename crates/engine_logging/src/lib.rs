#![deny(missing_docs)]
//! Shared logging utilities for the grabber workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro accepts an optional `job = <id>;` prefix which tags the line
//! with the job it belongs to:
//!
//! ```ignore
//! # use engine_logging::engine_info;
//! engine_info!(job = 7; "probe finished with {} streams", 3);
//! engine_info!("runner started");
//! ```

/// Target used for lines tagged with a job id.
pub const JOB_TARGET: &str = "grabber::job";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    (job = $job:expr; $($arg:tt)*) => {{
        log::trace!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    (job = $job:expr; $($arg:tt)*) => {{
        log::debug!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    (job = $job:expr; $($arg:tt)*) => {{
        log::info!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    (job = $job:expr; $($arg:tt)*) => {{
        log::warn!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    (job = $job:expr; $($arg:tt)*) => {{
        log::error!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let config = ConfigBuilder::new()
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Debug)
        .build();

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
