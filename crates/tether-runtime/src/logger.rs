//! Injectable logging.
//!
//! The engine logs through a [`Logger`] object supplied via
//! `Engine::configure`, defaulting to [`TracingLogger`], which forwards to
//! the `tracing` macros. Tests install [`NullLogger`].

use tracing::{debug, error, info, warn};

/// Structured logger consumed by the engine.
pub trait Logger {
    fn debug(&self, message: &str);
    fn log(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default logger: forwards to `tracing` (`log` maps to the info level).
#[derive(Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        debug!("{message}");
    }

    fn log(&self, message: &str) {
        info!("{message}");
    }

    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}

/// Silent logger for tests.
#[derive(Debug, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn log(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
