//! Scoped hand-off of the CLI log level to the surveyor's own logger.
//!
//! The surveyor reads its verbosity from two environment variables, which the
//! child process inherits. [`EngineLogLevelGuard`] sets both and puts back the
//! previous values (including "unset") when it is dropped.
//!
//! The environment is process-wide: only one orchestrator may hold a guard at a
//! time, otherwise restores can interleave.

use crate::config::LogLevel;
use std::env;
use std::ffi::OsString;
use tracing::debug;

pub const SURVEYOR_LOG_LEVEL_VARS: [&str; 2] = ["SURVEYOR_LOG_LEVEL", "SURVEYOR_DEFAULT_LOG_LEVEL"];

#[must_use = "the previous log level is restored when the guard is dropped"]
#[derive(Debug)]
pub struct EngineLogLevelGuard {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EngineLogLevelGuard {
    pub fn apply(level: LogLevel) -> Self {
        let value = level.engine_name();
        let saved = SURVEYOR_LOG_LEVEL_VARS
            .iter()
            .map(|var| {
                let previous = env::var_os(var);
                env::set_var(var, &value);
                (*var, previous)
            })
            .collect();
        debug!(level = %value, "Surveyor log level applied");
        EngineLogLevelGuard { saved }
    }
}

impl Drop for EngineLogLevelGuard {
    fn drop(&mut self) {
        for (var, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => env::set_var(var, value),
                None => env::remove_var(var),
            }
        }
        debug!("Surveyor log level restored");
    }
}
