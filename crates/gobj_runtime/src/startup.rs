//! Process bootstrap
//!
//! `start_up` runs exactly once per process, before any `create` call: it
//! initializes the global gclass registry and hands back the runtime wired
//! with the host's persistence store and command/stats parsers. There is no
//! mid-run teardown; the registry lives until process exit.

use crate::persist::PersistStore;
use crate::registry::GClassRegistry;
use crate::runtime::{CommandParser, GRuntime, StatsParser};
use gobj_core::{GObjError, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static STARTED: AtomicBool = AtomicBool::new(false);

/// Process-wide settings fed to `start_up`
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Maximum depth of nested synchronous dispatch before
    /// `RecursionLimitExceeded`
    pub max_dispatch_depth: usize,
    /// Trace level applied on top of each class's own
    pub default_trace_level: u32,
    /// Name reported in trace records
    pub process_name: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 128,
            default_trace_level: 0,
            process_name: "gobj".to_string(),
        }
    }
}

/// Bootstrap the process: initialize the registry and build the runtime.
///
/// Must run exactly once per process; a second call fails with
/// `AlreadyStartedUp` and leaves the first runtime untouched.
pub fn start_up(
    settings: GlobalSettings,
    persist: Option<Box<dyn PersistStore>>,
    command_parser: Option<CommandParser>,
    stats_parser: Option<StatsParser>,
) -> Result<GRuntime> {
    if STARTED.swap(true, Ordering::SeqCst) {
        return Err(GObjError::AlreadyStartedUp);
    }
    GClassRegistry::init();
    debug!(process = %settings.process_name, "gobj runtime starting up");

    let mut runtime = GRuntime::new(settings);
    if let Some(store) = persist {
        runtime.set_persist_store(store);
    }
    if let Some(parser) = command_parser {
        runtime.set_command_parser(parser);
    }
    if let Some(parser) = stats_parser {
        runtime.set_stats_parser(parser);
    }
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: GlobalSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.max_dispatch_depth, 128);
        assert_eq!(settings.default_trace_level, 0);

        let settings: GlobalSettings =
            serde_json::from_str(r#"{"max_dispatch_depth": 16, "process_name": "relay"}"#)
                .unwrap();
        assert_eq!(settings.max_dispatch_depth, 16);
        assert_eq!(settings.process_name, "relay");
    }
}
