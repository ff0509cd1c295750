//! Runtime configuration

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::HostRegistry;

// ─────────────────────────────────────────────────────────────────────────────
// Runtime Config
// ─────────────────────────────────────────────────────────────────────────────

/// Behavior switches for the interpreter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Abort the remainder of a run on the first action failure instead
    /// of continuing with the next sibling
    #[serde(default)]
    pub abort_on_error: bool,

    /// Initial game-time scale applied to tick deltas (1.0 = real time,
    /// 0.0 = paused)
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

fn default_time_scale() -> f64 {
    1.0
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            abort_on_error: false,
            time_scale: 1.0,
        }
    }
}

impl RuntimeConfig {
    /// Set the abort-on-error switch
    pub fn abort_on_error(mut self, abort: bool) -> Self {
        self.abort_on_error = abort;
        self
    }

    /// Set the initial time scale
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Shared runtime services threaded through every script run
#[derive(Clone)]
pub struct RuntimeHandle {
    pub registry: Arc<HostRegistry>,
    pub config: Arc<RuntimeConfig>,
}

impl RuntimeHandle {
    /// Create a handle over a registry and config
    pub fn new(registry: Arc<HostRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
