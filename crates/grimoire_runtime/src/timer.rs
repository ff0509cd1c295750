//! Trigger timers
//!
//! Each periodic/one-shot trigger of a script gets a timer on the owning
//! engine. The tick driver advances them with scaled time; the duration
//! expression is re-resolved on every update, so an interval may depend
//! on game state (an attack-speed-scaled pulse, say).

use std::sync::Arc;

use grimoire_types::Script;

use crate::{interp, resolve_number, Bindings, Engine, EvalContext, RunOutcome, RuntimeHandle};

/// Scheduled re-firing of one timed trigger
#[derive(Debug)]
pub struct Timer {
    script: Arc<Script>,
    trigger_index: usize,
    elapsed: f64,
    fired: bool,
    repeating: bool,
}

impl Timer {
    pub(crate) fn new(script: Arc<Script>, trigger_index: usize, repeating: bool) -> Self {
        Self {
            script,
            trigger_index,
            elapsed: 0.0,
            fired: false,
            repeating,
        }
    }

    /// Name of the script this timer fires
    pub fn script_name(&self) -> &str {
        &self.script.name
    }

    /// Whether a one-shot timer has already fired
    pub fn is_inert(&self) -> bool {
        self.fired && !self.repeating
    }

    /// Accumulate scaled time and fire at most once
    ///
    /// A one-shot timer fires exactly once and then goes permanently
    /// inert. A periodic timer resets its accumulator to zero on firing:
    /// an oversized delta never produces catch-up firings.
    pub(crate) fn update(
        &mut self,
        dt: f64,
        engine: &Engine,
        rt: &RuntimeHandle,
    ) -> Option<RunOutcome> {
        if self.is_inert() || self.script.is_disabled() {
            return None;
        }
        self.elapsed += dt;

        let threshold = self.threshold(engine, rt)?;
        if self.elapsed < threshold {
            return None;
        }

        self.fired = true;
        if self.repeating {
            self.elapsed = 0.0;
        }
        let bindings = Bindings::new();
        Some(interp::run_guarded(&self.script, engine, rt, &bindings))
    }

    fn threshold(&self, engine: &Engine, rt: &RuntimeHandle) -> Option<f64> {
        let trigger = self.script.triggers.get(self.trigger_index)?;
        let duration = trigger.duration()?;
        let bindings = Bindings::new();
        let ctx = EvalContext {
            engine,
            bindings: &bindings,
            rt,
        };
        match resolve_number(duration, &ctx) {
            Ok(threshold) => Some(threshold),
            Err(err) => {
                tracing::error!(
                    engine = %engine.name,
                    script = %self.script.name,
                    phase = "trigger",
                    index = self.trigger_index,
                    error = %err,
                    "timer duration failed to resolve, timer skipped this tick"
                );
                None
            }
        }
    }
}
