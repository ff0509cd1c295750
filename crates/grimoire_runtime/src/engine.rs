//! Engines: owner-bound script bundles with variable scope
//!
//! An engine binds a set of scripts to an owner (the unit whose ability
//! this is, the item holder, the world). Instances come in two flavors:
//! [`Engine::bind_to`] shares the template's script objects and gets a
//! private local-variable map; [`Engine::deep_clone`] copies everything
//! for fully independent editing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use grimoire_types::{Category, Script, ScriptError, Trigger, Value};

use crate::{interp, Bindings, Continuation, RunOutcome, RuntimeHandle, Timer};

// ─────────────────────────────────────────────────────────────────────────────
// Engine Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identity of an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(Uuid);

impl EngineId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// An owner-bound bundle of scripts plus a local variable scope
pub struct Engine {
    id: EngineId,
    /// Name used in diagnostics (usually the owner's)
    pub name: String,
    /// Identity the engine's context resolves against
    pub owner: Value,
    scripts: Vec<Arc<Script>>,
    locals: Mutex<HashMap<String, Value>>,
    timers: Mutex<Vec<Timer>>,
    pending: Mutex<Vec<Continuation>>,
    /// Set when the dispatcher drops the engine; blocks re-queueing of
    /// work taken out for an in-progress advance
    retired: AtomicBool,
}

impl Engine {
    /// Create an engine template from owned scripts
    ///
    /// Every script is validated here; an `Unset` placeholder or a
    /// mis-categorized operand blocks construction, so nothing invalid
    /// can ever start running.
    pub fn new(
        name: impl Into<String>,
        owner: Value,
        scripts: Vec<Script>,
    ) -> Result<Arc<Self>, ScriptError> {
        for script in &scripts {
            script.validate()?;
        }
        let scripts: Vec<Arc<Script>> = scripts.into_iter().map(Arc::new).collect();
        Ok(Arc::new(Self {
            id: EngineId::new(),
            name: name.into(),
            owner,
            timers: Mutex::new(Self::build_timers(&scripts)),
            scripts,
            locals: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            retired: AtomicBool::new(false),
        }))
    }

    /// Bind this template to another owner
    ///
    /// Script objects are shared: editing the template (or a script
    /// disabling itself) is visible to every bound instance. The local
    /// variable map is private and starts empty.
    pub fn bind_to(&self, owner: Value) -> Arc<Self> {
        Arc::new(Self {
            id: EngineId::new(),
            name: self.name.clone(),
            owner,
            timers: Mutex::new(Self::build_timers(&self.scripts)),
            scripts: self.scripts.clone(),
            locals: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            retired: AtomicBool::new(false),
        })
    }

    /// Deep-clone this engine for independent editing
    ///
    /// Scripts and the local variable map are both copied; nothing is
    /// shared with the source.
    pub fn deep_clone(&self) -> Arc<Self> {
        let scripts: Vec<Arc<Script>> = self
            .scripts
            .iter()
            .map(|s| Arc::new(Script::clone(s)))
            .collect();
        Arc::new(Self {
            id: EngineId::new(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            timers: Mutex::new(Self::build_timers(&scripts)),
            scripts,
            locals: Mutex::new(self.locals.lock().clone()),
            pending: Mutex::new(Vec::new()),
            retired: AtomicBool::new(false),
        })
    }

    fn build_timers(scripts: &[Arc<Script>]) -> Vec<Timer> {
        let mut timers = Vec::new();
        for script in scripts {
            for (index, trigger) in script.triggers.iter().enumerate() {
                match trigger {
                    Trigger::Periodic { .. } => {
                        timers.push(Timer::new(Arc::clone(script), index, true));
                    }
                    Trigger::Once { .. } => {
                        timers.push(Timer::new(Arc::clone(script), index, false));
                    }
                    Trigger::Event { .. } => {}
                }
            }
        }
        timers
    }

    /// Engine identity
    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Scripts in this engine
    pub fn scripts(&self) -> &[Arc<Script>] {
        &self.scripts
    }

    /// Number of runs currently suspended on a `Wait`
    pub fn suspended_runs(&self) -> usize {
        self.pending.lock().len()
    }

    // ── Variable scope ──────────────────────────────────────────────────────

    /// Write a local variable, last-writer-wins
    pub fn set_local(&self, name: impl Into<String>, value: Value) {
        self.locals.lock().insert(name.into(), value);
    }

    /// Read a local variable; an absent name yields the category zero
    pub fn local(&self, name: &str, category: Category) -> Value {
        self.locals
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::zero(category))
    }

    // ── Running ─────────────────────────────────────────────────────────────

    /// Run every script against a broadcast event
    pub fn run_event(
        &self,
        event: &str,
        requirement: Option<&Value>,
        bindings: &Bindings,
        rt: &RuntimeHandle,
    ) {
        for script in &self.scripts {
            let outcome = interp::run_script(script, self, rt, event, requirement, bindings);
            self.absorb(outcome);
        }
    }

    /// Queue the suspension of a finished run step, if any
    pub(crate) fn absorb(&self, outcome: RunOutcome) {
        if let RunOutcome::Suspended(cont) = outcome {
            if self.retired.load(Ordering::Relaxed) {
                return;
            }
            self.pending.lock().push(cont);
        }
    }

    /// Advance suspended runs and timers by an already-scaled delta
    ///
    /// Work is taken out of the queues before running so that scripts
    /// reached from here can suspend again, broadcast, or remove engines
    /// without deadlocking on the queue locks.
    pub fn advance(&self, dt: f64, rt: &RuntimeHandle) {
        if self.retired.load(Ordering::Relaxed) {
            return;
        }

        let waiting = std::mem::take(&mut *self.pending.lock());
        for mut cont in waiting {
            cont.remaining -= dt;
            if cont.remaining > 0.0 {
                self.absorb(RunOutcome::Suspended(cont));
            } else {
                let outcome = interp::resume(cont, self, rt);
                self.absorb(outcome);
            }
        }

        let mut timers = std::mem::take(&mut *self.timers.lock());
        for timer in &mut timers {
            if let Some(outcome) = timer.update(dt, self, rt) {
                self.absorb(outcome);
            }
        }
        if !self.retired.load(Ordering::Relaxed) {
            self.timers.lock().append(&mut timers);
        }
    }

    /// Drop all timers and suspended runs and refuse new ones
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Relaxed);
        self.timers.lock().clear();
        self.pending.lock().clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Globals
// ─────────────────────────────────────────────────────────────────────────────

/// The process-wide variable map shared by every engine
///
/// Unsynchronized in spirit: last write wins, with no atomicity across a
/// multi-step expression.
pub struct Globals {
    values: DashMap<String, Value>,
}

static GLOBALS: OnceLock<Globals> = OnceLock::new();

impl Globals {
    /// The process-wide instance
    pub fn get() -> &'static Globals {
        GLOBALS.get_or_init(|| Globals {
            values: DashMap::new(),
        })
    }

    /// Write a global variable, last-writer-wins
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Read a global variable; an absent name yields the category zero
    pub fn read(&self, name: &str, category: Category) -> Value {
        self.values
            .get(name)
            .map(|v| v.clone())
            .unwrap_or_else(|| Value::zero(category))
    }

    /// Remove a global variable
    pub fn remove(&self, name: &str) {
        self.values.remove(name);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
