//! Event dispatcher and tick driver
//!
//! The process-wide registry mapping event names to the engines whose
//! scripts trigger on them. Collaborators broadcast a named event with a
//! binding map; the dispatcher runs every interested engine. One
//! external driver calls [`Dispatcher::tick`] per frame with the raw
//! delta; the dispatcher applies the global time scale and advances
//! every engine's suspended runs and timers.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use grimoire_types::Value;

use crate::{Bindings, Engine, EngineId, HostRegistry, RuntimeConfig, RuntimeHandle};

/// Reserved signal delivered to an engine right after registration
pub const SCRIPT_LOADED: &str = "ScriptLoaded";
/// Reserved signal delivered to an engine right after deregistration
pub const SCRIPT_UNLOADED: &str = "ScriptUnloaded";

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Name-indexed registry of interested engines
pub struct Dispatcher {
    interests: DashMap<String, Vec<EngineId>>,
    engines: DashMap<EngineId, Arc<Engine>>,
    rt: RuntimeHandle,
    time_scale: Mutex<f64>,
}

impl Dispatcher {
    /// Create a dispatcher over a host registry and config
    pub fn new(registry: Arc<HostRegistry>, config: RuntimeConfig) -> Self {
        let time_scale = config.time_scale;
        Self {
            interests: DashMap::new(),
            engines: DashMap::new(),
            rt: RuntimeHandle::new(registry, config),
            time_scale: Mutex::new(time_scale),
        }
    }

    /// The runtime handle threaded through script runs
    pub fn handle(&self) -> &RuntimeHandle {
        &self.rt
    }

    /// Number of registered engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Whether no engines are registered
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Whether an engine is registered
    pub fn contains(&self, id: EngineId) -> bool {
        self.engines.contains_key(&id)
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Register an engine and deliver the script-loaded signal to it
    ///
    /// Every event-trigger name of every script is indexed. Host
    /// functions the scripts call but the registry does not know are
    /// surfaced here as warnings instead of as lookup noise mid-run.
    pub fn add_engine(&self, engine: Arc<Engine>) {
        let id = engine.id();
        for script in engine.scripts() {
            for name in self.rt.registry.unknown_functions(script) {
                tracing::warn!(
                    engine = %engine.name,
                    script = %script.name,
                    function = %name,
                    "script calls an unregistered host function"
                );
            }
            for trigger in &script.triggers {
                if let Some(event) = trigger.event_name() {
                    let mut ids = self.interests.entry(event.to_string()).or_default();
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        self.engines.insert(id, Arc::clone(&engine));
        tracing::debug!(engine = %engine.name, id = %id, "engine registered");

        engine.run_event(SCRIPT_LOADED, None, &Bindings::new(), &self.rt);
    }

    /// Deregister an engine: cancel its timers and suspended runs,
    /// drop it from the index, then deliver the script-unloaded signal
    /// to it alone
    pub fn remove_engine(&self, id: EngineId) {
        let Some((_, engine)) = self.engines.remove(&id) else {
            return;
        };
        engine.retire();
        for mut ids in self.interests.iter_mut() {
            ids.retain(|registered| *registered != id);
        }
        tracing::debug!(engine = %engine.name, id = %id, "engine removed");

        engine.run_event(SCRIPT_UNLOADED, None, &Bindings::new(), &self.rt);
    }

    // ── Broadcast ───────────────────────────────────────────────────────────

    /// Broadcast a named event to every interested engine
    ///
    /// A name nobody registered is a silent no-op. Delivery iterates a
    /// snapshot of the interest list: an engine added or removed
    /// reentrantly mid-broadcast (a script disabling and deregistering
    /// itself, say) cannot corrupt the in-progress iteration. Engines
    /// removed mid-broadcast are skipped when their turn comes.
    pub fn broadcast(&self, event: &str, bindings: &Bindings, requirement: Option<&Value>) {
        let snapshot: Vec<EngineId> = match self.interests.get(event) {
            Some(ids) => ids.clone(),
            None => return,
        };
        tracing::trace!(event, engines = snapshot.len(), "broadcast");

        for id in snapshot {
            let engine = self.engines.get(&id).map(|e| Arc::clone(e.value()));
            if let Some(engine) = engine {
                engine.run_event(event, requirement, bindings, &self.rt);
            }
        }
    }

    // ── Tick Driver ─────────────────────────────────────────────────────────

    /// Advance every engine by a raw delta, scaled by the global time
    /// scale
    ///
    /// Suspended `Wait` runs and trigger timers both move on scaled game
    /// time, so pause and slow-motion apply uniformly.
    pub fn tick(&self, delta: f64) {
        let scaled = delta * *self.time_scale.lock();
        let engines: Vec<Arc<Engine>> = self
            .engines
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for engine in engines {
            engine.advance(scaled, &self.rt);
        }
    }

    /// Set the global time scale (0.0 pauses all scripted time)
    pub fn set_time_scale(&self, scale: f64) {
        *self.time_scale.lock() = scale;
    }

    /// Current global time scale
    pub fn time_scale(&self) -> f64 {
        *self.time_scale.lock()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use grimoire_types::{Category, EntityId, Node, Script, Trigger};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(HostRegistry::new()), RuntimeConfig::default())
    }

    fn engine_on(event: &str) -> Arc<Engine> {
        let script = Script::new(format!("on-{event}")).with_trigger(Trigger::Event {
            event: event.to_string(),
            requirement: None,
        });
        Engine::new("test", Value::Entity(EntityId(1)), vec![script]).unwrap()
    }

    #[test]
    fn test_add_and_remove_engine() {
        let dispatcher = dispatcher();
        let engine = engine_on("UnitDied");
        let id = engine.id();

        dispatcher.add_engine(engine);
        assert!(dispatcher.contains(id));
        assert_eq!(dispatcher.len(), 1);

        dispatcher.remove_engine(id);
        assert!(!dispatcher.contains(id));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_remove_unknown_engine_is_a_no_op() {
        let dispatcher = dispatcher();
        let stray = engine_on("X");
        dispatcher.remove_engine(stray.id());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_broadcast_to_unknown_event_is_silent() {
        let dispatcher = dispatcher();
        dispatcher.broadcast("NobodyListens", &Bindings::new(), None);
    }

    #[test]
    fn test_loaded_signal_runs_matching_script() {
        let registry = Arc::new(HostRegistry::new());
        let seen = Arc::new(Mutex::new(0));
        {
            let seen = Arc::clone(&seen);
            registry.register_fn("NoteLoaded", move |_ctx| {
                *seen.lock() += 1;
                Ok(Value::Bool(true))
            });
        }
        let dispatcher = Dispatcher::new(registry, RuntimeConfig::default());

        let script = Script::new("greet")
            .with_trigger(Trigger::Event {
                event: SCRIPT_LOADED.to_string(),
                requirement: None,
            })
            .with_actions(vec![grimoire_types::Action::call(Node::call(
                Category::Bool,
                "NoteLoaded",
                vec![],
            ))]);
        let engine = Engine::new("test", Value::Entity(EntityId(1)), vec![script]).unwrap();

        dispatcher.add_engine(engine);
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_time_scale_round_trip() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.time_scale(), 1.0);
        dispatcher.set_time_scale(0.25);
        assert_eq!(dispatcher.time_scale(), 0.25);
    }
}
