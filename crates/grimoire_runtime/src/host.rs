//! Host Function Table
//!
//! Named primitives the interpreter invokes by exact string key. The
//! game supplies these (damage, movement, VFX, ...); the fixed
//! comparison/logic/variable catalog in [`crate::builtins`] is installed
//! the same way. Dynamic-preset providers live here too: zero-argument
//! callables consulted when a preset name is not satisfied by the
//! broadcast's bindings.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use grimoire_types::{AbilityId, Category, EntityId, ItemId, Script, Value, Vec3};

use crate::Engine;

// ─────────────────────────────────────────────────────────────────────────────
// Host Error
// ─────────────────────────────────────────────────────────────────────────────

/// Failure reported by a host function
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// A required reference argument resolved to "no object"; the
    /// function skipped its side effect
    #[error("required {what} is missing (no object)")]
    NullObject { what: String },

    /// An argument had the wrong runtime type for this function
    #[error("argument {index} is not a {expected}")]
    BadArg { index: usize, expected: &'static str },

    /// Unexpected failure inside the function body
    #[error("{0}")]
    Failed(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Bindings
// ─────────────────────────────────────────────────────────────────────────────

/// Named values supplied by the broadcasting collaborator
///
/// A combat system, for example, broadcasts a damage event with
/// "Damaged Entity", "Damaging Entity", "Amount", and "Is Critical".
/// Preset nodes resolve against these first.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    /// Create an empty binding map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Insert a binding
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a binding
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Call Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to a host function invocation
pub struct CallContext<'a> {
    /// Registered function name being invoked
    pub function: &'a str,
    /// Declared category of the call node (used for default results)
    pub category: Category,
    /// Child expressions, already resolved left-to-right
    pub args: Vec<Value>,
    /// Engine whose script is running
    pub engine: &'a Engine,
    /// Bindings of the event that triggered the run
    pub bindings: &'a Bindings,
}

impl CallContext<'_> {
    /// Get a raw argument
    pub fn arg(&self, index: usize) -> Result<&Value, HostError> {
        self.args.get(index).ok_or(HostError::BadArg {
            index,
            expected: "value",
        })
    }

    /// Get an argument as f64
    pub fn number(&self, index: usize) -> Result<f64, HostError> {
        self.arg(index)?.as_number().ok_or(HostError::BadArg {
            index,
            expected: "number",
        })
    }

    /// Get an argument as bool
    pub fn boolean(&self, index: usize) -> Result<bool, HostError> {
        self.arg(index)?.as_bool().ok_or(HostError::BadArg {
            index,
            expected: "bool",
        })
    }

    /// Get an argument as a string slice
    pub fn text(&self, index: usize) -> Result<&str, HostError> {
        self.arg(index)?.as_text().ok_or(HostError::BadArg {
            index,
            expected: "text",
        })
    }

    /// Get an argument as a vector
    pub fn vector(&self, index: usize) -> Result<Vec3, HostError> {
        self.arg(index)?.as_vector().ok_or(HostError::BadArg {
            index,
            expected: "vector",
        })
    }

    /// Get an argument as an entity reference (may be the none sentinel)
    pub fn entity(&self, index: usize) -> Result<EntityId, HostError> {
        self.arg(index)?.as_entity().ok_or(HostError::BadArg {
            index,
            expected: "entity",
        })
    }

    /// Get an argument as an ability reference
    pub fn ability(&self, index: usize) -> Result<AbilityId, HostError> {
        self.arg(index)?.as_ability().ok_or(HostError::BadArg {
            index,
            expected: "ability",
        })
    }

    /// Get an argument as an item reference
    pub fn item(&self, index: usize) -> Result<ItemId, HostError> {
        self.arg(index)?.as_item().ok_or(HostError::BadArg {
            index,
            expected: "item",
        })
    }

    /// Get an argument as a group slice
    pub fn group(&self, index: usize) -> Result<&[EntityId], HostError> {
        self.arg(index)?.as_group().ok_or(HostError::BadArg {
            index,
            expected: "group",
        })
    }

    /// Get a required entity argument, naming it in the error when it
    /// resolves to no object
    pub fn require_entity(&self, index: usize, what: &str) -> Result<EntityId, HostError> {
        let id = self.entity(index)?;
        if id.is_none() {
            return Err(HostError::NullObject {
                what: what.to_string(),
            });
        }
        Ok(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Function Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A named primitive invokable from script call nodes
pub trait HostFn: Send + Sync {
    /// Invoke with resolved positional arguments
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value, HostError>;
}

/// Function-based host executor (for simple primitives)
pub struct FnHostFn<F>
where
    F: Fn(&mut CallContext<'_>) -> Result<Value, HostError> + Send + Sync,
{
    func: F,
}

impl<F> FnHostFn<F>
where
    F: Fn(&mut CallContext<'_>) -> Result<Value, HostError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> HostFn for FnHostFn<F>
where
    F: Fn(&mut CallContext<'_>) -> Result<Value, HostError> + Send + Sync,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value, HostError> {
        (self.func)(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dynamic Presets
// ─────────────────────────────────────────────────────────────────────────────

/// Context available to a dynamic-preset provider
pub struct PresetContext<'a> {
    /// Engine whose script is resolving the preset
    pub engine: &'a Engine,
}

/// A zero-argument provider consulted when a preset name is not bound
/// by the current event ("the current player", "the owner of this
/// script", ...)
pub trait PresetFn: Send + Sync {
    fn resolve(&self, ctx: &PresetContext<'_>) -> Value;
}

struct FnPresetFn<F>
where
    F: Fn(&PresetContext<'_>) -> Value + Send + Sync,
{
    func: F,
}

impl<F> PresetFn for FnPresetFn<F>
where
    F: Fn(&PresetContext<'_>) -> Value + Send + Sync,
{
    fn resolve(&self, ctx: &PresetContext<'_>) -> Value {
        (self.func)(ctx)
    }
}

/// Callback deciding whether an entity reference is still live
pub type EntityValidator = dyn Fn(EntityId) -> bool + Send + Sync;

// ─────────────────────────────────────────────────────────────────────────────
// Host Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of host functions and dynamic-preset providers
///
/// Exact string keys, one signature per name; no overload resolution.
pub struct HostRegistry {
    functions: DashMap<String, Arc<dyn HostFn>>,
    presets: DashMap<String, Arc<dyn PresetFn>>,
    entity_validator: RwLock<Option<Arc<EntityValidator>>>,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            functions: DashMap::new(),
            presets: DashMap::new(),
            entity_validator: RwLock::new(None),
        }
    }

    /// Register a host function
    pub fn register(&self, name: impl Into<String>, func: Arc<dyn HostFn>) {
        self.functions.insert(name.into(), func);
    }

    /// Register a host function from a closure
    pub fn register_fn<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnHostFn::new(func)));
    }

    /// Look up a host function
    pub fn get(&self, name: &str) -> Option<Arc<dyn HostFn>> {
        self.functions.get(name).map(|f| Arc::clone(f.value()))
    }

    /// Check if a function name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no functions are registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Register a dynamic-preset provider
    pub fn register_preset(&self, name: impl Into<String>, provider: Arc<dyn PresetFn>) {
        self.presets.insert(name.into(), provider);
    }

    /// Register a dynamic-preset provider from a closure
    pub fn register_preset_fn<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&PresetContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.register_preset(name, Arc::new(FnPresetFn { func }));
    }

    /// Look up a dynamic-preset provider
    pub fn preset(&self, name: &str) -> Option<Arc<dyn PresetFn>> {
        self.presets.get(name).map(|p| Arc::clone(p.value()))
    }

    /// Install the liveness probe used by group walks
    pub fn set_entity_validator<F>(&self, validator: F)
    where
        F: Fn(EntityId) -> bool + Send + Sync + 'static,
    {
        *self.entity_validator.write() = Some(Arc::new(validator));
    }

    /// Whether an entity reference is live: not the none sentinel, and
    /// accepted by the installed validator (if any)
    pub fn entity_alive(&self, id: EntityId) -> bool {
        if id.is_none() {
            return false;
        }
        match self.entity_validator.read().as_ref() {
            Some(validator) => validator(id),
            None => true,
        }
    }

    /// Function names a script calls that are not registered
    ///
    /// Loaders use this to surface missing primitives at load time
    /// instead of as lookup warnings mid-run.
    pub fn unknown_functions(&self, script: &Script) -> Vec<String> {
        script
            .called_functions()
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
