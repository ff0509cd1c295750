//! Node resolution
//!
//! `resolve` turns an expression node into a [`Value`]: literals yield
//! themselves, presets consult the event bindings then the dynamic
//! providers, and calls resolve every child left-to-right before
//! invoking the host function positionally. There is no lazy or
//! short-circuit evaluation here; only the dedicated control-flow
//! actions in the interpreter special-case evaluation order.

use grimoire_types::{Node, NodeKind, Value};

use crate::{Bindings, CallContext, Engine, EvalError, HostError, PresetContext, RuntimeHandle};

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation Context
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a node needs to resolve
pub struct EvalContext<'a> {
    pub engine: &'a Engine,
    pub bindings: &'a Bindings,
    pub rt: &'a RuntimeHandle,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve a node to a value
///
/// Lookup misses (unknown host function or preset name) and
/// null-object/bad-argument reports from host functions are non-fatal:
/// they are logged and the call yields the node's category zero. Only
/// unexpected host failures and reachable `Unset` placeholders surface
/// as errors, to be caught at the enclosing action's boundary.
pub fn resolve(node: &Node, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    match &node.kind {
        NodeKind::Value(value) => Ok(value.clone()),
        NodeKind::Unset => Err(EvalError::UnresolvedUnset),
        NodeKind::Preset { name } => {
            if let Some(value) = ctx.bindings.get(name) {
                return Ok(value.clone());
            }
            if let Some(provider) = ctx.rt.registry.preset(name) {
                return Ok(provider.resolve(&PresetContext { engine: ctx.engine }));
            }
            tracing::warn!(
                preset = %name,
                engine = %ctx.engine.name,
                "preset has no binding and no provider, substituting zero value"
            );
            Ok(Value::zero(node.category))
        }
        NodeKind::Call { function, args } => {
            // Eager, declared-order child evaluation.
            let mut resolved = Vec::with_capacity(args.len());
            for arg in args {
                resolved.push(resolve(arg, ctx)?);
            }
            invoke(node, function, resolved, ctx)
        }
    }
}

fn invoke(
    node: &Node,
    function: &str,
    args: Vec<Value>,
    ctx: &EvalContext<'_>,
) -> Result<Value, EvalError> {
    let Some(host_fn) = ctx.rt.registry.get(function) else {
        tracing::warn!(
            function = %function,
            engine = %ctx.engine.name,
            "unknown host function, substituting zero value"
        );
        return Ok(Value::zero(node.category));
    };

    let mut call = CallContext {
        function,
        category: node.category,
        args,
        engine: ctx.engine,
        bindings: ctx.bindings,
    };
    match host_fn.call(&mut call) {
        Ok(value) => Ok(value),
        Err(err @ HostError::NullObject { .. }) | Err(err @ HostError::BadArg { .. }) => {
            tracing::warn!(
                function = %function,
                engine = %ctx.engine.name,
                error = %err,
                "host function declined, substituting zero value"
            );
            Ok(Value::zero(node.category))
        }
        Err(HostError::Failed(message)) => Err(EvalError::Host {
            function: function.to_string(),
            message,
        }),
    }
}

/// Resolve a node expected to produce a bool
///
/// A value of another runtime type is logged and treated as false.
pub fn resolve_bool(node: &Node, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
    let value = resolve(node, ctx)?;
    match value.as_bool() {
        Some(flag) => Ok(flag),
        None => {
            tracing::warn!(
                engine = %ctx.engine.name,
                found = value.type_name(),
                "condition did not resolve to a bool, treating as false"
            );
            Ok(false)
        }
    }
}

/// Resolve a node expected to produce a number
///
/// A value of another runtime type is logged and treated as zero.
pub fn resolve_number(node: &Node, ctx: &EvalContext<'_>) -> Result<f64, EvalError> {
    let value = resolve(node, ctx)?;
    match value.as_number() {
        Some(number) => Ok(number),
        None => {
            tracing::warn!(
                engine = %ctx.engine.name,
                found = value.type_name(),
                "expression did not resolve to a number, treating as zero"
            );
            Ok(0.0)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
