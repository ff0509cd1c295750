//! Built-in host functions
//!
//! The fixed catalog every embedder gets: comparisons, arithmetic,
//! logic, variable access, and group helpers. Everything else (damage,
//! movement, VFX, item rolling, ...) is the game's to register.

use grimoire_types::Value;

use crate::{CallContext, Globals, HostError, HostRegistry};

/// Register the built-in catalog
pub fn register_builtins(registry: &HostRegistry) {
    register_comparisons(registry);
    register_arithmetic(registry);
    register_logic(registry);
    register_variables(registry);
    register_groups(registry);

    tracing::info!("Registered {} built-in host functions", registry.len());
}

// ─────────────────────────────────────────────────────────────────────────────
// Comparisons
// ─────────────────────────────────────────────────────────────────────────────

/// Equal/NotEqual accept any pair of values (structural equality);
/// ordering comparisons are defined for numbers only.
fn register_comparisons(registry: &HostRegistry) {
    registry.register_fn("Equal", |ctx| {
        Ok(Value::Bool(ctx.arg(0)? == ctx.arg(1)?))
    });
    registry.register_fn("NotEqual", |ctx| {
        Ok(Value::Bool(ctx.arg(0)? != ctx.arg(1)?))
    });

    registry.register_fn("Less", |ctx| ordered(ctx, |a, b| a < b));
    registry.register_fn("LessOrEqual", |ctx| ordered(ctx, |a, b| a <= b));
    registry.register_fn("Greater", |ctx| ordered(ctx, |a, b| a > b));
    registry.register_fn("GreaterOrEqual", |ctx| ordered(ctx, |a, b| a >= b));
}

fn ordered(
    ctx: &CallContext<'_>,
    compare: impl Fn(f64, f64) -> bool,
) -> Result<Value, HostError> {
    Ok(Value::Bool(compare(ctx.number(0)?, ctx.number(1)?)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Arithmetic
// ─────────────────────────────────────────────────────────────────────────────

fn register_arithmetic(registry: &HostRegistry) {
    registry.register_fn("Add", |ctx| {
        Ok(Value::Number(ctx.number(0)? + ctx.number(1)?))
    });
    registry.register_fn("Subtract", |ctx| {
        Ok(Value::Number(ctx.number(0)? - ctx.number(1)?))
    });
    registry.register_fn("Multiply", |ctx| {
        Ok(Value::Number(ctx.number(0)? * ctx.number(1)?))
    });
    registry.register_fn("Divide", |ctx| {
        let numerator = ctx.number(0)?;
        let denominator = ctx.number(1)?;
        if denominator == 0.0 {
            tracing::warn!(numerator, "Divide by zero, yielding 0");
            return Ok(Value::Number(0.0));
        }
        Ok(Value::Number(numerator / denominator))
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Logic
// ─────────────────────────────────────────────────────────────────────────────

fn register_logic(registry: &HostRegistry) {
    registry.register_fn("And", |ctx| {
        Ok(Value::Bool(ctx.boolean(0)? && ctx.boolean(1)?))
    });
    registry.register_fn("Or", |ctx| {
        Ok(Value::Bool(ctx.boolean(0)? || ctx.boolean(1)?))
    });
    registry.register_fn("Not", |ctx| Ok(Value::Bool(!ctx.boolean(0)?)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Variables
// ─────────────────────────────────────────────────────────────────────────────

/// Reads default to the zero value of the call node's declared category.
fn register_variables(registry: &HostRegistry) {
    registry.register_fn("GetLocal", |ctx| {
        let name = ctx.text(0)?;
        Ok(ctx.engine.local(name, ctx.category))
    });
    registry.register_fn("SetLocal", |ctx| {
        let name = ctx.text(0)?.to_string();
        let value = ctx.arg(1)?.clone();
        ctx.engine.set_local(name, value.clone());
        Ok(value)
    });
    registry.register_fn("GetGlobal", |ctx| {
        let name = ctx.text(0)?;
        Ok(Globals::get().read(name, ctx.category))
    });
    registry.register_fn("SetGlobal", |ctx| {
        let name = ctx.text(0)?.to_string();
        let value = ctx.arg(1)?.clone();
        Globals::get().set(name, value.clone());
        Ok(value)
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────────────────────────

fn register_groups(registry: &HostRegistry) {
    registry.register_fn("GroupSize", |ctx| {
        Ok(Value::Number(ctx.group(0)?.len() as f64))
    });
    registry.register_fn("GroupContains", |ctx| {
        let group = ctx.group(0)?;
        let entity = ctx.entity(1)?;
        Ok(Value::Bool(group.contains(&entity)))
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use grimoire_types::{Category, EntityId, Node};

    use crate::{resolve, Bindings, Engine, EvalContext, RuntimeConfig, RuntimeHandle};

    fn runtime() -> RuntimeHandle {
        let registry = HostRegistry::new();
        register_builtins(&registry);
        RuntimeHandle::new(Arc::new(registry), RuntimeConfig::default())
    }

    fn eval(node: &Node, rt: &RuntimeHandle, engine: &Engine) -> Value {
        let bindings = Bindings::new();
        let ctx = EvalContext {
            engine,
            bindings: &bindings,
            rt,
        };
        resolve(node, &ctx).unwrap()
    }

    fn num_call(function: &str, a: impl Into<Value>, b: impl Into<Value>) -> Node {
        Node::call(
            Category::Number,
            function,
            vec![Node::value(a), Node::value(b)],
        )
    }

    fn bool_call(function: &str, a: impl Into<Value>, b: impl Into<Value>) -> Node {
        Node::call(
            Category::Bool,
            function,
            vec![Node::value(a), Node::value(b)],
        )
    }

    #[test]
    fn test_number_comparisons() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();

        assert_eq!(eval(&bool_call("Equal", 2.0, 2.0), &rt, &engine), Value::Bool(true));
        assert_eq!(eval(&bool_call("Less", 1.0, 2.0), &rt, &engine), Value::Bool(true));
        assert_eq!(eval(&bool_call("Greater", 1.0, 2.0), &rt, &engine), Value::Bool(false));
        assert_eq!(
            eval(&bool_call("GreaterOrEqual", 2.0, 2.0), &rt, &engine),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_reference_equality_only() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();

        assert_eq!(
            eval(&bool_call("Equal", EntityId(4), EntityId(4)), &rt, &engine),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&bool_call("NotEqual", EntityId(4), EntityId(5)), &rt, &engine),
            Value::Bool(true)
        );
        // Ordering an entity pair is a bad argument: logged, zero value.
        assert_eq!(
            eval(&bool_call("Less", EntityId(4), EntityId(5)), &rt, &engine),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_arithmetic() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();

        assert_eq!(eval(&num_call("Add", 2.0, 3.0), &rt, &engine), Value::Number(5.0));
        assert_eq!(eval(&num_call("Divide", 9.0, 3.0), &rt, &engine), Value::Number(3.0));
        assert_eq!(eval(&num_call("Divide", 9.0, 0.0), &rt, &engine), Value::Number(0.0));
    }

    #[test]
    fn test_logic() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();

        assert_eq!(eval(&bool_call("And", true, false), &rt, &engine), Value::Bool(false));
        assert_eq!(eval(&bool_call("Or", true, false), &rt, &engine), Value::Bool(true));
        assert_eq!(
            eval(
                &Node::call(Category::Bool, "Not", vec![Node::value(false)]),
                &rt,
                &engine
            ),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_local_variable_builtins() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();

        // Absent read defaults to the declared category's zero.
        let get = Node::call(Category::Number, "GetLocal", vec![Node::value("mana")]);
        assert_eq!(eval(&get, &rt, &engine), Value::Number(0.0));

        let set = Node::call(
            Category::Number,
            "SetLocal",
            vec![Node::value("mana"), Node::value(40.0)],
        );
        assert_eq!(eval(&set, &rt, &engine), Value::Number(40.0));
        assert_eq!(eval(&get, &rt, &engine), Value::Number(40.0));
    }

    #[test]
    fn test_global_variable_builtins() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();
        Globals::get().remove("builtins-test-score");

        let get = Node::call(
            Category::Number,
            "GetGlobal",
            vec![Node::value("builtins-test-score")],
        );
        assert_eq!(eval(&get, &rt, &engine), Value::Number(0.0));

        let set = Node::call(
            Category::Number,
            "SetGlobal",
            vec![Node::value("builtins-test-score"), Node::value(7.0)],
        );
        eval(&set, &rt, &engine);
        assert_eq!(eval(&get, &rt, &engine), Value::Number(7.0));
        Globals::get().remove("builtins-test-score");
    }

    #[test]
    fn test_group_helpers() {
        let rt = runtime();
        let engine = Engine::new("t", Value::Entity(EntityId(1)), vec![]).unwrap();
        let group = vec![EntityId(1), EntityId(2)];

        let size = Node::call(
            Category::Number,
            "GroupSize",
            vec![Node::value(group.clone())],
        );
        assert_eq!(eval(&size, &rt, &engine), Value::Number(2.0));

        let contains = Node::call(
            Category::Bool,
            "GroupContains",
            vec![Node::value(group), Node::value(EntityId(2))],
        );
        assert_eq!(eval(&contains, &rt, &engine), Value::Bool(true));
    }
}
