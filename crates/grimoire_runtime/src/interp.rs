//! Action interpreter
//!
//! A script run is a depth-first walk over the nested action tree,
//! driven by an explicit frame stack so that `Wait` can suspend the walk
//! into a plain-data [`Continuation`] and the tick driver can resume it
//! later. Each top-level run owns its own stack: overlapping runs of the
//! same script progress independently.

use std::sync::Arc;

use grimoire_types::{Action, ActionKind, EntityId, Node, Script, Trigger, Value};

use crate::{
    resolve, resolve_bool, resolve_number, Bindings, Engine, EvalContext, EvalError,
    RuntimeHandle,
};

// ─────────────────────────────────────────────────────────────────────────────
// Run Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// How a script run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The action walk ran to completion (or never started: disabled
    /// script, no trigger match, guard failure)
    Completed,
    /// A `Wait` suspended the run; resume through the tick driver
    Suspended(Continuation),
    /// An action failed under abort-on-error and the rest of the run was
    /// discarded
    Aborted,
}

/// A suspended run: everything needed to pick the walk back up
#[derive(Debug)]
pub struct Continuation {
    script: Arc<Script>,
    bindings: Bindings,
    /// Scaled-time units left before the walk resumes
    pub(crate) remaining: f64,
    stack: Vec<Frame>,
}

impl Continuation {
    /// Scaled time left until resumption
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Name of the suspended script
    pub fn script_name(&self) -> &str {
        &self.script.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames
// ─────────────────────────────────────────────────────────────────────────────

/// Why a block is on the stack
///
/// Loop bookkeeping lives in the frame itself, so a `Wait` inside any
/// loop body resumes mid-iteration with nothing but this record.
#[derive(Debug, Clone)]
enum BlockKind {
    /// The script's top-level action list
    Root,
    /// Body of an If or of an ordinary call action
    Body,
    /// Body of a While; the condition is re-resolved before every pass
    WhileLoop { cond: Node },
    /// Body of a Repeat; `next` is the 0-based index of the next pass
    RepeatLoop { var: String, next: i64, count: i64 },
    /// Body of a ForEach; `next` indexes into the captured snapshot
    ForEachLoop {
        var: String,
        items: Vec<EntityId>,
        next: usize,
    },
}

#[derive(Debug, Clone)]
struct Frame {
    /// Next action to execute within this block
    pos: usize,
    /// Index of the action in the parent block that opened this frame,
    /// kept for diagnostics
    opened_at: usize,
    kind: BlockKind,
}

impl Frame {
    fn root() -> Self {
        Self {
            pos: 0,
            opened_at: 0,
            kind: BlockKind::Root,
        }
    }

    fn child(pos_in_parent: usize, kind: BlockKind) -> Self {
        Self {
            pos: 0,
            opened_at: pos_in_parent,
            kind,
        }
    }
}

/// The block the last frame walks, derived by descending from the root
/// through each parent frame's current action
fn block_slice<'s>(actions: &'s [Action], stack: &[Frame]) -> &'s [Action] {
    let mut block = actions;
    for frame in &stack[..stack.len() - 1] {
        block = &block[frame.pos].body;
    }
    block
}

// ─────────────────────────────────────────────────────────────────────────────
// Matching & Guards
// ─────────────────────────────────────────────────────────────────────────────

/// Run a script against a broadcast event
///
/// Disabled scripts are a no-op before any matching. Any event trigger
/// whose name equals `event` and whose requirement (if declared)
/// resolves equal to the supplied requirement fires the script; guards
/// then apply in declared order with early exit.
pub fn run_script(
    script: &Arc<Script>,
    engine: &Engine,
    rt: &RuntimeHandle,
    event: &str,
    requirement: Option<&Value>,
    bindings: &Bindings,
) -> RunOutcome {
    if script.is_disabled() {
        return RunOutcome::Completed;
    }
    if !trigger_matches(script, engine, rt, event, requirement, bindings) {
        return RunOutcome::Completed;
    }
    run_guarded(script, engine, rt, bindings)
}

/// Guard check followed by the action walk, skipping trigger matching
///
/// Timer firings and the dispatcher's reserved load/unload signals use
/// this entry directly.
pub fn run_guarded(
    script: &Arc<Script>,
    engine: &Engine,
    rt: &RuntimeHandle,
    bindings: &Bindings,
) -> RunOutcome {
    if script.is_disabled() {
        return RunOutcome::Completed;
    }
    let ctx = EvalContext {
        engine,
        bindings,
        rt,
    };
    for (index, guard) in script.guards.iter().enumerate() {
        match resolve_bool(guard, &ctx) {
            Ok(true) => {}
            Ok(false) => return RunOutcome::Completed,
            Err(err) => {
                tracing::error!(
                    engine = %engine.name,
                    script = %script.name,
                    phase = "guard",
                    index,
                    error = %err,
                    "guard failed to resolve, treating as false"
                );
                return RunOutcome::Completed;
            }
        }
    }
    execute(script, engine, rt, bindings, vec![Frame::root()])
}

/// Resume a suspended run whose wait has elapsed
pub fn resume(cont: Continuation, engine: &Engine, rt: &RuntimeHandle) -> RunOutcome {
    let Continuation {
        script,
        bindings,
        stack,
        ..
    } = cont;
    execute(&script, engine, rt, &bindings, stack)
}

fn trigger_matches(
    script: &Arc<Script>,
    engine: &Engine,
    rt: &RuntimeHandle,
    event: &str,
    requirement: Option<&Value>,
    bindings: &Bindings,
) -> bool {
    let ctx = EvalContext {
        engine,
        bindings,
        rt,
    };
    for (index, trigger) in script.triggers.iter().enumerate() {
        let Trigger::Event {
            event: name,
            requirement: filter,
        } = trigger
        else {
            continue;
        };
        if name != event {
            continue;
        }
        match filter {
            None => return true,
            Some(node) => match resolve(node, &ctx) {
                Ok(value) => {
                    if requirement == Some(&value) {
                        return true;
                    }
                }
                Err(err) => {
                    tracing::error!(
                        engine = %engine.name,
                        script = %script.name,
                        phase = "trigger",
                        index,
                        error = %err,
                        "requirement failed to resolve, trigger skipped"
                    );
                }
            },
        }
    }
    false
}

// ─────────────────────────────────────────────────────────────────────────────
// The Walk
// ─────────────────────────────────────────────────────────────────────────────

enum ErrorVerdict {
    Skip,
    Abort,
}

fn action_error(
    err: &EvalError,
    engine: &Engine,
    script: &Script,
    index: usize,
    rt: &RuntimeHandle,
) -> ErrorVerdict {
    tracing::error!(
        engine = %engine.name,
        script = %script.name,
        phase = "action",
        index,
        error = %err,
        "action failed"
    );
    if rt.config.abort_on_error {
        ErrorVerdict::Abort
    } else {
        ErrorVerdict::Skip
    }
}

fn execute(
    script: &Arc<Script>,
    engine: &Engine,
    rt: &RuntimeHandle,
    bindings: &Bindings,
    mut stack: Vec<Frame>,
) -> RunOutcome {
    let ctx = EvalContext {
        engine,
        bindings,
        rt,
    };

    loop {
        if stack.is_empty() {
            return RunOutcome::Completed;
        }
        let block = block_slice(&script.actions, &stack);
        let block_len = block.len();
        let pos = stack.last().map(|f| f.pos).unwrap_or(0);

        // End of the current block
        if pos >= block_len {
            let Some(frame) = stack.last_mut() else {
                return RunOutcome::Completed;
            };
            match &mut frame.kind {
                BlockKind::Root => return RunOutcome::Completed,
                BlockKind::Body => {
                    stack.pop();
                    advance_cursor(&mut stack);
                }
                BlockKind::WhileLoop { cond } => {
                    let cond = cond.clone();
                    let opened_at = frame.opened_at;
                    match resolve_bool(&cond, &ctx) {
                        Ok(true) => frame.pos = 0,
                        Ok(false) => {
                            stack.pop();
                            advance_cursor(&mut stack);
                        }
                        Err(err) => {
                            match action_error(&err, engine, script, opened_at, rt) {
                                ErrorVerdict::Abort => return RunOutcome::Aborted,
                                ErrorVerdict::Skip => {
                                    stack.pop();
                                    advance_cursor(&mut stack);
                                }
                            }
                        }
                    }
                }
                BlockKind::RepeatLoop { var, next, count } => {
                    if *next < *count {
                        engine.set_local(var.clone(), Value::Number(*next as f64));
                        *next += 1;
                        frame.pos = 0;
                    } else {
                        stack.pop();
                        advance_cursor(&mut stack);
                    }
                }
                BlockKind::ForEachLoop { var, items, next } => {
                    match next_live(items, *next, rt) {
                        Some(found) => {
                            engine.set_local(var.clone(), Value::Entity(items[found]));
                            *next = found + 1;
                            frame.pos = 0;
                        }
                        None => {
                            stack.pop();
                            advance_cursor(&mut stack);
                        }
                    }
                }
            }
            continue;
        }

        // Execute the action under the cursor
        let action = &block[pos];
        let has_body = !action.body.is_empty();
        match &action.kind {
            ActionKind::Wait { duration } => match resolve_number(duration, &ctx) {
                Ok(units) => {
                    // Resume with the next sibling at this depth.
                    advance_cursor(&mut stack);
                    return RunOutcome::Suspended(Continuation {
                        script: Arc::clone(script),
                        bindings: bindings.clone(),
                        remaining: units.max(0.0),
                        stack,
                    });
                }
                Err(err) => match action_error(&err, engine, script, pos, rt) {
                    ErrorVerdict::Abort => return RunOutcome::Aborted,
                    ErrorVerdict::Skip => advance_cursor(&mut stack),
                },
            },
            ActionKind::If { cond } => match resolve_bool(cond, &ctx) {
                Ok(true) if has_body => stack.push(Frame::child(pos, BlockKind::Body)),
                Ok(_) => advance_cursor(&mut stack),
                Err(err) => match action_error(&err, engine, script, pos, rt) {
                    ErrorVerdict::Abort => return RunOutcome::Aborted,
                    ErrorVerdict::Skip => advance_cursor(&mut stack),
                },
            },
            ActionKind::While { cond } => match resolve_bool(cond, &ctx) {
                Ok(true) => stack.push(Frame::child(
                    pos,
                    BlockKind::WhileLoop { cond: cond.clone() },
                )),
                Ok(false) => advance_cursor(&mut stack),
                Err(err) => match action_error(&err, engine, script, pos, rt) {
                    ErrorVerdict::Abort => return RunOutcome::Aborted,
                    ErrorVerdict::Skip => advance_cursor(&mut stack),
                },
            },
            ActionKind::Repeat { count, var } => match resolve_number(count, &ctx) {
                Ok(count) => {
                    let count = count.floor() as i64;
                    if count > 0 {
                        engine.set_local(var.clone(), Value::Number(0.0));
                        stack.push(Frame::child(
                            pos,
                            BlockKind::RepeatLoop {
                                var: var.clone(),
                                next: 1,
                                count,
                            },
                        ));
                    } else {
                        advance_cursor(&mut stack);
                    }
                }
                Err(err) => match action_error(&err, engine, script, pos, rt) {
                    ErrorVerdict::Abort => return RunOutcome::Aborted,
                    ErrorVerdict::Skip => advance_cursor(&mut stack),
                },
            },
            ActionKind::ForEach { group, var } => match resolve(group, &ctx) {
                Ok(value) => {
                    // Snapshot: mutating the collection mid-walk is
                    // unsupported.
                    let items = value.as_group().map(<[EntityId]>::to_vec).unwrap_or_else(|| {
                        tracing::warn!(
                            engine = %engine.name,
                            script = %script.name,
                            found = value.type_name(),
                            "ForEach collection is not a group, treating as empty"
                        );
                        Vec::new()
                    });
                    match next_live(&items, 0, rt) {
                        Some(found) => {
                            engine.set_local(var.clone(), Value::Entity(items[found]));
                            let next = found + 1;
                            stack.push(Frame::child(
                                pos,
                                BlockKind::ForEachLoop {
                                    var: var.clone(),
                                    items,
                                    next,
                                },
                            ));
                        }
                        None => advance_cursor(&mut stack),
                    }
                }
                Err(err) => match action_error(&err, engine, script, pos, rt) {
                    ErrorVerdict::Abort => return RunOutcome::Aborted,
                    ErrorVerdict::Skip => advance_cursor(&mut stack),
                },
            },
            ActionKind::DisableScript => {
                tracing::debug!(
                    engine = %engine.name,
                    script = %script.name,
                    "script disabled itself, abandoning the rest of this run"
                );
                script.disable();
                return RunOutcome::Completed;
            }
            ActionKind::Call(node) => match resolve(node, &ctx) {
                // Return value discarded; continue into the body if the
                // action declares one.
                Ok(_) if has_body => stack.push(Frame::child(pos, BlockKind::Body)),
                Ok(_) => advance_cursor(&mut stack),
                Err(err) => match action_error(&err, engine, script, pos, rt) {
                    ErrorVerdict::Abort => return RunOutcome::Aborted,
                    ErrorVerdict::Skip => advance_cursor(&mut stack),
                },
            },
        }
    }
}

/// Step the innermost frame past its current action
fn advance_cursor(stack: &mut [Frame]) {
    if let Some(frame) = stack.last_mut() {
        frame.pos += 1;
    }
}

/// First live element of a group snapshot at or after `from`
fn next_live(items: &[EntityId], from: usize, rt: &RuntimeHandle) -> Option<usize> {
    (from..items.len()).find(|&i| rt.registry.entity_alive(items[i]))
}
