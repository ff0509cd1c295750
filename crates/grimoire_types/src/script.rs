//! Scripts: triggers, guards, and the nested action tree
//!
//! A script fires when one of its triggers matches a broadcast event (OR
//! across triggers), every guard resolves true (AND, early exit), and then
//! its action tree runs. Block-owning actions hold their children
//! directly; the depth-tagged flat form lives in [`crate::flat`].

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::{Category, Node, NodeKind, ScriptError};

// ─────────────────────────────────────────────────────────────────────────────
// Triggers
// ─────────────────────────────────────────────────────────────────────────────

/// What causes a script to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    /// A named broadcast event, with an optional requirement filter that
    /// must resolve equal to the broadcast's requirement value
    Event {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requirement: Option<Node>,
    },
    /// Fires repeatedly; the interval expression is re-resolved on every
    /// tick, so it may depend on game state
    Periodic { interval: Node },
    /// Fires exactly once after the delay elapses
    Once { delay: Node },
}

impl Trigger {
    /// Event name for event triggers, None for timed triggers
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Trigger::Event { event, .. } => Some(event),
            _ => None,
        }
    }

    /// Duration expression for timed triggers
    pub fn duration(&self) -> Option<&Node> {
        match self {
            Trigger::Periodic { interval } => Some(interval),
            Trigger::Once { delay } => Some(delay),
            Trigger::Event { .. } => None,
        }
    }

    /// Whether this is a repeating timed trigger
    pub fn is_periodic(&self) -> bool {
        matches!(self, Trigger::Periodic { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// What a single action does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    /// Suspend this run for a number of scaled-time units
    Wait { duration: Node },
    /// Run the body once if the condition resolves true
    If { cond: Node },
    /// Re-resolve the condition before every iteration; run while true
    While { cond: Node },
    /// Run the body `count` times, binding `var` to the 0-based index
    Repeat { count: Node, var: String },
    /// Run the body once per live element, binding `var` to the element
    ForEach { group: Node, var: String },
    /// Set the owning script's disabled flag and abandon this run
    DisableScript,
    /// Resolve an ordinary call node and discard its value
    Call(Node),
}

/// One statement in a script body
///
/// `body` is the nested block; it is only meaningful for block-owning
/// kinds (If/While/Repeat/ForEach and calls that declare one) and is
/// empty otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Action>,
}

impl Action {
    /// Create an action with no body
    pub fn leaf(kind: ActionKind) -> Self {
        Self {
            kind,
            body: Vec::new(),
        }
    }

    /// Create a block-owning action
    pub fn block(kind: ActionKind, body: Vec<Action>) -> Self {
        Self { kind, body }
    }

    /// Create a plain call action with no body
    pub fn call(node: Node) -> Self {
        Self::leaf(ActionKind::Call(node))
    }

    /// Expression nodes this action resolves directly
    pub fn nodes(&self) -> Vec<&Node> {
        match &self.kind {
            ActionKind::Wait { duration } => vec![duration],
            ActionKind::If { cond } | ActionKind::While { cond } => vec![cond],
            ActionKind::Repeat { count, .. } => vec![count],
            ActionKind::ForEach { group, .. } => vec![group],
            ActionKind::DisableScript => vec![],
            ActionKind::Call(node) => vec![node],
        }
    }

    fn validate(&self, index: usize) -> Result<(), ScriptError> {
        for node in self.nodes() {
            node.validate()?;
        }
        match &self.kind {
            ActionKind::Wait { duration } => {
                expect_category(duration, Category::Number, index)?;
            }
            ActionKind::If { cond } | ActionKind::While { cond } => {
                expect_category(cond, Category::Bool, index)?;
            }
            ActionKind::Repeat { count, .. } => {
                expect_category(count, Category::Number, index)?;
            }
            ActionKind::ForEach { group, .. } => {
                expect_category(group, Category::Group, index)?;
            }
            ActionKind::DisableScript | ActionKind::Call(_) => {}
        }
        for (child_index, child) in self.body.iter().enumerate() {
            child.validate(child_index)?;
        }
        Ok(())
    }
}

fn expect_category(node: &Node, expected: Category, index: usize) -> Result<(), ScriptError> {
    if node.category == expected {
        Ok(())
    } else {
        Err(ScriptError::CategoryMismatch {
            expected,
            found: node.category,
            path: index.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Script
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered bundle of triggers, guards, and actions
#[derive(Debug, Serialize, Deserialize)]
pub struct Script {
    /// Display name used in diagnostics
    pub name: String,
    /// Any matching trigger fires the script (logical OR)
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Bool-category nodes, implicit AND in declared order
    #[serde(default)]
    pub guards: Vec<Node>,
    /// Nested action tree executed on a successful match
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Sticky until cleared; a disabled script never matches
    #[serde(default, with = "atomic_flag")]
    pub disabled: AtomicBool,
}

impl Clone for Script {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            triggers: self.triggers.clone(),
            guards: self.guards.clone(),
            actions: self.actions.clone(),
            disabled: AtomicBool::new(self.is_disabled()),
        }
    }
}

impl Script {
    /// Create an empty named script
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triggers: Vec::new(),
            guards: Vec::new(),
            actions: Vec::new(),
            disabled: AtomicBool::new(false),
        }
    }

    /// Add a trigger
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Add a guard expression
    pub fn with_guard(mut self, guard: Node) -> Self {
        self.guards.push(guard);
        self
    }

    /// Set the action tree
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Whether the script is currently opted out of triggering
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Opt the script out of all future triggering
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::Relaxed);
    }

    /// Clear the disabled flag
    ///
    /// No interpreter action re-enables a script; this is an embedder
    /// affordance.
    pub fn enable(&self) {
        self.disabled.store(false, Ordering::Relaxed);
    }

    /// Validate every reachable node before the script is allowed to run
    ///
    /// Checks for `Unset` placeholders and for the fixed operand
    /// categories of control-flow actions and timed triggers.
    pub fn validate(&self) -> Result<(), ScriptError> {
        for trigger in &self.triggers {
            if let Trigger::Event {
                requirement: Some(node),
                ..
            } = trigger
            {
                node.validate()?;
            }
            if let Some(duration) = trigger.duration() {
                duration.validate()?;
                expect_category(duration, Category::Number, 0)?;
            }
        }
        for guard in &self.guards {
            guard.validate()?;
            expect_category(guard, Category::Bool, 0)?;
        }
        for (index, action) in self.actions.iter().enumerate() {
            action.validate(index)?;
        }
        Ok(())
    }

    /// Every host-function name called anywhere in the script, in
    /// first-seen order
    ///
    /// Lets a loader check a script against the host-function table up
    /// front instead of discovering unknown names mid-run.
    pub fn called_functions(&self) -> Vec<&str> {
        fn walk_node<'a>(node: &'a Node, out: &mut Vec<&'a str>) {
            if let NodeKind::Call { function, args } = &node.kind {
                if !out.contains(&function.as_str()) {
                    out.push(function);
                }
                for arg in args {
                    walk_node(arg, out);
                }
            }
        }
        fn walk_action<'a>(action: &'a Action, out: &mut Vec<&'a str>) {
            for node in action.nodes() {
                walk_node(node, out);
            }
            for child in &action.body {
                walk_action(child, out);
            }
        }

        let mut out = Vec::new();
        for trigger in &self.triggers {
            if let Trigger::Event {
                requirement: Some(node),
                ..
            } = trigger
            {
                walk_node(node, &mut out);
            }
            if let Some(duration) = trigger.duration() {
                walk_node(duration, &mut out);
            }
        }
        for guard in &self.guards {
            walk_node(guard, &mut out);
        }
        for action in &self.actions {
            walk_action(action, &mut out);
        }
        out
    }
}

mod atomic_flag {
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flag: &AtomicBool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(flag.load(Ordering::Relaxed))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AtomicBool, D::Error> {
        Ok(AtomicBool::new(bool::deserialize(d)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
