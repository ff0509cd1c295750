//! Expression nodes
//!
//! A [`Node`] is the leaf building block of a script: a literal, an
//! unfilled placeholder, a context-bound preset, or a named call over
//! child nodes. The category of every node and of every call argument is
//! fixed at authoring time; [`Node::validate`] catches placeholders
//! before a script is allowed to run.

use serde::{Deserialize, Serialize};

use crate::{Category, ScriptError, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// What a node is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
    /// Literal value
    Value(Value),
    /// Placeholder left by the editor; invalid at execution time
    Unset,
    /// Named value resolved from event bindings or a dynamic provider
    Preset { name: String },
    /// Named host-function invocation over ordered child expressions
    Call { function: String, args: Vec<Node> },
}

/// A typed expression unit
///
/// `Clone` is a deep copy: child vectors are owned, so clones never alias
/// the source tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub category: Category,
    pub kind: NodeKind,
}

impl Node {
    /// Create a literal node
    pub fn value(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            category: value.category(),
            kind: NodeKind::Value(value),
        }
    }

    /// Create an unset placeholder of a known category
    pub fn unset(category: Category) -> Self {
        Self {
            category,
            kind: NodeKind::Unset,
        }
    }

    /// Create a preset reference
    pub fn preset(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            kind: NodeKind::Preset { name: name.into() },
        }
    }

    /// Create a call node
    pub fn call(category: Category, function: impl Into<String>, args: Vec<Node>) -> Self {
        Self {
            category,
            kind: NodeKind::Call {
                function: function.into(),
                args,
            },
        }
    }

    /// Replace both fields in place, keeping this node's allocation
    ///
    /// Supports editor "revert": a node slot can be restored from a saved
    /// copy without rebuilding the surrounding tree.
    pub fn overwrite(&mut self, source: &Node) {
        self.category = source.category;
        self.kind = source.kind.clone();
    }

    /// Child nodes of a call, empty for every other kind
    pub fn args(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Call { args, .. } => args,
            _ => &[],
        }
    }

    /// Check the tree for reachable `Unset` placeholders
    ///
    /// Paths in the error are slash-joined argument indices from this
    /// node ("2/0" = first argument of the third argument).
    pub fn validate(&self) -> Result<(), ScriptError> {
        self.validate_at(String::new())
    }

    fn validate_at(&self, path: String) -> Result<(), ScriptError> {
        match &self.kind {
            NodeKind::Unset => Err(ScriptError::UnsetNode { path }),
            NodeKind::Call { args, .. } => {
                for (index, arg) in args.iter().enumerate() {
                    let child = if path.is_empty() {
                        index.to_string()
                    } else {
                        format!("{}/{}", path, index)
                    };
                    arg.validate_at(child)?;
                }
                Ok(())
            }
            NodeKind::Value(_) | NodeKind::Preset { .. } => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_call() -> Node {
        Node::call(
            Category::Number,
            "Add",
            vec![
                Node::value(1.0),
                Node::call(
                    Category::Number,
                    "Multiply",
                    vec![Node::preset(Category::Number, "Amount"), Node::value(2.0)],
                ),
            ],
        )
    }

    #[test]
    fn test_deep_copy_is_structurally_equal() {
        let original = nested_call();
        let copy = original.clone();
        assert_eq!(copy, original);
    }

    #[test]
    fn test_deep_copy_does_not_alias() {
        let original = nested_call();
        let mut copy = original.clone();

        // Mutate a leaf two levels down in the copy
        if let NodeKind::Call { args, .. } = &mut copy.kind {
            if let NodeKind::Call { args: inner, .. } = &mut args[1].kind {
                inner[1] = Node::value(99.0);
            }
        }

        assert_ne!(copy, original);
        let NodeKind::Call { args, .. } = &original.kind else {
            panic!("expected call");
        };
        let NodeKind::Call { args: inner, .. } = &args[1].kind else {
            panic!("expected call");
        };
        assert_eq!(inner[1], Node::value(2.0));
    }

    #[test]
    fn test_overwrite_replaces_in_place() {
        let mut slot = Node::unset(Category::Bool);
        let saved = Node::value(true);
        slot.overwrite(&saved);
        assert_eq!(slot, saved);
        assert!(slot.validate().is_ok());
    }

    #[test]
    fn test_validate_finds_nested_unset() {
        let node = Node::call(
            Category::Number,
            "Add",
            vec![
                Node::value(1.0),
                Node::call(
                    Category::Number,
                    "Multiply",
                    vec![Node::unset(Category::Number), Node::value(2.0)],
                ),
            ],
        );
        match node.validate() {
            Err(ScriptError::UnsetNode { path }) => assert_eq!(path, "1/0"),
            other => panic!("expected UnsetNode, got {:?}", other),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let node = nested_call();
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
