//! Authoring-time script errors

use crate::Category;

/// Errors detected while validating or converting script data
///
/// All of these block a script from running; none of them can occur
/// mid-execution for a script that passed [`crate::Script::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("unset node at {path}: placeholder reached validation")]
    UnsetNode { path: String },

    #[error("bad depth at flat action {index}: entry violates block ownership")]
    BadDepth { index: usize },

    #[error("category mismatch at {path}: expected {expected:?}, found {found:?}")]
    CategoryMismatch {
        expected: Category,
        found: Category,
        path: String,
    },
}
