//! Runtime evaluation errors
//!
//! All of these are scoped to the current run and never escape the tick
//! driver: the interpreter catches them at the boundary of the node or
//! action that raised them, logs, and either continues or abandons the
//! run depending on [`crate::RuntimeConfig::abort_on_error`].

/// Errors raised while resolving a node
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    /// An `Unset` placeholder survived to execution; validation at
    /// engine construction is supposed to make this unreachable
    #[error("unset node reached execution")]
    UnresolvedUnset,

    /// A host function reported an unexpected failure
    #[error("host function '{function}' failed: {message}")]
    Host { function: String, message: String },
}
