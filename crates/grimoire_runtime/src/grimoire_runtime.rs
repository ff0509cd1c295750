//! Grimoire Runtime - Execution engine for ECA gameplay scripts
//!
//! This crate contains the host-function registry, the node resolver, the
//! action interpreter with cooperative `Wait` suspension, per-owner
//! engines with local variable scopes, the event dispatcher, and the
//! trigger timers. One external driver advances everything through
//! [`Dispatcher::tick`]; there is no hidden threading.

pub use grimoire_types;

mod builtins;
mod config;
mod dispatcher;
mod engine;
mod error;
mod host;
mod interp;
mod resolve;
mod timer;

pub use builtins::*;
pub use config::*;
pub use dispatcher::*;
pub use engine::*;
pub use error::*;
pub use host::*;
pub use interp::*;
pub use resolve::*;
pub use timer::*;
