//! Grimoire Types - Core type definitions for the ECA scripting system
//!
//! This crate contains the pure data structures for scripts: runtime
//! values, expression nodes, triggers, guards, and the nested action
//! tree, plus the depth-tagged flat form used at the editor boundary.

mod error;
mod flat;
mod node;
mod script;
mod value;

pub use error::*;
pub use flat::*;
pub use node::*;
pub use script::*;
pub use value::*;
