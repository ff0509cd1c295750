//! Depth-tagged flat action lists
//!
//! The editor and stored assets represent nested blocks as a flat array
//! where each entry carries an integer depth: an entry at depth *d* owns,
//! as its body, every immediately following entry with depth > *d*, up to
//! the first entry with depth ≤ *d* or the end of the list. In memory the
//! interpreter works on the explicit [`Action`] tree; this module is the
//! conversion at that boundary.

use serde::{Deserialize, Serialize};

use crate::{Action, ActionKind, ScriptError};

// ─────────────────────────────────────────────────────────────────────────────
// Flat Form
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the flat, depth-tagged action list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatAction {
    pub depth: u32,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Flatten an action tree into the depth-tagged list form
pub fn flatten(actions: &[Action]) -> Vec<FlatAction> {
    let mut out = Vec::new();
    flatten_into(actions, 0, &mut out);
    out
}

fn flatten_into(actions: &[Action], depth: u32, out: &mut Vec<FlatAction>) {
    for action in actions {
        out.push(FlatAction {
            depth,
            kind: action.kind.clone(),
        });
        flatten_into(&action.body, depth + 1, out);
    }
}

/// Rebuild the action tree from a depth-tagged list
///
/// Rejects lists that violate the ownership invariant: the first entry
/// must be at depth 0, and no entry may sit more than one level below
/// its predecessor.
pub fn nest(flat: &[FlatAction]) -> Result<Vec<Action>, ScriptError> {
    for (index, entry) in flat.iter().enumerate() {
        let limit = if index == 0 {
            0
        } else {
            flat[index - 1].depth + 1
        };
        if entry.depth > limit {
            return Err(ScriptError::BadDepth { index });
        }
    }
    let mut cursor = 0;
    Ok(nest_block(flat, &mut cursor, 0))
}

fn nest_block(flat: &[FlatAction], cursor: &mut usize, depth: u32) -> Vec<Action> {
    let mut block = Vec::new();
    while *cursor < flat.len() && flat[*cursor].depth >= depth {
        // Entries deeper than the current block belong to the previous
        // entry's body and were already consumed by the recursive call.
        debug_assert_eq!(flat[*cursor].depth, depth);
        let kind = flat[*cursor].kind.clone();
        *cursor += 1;
        let body = nest_block(flat, cursor, depth + 1);
        block.push(Action { kind, body });
    }
    block
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
