//! Requests a list controller understands, beyond the standard ones.
//!
//! When adding a request, remember to add:
//! - dispatch logic in `role.rs`;
//! - a parser from wire messages in `bifrost.rs`.

use crate::{AutoMode, Item};

/// Requests an autoselection mode change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAutoMode {
    pub mode: AutoMode,
}

/// Requests a selection change.
///
/// The index is as parsed off the wire: negative values are possible and
/// rejected as out of bounds, not clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSelect {
    pub index: i64,
    /// The hash of the item the requester believes lives at `index`.
    /// It exists to prevent selection races.
    pub hash: String,
}

/// Requests an item insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItem {
    pub index: usize,
    pub item: Item,
}

/// Requests a selection advance per the current autoselection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextTrack;
