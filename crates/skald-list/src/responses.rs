//! Responses a list controller can send, beyond the standard ones.
//!
//! When adding a response, remember to add:
//! - emission logic in `role.rs`;
//! - an emitter to wire messages in `bifrost.rs`.

use crate::{AutoMode, Item};

/// The hash reported for the unselected state.
pub const UNDEFINED_HASH: &str = "(undefined)";

/// Announces the autoselection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoModeResponse {
    pub mode: AutoMode,
}

/// Announces the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectResponse {
    /// The selected index, or `-1` for no selection.
    pub index: i64,
    /// The selected item's hash, or [`UNDEFINED_HASH`].
    pub hash: String,
}

impl SelectResponse {
    /// Builds the response for a given selection state.
    #[must_use]
    pub fn of(selection: Option<(usize, &Item)>) -> Self {
        match selection {
            Some((index, item)) => Self {
                index: index as i64,
                hash: item.hash().to_owned(),
            },
            None => Self {
                index: -1,
                hash: UNDEFINED_HASH.to_owned(),
            },
        }
    }
}

/// Announces a snapshot of the entire list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeResponse(pub Vec<Item>);

/// Announces the presence of a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResponse {
    pub index: usize,
    pub item: Item,
}
