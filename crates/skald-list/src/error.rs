//! List role errors.
//!
//! All of these are *domain* errors: a semantically invalid operation on an
//! otherwise healthy list. They travel to the requester inside the `Done`
//! terminator and surface on the wire as `ACK WHAT`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// An inserted item's hash is already taken.
    #[error("duplicate hash {hash} at index {index}")]
    DuplicateHash { hash: String, index: usize },

    /// An insertion index was past the end of the list.
    #[error("tried to insert at index {index} when there are only {len} item(s)")]
    InsertOutOfBounds { index: usize, len: usize },

    /// A selection index named no item.
    #[error("Select: index {0} out of bounds")]
    SelectOutOfBounds(i64),

    /// A selection named an index whose item has a different hash; the
    /// selection raced a list change and loses.
    #[error("Select: hash mismatch: requested '{requested}', actual '{actual}'")]
    HashMismatch { requested: String, actual: String },

    /// A selection named an item that cannot be selected.
    #[error("Select: item not selectable")]
    NotSelectable,

    /// An autoselection mode string was not one of the known modes.
    #[error("invalid automode")]
    InvalidAutoMode,

    /// A request body reached the list role that it does not understand.
    #[error("unknown request")]
    UnknownRequest,
}
