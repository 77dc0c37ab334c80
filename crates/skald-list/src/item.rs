//! List items.

/// What kind of thing an [`Item`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A playable track. Tracks can be selected.
    Track,
    /// A textual entry (a jingle note, a link, a comment). Text cannot be
    /// selected.
    Text,
}

/// One entry in a list.
///
/// The hash is supplied by whoever inserts the item and must be unique
/// within its list; it exists so a selection can name the item it *meant*,
/// and lose gracefully if the list changed underneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    hash: String,
    payload: String,
    kind: ItemKind,
}

impl Item {
    /// Creates a track item; the payload is the track's path.
    #[must_use]
    pub fn track(hash: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            payload: path.into(),
            kind: ItemKind::Track,
        }
    }

    /// Creates a text item; the payload is the text itself.
    #[must_use]
    pub fn text(hash: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            payload: contents.into(),
            kind: ItemKind::Text,
        }
    }

    /// The inserter-supplied unique hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The data component: a path for tracks, contents for text.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Whether this item may hold the selection.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.kind == ItemKind::Track
    }
}
