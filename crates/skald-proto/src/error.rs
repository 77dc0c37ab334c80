//! Wire protocol errors.

use thiserror::Error;

/// Error raised while turning words into [`Message`](crate::Message)s.
///
/// Protocol errors are never fatal to the peer: callers translate them into
/// `ACK WHAT` responses or log-and-disconnect, depending on the layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// A line had fewer than the two words (tag, command word) every
    /// message needs.
    #[error("insufficient words: got {0}, need at least 2")]
    ShortLine(usize),

    /// An argument index was requested past the end of a message.
    #[error("wanted argument {index}, only {len} argument(s)")]
    NoSuchArg { index: usize, len: usize },
}
