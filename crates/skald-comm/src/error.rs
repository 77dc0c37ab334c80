//! Substrate errors.
//!
//! Two kinds of error cross this crate's boundaries:
//!
//! - [`CommError`]: lifecycle and protocol failures raised by the substrate
//!   itself (a controller that has shut down, a word no parser knows).
//! - [`HandlerError`]: whatever a role's request handler returned. Roles
//!   keep their own error enums; the box lets any of them ride inside a
//!   `Done` response.

use thiserror::Error;

/// A role handler's error, carried in `Done` responses and rendered as
/// `ACK WHAT <message>` at the wire boundary.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the controller/client substrate.
#[derive(Debug, Error)]
pub enum CommError {
    /// The target controller stopped accepting requests.
    #[error("controller shut down")]
    ControllerShutDown,

    /// The controller's state does not implement a Bifrost parser.
    #[error("this controller's state can't speak Bifrost")]
    CannotSpeakBifrost,

    /// A Bifrost parser did not understand the command word.
    #[error("unknown word: {0}")]
    UnknownWord(String),

    /// A command word was given the wrong number of arguments.
    #[error("bad arity: {word} takes {want} argument(s), got {got}")]
    BadArity {
        word: String,
        want: usize,
        got: usize,
    },

    /// An `On` request named a mount point this controller doesn't have.
    #[error("no such mount point: {0}")]
    NoSuchMountPoint(String),

    /// A mounted controller refused a forwarded request.
    #[error("couldn't send to mount point: {0}")]
    MountSendFailed(String),

    /// The peer stopped reading; its connection is torn down.
    #[error("client has hung up")]
    HungUp,

    /// A reply protocol was violated by a second copy of a response that
    /// must arrive exactly once.
    #[error("duplicate {0} response")]
    DuplicateResponse(&'static str),

    /// A reply protocol was violated by a response that never arrived.
    #[error("missing {0} response")]
    MissingResponse(&'static str),

    /// The reply channel closed before the `Done` terminator arrived.
    #[error("reply channel closed before done")]
    ReplyChannelClosed,

    /// A response had no wire message equivalent.
    #[error("response with no message equivalent")]
    NoMessageEquivalent,

    /// A request failed with a role-level error.
    #[error("{0}")]
    Request(String),

    /// The wire peer sent something that doesn't frame as a message.
    #[error(transparent)]
    Proto(#[from] skald_proto::ProtoError),

    /// Byte-boundary I/O failure; tears down the affected connection only.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CommError {
    /// Recovers a `CommError` from a boxed handler error, falling back to
    /// wrapping the message when the box holds a role-level error.
    pub(crate) fn from_handler(err: HandlerError) -> Self {
        match err.downcast::<CommError>() {
            Ok(e) => *e,
            Err(e) => CommError::Request(e.to_string()),
        }
    }
}
