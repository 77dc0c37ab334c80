//! Requests and the bodies every controller understands.

use std::any::Any;
use std::fmt;

use tokio::sync::mpsc;

use crate::Response;

/// Where a request came from: the correlation tag the requester chose, and
/// the channel its unicast replies go down.
///
/// The reply channel is distinct from the client's main response channel;
/// it carries only responses paired with this specific request, terminated
/// by exactly one `Done`.
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    /// Correlation tag, if any. Broadcast-tagged origins are used during
    /// the Bifrost handshake so dump output lands on the broadcast tag.
    pub tag: String,

    /// Channel for unicast responses to this request.
    pub reply_tx: mpsc::Sender<Response>,
}

/// A request to a controller.
#[derive(Debug)]
pub struct Request {
    /// Who is asking, and where replies go.
    pub origin: RequestOrigin,

    /// What is being asked.
    pub body: RequestBody,
}

impl Request {
    /// Creates a request with the given body, tag, and reply channel.
    #[must_use]
    pub fn new(
        body: RequestBody,
        tag: impl Into<String>,
        reply_tx: mpsc::Sender<Response>,
    ) -> Self {
        Self {
            origin: RequestOrigin {
                tag: tag.into(),
                reply_tx,
            },
            body,
        }
    }
}

/// The body of a request.
///
/// The standard bodies are handled by the controller itself; a
/// [`State`](RequestBody::State) body is forwarded to the controller's
/// [`Controllable`](crate::Controllable), which discriminates it by
/// downcast.
pub enum RequestBody {
    /// Ask the controller for its role name; replied with a role response.
    Role,

    /// Ask for a full dump of the observable state, unicast to the origin.
    Dump,

    /// Ask the controller to attach a new client and reply with its handle.
    NewClient,

    /// Ask the controller to stop after the current iteration.
    Shutdown,

    /// Ask for the state's Bifrost parser, if it has one.
    BifrostParser,

    /// Forward an inner request to the mounted controller at `mount_point`.
    On {
        mount_point: String,
        request: Box<Request>,
    },

    /// A role-specific request, discriminated by the role itself.
    State(Box<dyn Any + Send>),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "Role"),
            Self::Dump => write!(f, "Dump"),
            Self::NewClient => write!(f, "NewClient"),
            Self::Shutdown => write!(f, "Shutdown"),
            Self::BifrostParser => write!(f, "BifrostParser"),
            Self::On { mount_point, .. } => {
                f.debug_struct("On").field("mount_point", mount_point).finish_non_exhaustive()
            }
            Self::State(_) => write!(f, "State(..)"),
        }
    }
}
