//! Responses and the bodies every controller can send.

use std::fmt;
use std::sync::Arc;

use crate::bifrost::BifrostParser;
use crate::controllable::StateResponse;
use crate::error::HandlerError;
use crate::request::RequestOrigin;
use crate::Client;

/// A response from a controller.
///
/// Broadcast responses carry no origin and reach every attached client;
/// unicast responses carry the origin of the request they answer and are
/// delivered only on that request's reply channel.
#[derive(Debug)]
pub struct Response {
    /// Whether this response was broadcast to every client.
    pub broadcast: bool,

    /// The originating request, for unicast responses.
    pub origin: Option<RequestOrigin>,

    /// The body of the response.
    pub body: ResponseBody,
}

/// The body of a response.
pub enum ResponseBody {
    /// The request has finished processing, successfully or not. Exactly
    /// one `Done` arrives per request, after all of its other replies and
    /// broadcasts.
    Done(Option<HandlerError>),

    /// The controller's role name.
    Role(String),

    /// A freshly attached client handle, answering a new-client request.
    ///
    /// Clients can only be constructed inside the controller task, where
    /// attachment and construction are a single atomic step; the handle is
    /// therefore transferred to its owner through this response.
    NewClient(Client),

    /// The state's Bifrost parser, answering a parser request.
    BifrostParser(Arc<dyn BifrostParser>),

    /// A role-specific response, discriminated by the role's parser.
    State(StateResponse),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(err) => f.debug_tuple("Done").field(err).finish(),
            Self::Role(role) => f.debug_tuple("Role").field(role).finish(),
            Self::NewClient(_) => write!(f, "NewClient(..)"),
            Self::BifrostParser(_) => write!(f, "BifrostParser(..)"),
            Self::State(_) => write!(f, "State(..)"),
        }
    }
}
