//! The contract between a controller and the state it owns.

use std::any::Any;
use std::sync::Arc;

use crate::bifrost::BifrostParser;
use crate::error::HandlerError;

/// A role-specific response body.
///
/// Responses are reference-counted so a broadcast can hand the same body to
/// every attached client without copying the payload.
pub type StateResponse = Arc<dyn Any + Send + Sync>;

/// An ordered buffer of responses produced by one [`Controllable`] call.
///
/// Handlers run synchronously inside the controller's task, so they cannot
/// await channel sends themselves. They record emissions here instead; the
/// controller flushes the buffer, in order, after the call returns and
/// before it sends the terminating `Done`.
#[derive(Default)]
pub struct Emitter {
    emissions: Vec<Emission>,
}

pub(crate) enum Emission {
    /// Unicast to the requesting origin.
    Reply(StateResponse),
    /// Broadcast to every attached client.
    Broadcast(StateResponse),
}

impl Emitter {
    /// Creates an empty emitter. Controllers make one per handler call;
    /// role tests may too.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a unicast reply to the requesting origin.
    pub fn reply<T: Any + Send + Sync>(&mut self, body: T) {
        self.emissions.push(Emission::Reply(Arc::new(body)));
    }

    /// Records a broadcast to every attached client.
    pub fn broadcast<T: Any + Send + Sync>(&mut self, body: T) {
        self.emissions.push(Emission::Broadcast(Arc::new(body)));
    }

    pub(crate) fn drain(self) -> Vec<Emission> {
        self.emissions
    }

    /// The recorded emissions, in order, as (broadcast, body) pairs.
    ///
    /// Lets a role unit-test its handlers without standing up a whole
    /// controller.
    pub fn recorded(&self) -> impl Iterator<Item = (bool, &StateResponse)> {
        self.emissions.iter().map(|e| match e {
            Emission::Reply(body) => (false, body),
            Emission::Broadcast(body) => (true, body),
        })
    }
}

/// The contract a role implements to live inside a
/// [`Controller`](crate::Controller).
///
/// The controller owns the state outright; all three methods run inside
/// the controller's task, one request at a time, so implementations need no
/// internal synchronisation. `Send + Sync` is still required so the
/// controller's future can live on any runtime worker.
pub trait Controllable: Send + Sync + 'static {
    /// The identifier this role advertises (e.g. `"list"`).
    fn role_name(&self) -> &str;

    /// Enumerates the full observable state, emitting zero or more
    /// replies. Used to bring new clients up to date.
    fn dump(&self, out: &mut Emitter);

    /// Interprets a role-specific request body.
    ///
    /// Emit replies for responses paired with the requesting origin and
    /// broadcasts for state changes every client must see.
    ///
    /// # Errors
    ///
    /// A semantic failure; it travels to the requester in the `Done`
    /// terminator and never stops the controller.
    fn handle_request(
        &mut self,
        out: &mut Emitter,
        body: Box<dyn Any + Send>,
    ) -> Result<(), HandlerError>;

    /// The state's Bifrost parser, if it can speak Bifrost.
    ///
    /// A state without one cannot be served over the wire; clients asking
    /// for an adapter get *can't speak Bifrost* back.
    fn bifrost_parser(&self) -> Option<Arc<dyn BifrostParser>> {
        None
    }
}
