//! The Bifrost adapter: typed requests/responses ↔ wire messages.
//!
//! One adapter serves one [`Client`]. Inbound wire messages are parsed into
//! typed requests and sent through the client; controller responses coming
//! back are rendered into wire messages and pushed out.
//!
//! ```text
//!             tx: Message ──►  ┌─────────────┐ ──► Client.send ──► Controller
//!   IoClient                   │   Bifrost   │
//!             rx: Message ◄──  └─────────────┘ ◄── Client.rx / reply channel
//! ```
//!
//! On startup the adapter runs the handshake: `OHAI`, the role's `IAMA`,
//! and a full state dump, all on the broadcast tag, before entering its
//! main loop.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use skald_proto::{Message, TAG_BCAST, WORD_ACK, WORD_IAMA, WORD_OHAI};

use crate::client::{Client, CHANNEL_BUFFER};
use crate::error::{CommError, HandlerError};
use crate::request::{Request, RequestBody};
use crate::response::{Response, ResponseBody};

/// The Bifrost semantic protocol version.
pub const PROTOCOL_VERSION: &str = "bifrost-0.0.0";

/// The semantic server version, fixed at build time.
pub const SERVER_VERSION: &str = concat!("skaldd-", env!("CARGO_PKG_VERSION"));

/// Role-specific parsing and emitting for one kind of
/// [`Controllable`](crate::Controllable).
///
/// A controller whose state supplies one of these can be served over
/// Bifrost; the adapter delegates every non-standard word and every
/// role-specific response body to it. Implementations are pure
/// translators: they see words and bodies, never the live state.
pub trait BifrostParser: Send + Sync {
    /// Parses a role-specific request word into a request body.
    ///
    /// # Errors
    ///
    /// *unknown word* for words the role doesn't know; *bad arity* or any
    /// argument parse failure otherwise. Parse errors are returned to the
    /// requesting client as `ACK WHAT`, never anywhere else.
    fn parse_request(
        &self,
        word: &str,
        args: &[String],
    ) -> Result<Box<dyn Any + Send>, HandlerError>;

    /// Renders a role-specific response body into wire messages for `tag`,
    /// appending to `out`.
    ///
    /// # Errors
    ///
    /// *no message equivalent* if the body is not one the role emits.
    fn emit_response(
        &self,
        tag: &str,
        body: &(dyn Any + Send + Sync),
        out: &mut Vec<Message>,
    ) -> Result<(), HandlerError>;
}

/// The outward handle onto a [`Bifrost`] adapter.
#[derive(Debug)]
pub struct BifrostClient {
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
    done: CancellationToken,
}

impl BifrostClient {
    /// Tries to send a request message to the adapter.
    ///
    /// Returns `false` if the adapter's upstream has shut down.
    pub async fn send(&self, message: Message) -> bool {
        tokio::select! {
            _ = self.done.cancelled() => false,
            sent = self.tx.send(message) => sent.is_ok(),
        }
    }

    /// Receives the next response message; `None` once the adapter exits.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// The adapter's done signal, cancelled when it exits.
    #[must_use]
    pub fn done(&self) -> &CancellationToken {
        &self.done
    }

    pub(crate) fn into_parts(
        self,
    ) -> (mpsc::Sender<Message>, mpsc::Receiver<Message>, CancellationToken) {
        (self.tx, self.rx, self.done)
    }
}

/// An adapter between one client and the Bifrost wire protocol.
pub struct Bifrost {
    /// The inward client this adapter is speaking for.
    client: Client,

    /// Outward channel for response messages.
    res_tx: mpsc::Sender<Message>,

    /// Outward channel for request messages.
    req_rx: mpsc::Receiver<Message>,

    /// Cancelled when this adapter exits.
    done: CancellationToken,

    /// Role-specific parser and emitter.
    parser: Arc<dyn BifrostParser>,

    /// Reply channel given to requests the adapter forwards on behalf of
    /// the wire peer.
    reply_tx: mpsc::Sender<Response>,
    reply_rx: mpsc::Receiver<Response>,

    /// Ambient cancellation; observed by every send towards the client.
    ct: CancellationToken,
}

impl std::fmt::Debug for Bifrost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bifrost")
            .field("client", &self.client)
            .field("res_tx", &self.res_tx)
            .field("req_rx", &self.req_rx)
            .field("done", &self.done)
            .field("parser", &"..")
            .field("reply_tx", &self.reply_tx)
            .field("reply_rx", &self.reply_rx)
            .field("ct", &self.ct)
            .finish()
    }
}

impl Bifrost {
    /// Wraps `client` in a Bifrost adapter with parsing and emitting done
    /// by `parser`. Returns the adapter and the outward handle for talking
    /// to it.
    #[must_use]
    pub fn new(
        client: Client,
        parser: Arc<dyn BifrostParser>,
        ct: CancellationToken,
    ) -> (Self, BifrostClient) {
        let (res_tx, res_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (req_tx, req_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (reply_tx, reply_rx) = mpsc::channel(CHANNEL_BUFFER);
        let done = CancellationToken::new();

        let adapter = Self {
            client,
            res_tx,
            req_rx,
            done: done.clone(),
            parser,
            reply_tx,
            reply_rx,
            ct,
        };
        let handle = BifrostClient {
            tx: req_tx,
            rx: res_rx,
            done,
        };
        (adapter, handle)
    }

    /// Runs the adapter until its wire peer or its controller goes away.
    ///
    /// The outward response channel closes and the done signal fires on
    /// exit; the client's own channels are left to the controller, which
    /// may have other clients.
    pub async fn run(mut self) {
        if self.handshake().await {
            self.main_loop().await;
        }
        self.done.cancel();
        debug!("bifrost adapter stopped");
    }

    /// Sends the new-connection messages: `OHAI`, `IAMA`, and a full dump,
    /// all broadcast-tagged.
    ///
    /// Returns `false` if the peer or the controller went away mid-way.
    async fn handshake(&mut self) -> bool {
        let ohai = Message::new(TAG_BCAST, WORD_OHAI)
            .arg(PROTOCOL_VERSION)
            .arg(SERVER_VERSION);
        if self.res_tx.send(ohai).await.is_err() {
            return false;
        }

        // The role announcement and dump go through a dedicated reply
        // channel so their Done terminators can be swallowed rather than
        // ACKed at the peer.
        let (tx, mut rx) = mpsc::channel(CHANNEL_BUFFER);
        for body in [RequestBody::Role, RequestBody::Dump] {
            let request = Request::new(body, TAG_BCAST, tx.clone());
            if !self.client.send(&self.ct, request).await {
                return false;
            }
            if !self.forward_until_done(&mut rx).await {
                return false;
            }
        }
        true
    }

    /// Forwards responses from `rx` until the `Done` terminator, which is
    /// suppressed. Returns `false` if the channel closed first.
    async fn forward_until_done(&mut self, rx: &mut mpsc::Receiver<Response>) -> bool {
        while let Some(response) = rx.recv().await {
            if matches!(response.body, ResponseBody::Done(_)) {
                return true;
            }
            self.handle_response(response).await;
        }
        false
    }

    async fn main_loop(&mut self) {
        loop {
            tokio::select! {
                // Broadcasts a request caused must hit the wire before that
                // request's ACK, and replies before requests; hence the
                // fixed polling order.
                biased;

                response = self.client.rx.recv() => match response {
                    Some(response) => self.handle_response(response).await,
                    // The controller hung us up.
                    None => return,
                },

                response = self.reply_rx.recv() => {
                    if let Some(response) = response {
                        self.handle_response(response).await;
                    }
                    // The adapter holds its own reply_tx, so this channel
                    // can't close while it runs.
                },

                request = self.req_rx.recv() => match request {
                    Some(message) => {
                        if !self.handle_request(message).await {
                            return;
                        }
                    }
                    // The wire peer disconnected.
                    None => return,
                },
            }
        }
    }

    /// Handles one inbound wire message. Returns whether the client is
    /// still accepting requests.
    async fn handle_request(&mut self, message: Message) -> bool {
        match self.parse_request(&message) {
            Ok(request) => self.client.send(&self.ct, request).await,
            Err(err) => {
                self.respond(error_message(message.tag(), &err)).await;
                true
            }
        }
    }

    /// Parses a wire message into a typed request bound to this adapter's
    /// reply channel.
    fn parse_request(&self, message: &Message) -> Result<Request, HandlerError> {
        let body = self.parse_body(message)?;
        Ok(Request::new(body, message.tag(), self.reply_tx.clone()))
    }

    /// Parses a message into a request body: standard words first, the
    /// role's parser for everything else.
    fn parse_body(&self, message: &Message) -> Result<RequestBody, HandlerError> {
        match message.word() {
            "dump" => {
                if !message.args().is_empty() {
                    return Err(CommError::BadArity {
                        word: "dump".into(),
                        want: 0,
                        got: message.args().len(),
                    }
                    .into());
                }
                Ok(RequestBody::Dump)
            }
            word => {
                let body = self.parser.parse_request(word, message.args())?;
                Ok(RequestBody::State(body))
            }
        }
    }

    /// Renders one controller response onto the wire.
    async fn handle_response(&mut self, response: Response) {
        let tag = bifrost_tag_of(&response).to_owned();

        let result = match &response.body {
            ResponseBody::Done(None) => {
                self.respond(
                    Message::new(&tag, WORD_ACK).arg("OK").arg("success"),
                )
                .await;
                Ok(())
            }
            ResponseBody::Done(Some(err)) => Err(err.to_string()),
            ResponseBody::Role(role) => {
                self.respond(Message::new(&tag, WORD_IAMA).arg(role.clone())).await;
                Ok(())
            }
            ResponseBody::State(body) => {
                let mut messages = Vec::new();
                match self.parser.emit_response(&tag, body.as_ref(), &mut messages) {
                    Ok(()) => {
                        for m in messages {
                            self.respond(m).await;
                        }
                        Ok(())
                    }
                    Err(err) => Err(err.to_string()),
                }
            }
            // Handles and parsers have no wire form; they only ever answer
            // requests the adapter doesn't make.
            ResponseBody::NewClient(_) | ResponseBody::BifrostParser(_) => {
                Err(CommError::NoMessageEquivalent.to_string())
            }
        };

        if let Err(text) = result {
            self.respond(
                Message::new(&tag, WORD_ACK).arg("WHAT").arg(text),
            )
            .await;
        }
    }

    async fn respond(&self, message: Message) {
        if self.res_tx.send(message).await.is_err() {
            debug!("response dropped: wire peer went away");
        }
    }
}

/// The wire tag of a response: the broadcast tag for broadcasts, else the
/// originating request's tag.
fn bifrost_tag_of(response: &Response) -> &str {
    if response.broadcast {
        return TAG_BCAST;
    }
    match &response.origin {
        Some(origin) => &origin.tag,
        // A non-broadcast response always names its origin; anything else
        // is a controller bug.
        None => panic!("non-broadcast response with no origin"),
    }
}

/// Renders an error as the `ACK WHAT` message for tag `tag`.
fn error_message(tag: &str, err: &HandlerError) -> Message {
    Message::new(tag, WORD_ACK).arg("WHAT").arg(err.to_string())
}
