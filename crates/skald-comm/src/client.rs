//! Client handles onto a controller.
//!
//! A [`Client`] is a channel pair plus a done signal:
//!
//! ```text
//!            Tx: Request ──────────►
//!   Client                             Controller (owns the coclient)
//!            Rx: Response ◄──────────
//!            done ◄─────── cancelled on hang-up
//! ```
//!
//! The matching inward half lives inside the controller. Dropping the
//! client (and with it the request sender) is how a client announces it is
//! gone; the controller cancelling `done` and dropping the response sender
//! is how it announces the reverse.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bifrost::{Bifrost, BifrostClient, BifrostParser};
use crate::error::{CommError, HandlerError};
use crate::request::{Request, RequestBody};
use crate::response::{Response, ResponseBody};

/// Requests and responses in flight per client.
///
/// Kept small on purpose: channels are a hand-off, not a queue, and a slow
/// client is supposed to back-pressure the controller rather than buffer
/// unboundedly.
pub(crate) const CHANNEL_BUFFER: usize = 16;

/// An outward handle to a controller.
#[derive(Debug)]
pub struct Client {
    pub(crate) tx: mpsc::Sender<Request>,
    pub(crate) rx: mpsc::Receiver<Response>,
    pub(crate) done: CancellationToken,
}

/// The controller-facing half of a client pair.
pub(crate) struct Coclient {
    /// Response sender; dropping it closes the client's Rx.
    pub(crate) tx: mpsc::Sender<Response>,
    /// Request receiver; yields `None` once the client is gone.
    pub(crate) rx: mpsc::Receiver<Request>,
    /// Cancelled to tell transmitters the client has been hung up.
    pub(crate) done: CancellationToken,
}

impl Coclient {
    /// Does the disconnection part of a hang-up. The response channel
    /// closes when the coclient is dropped.
    pub(crate) fn close(&self) {
        self.done.cancel();
    }
}

/// Creates a new client and coclient pair.
pub(crate) fn pair() -> (Client, Coclient) {
    let (req_tx, req_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (res_tx, res_rx) = mpsc::channel(CHANNEL_BUFFER);
    let done = CancellationToken::new();

    let client = Client {
        tx: req_tx,
        rx: res_rx,
        done: done.clone(),
    };
    let coclient = Coclient {
        tx: res_tx,
        rx: req_rx,
        done,
    };
    (client, coclient)
}

impl Client {
    /// Tries to send a request.
    ///
    /// Returns `false`, without enqueueing, if the controller has hung this
    /// client up or `ct` was cancelled; the request was not delivered.
    pub async fn send(&self, ct: &CancellationToken, request: Request) -> bool {
        tokio::select! {
            _ = self.done.cancelled() => false,
            _ = ct.cancelled() => false,
            sent = self.tx.send(request) => sent.is_ok(),
        }
    }

    /// Receives the next response on this client's main channel: unicast
    /// replies made on its behalf and every broadcast.
    ///
    /// Returns `None` once the controller has hung this client up.
    pub async fn recv(&mut self) -> Option<Response> {
        self.rx.recv().await
    }

    /// Whether the controller has hung this client up.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Sends a request and feeds each of its replies through `cb` until the
    /// `Done` terminator.
    ///
    /// Returns whether the request was delivered at all, and the result the
    /// `Done` carried. An undelivered request yields `(false, Ok(()))`.
    pub async fn send_and_process_replies<F>(
        &self,
        ct: &CancellationToken,
        tag: &str,
        body: RequestBody,
        mut cb: F,
    ) -> (bool, Result<(), HandlerError>)
    where
        F: FnMut(ResponseBody),
    {
        let (reply_tx, mut reply_rx) = mpsc::channel(CHANNEL_BUFFER);
        if !self.send(ct, Request::new(body, tag, reply_tx)).await {
            return (false, Ok(()));
        }

        loop {
            match reply_rx.recv().await {
                Some(Response {
                    body: ResponseBody::Done(err),
                    ..
                }) => {
                    return (true, err.map_or(Ok(()), Err));
                }
                Some(response) => cb(response.body),
                None => {
                    return (true, Err(CommError::ReplyChannelClosed.into()));
                }
            }
        }
    }

    /// Copies this client, creating a new independent handle to the same
    /// controller.
    ///
    /// The copy is registered by the controller task itself, so it only
    /// succeeds while the controller is still processing requests. The
    /// original may be dropped afterwards; the copy keeps the controller
    /// alive on its own.
    ///
    /// # Errors
    ///
    /// [`CommError::ControllerShutDown`] if the controller is gone, or a
    /// protocol violation if the new-client response arrives twice or not
    /// at all.
    pub async fn copy(&self, ct: &CancellationToken) -> Result<Client, CommError> {
        let mut copied: Option<Client> = None;
        let mut duplicate = false;

        let (delivered, result) = self
            .send_and_process_replies(ct, "", RequestBody::NewClient, |body| {
                if let ResponseBody::NewClient(client) = body {
                    duplicate = duplicate || copied.is_some();
                    copied = Some(client);
                }
            })
            .await;

        if !delivered {
            return Err(CommError::ControllerShutDown);
        }
        result.map_err(CommError::from_handler)?;
        if duplicate {
            return Err(CommError::DuplicateResponse("new client"));
        }
        copied.ok_or(CommError::MissingResponse("new client"))
    }

    /// Asks this client's controller to shut down and waits for the
    /// acknowledgement.
    ///
    /// Shutdown is idempotent: once the controller is gone, further calls
    /// succeed without doing anything.
    ///
    /// # Errors
    ///
    /// A protocol violation if the reply channel closes before the `Done`.
    pub async fn shutdown(&self, ct: &CancellationToken) -> Result<(), CommError> {
        let (delivered, result) = self
            .send_and_process_replies(ct, "", RequestBody::Shutdown, |_| {})
            .await;
        if !delivered {
            // Already shut down; nothing to do.
            return Ok(());
        }
        result.map_err(CommError::from_handler)
    }

    /// Obtains a Bifrost adapter for this client's controller, consuming
    /// the client: the adapter takes over its response channel.
    ///
    /// # Errors
    ///
    /// [`CommError::CannotSpeakBifrost`] if the controller's state has no
    /// Bifrost parser, [`CommError::ControllerShutDown`] if the controller
    /// is gone.
    pub async fn bifrost(
        self,
        ct: &CancellationToken,
    ) -> Result<(Bifrost, BifrostClient), CommError> {
        let mut parser: Option<Arc<dyn BifrostParser>> = None;
        let mut duplicate = false;

        let (delivered, result) = self
            .send_and_process_replies(ct, "", RequestBody::BifrostParser, |body| {
                if let ResponseBody::BifrostParser(p) = body {
                    duplicate = duplicate || parser.is_some();
                    parser = Some(p);
                }
            })
            .await;

        if !delivered {
            return Err(CommError::ControllerShutDown);
        }
        result.map_err(CommError::from_handler)?;
        if duplicate {
            return Err(CommError::DuplicateResponse("parser"));
        }
        let parser = parser.ok_or(CommError::MissingResponse("parser"))?;

        debug!("wiring client into a Bifrost adapter");
        Ok(Bifrost::new(self, parser, ct.clone()))
    }
}
