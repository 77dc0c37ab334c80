//! The controller actor.
//!
//! A [`Controller`] is the single-task owner of one
//! [`Controllable`](crate::Controllable). Every mutation of the state goes
//! through its request loop, one request to completion at a time, so the
//! state itself needs no locks; the actor boundary is the only
//! synchronisation primitive in the core.
//!
//! # Main loop
//!
//! Each iteration waits on the ingress channel of every attached client at
//! once. Three things can happen:
//!
//! 1. A request arrives on some client's ingress: dispatch it.
//! 2. A client's ingress closes: hang that client up.
//! 3. The stop flag was set during a dispatch: exit after this iteration.
//!
//! The wait set is implicitly rebuilt when a client is added or removed;
//! that is O(n) in the client count, and fine, because client churn is
//! rare next to request traffic.

use std::any::Any;
use std::collections::HashMap;

use futures::future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{self, Client, Coclient};
use crate::controllable::{Controllable, Emission, Emitter, StateResponse};
use crate::error::{CommError, HandlerError};
use crate::request::{Request, RequestBody, RequestOrigin};
use crate::response::{Response, ResponseBody};

/// A named inner controller reachable via `On` forwarding.
struct MountHandle {
    tx: mpsc::Sender<Request>,
    done: CancellationToken,
}

impl MountHandle {
    async fn send(&self, request: Request) -> bool {
        tokio::select! {
            _ = self.done.cancelled() => false,
            sent = self.tx.send(request) => sent.is_ok(),
        }
    }
}

/// The actor serialising requests against one [`Controllable`].
pub struct Controller<S: Controllable> {
    /// The state this controller owns. Nothing outside the controller task
    /// can touch it.
    state: S,

    /// The inward halves of every attached client.
    clients: Vec<Coclient>,

    /// Mounted inner controllers, by mount-point name.
    mounts: HashMap<String, MountHandle>,

    /// Cleared to make the main loop exit after the current iteration.
    running: bool,
}

impl<S: Controllable> Controller<S> {
    /// Creates a controller for `state`, returning it together with its
    /// first client.
    #[must_use]
    pub fn new(state: S) -> (Self, Client) {
        let mut controller = Self {
            state,
            clients: Vec::new(),
            mounts: HashMap::new(),
            running: false,
        };
        let client = controller.make_and_add_client();
        (controller, client)
    }

    /// Mounts `client` under `name`, making it reachable through `On`
    /// requests.
    ///
    /// The mounted client's response channel is drained by a background
    /// task: broadcasts from the inner controller are not forwarded, and
    /// leaving them unread would eventually block the inner controller's
    /// broadcast path.
    pub fn add_mount(&mut self, name: impl Into<String>, client: Client) {
        let Client { tx, mut rx, done } = client;
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        self.mounts.insert(name.into(), MountHandle { tx, done });
    }

    fn make_and_add_client(&mut self) -> Client {
        let (client, coclient) = client::pair();
        self.clients.push(coclient);
        client
    }

    /// Runs the controller's event loop until shutdown.
    ///
    /// Returns once a shutdown request was processed or every attached
    /// client has disconnected; either way, all remaining clients are hung
    /// up first.
    pub async fn run(mut self) {
        debug!(role = self.state.role_name(), "controller starting");
        self.running = true;
        while self.running {
            match self.next_ingress().await {
                (Some(request), _) => self.handle_request(request).await,
                (None, index) => self.hang_up_client(index),
            }
        }
        self.hang_up_clients();
        debug!(role = self.state.role_name(), "controller stopped");
    }

    /// Waits for the next event across every client's ingress channel.
    ///
    /// Returns the request and the index of the client it arrived on, or
    /// `None` and the index of a client whose ingress has closed.
    ///
    /// `recv` on an mpsc receiver is cancel-safe, so the futures that lose
    /// the race can be dropped without losing anyone's request.
    async fn next_ingress(&mut self) -> (Option<Request>, usize) {
        let ingress = self
            .clients
            .iter_mut()
            .enumerate()
            .map(|(index, coclient)| {
                Box::pin(async move { (index, coclient.rx.recv().await) })
            });
        let ((index, request), _, _) = future::select_all(ingress).await;
        (request, index)
    }

    /// Dispatches one request and sends its `Done` terminator.
    async fn handle_request(&mut self, request: Request) {
        let origin = request.origin;
        let result = match request.body {
            RequestBody::Role => self.handle_role(&origin).await,
            RequestBody::Dump => self.handle_dump(&origin).await,
            RequestBody::NewClient => self.handle_new_client(&origin).await,
            RequestBody::Shutdown => {
                // The shutdown itself happens when the loop comes round.
                self.running = false;
                Ok(())
            }
            RequestBody::BifrostParser => self.handle_bifrost_parser(&origin).await,
            RequestBody::On {
                mount_point,
                request,
            } => self.handle_on(&mount_point, *request).await,
            RequestBody::State(body) => self.handle_state_request(&origin, body).await,
        };

        self.reply(&origin, ResponseBody::Done(result.err())).await;
    }

    async fn handle_role(&mut self, origin: &RequestOrigin) -> Result<(), HandlerError> {
        let role = self.state.role_name().to_owned();
        self.reply(origin, ResponseBody::Role(role)).await;
        Ok(())
    }

    async fn handle_dump(&mut self, origin: &RequestOrigin) -> Result<(), HandlerError> {
        let mut out = Emitter::new();
        self.state.dump(&mut out);
        self.flush(origin, out).await;
        // Dumps never fail.
        Ok(())
    }

    async fn handle_new_client(&mut self, origin: &RequestOrigin) -> Result<(), HandlerError> {
        let client = self.make_and_add_client();
        self.reply(origin, ResponseBody::NewClient(client)).await;
        Ok(())
    }

    async fn handle_bifrost_parser(
        &mut self,
        origin: &RequestOrigin,
    ) -> Result<(), HandlerError> {
        match self.state.bifrost_parser() {
            Some(parser) => {
                self.reply(origin, ResponseBody::BifrostParser(parser)).await;
                Ok(())
            }
            None => Err(CommError::CannotSpeakBifrost.into()),
        }
    }

    async fn handle_on(
        &mut self,
        mount_point: &str,
        request: Request,
    ) -> Result<(), HandlerError> {
        let mount = self
            .mounts
            .get(mount_point)
            .ok_or_else(|| CommError::NoSuchMountPoint(mount_point.to_owned()))?;
        if !mount.send(request).await {
            return Err(CommError::MountSendFailed(mount_point.to_owned()).into());
        }
        Ok(())
    }

    async fn handle_state_request(
        &mut self,
        origin: &RequestOrigin,
        body: Box<dyn Any + Send>,
    ) -> Result<(), HandlerError> {
        let mut out = Emitter::new();
        let result = self.state.handle_request(&mut out, body);
        self.flush(origin, out).await;
        result
    }

    /// Flushes a handler's buffered emissions, in emission order.
    async fn flush(&mut self, origin: &RequestOrigin, out: Emitter) {
        for emission in out.drain() {
            match emission {
                Emission::Reply(body) => {
                    self.reply(origin, ResponseBody::State(body)).await;
                }
                Emission::Broadcast(body) => self.broadcast(body).await,
            }
        }
    }

    /// Sends a unicast response to a request's origin.
    ///
    /// A requester that stopped reading its own reply channel forfeits the
    /// response; that is its problem, not the controller's.
    async fn reply(&self, origin: &RequestOrigin, body: ResponseBody) {
        let response = Response {
            broadcast: false,
            origin: Some(origin.clone()),
            body,
        };
        if origin.reply_tx.send(response).await.is_err() {
            debug!(tag = %origin.tag, "reply dropped: requester went away");
        }
    }

    /// Sends a broadcast response to every attached client, in turn.
    ///
    /// Sends block: a slow client back-pressures the controller, and
    /// through it every other client. Accepted trade-off; there is no
    /// hidden buffering in the core.
    async fn broadcast(&self, body: StateResponse) {
        for coclient in &self.clients {
            let response = Response {
                broadcast: true,
                origin: None,
                body: ResponseBody::State(body.clone()),
            };
            if coclient.tx.send(response).await.is_err() {
                // The client's ingress closure will hang it up shortly.
                warn!("broadcast dropped: client stopped reading");
            }
        }
    }

    /// Hangs up the client at `index`: tells it the controller is done
    /// with it, forgets it, and stops the controller if it was the last.
    fn hang_up_client(&mut self, index: usize) {
        let coclient = self.clients.remove(index);
        coclient.close();
        drop(coclient);

        // A controller with no clients can never receive another request.
        if self.clients.is_empty() {
            self.running = false;
        }
    }

    /// Hangs up every attached client.
    fn hang_up_clients(&mut self) {
        for coclient in self.clients.drain(..) {
            coclient.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::controllable::Emitter;

    const TICK: Duration = Duration::from_secs(5);

    /// A request the test state knows; replied or broadcast per the flag.
    struct Ping {
        broadcast: bool,
    }

    /// The test state's lone response body.
    #[derive(Debug, PartialEq)]
    struct Pong;

    struct TestState;

    impl Controllable for TestState {
        fn role_name(&self) -> &str {
            "test"
        }

        fn dump(&self, out: &mut Emitter) {
            out.reply(Pong);
        }

        fn handle_request(
            &mut self,
            out: &mut Emitter,
            body: Box<dyn Any + Send>,
        ) -> Result<(), HandlerError> {
            match body.downcast::<Ping>() {
                Ok(ping) => {
                    if ping.broadcast {
                        out.broadcast(Pong);
                    } else {
                        out.reply(Pong);
                    }
                    Ok(())
                }
                Err(_) => Err("unknown request".into()),
            }
        }
    }

    fn ping(broadcast: bool) -> RequestBody {
        RequestBody::State(Box::new(Ping { broadcast }))
    }

    fn is_pong(body: &ResponseBody) -> bool {
        matches!(body, ResponseBody::State(b) if b.downcast_ref::<Pong>().is_some())
    }

    async fn with_controller<F, Fut>(f: F)
    where
        F: FnOnce(Client, CancellationToken) -> Fut,
        Fut: std::future::Future<Output = Client>,
    {
        let (controller, client) = Controller::new(TestState);
        let handle = tokio::spawn(controller.run());

        let ct = CancellationToken::new();
        let client = f(client, ct.clone()).await;

        client.shutdown(&ct).await.expect("shutdown failed");
        timeout(TICK, handle)
            .await
            .expect("controller did not stop")
            .expect("controller panicked");
    }

    #[tokio::test]
    async fn reply_then_done_in_order() {
        with_controller(|client, ct| async move {
            let (reply_tx, mut reply_rx) = mpsc::channel(8);
            assert!(
                client
                    .send(&ct, Request::new(ping(false), "test1", reply_tx))
                    .await
            );

            let first = reply_rx.recv().await.expect("no first reply");
            assert!(!first.broadcast);
            assert_eq!(first.origin.as_ref().unwrap().tag, "test1");
            assert!(is_pong(&first.body));

            let second = reply_rx.recv().await.expect("no done");
            assert!(matches!(second.body, ResponseBody::Done(None)));

            client
        })
        .await;
    }

    #[tokio::test]
    async fn unknown_request_fails_in_done() {
        with_controller(|client, ct| async move {
            struct Mystery;
            let body = RequestBody::State(Box::new(Mystery));
            let (delivered, result) = client
                .send_and_process_replies(&ct, "t", body, |_| {})
                .await;
            assert!(delivered);
            let err = result.expect_err("mystery request should fail");
            assert_eq!(err.to_string(), "unknown request");

            client
        })
        .await;
    }

    #[tokio::test]
    async fn role_request_names_the_role() {
        with_controller(|client, ct| async move {
            let mut role = None;
            let (delivered, result) = client
                .send_and_process_replies(&ct, "t", RequestBody::Role, |body| {
                    if let ResponseBody::Role(r) = body {
                        role = Some(r);
                    }
                })
                .await;
            assert!(delivered);
            result.expect("role request failed");
            assert_eq!(role.as_deref(), Some("test"));

            client
        })
        .await;
    }

    #[tokio::test]
    async fn dump_emits_state() {
        with_controller(|client, ct| async move {
            let mut pongs = 0;
            let (delivered, result) = client
                .send_and_process_replies(&ct, "t", RequestBody::Dump, |body| {
                    if is_pong(&body) {
                        pongs += 1;
                    }
                })
                .await;
            assert!(delivered);
            result.expect("dump failed");
            assert_eq!(pongs, 1);

            client
        })
        .await;
    }

    #[tokio::test]
    async fn broadcast_reaches_original_and_copy() {
        with_controller(|mut client, ct| async move {
            let mut copy = client.copy(&ct).await.expect("copy failed");

            let (reply_tx, mut reply_rx) = mpsc::channel(8);
            assert!(
                client
                    .send(&ct, Request::new(ping(true), "b", reply_tx))
                    .await
            );

            for c in [&mut client, &mut copy] {
                let b = timeout(TICK, c.recv())
                    .await
                    .expect("timed out")
                    .expect("channel closed");
                assert!(b.broadcast);
                assert!(b.origin.is_none());
                assert!(is_pong(&b.body));
            }

            let done = reply_rx.recv().await.expect("no done");
            assert!(matches!(done.body, ResponseBody::Done(None)));

            drop(copy);
            client
        })
        .await;
    }

    #[tokio::test]
    async fn copy_outlives_original() {
        let (controller, client) = Controller::new(TestState);
        let handle = tokio::spawn(controller.run());
        let ct = CancellationToken::new();

        let copy = client.copy(&ct).await.expect("copy failed");
        drop(client);

        // The copy alone keeps the controller alive and serviceable.
        let (delivered, result) = copy
            .send_and_process_replies(&ct, "t", ping(false), |_| {})
            .await;
        assert!(delivered);
        result.expect("request on copy failed");

        copy.shutdown(&ct).await.expect("shutdown failed");
        timeout(TICK, handle)
            .await
            .expect("controller did not stop")
            .expect("controller panicked");
    }

    #[tokio::test]
    async fn stops_when_last_client_disconnects() {
        let (controller, client) = Controller::new(TestState);
        let handle = tokio::spawn(controller.run());

        drop(client);
        timeout(TICK, handle)
            .await
            .expect("controller did not stop on client loss")
            .expect("controller panicked");
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (controller, client) = Controller::new(TestState);
        let handle = tokio::spawn(controller.run());
        let ct = CancellationToken::new();

        client.shutdown(&ct).await.expect("first shutdown failed");
        timeout(TICK, handle)
            .await
            .expect("controller did not stop")
            .expect("controller panicked");

        // The controller is gone; shutting down again is a no-op.
        client.shutdown(&ct).await.expect("second shutdown failed");
        assert!(client.is_done());
        assert!(!client.send(&ct, {
            let (tx, _rx) = mpsc::channel(1);
            Request::new(RequestBody::Dump, "t", tx)
        }).await);
    }

    #[tokio::test]
    async fn cancelled_send_is_not_delivered() {
        with_controller(|client, ct| async move {
            let cancelled = CancellationToken::new();
            cancelled.cancel();
            let (tx, _rx) = mpsc::channel(1);
            assert!(
                !client
                    .send(&cancelled, Request::new(RequestBody::Dump, "t", tx))
                    .await
            );

            drop(ct);
            client
        })
        .await;
    }

    #[tokio::test]
    async fn bifrost_needs_a_parser() {
        with_controller(|client, ct| async move {
            let copy = client.copy(&ct).await.expect("copy failed");
            let err = copy.bifrost(&ct).await.expect_err("expected an error");
            assert!(matches!(err, CommError::CannotSpeakBifrost));

            client
        })
        .await;
    }

    #[tokio::test]
    async fn on_without_mounts_fails() {
        with_controller(|client, ct| async move {
            let (inner_tx, _inner_rx) = mpsc::channel(1);
            let inner = Request::new(RequestBody::Dump, "in", inner_tx);
            let body = RequestBody::On {
                mount_point: "player".into(),
                request: Box::new(inner),
            };
            let (delivered, result) = client
                .send_and_process_replies(&ct, "t", body, |_| {})
                .await;
            assert!(delivered);
            let err = result.expect_err("expected a mount error");
            assert_eq!(err.to_string(), "no such mount point: player");

            client
        })
        .await;
    }
}
