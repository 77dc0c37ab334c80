//! Integration tests for the Bifrost adapter over a toy role.
//!
//! The role here is deliberately tiny: one word, one response body. The
//! list role's own tests cover a real state machine; these cover the
//! adapter's handshake, tagging, and error paths in isolation.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use skald_comm::{
    BifrostClient, BifrostParser, Client, CommError, Controllable, Controller, Emitter,
    HandlerError, PROTOCOL_VERSION,
};
use skald_proto::Message;

const TICK: Duration = Duration::from_secs(5);

/// Request: echo a word back to everyone.
struct Echo(String);

/// Response: the echoed word.
struct Echoed(String);

struct EchoRole;

impl Controllable for EchoRole {
    fn role_name(&self) -> &str {
        "echo"
    }

    fn dump(&self, _out: &mut Emitter) {}

    fn handle_request(
        &mut self,
        out: &mut Emitter,
        body: Box<dyn Any + Send>,
    ) -> Result<(), HandlerError> {
        match body.downcast::<Echo>() {
            Ok(echo) => {
                out.broadcast(Echoed(echo.0));
                Ok(())
            }
            Err(_) => Err("unknown request".into()),
        }
    }

    fn bifrost_parser(&self) -> Option<Arc<dyn BifrostParser>> {
        Some(Arc::new(EchoParser))
    }
}

struct EchoParser;

impl BifrostParser for EchoParser {
    fn parse_request(
        &self,
        word: &str,
        args: &[String],
    ) -> Result<Box<dyn Any + Send>, HandlerError> {
        match word {
            "echo" => {
                if args.len() != 1 {
                    return Err(CommError::BadArity {
                        word: word.into(),
                        want: 1,
                        got: args.len(),
                    }
                    .into());
                }
                Ok(Box::new(Echo(args[0].clone())))
            }
            _ => Err(CommError::UnknownWord(word.into()).into()),
        }
    }

    fn emit_response(
        &self,
        tag: &str,
        body: &(dyn Any + Send + Sync),
        out: &mut Vec<Message>,
    ) -> Result<(), HandlerError> {
        match body.downcast_ref::<Echoed>() {
            Some(echoed) => {
                out.push(Message::new(tag, "ECHO").arg(echoed.0.clone()));
                Ok(())
            }
            None => Err(CommError::NoMessageEquivalent.into()),
        }
    }
}

/// Spins up a controller and an adapter, returning the wire-side handle
/// and the root client kept to shut everything down.
async fn rig() -> (BifrostClient, Client, CancellationToken) {
    let (controller, root) = Controller::new(EchoRole);
    tokio::spawn(controller.run());

    let ct = CancellationToken::new();
    let for_adapter = root.copy(&ct).await.expect("copy failed");
    let (adapter, wire) = for_adapter.bifrost(&ct).await.expect("bifrost failed");
    tokio::spawn(adapter.run());

    (wire, root, ct)
}

async fn recv_line(wire: &mut BifrostClient) -> String {
    let message = timeout(TICK, wire.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("adapter closed its response channel");
    String::from_utf8(message.pack()).expect("packed message was not UTF-8")
}

/// Drains the three-part handshake so tests can get at their own traffic.
async fn skip_handshake(wire: &mut BifrostClient) {
    let ohai = recv_line(wire).await;
    assert!(ohai.starts_with(&format!("! OHAI {PROTOCOL_VERSION} ")));
    assert_eq!(recv_line(wire).await, "! IAMA echo\n");
    // EchoRole dumps nothing, so the handshake ends here.
}

#[tokio::test]
async fn handshake_announces_protocol_and_role() {
    let (mut wire, root, ct) = rig().await;
    skip_handshake(&mut wire).await;
    root.shutdown(&ct).await.expect("shutdown failed");
}

#[tokio::test]
async fn request_broadcasts_then_acks() {
    let (mut wire, root, ct) = rig().await;
    skip_handshake(&mut wire).await;

    assert!(wire.send(Message::new("t1", "echo").arg("hello")).await);
    assert_eq!(recv_line(&mut wire).await, "! ECHO hello\n");
    assert_eq!(recv_line(&mut wire).await, "t1 ACK OK success\n");

    root.shutdown(&ct).await.expect("shutdown failed");
}

#[tokio::test]
async fn unknown_word_is_refused_per_request() {
    let (mut wire, root, ct) = rig().await;
    skip_handshake(&mut wire).await;

    assert!(wire.send(Message::new("t1", "frobnicate")).await);
    assert_eq!(
        recv_line(&mut wire).await,
        "t1 ACK WHAT 'unknown word: frobnicate'\n"
    );

    // The connection survives a protocol error.
    assert!(wire.send(Message::new("t2", "echo").arg("still-here")).await);
    assert_eq!(recv_line(&mut wire).await, "! ECHO still-here\n");
    assert_eq!(recv_line(&mut wire).await, "t2 ACK OK success\n");

    root.shutdown(&ct).await.expect("shutdown failed");
}

#[tokio::test]
async fn bad_arity_is_refused() {
    let (mut wire, root, ct) = rig().await;
    skip_handshake(&mut wire).await;

    assert!(wire.send(Message::new("t1", "echo").arg("a").arg("b")).await);
    let line = recv_line(&mut wire).await;
    assert!(
        line.starts_with("t1 ACK WHAT 'bad arity"),
        "unexpected line: {line}"
    );

    root.shutdown(&ct).await.expect("shutdown failed");
}

#[tokio::test]
async fn dump_takes_no_arguments() {
    let (mut wire, root, ct) = rig().await;
    skip_handshake(&mut wire).await;

    assert!(wire.send(Message::new("t1", "dump").arg("x")).await);
    let line = recv_line(&mut wire).await;
    assert!(
        line.starts_with("t1 ACK WHAT 'bad arity"),
        "unexpected line: {line}"
    );

    // A well-formed dump on this role emits nothing but the ACK.
    assert!(wire.send(Message::new("t2", "dump")).await);
    assert_eq!(recv_line(&mut wire).await, "t2 ACK OK success\n");

    root.shutdown(&ct).await.expect("shutdown failed");
}

#[tokio::test]
async fn adapter_exits_when_controller_shuts_down() {
    let (mut wire, root, ct) = rig().await;
    skip_handshake(&mut wire).await;

    root.shutdown(&ct).await.expect("shutdown failed");

    // The adapter notices its client being hung up, closes its response
    // channel, and fires its done signal.
    loop {
        match timeout(TICK, wire.recv()).await.expect("timed out") {
            Some(_) => continue,
            None => break,
        }
    }
    assert!(wire.done().is_cancelled());
}
