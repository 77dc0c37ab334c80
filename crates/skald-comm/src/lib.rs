//! Concurrency and messaging substrate for skald.
//!
//! A skald process hosts one or more in-memory *roles* (a playlist, say)
//! and exposes each to many concurrent clients. This crate is the machinery
//! that makes that safe: every role lives inside a [`Controller`], a
//! single-task actor that owns the role state, serialises requests against
//! it, and fans state-change broadcasts out to every attached client.
//!
//! ```text
//!                     ┌──────────────────────────────┐
//!   Client ──Tx────►  │          Controller          │
//!   Client ──Tx────►  │   select over all ingress    │
//!   Client ──Tx────►  │   state: impl Controllable   │
//!                     │                              │
//!   Client ◄──Rx────  │   broadcast / unicast reply  │
//!                     └──────────────────────────────┘
//! ```
//!
//! # Pieces
//!
//! - [`Controllable`]: the contract a role implements (role name, state
//!   dump, request handling).
//! - [`Controller`]: the actor. One long-running task per controller.
//! - [`Client`]: the outward handle; cloneable via [`Client::copy`],
//!   shut down cooperatively via [`Client::shutdown`].
//! - [`Bifrost`]: an adapter translating between typed requests/responses
//!   and wire [`Message`](skald_proto::Message)s for one client.
//! - [`IoClient`]: glue pumping a byte stream in and out of a
//!   [`BifrostClient`].
//!
//! # Ownership and lifetime
//!
//! The Controller owns both ends of every inward client pair. A client
//! announces it is gone by dropping its request sender; the Controller
//! announces *it* is gone by cancelling the client's done token and
//! dropping the response sender. No back-references exist, so the cyclic
//! Client ↔ Controller lifetime needs no reference counting.

mod bifrost;
mod client;
mod controllable;
mod controller;
mod error;
mod ioclient;
mod request;
mod response;

pub use bifrost::{Bifrost, BifrostClient, BifrostParser, PROTOCOL_VERSION, SERVER_VERSION};
pub use client::Client;
pub use controllable::{Controllable, Emitter, StateResponse};
pub use controller::Controller;
pub use error::{CommError, HandlerError};
pub use ioclient::IoClient;
pub use request::{Request, RequestBody, RequestOrigin};
pub use response::{Response, ResponseBody};
