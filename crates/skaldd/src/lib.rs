//! Daemon wiring for skaldd: configuration, the interactive console, and
//! the TCP server.
//!
//! The binary in `main.rs` is thin; everything testable lives here.

pub mod config;
pub mod console;
pub mod netsrv;
