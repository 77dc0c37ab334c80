//! Bifrost wire protocol for skald.
//!
//! Bifrost is a line-oriented text protocol: each message is one
//! `\n`-terminated line of whitespace-separated words, the first two being a
//! *tag* and a *command word*, the rest arguments. Arguments containing
//! whitespace or quote characters are single-quoted on the wire.
//!
//! This crate is the leaf of the workspace: it knows nothing about
//! controllers or roles, only about bytes and words.
//!
//! ```text
//! bytes ──► Tokenizer ──► [words] ──► Message::from_line ──► Message
//! Message ──► Message::pack ──► bytes
//! ```
//!
//! # Example
//!
//! ```
//! use skald_proto::{Message, Tokenizer};
//!
//! let msg = Message::new("t1", "sel").arg("0").arg("abc");
//! assert_eq!(msg.pack(), b"t1 sel 0 abc\n");
//!
//! let mut tok = Tokenizer::new();
//! let lines = tok.feed(b"t1 sel 0 abc\n");
//! assert_eq!(Message::from_line(&lines[0]).unwrap(), msg);
//! ```

mod error;
mod message;
mod tokenizer;

pub use error::ProtoError;
pub use message::{
    new_tag, Message, TAG_BCAST, TAG_UNKNOWN, WORD_ACK, WORD_IAMA, WORD_OHAI,
};
pub use tokenizer::Tokenizer;
