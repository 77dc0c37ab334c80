//! The playlist ("list") role for skald.
//!
//! A list is an ordered sequence of items, at most one of which is
//! selected, plus an *autoselection* policy deciding where the selection
//! goes when the current item finishes. The list knows nothing about audio
//! or timing; it is a pure state machine, plugged into the concurrency
//! substrate as a [`Controllable`](skald_comm::Controllable) by
//! [`ListRole`].
//!
//! # Module map
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`List`] | The state machine itself |
//! | [`Item`], [`ItemKind`] | List entries |
//! | [`AutoMode`] | Autoselection policies |
//! | `role` | [`ListRole`], the Controllable wrapper |
//! | `bifrost` | [`ListParser`], the wire parser/emitter |
//! | `requests`, `responses` | Role-specific message bodies |

mod automode;
mod bifrost;
mod error;
mod item;
mod list;
mod requests;
mod responses;
mod role;

pub use automode::AutoMode;
pub use bifrost::ListParser;
pub use error::ListError;
pub use item::{Item, ItemKind};
pub use list::List;
pub use requests::{AddItem, NextTrack, SetAutoMode, SetSelect};
pub use responses::{
    AutoModeResponse, FreezeResponse, ItemResponse, SelectResponse, UNDEFINED_HASH,
};
pub use role::{ListRole, ROLE_NAME};
