//! The list role: a [`List`] plugged into the controller substrate.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use skald_comm::{BifrostParser, Controllable, Emitter, HandlerError};

use crate::bifrost::ListParser;
use crate::requests::{AddItem, NextTrack, SetAutoMode, SetSelect};
use crate::responses::{AutoModeResponse, FreezeResponse, ItemResponse, SelectResponse};
use crate::{List, ListError};

/// The role name a list controller advertises.
pub const ROLE_NAME: &str = "list";

/// A [`Controllable`] wrapping a [`List`].
///
/// All the logic here is dispatch: the rules live in [`List`]. Successful
/// state changes broadcast; unchanged states and failures do not.
pub struct ListRole {
    list: List,
}

impl ListRole {
    #[must_use]
    pub fn new(list: List) -> Self {
        Self { list }
    }

    fn handle_set_auto_mode(&mut self, out: &mut Emitter, rq: SetAutoMode) {
        if self.list.set_auto_mode(rq.mode) {
            out.broadcast(AutoModeResponse { mode: rq.mode });
        }
    }

    fn handle_set_select(
        &mut self,
        out: &mut Emitter,
        rq: SetSelect,
    ) -> Result<(), ListError> {
        if rq.index < 0 {
            return Err(ListError::SelectOutOfBounds(rq.index));
        }
        let changed = self.list.select(rq.index as usize, &rq.hash)?;
        if changed {
            out.broadcast(SelectResponse {
                index: rq.index,
                hash: rq.hash,
            });
        }
        Ok(())
    }

    fn handle_add_item(&mut self, out: &mut Emitter, rq: AddItem) -> Result<(), ListError> {
        self.list.add(rq.item.clone(), rq.index)?;
        debug!(index = rq.index, hash = rq.item.hash(), "item added");
        out.broadcast(ItemResponse {
            index: rq.index,
            item: rq.item,
        });
        Ok(())
    }

    fn handle_next(&mut self, out: &mut Emitter) {
        let (_, changed) = self.list.next();
        if changed {
            out.broadcast(SelectResponse::of(self.list.selection()));
        }
    }
}

impl Controllable for ListRole {
    fn role_name(&self) -> &str {
        ROLE_NAME
    }

    fn dump(&self, out: &mut Emitter) {
        out.reply(AutoModeResponse {
            mode: self.list.auto_mode(),
        });
        out.reply(FreezeResponse(self.list.freeze()));
        out.reply(SelectResponse::of(self.list.selection()));
    }

    fn handle_request(
        &mut self,
        out: &mut Emitter,
        body: Box<dyn Any + Send>,
    ) -> Result<(), HandlerError> {
        let body = match body.downcast::<SetAutoMode>() {
            Ok(rq) => {
                self.handle_set_auto_mode(out, *rq);
                return Ok(());
            }
            Err(body) => body,
        };
        let body = match body.downcast::<SetSelect>() {
            Ok(rq) => return self.handle_set_select(out, *rq).map_err(Into::into),
            Err(body) => body,
        };
        let body = match body.downcast::<AddItem>() {
            Ok(rq) => return self.handle_add_item(out, *rq).map_err(Into::into),
            Err(body) => body,
        };
        match body.downcast::<NextTrack>() {
            Ok(_) => {
                self.handle_next(out);
                Ok(())
            }
            Err(_) => Err(ListError::UnknownRequest.into()),
        }
    }

    fn bifrost_parser(&self) -> Option<Arc<dyn BifrostParser>> {
        Some(Arc::new(ListParser))
    }
}
