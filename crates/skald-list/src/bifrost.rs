//! List-specific Bifrost marshalling.
//!
//! See `skald-comm`'s adapter for the common marshalling logic; this module
//! only covers the list role's own words.
//!
//! # Wire surface
//!
//! | Request | Body |
//! |---------|------|
//! | `auto <mode>` | [`SetAutoMode`] |
//! | `sel <index> <hash>` | [`SetSelect`] |
//! | `floadl <index> <hash> <path>` | [`AddItem`] (track) |
//! | `tloadl <index> <hash> <text>` | [`AddItem`] (text) |
//! | `next` | [`NextTrack`] |
//!
//! | Response | Wire form |
//! |----------|-----------|
//! | [`AutoModeResponse`] | `AUTO <mode>` |
//! | [`SelectResponse`] | `SEL <index> <hash>` |
//! | [`FreezeResponse`] | `COUNTL <n>`, then one item line per item |
//! | [`ItemResponse`] | `FLOADL <index> <hash> <path>` or `TLOADL …` |

use std::any::Any;

use skald_comm::{BifrostParser, CommError, HandlerError};
use skald_proto::Message;

use crate::requests::{AddItem, NextTrack, SetAutoMode, SetSelect};
use crate::responses::{AutoModeResponse, FreezeResponse, ItemResponse, SelectResponse};
use crate::{AutoMode, Item, ItemKind};

/// Parser and emitter for the list role's wire surface.
pub struct ListParser;

impl BifrostParser for ListParser {
    fn parse_request(
        &self,
        word: &str,
        args: &[String],
    ) -> Result<Box<dyn Any + Send>, HandlerError> {
        match word {
            "auto" => parse_auto(check_arity(word, args, 1)?),
            "sel" => parse_sel(check_arity(word, args, 2)?),
            "floadl" => parse_load(check_arity(word, args, 3)?, ItemKind::Track),
            "tloadl" => parse_load(check_arity(word, args, 3)?, ItemKind::Text),
            "next" => {
                check_arity(word, args, 0)?;
                Ok(Box::new(NextTrack))
            }
            _ => Err(CommError::UnknownWord(word.to_owned()).into()),
        }
    }

    fn emit_response(
        &self,
        tag: &str,
        body: &(dyn Any + Send + Sync),
        out: &mut Vec<Message>,
    ) -> Result<(), HandlerError> {
        if let Some(r) = body.downcast_ref::<AutoModeResponse>() {
            out.push(Message::new(tag, "AUTO").arg(r.mode.to_string()));
            return Ok(());
        }
        if let Some(r) = body.downcast_ref::<SelectResponse>() {
            out.push(
                Message::new(tag, "SEL")
                    .arg(r.index.to_string())
                    .arg(r.hash.clone()),
            );
            return Ok(());
        }
        if let Some(FreezeResponse(items)) = body.downcast_ref::<FreezeResponse>() {
            out.push(Message::new(tag, "COUNTL").arg(items.len().to_string()));
            // The rest is the same as if the items were being loaded one
            // by one, so the same emitter serves both.
            for (index, item) in items.iter().enumerate() {
                out.push(item_message(tag, index, item));
            }
            return Ok(());
        }
        if let Some(r) = body.downcast_ref::<ItemResponse>() {
            out.push(item_message(tag, r.index, &r.item));
            return Ok(());
        }
        Err(CommError::NoMessageEquivalent.into())
    }
}

/// Checks an exact argument count, passing the arguments through.
fn check_arity<'a>(
    word: &str,
    args: &'a [String],
    want: usize,
) -> Result<&'a [String], HandlerError> {
    if args.len() != want {
        return Err(CommError::BadArity {
            word: word.to_owned(),
            want,
            got: args.len(),
        }
        .into());
    }
    Ok(args)
}

fn parse_auto(args: &[String]) -> Result<Box<dyn Any + Send>, HandlerError> {
    let mode: AutoMode = args[0].parse()?;
    Ok(Box::new(SetAutoMode { mode }))
}

fn parse_sel(args: &[String]) -> Result<Box<dyn Any + Send>, HandlerError> {
    let index: i64 = args[0].parse()?;
    Ok(Box::new(SetSelect {
        index,
        hash: args[1].clone(),
    }))
}

fn parse_load(args: &[String], kind: ItemKind) -> Result<Box<dyn Any + Send>, HandlerError> {
    let index: usize = args[0].parse()?;
    let item = match kind {
        ItemKind::Track => Item::track(&args[1], &args[2]),
        ItemKind::Text => Item::text(&args[1], &args[2]),
    };
    Ok(Box::new(AddItem { index, item }))
}

/// Renders one item as its load line: `FLOADL` for tracks, `TLOADL` for
/// text.
fn item_message(tag: &str, index: usize, item: &Item) -> Message {
    let word = match item.kind() {
        ItemKind::Track => "FLOADL",
        ItemKind::Text => "TLOADL",
    };
    Message::new(tag, word)
        .arg(index.to_string())
        .arg(item.hash())
        .arg(item.payload())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| (*s).to_string()).collect()
    }

    fn parse(word: &str, a: &[&str]) -> Result<Box<dyn Any + Send>, HandlerError> {
        ListParser.parse_request(word, &args(a))
    }

    #[test]
    fn parses_auto() {
        let body = parse("auto", &["shuffle"]).unwrap();
        let rq = body.downcast::<SetAutoMode>().unwrap();
        assert_eq!(rq.mode, AutoMode::Shuffle);
    }

    #[test]
    fn rejects_bad_automode() {
        let err = parse("auto", &["random"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid automode");
    }

    #[test]
    fn parses_sel_with_negative_index() {
        let body = parse("sel", &["-1", "abc"]).unwrap();
        let rq = body.downcast::<SetSelect>().unwrap();
        assert_eq!(rq.index, -1);
        assert_eq!(rq.hash, "abc");
    }

    #[test]
    fn parses_loads() {
        let body = parse("floadl", &["0", "abc", "foo.mp3"]).unwrap();
        let rq = body.downcast::<AddItem>().unwrap();
        assert_eq!(rq.index, 0);
        assert_eq!(rq.item, Item::track("abc", "foo.mp3"));

        let body = parse("tloadl", &["1", "xyz", "hello"]).unwrap();
        let rq = body.downcast::<AddItem>().unwrap();
        assert_eq!(rq.item, Item::text("xyz", "hello"));
    }

    #[test]
    fn parses_next() {
        let body = parse("next", &[]).unwrap();
        assert!(body.downcast::<NextTrack>().is_ok());
    }

    #[test]
    fn arity_is_checked_per_word() {
        for (word, wrong) in [
            ("auto", vec![]),
            ("sel", vec!["0"]),
            ("floadl", vec!["0", "abc"]),
            ("tloadl", vec!["0", "abc", "x", "y"]),
            ("next", vec!["surplus"]),
        ] {
            let err = parse(word, &wrong).unwrap_err();
            assert!(
                err.to_string().starts_with("bad arity"),
                "{word}: {err}"
            );
        }
    }

    #[test]
    fn unknown_word_is_unknown() {
        let err = parse("warble", &[]).unwrap_err();
        assert_eq!(err.to_string(), "unknown word: warble");
    }

    fn emitted(body: &(dyn Any + Send + Sync), tag: &str) -> Vec<String> {
        let mut out = Vec::new();
        ListParser.emit_response(tag, body, &mut out).unwrap();
        out.into_iter()
            .map(|m| String::from_utf8(m.pack()).unwrap())
            .collect()
    }

    #[test]
    fn emits_auto_and_sel() {
        assert_eq!(
            emitted(&AutoModeResponse { mode: AutoMode::Drop }, "!"),
            ["! AUTO drop\n"]
        );
        assert_eq!(
            emitted(
                &SelectResponse {
                    index: -1,
                    hash: "(undefined)".into()
                },
                "t1"
            ),
            ["t1 SEL -1 (undefined)\n"]
        );
    }

    #[test]
    fn emits_freeze_as_count_then_items() {
        let freeze = FreezeResponse(vec![
            Item::track("abc", "foo.mp3"),
            Item::text("xyz", "hello world"),
        ]);
        assert_eq!(
            emitted(&freeze, "!"),
            [
                "! COUNTL 2\n",
                "! FLOADL 0 abc foo.mp3\n",
                "! TLOADL 1 xyz 'hello world'\n",
            ]
        );
    }

    #[test]
    fn unemittable_body_is_an_error() {
        struct Opaque;
        let mut out = Vec::new();
        let err = ListParser.emit_response("t", &Opaque, &mut out).unwrap_err();
        assert_eq!(err.to_string(), "response with no message equivalent");
    }
}
