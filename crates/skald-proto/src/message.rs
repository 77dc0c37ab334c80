//! The Bifrost message record and its wire packing.
//!
//! A [`Message`] is an immutable (tag, word, args) triple. Tags correlate
//! requests with their responses; two values are reserved:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | [`TAG_BCAST`] (`!`) | Not tied to a single originating request |
//! | [`TAG_UNKNOWN`] (`?`) | The right tag could not be determined |

use std::fmt;

use crate::ProtoError;

/// Tag used for broadcast messages.
pub const TAG_BCAST: &str = "!";

/// Tag used when the right tag is unknown.
pub const TAG_UNKNOWN: &str = "?";

/// The `ACK` response word, terminating every request.
pub const WORD_ACK: &str = "ACK";

/// The `OHAI` response word, opening every connection.
pub const WORD_OHAI: &str = "OHAI";

/// The `IAMA` response word, announcing a role.
pub const WORD_IAMA: &str = "IAMA";

/// A full Bifrost message: a tag, a command word, and zero or more
/// string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: String,
    word: String,
    args: Vec<String>,
}

impl Message {
    /// Creates a new message with the given tag and command word and no
    /// arguments. Use [`arg`](Self::arg) to append arguments.
    #[must_use]
    pub fn new(tag: impl Into<String>, word: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            word: word.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument, returning the message for chaining.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns this message's tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns this message's command word.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Returns the argument slice.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the `index`-th argument, counting from zero.
    ///
    /// # Errors
    ///
    /// [`ProtoError::NoSuchArg`] if the message has no such argument.
    pub fn arg_at(&self, index: usize) -> Result<&str, ProtoError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or(ProtoError::NoSuchArg {
                index,
                len: self.args.len(),
            })
    }

    /// Packs the message into its wire form, including the terminating
    /// newline.
    ///
    /// Packing is deterministic: `tag SP word (SP arg)* LF`, with each
    /// argument escaped iff necessary via [`escape_argument`].
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.tag.len() + self.word.len() + 16);
        out.extend_from_slice(self.tag.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.word.as_bytes());
        for a in &self.args {
            out.push(b' ');
            if needs_quoting(a) {
                out.extend_from_slice(escape_argument(a).as_bytes());
            } else {
                out.extend_from_slice(a.as_bytes());
            }
        }
        out.push(b'\n');
        out
    }

    /// Constructs a message from a line of word-strings, as produced by the
    /// [`Tokenizer`](crate::Tokenizer).
    ///
    /// # Errors
    ///
    /// [`ProtoError::ShortLine`] if the line has fewer than two words.
    pub fn from_line(line: &[String]) -> Result<Self, ProtoError> {
        if line.len() < 2 {
            return Err(ProtoError::ShortLine(line.len()));
        }
        Ok(Self {
            tag: line[0].clone(),
            word: line[1].clone(),
            args: line[2..].to_vec(),
        })
    }
}

impl fmt::Display for Message {
    /// Human-readable rendering: the word and arguments, without the tag.
    /// This is not the wire form; use [`Message::pack`] for that.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.word)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// Whether an argument must be quoted to survive the trip over the wire.
///
/// Empty arguments count: an unquoted empty word would vanish between its
/// neighbouring separators.
fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_ascii() && (c.is_ascii_whitespace() || "'\"\\".contains(c)))
}

/// Escapes an argument using Bifrost single-quoting: the whole argument is
/// wrapped in `'`, and a literal `'` inside is emitted as `'\''`.
fn escape_argument(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Generates a fresh request tag.
///
/// Tags are client-chosen and only need to be unique per connection; 128
/// random bits rendered as hex are plenty.
#[must_use]
pub fn new_tag() -> String {
    format!("{:032x}", rand::random::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_plain() {
        let m = Message::new("t1", "auto").arg("shuffle");
        assert_eq!(m.pack(), b"t1 auto shuffle\n");
    }

    #[test]
    fn pack_no_args() {
        let m = Message::new("!", "OHAI").arg("bifrost-0.0.0").arg("skaldd-0.1.0");
        assert_eq!(m.pack(), b"! OHAI bifrost-0.0.0 skaldd-0.1.0\n");
    }

    #[test]
    fn pack_quotes_whitespace() {
        let m = Message::new("t1", "tloadl").arg("0").arg("abc").arg("hello world");
        assert_eq!(m.pack(), b"t1 tloadl 0 abc 'hello world'\n");
    }

    #[test]
    fn pack_escapes_single_quote() {
        let m = Message::new("t1", "tloadl").arg("0").arg("abc").arg("it's");
        assert_eq!(m.pack(), b"t1 tloadl 0 abc 'it'\\''s'\n");
    }

    #[test]
    fn pack_quotes_backslash_and_double_quote() {
        let m = Message::new("t", "w").arg(r#"a\b"#).arg(r#"c"d"#);
        assert_eq!(m.pack(), b"t w 'a\\b' 'c\"d'\n");
    }

    #[test]
    fn pack_quotes_empty_argument() {
        let m = Message::new("t", "w").arg("");
        assert_eq!(m.pack(), b"t w ''\n");
    }

    #[test]
    fn from_line_ok() {
        let line = vec!["t1".to_string(), "sel".to_string(), "0".to_string()];
        let m = Message::from_line(&line).unwrap();
        assert_eq!(m.tag(), "t1");
        assert_eq!(m.word(), "sel");
        assert_eq!(m.args(), ["0"]);
    }

    #[test]
    fn from_line_short() {
        let line = vec!["lonely".to_string()];
        assert_eq!(Message::from_line(&line), Err(ProtoError::ShortLine(1)));
        assert_eq!(Message::from_line(&[]), Err(ProtoError::ShortLine(0)));
    }

    #[test]
    fn arg_at_in_and_out_of_range() {
        let m = Message::new("t", "w").arg("x");
        assert_eq!(m.arg_at(0).unwrap(), "x");
        assert_eq!(
            m.arg_at(1),
            Err(ProtoError::NoSuchArg { index: 1, len: 1 })
        );
    }

    #[test]
    fn display_omits_tag() {
        let m = Message::new("t1", "sel").arg("0").arg("abc");
        assert_eq!(m.to_string(), "sel 0 abc");
    }

    #[test]
    fn new_tags_are_distinct() {
        assert_ne!(new_tag(), new_tag());
    }
}
