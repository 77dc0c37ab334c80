//! Stateful byte-stream tokenizer.
//!
//! The tokenizer consumes raw bytes and yields completed lines of words.
//! Input may be arbitrarily fragmented: state survives across
//! [`feed`](Tokenizer::feed) calls, so a word or quoted span may be split at
//! any byte boundary.
//!
//! # Quoting rules
//!
//! - A newline outside any quote completes the current line.
//! - Runs of unquoted ASCII whitespace separate words.
//! - `'...'` and `"..."` quote their contents; quotes may open and close
//!   mid-word, and `''` produces an empty word.
//! - `\` escapes the byte after it, in unquoted, single-quoted, and
//!   double-quoted context alike. An escaped newline does not end a line.

/// Which quoting construct the tokenizer is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteMode {
    None,
    Single,
    Double,
}

/// A resumable byte-at-a-time line tokenizer.
#[derive(Debug)]
pub struct Tokenizer {
    /// Bytes of the word currently being read.
    word: Vec<u8>,
    /// Whether any byte (or an empty quote pair) has started the current
    /// word. Distinguishes `''` from no word at all.
    in_word: bool,
    /// Completed words of the line currently being read.
    line: Vec<String>,
    quote: QuoteMode,
    /// The previous byte was a backslash; the next byte is literal.
    escaping: bool,
}

impl Tokenizer {
    /// Creates a fresh tokenizer, outside any word, line, or quote.
    #[must_use]
    pub fn new() -> Self {
        Self {
            word: Vec::new(),
            in_word: false,
            line: Vec::new(),
            quote: QuoteMode::None,
            escaping: false,
        }
    }

    /// Whether a line is only partly read: a word, quote, or escape is
    /// still open, or completed words are waiting for their newline.
    ///
    /// Interactive callers use this to switch to a continuation prompt.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_word
            || !self.line.is_empty()
            || self.quote != QuoteMode::None
            || self.escaping
    }

    /// Feeds a chunk of bytes in, returning every line this chunk
    /// completed, in order. Partial trailing input is retained for the
    /// next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<String>> {
        let mut lines = Vec::new();
        for &b in bytes {
            if let Some(line) = self.push_byte(b) {
                lines.push(line);
            }
        }
        lines
    }

    /// Consumes one byte, returning a completed line if this byte ended one.
    fn push_byte(&mut self, b: u8) -> Option<Vec<String>> {
        if self.escaping {
            self.escaping = false;
            self.put(b);
            return None;
        }

        match self.quote {
            QuoteMode::None => match b {
                b'\\' => self.escaping = true,
                b'\'' => {
                    self.quote = QuoteMode::Single;
                    self.in_word = true;
                }
                b'"' => {
                    self.quote = QuoteMode::Double;
                    self.in_word = true;
                }
                b'\n' => return Some(self.end_line()),
                b if b.is_ascii_whitespace() => self.end_word(),
                _ => self.put(b),
            },
            QuoteMode::Single => match b {
                b'\'' => self.quote = QuoteMode::None,
                b'\\' => self.escaping = true,
                _ => self.put(b),
            },
            QuoteMode::Double => match b {
                b'"' => self.quote = QuoteMode::None,
                b'\\' => self.escaping = true,
                _ => self.put(b),
            },
        }
        None
    }

    fn put(&mut self, b: u8) {
        self.word.push(b);
        self.in_word = true;
    }

    /// Completes the current word, if one is in progress.
    fn end_word(&mut self) {
        if !self.in_word {
            return;
        }
        let word = String::from_utf8_lossy(&self.word).into_owned();
        self.word.clear();
        self.in_word = false;
        self.line.push(word);
    }

    /// Completes the current line, returning its words.
    fn end_line(&mut self) -> Vec<String> {
        self.end_word();
        std::mem::take(&mut self.line)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
