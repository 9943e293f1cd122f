//! Two-token-lookahead lexer for the game's text format.
//!
//! Operates on text that has already passed through [`crate::escape::import`],
//! so every `#hh` escape is exactly three ASCII characters and no other
//! non-ASCII content is present.

fn is_special(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\r' | b'\t' | b'"' | b'*' | b'/')
}

/// Split escaped text into the same word stream the reference lexer
/// produces: each word is either a `#hh` escape, a single special
/// character, or a run of "plain" characters.
fn split_words(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut words = Vec::new();
    let mut plain_start = None;
    let mut i = 0;

    macro_rules! flush_plain {
        ($end:expr) => {
            if let Some(start) = plain_start.take() {
                if $end > start {
                    words.push(text[start..$end].to_string());
                }
            }
        };
    }

    while i < bytes.len() {
        if bytes[i] == b'#'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            flush_plain!(i);
            words.push(text[i..i + 3].to_string());
            i += 3;
        } else if is_special(bytes[i]) {
            flush_plain!(i);
            words.push(text[i..i + 1].to_string());
            i += 1;
        } else {
            if plain_start.is_none() {
                plain_start = Some(i);
            }
            i += 1;
        }
    }
    flush_plain!(bytes.len());
    words
}

fn word_is_whitespace(word: &str) -> bool {
    match word {
        " " | "\n" | "\r" | "\t" => true,
        _ => {
            if let Some(hex) = word.strip_prefix('#') {
                u8::from_str_radix(hex, 16).is_ok_and(|v| v <= 32)
            } else {
                false
            }
        }
    }
}

/// Tokenizer over escaped game text, with two-word lookahead.
pub struct Tokenizer {
    words: Vec<String>,
    pos: usize,
    current: String,
    next: String,
}

impl Tokenizer {
    /// Build a tokenizer over already-escaped text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let words = split_words(text);
        let mut tok = Self {
            words,
            pos: 0,
            current: String::new(),
            next: String::new(),
        };
        tok.advance();
        tok.advance();
        tok
    }

    fn advance(&mut self) {
        self.current = std::mem::take(&mut self.next);
        self.next = loop {
            if self.pos >= self.words.len() {
                break String::new();
            }
            let word = self.words[self.pos].clone();
            self.pos += 1;
            if !word.is_empty() {
                break word;
            }
        };
    }

    /// True once the lexer has consumed all input.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.current.is_empty()
    }

    /// Skip whitespace and comments, reporting whether a newline was crossed.
    pub fn skip_whitespace(&mut self) -> bool {
        let mut has_newlines = false;
        while !self.current.is_empty() && word_is_whitespace(&self.current) {
            if self.current == "\n" {
                has_newlines = true;
            }
            self.advance();
        }
        has_newlines
    }

    /// Parse the next token, honoring comments and quoting.
    ///
    /// Returns the token text and whether a line break was crossed before it
    /// (inside whitespace/comment skipping). Mirrors `ParseExtN`.
    pub fn parse_ext_n(&mut self, allow_line_breaks: bool) -> (String, bool) {
        let has_newlines = loop {
            let crossed = self.skip_whitespace();
            if self.completed() {
                return (String::new(), crossed);
            }
            if crossed && !allow_line_breaks {
                return (String::new(), crossed);
            }

            if self.current == "/" && self.next == "/" {
                self.advance();
                self.advance();
                while !self.current.is_empty() && self.current != "\n" {
                    self.advance();
                }
                continue;
            }

            if self.current == "/" && self.next == "*" {
                self.advance();
                self.advance();
                while !self.current.is_empty() && !(self.current == "*" && self.next == "/") {
                    self.advance();
                }
                self.advance();
                self.advance();
                continue;
            }

            break crossed;
        };

        if self.current == "\"" {
            let mut out = String::new();
            loop {
                self.advance();
                if self.current == "\"" || self.current.is_empty() {
                    self.advance();
                    return (out, has_newlines);
                }
                out.push_str(&self.current);
            }
        }

        let mut out = String::new();
        loop {
            out.push_str(&self.current);
            self.advance();
            if self.current.is_empty() || word_is_whitespace(&self.current) {
                break;
            }
        }
        (out, has_newlines)
    }

    /// Parse the next token, discarding the line-break flag.
    pub fn parse_ext(&mut self, allow_line_breaks: bool) -> String {
        self.parse_ext_n(allow_line_breaks).0
    }

    /// Parse the next token and lowercase it.
    pub fn lparse_ext(&mut self, allow_line_breaks: bool) -> String {
        self.parse_ext(allow_line_breaks).to_lowercase()
    }

    /// Skip to (not including) the next newline.
    pub fn skip_rest_of_line(&mut self) {
        while !self.current.is_empty() && self.current != "\n" {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_unquoted_tokens() {
        let mut tok = Tokenizer::new("foo bar baz");
        assert_eq!(tok.parse_ext(true), "foo");
        assert_eq!(tok.parse_ext(true), "bar");
        assert_eq!(tok.parse_ext(true), "baz");
        assert!(tok.completed());
    }

    #[test]
    fn parses_quoted_tokens_with_inner_whitespace() {
        let mut tok = Tokenizer::new(r#""hello world""#);
        assert_eq!(tok.parse_ext(true), "hello world");
    }

    #[test]
    fn skips_double_slash_comments() {
        let mut tok = Tokenizer::new("foo // bar baz\nqux");
        assert_eq!(tok.parse_ext(true), "foo");
        assert_eq!(tok.parse_ext(true), "qux");
    }

    #[test]
    fn skips_block_comments() {
        let mut tok = Tokenizer::new("foo /* bar\nbaz */ qux");
        assert_eq!(tok.parse_ext(true), "foo");
        assert_eq!(tok.parse_ext(true), "qux");
    }

    #[test]
    fn disallows_line_breaks_when_requested() {
        let mut tok = Tokenizer::new("foo\nbar");
        assert_eq!(tok.parse_ext(true), "foo");
        assert_eq!(tok.parse_ext(false), "");
        assert_eq!(tok.parse_ext(true), "bar");
    }
}
