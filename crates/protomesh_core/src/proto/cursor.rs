//! Line cursor and bracketed field reader.
//!
//! The cursor walks a document line by line and keeps the byte offset of
//! the first unconsumed character on the current line, so a reader that
//! stops in the middle of a line hands the remainder back to the scanner.

use super::parser::{ParseError, ParseResult};

/// Lexical class of a [`Token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `{` or `[`
    Open(char),

    /// `}` or `]`
    Close(char),

    /// Quoted string, quotes included in the token text
    Str,

    /// Anything else: keywords, identifiers, numbers
    Word,
}

/// A token on the current line. `start..end` are byte offsets into the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text == word
    }

    /// Token text with surrounding quotes removed.
    pub fn unquoted(&self) -> &'a str {
        match self.kind {
            TokenKind::Str => {
                let inner = &self.text[1..];
                inner.strip_suffix('"').unwrap_or(inner)
            }
            _ => self.text,
        }
    }
}

/// Cursor over the lines of one document.
pub struct LineCursor<'a> {
    /// Lines with their terminators, so untouched lines copy back verbatim
    lines: Vec<&'a str>,
    line: usize,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.split_inclusive('\n').collect(),
            line: 0,
            pos: 0,
        }
    }

    /// True once every line has been consumed.
    pub fn at_end(&self) -> bool {
        self.line >= self.lines.len()
    }

    /// Full text of the current line, terminator included.
    pub fn line_text(&self) -> &'a str {
        self.lines.get(self.line).copied().unwrap_or("")
    }

    /// 1-based number of the current line.
    pub fn line_number(&self) -> usize {
        self.line + 1
    }

    /// Byte offset of the first unconsumed character on the current line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Unconsumed part of the current line.
    pub fn rest(&self) -> &'a str {
        let line = self.line_text();
        &line[self.pos.min(line.len())..]
    }

    /// Number of lines not yet reached, the current one included.
    pub fn remaining_lines(&self) -> usize {
        self.lines.len().saturating_sub(self.line)
    }

    /// Move to the start of the next line. Returns `false` at end of document.
    pub fn advance_line(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.line += 1;
        self.pos = 0;
        !self.at_end()
    }

    /// Next token on the current line, or `None` once the line is exhausted.
    /// Commas count as whitespace and `#` starts a comment.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let line = self.line_text();
        let bytes = line.as_bytes();
        let mut i = self.pos;

        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'#' {
            self.pos = bytes.len();
            return None;
        }

        let start = i;
        let kind = match bytes[i] {
            b'{' | b'[' => {
                i += 1;
                TokenKind::Open(bytes[start] as char)
            }
            b'}' | b']' => {
                i += 1;
                TokenKind::Close(bytes[start] as char)
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i < bytes.len() && bytes[i] == b'"' {
                    i += 1;
                }
                TokenKind::Str
            }
            _ => {
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                TokenKind::Word
            }
        };

        let end = i.min(bytes.len());
        self.pos = end;
        Some(Token {
            kind,
            text: &line[start..end],
            start,
            end,
        })
    }

    /// Next token on the current line without consuming it.
    pub fn peek_token(&mut self) -> Option<Token<'a>> {
        let pos = self.pos;
        let token = self.next_token();
        self.pos = pos;
        token
    }

    /// Next token, moving on to later lines when the current one is exhausted.
    pub fn next_token_across_lines(&mut self) -> Option<Token<'a>> {
        loop {
            if let Some(token) = self.next_token() {
                return Some(token);
            }
            if !self.advance_line() {
                return None;
            }
        }
    }

    /// Next token on this or a later line without consuming it.
    pub fn peek_token_across_lines(&mut self) -> Option<Token<'a>> {
        let (line, pos) = (self.line, self.pos);
        let token = self.next_token_across_lines();
        self.line = line;
        self.pos = pos;
        token
    }

    /// Read a bracketed array field whose opening `[` is the next token.
    ///
    /// Returns the contents with the brackets stripped and all whitespace,
    /// newlines included, collapsed to single spaces. The cursor is left
    /// just past the closing `]`.
    pub fn read_field(&mut self, field: &str) -> ParseResult<String> {
        let line = self.line_number();
        match self.next_token_across_lines() {
            Some(token) if token.kind == TokenKind::Open('[') => self.read_bracketed(field, line),
            Some(token) => Err(ParseError::Parse {
                line: self.line_number(),
                message: format!("Expected '[' after {}, found '{}'", field, token.text),
            }),
            None => Err(ParseError::UnterminatedField {
                field: field.to_string(),
                line,
            }),
        }
    }

    /// Read the body of an array whose opening `[` was just consumed.
    pub fn read_bracketed(&mut self, field: &str, start_line: usize) -> ParseResult<String> {
        let mut raw = String::new();

        loop {
            let (body, close) = array_segment(self.rest());
            raw.push(' ');
            raw.push_str(body);

            if let Some(close) = close {
                self.pos += close;
                break;
            }

            if !self.advance_line() {
                return Err(ParseError::UnterminatedField {
                    field: field.to_string(),
                    line: start_line,
                });
            }
        }

        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Array text of one line, up to the closing `]` or a `#` comment outside
/// a string. The offset is just past the `]` when the array ends here.
fn array_segment(text: &str) -> (&str, Option<usize>) {
    let bytes = text.as_bytes();
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'#' if !in_string => return (&text[..i], None),
            b']' if !in_string => return (&text[..i], Some(i + 1)),
            _ => {}
        }
        i += 1;
    }

    (text, None)
}

fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace()
        || matches!(byte, b',' | b'{' | b'}' | b'[' | b']' | b'"' | b'#')
}
