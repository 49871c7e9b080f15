//! The lexer: turns a source buffer into a token stream and builds the
//! row index used for snippet rendering.

use crate::diagnostic::Diagnostic;
use crate::location::{LineIndex, Location};
use crate::token::{Token, TokenKind};

/// Everything the lexer produced. The row index is complete even when
/// lexing failed, so the error itself can be rendered.
pub struct LexOutput<'s> {
    pub tokens: Vec<Token<'s>>,
    pub index: LineIndex,
    pub error: Option<Diagnostic>,
}

/// Lexes `source` in one pass. The token stream always ends with a
/// [`TokenKind::End`] token so the parser never runs off the end.
#[must_use]
pub fn lex(source: &str) -> LexOutput<'_> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    row: u16,
    col: u16,
    index: LineIndex,
    tokens: Vec<Token<'s>>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            row: 1,
            col: 1,
            index: LineIndex::new(),
            tokens: Vec::with_capacity(source.len() / 4),
        }
    }

    fn run(mut self) -> LexOutput<'s> {
        let error = loop {
            match self.next_token() {
                Ok(true) => {}
                Ok(false) => break None,
                Err(d) => break Some(d),
            }
        };
        let end_loc = Location::new(self.row, self.col, 0);
        self.tokens.push(Token {
            kind: TokenKind::End,
            text: "",
            loc: end_loc,
            offset: u32::try_from(self.pos).unwrap_or(u32::MAX),
        });
        LexOutput {
            tokens: self.tokens,
            index: self.index,
            error,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Advances one byte, maintaining the row/column counters and the
    /// row index.
    fn bump(&mut self) {
        if self.bytes[self.pos] == b'\n' {
            self.row = self.row.saturating_add(1);
            self.col = 1;
            self.pos += 1;
            self.index.add(self.row, u32::try_from(self.pos).unwrap_or(u32::MAX));
        } else {
            self.col = self.col.saturating_add(1);
            self.pos += 1;
        }
    }

    fn here(&self) -> Location {
        Location::new(self.row, self.col, 0)
    }

    fn push(&mut self, kind: TokenKind, start: usize, loc: Location) {
        let size = u32::try_from(self.pos - start).unwrap_or(u32::MAX);
        self.tokens.push(Token {
            kind,
            text: &self.source[start..self.pos],
            loc: Location { size, ..loc },
            offset: u32::try_from(start).unwrap_or(u32::MAX),
        });
    }

    /// Lexes one token. Returns `Ok(false)` at the end of input.
    fn next_token(&mut self) -> Result<bool, Diagnostic> {
        loop {
            match self.peek() {
                None => return Ok(false),
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.bump(),
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                Some(_) => break,
            }
        }

        let loc = self.here();
        let start = self.pos;
        let c = self.bytes[self.pos];
        match c {
            b'0'..=b'9' => self.number(start, loc),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while matches!(self.peek(), Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')) {
                    self.bump();
                }
                let kind = keyword(&self.source[start..self.pos]).unwrap_or(TokenKind::Ident);
                self.push(kind, start, loc);
                Ok(true)
            }
            b'"' => self.string(start, loc),
            _ => self.punct(start, loc),
        }
    }

    fn number(&mut self, start: usize, loc: Location) -> Result<bool, Diagnostic> {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        let mut kind = TokenKind::IntLit;
        // A dot only continues the number when a digit follows, so `xs[0].f`
        // still lexes the dot as a projection.
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            kind = TokenKind::DecimalLit;
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        self.push(kind, start, loc);
        Ok(true)
    }

    fn string(&mut self, start: usize, loc: Location) -> Result<bool, Diagnostic> {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(Diagnostic::error()
                        .text("Unterminated string literal.\n")
                        .snippet(Location { size: u32::try_from(self.pos - start).unwrap_or(u32::MAX), ..loc }));
                }
                Some(b'\\') => {
                    self.bump();
                    if self.peek().is_some() {
                        self.bump();
                    }
                }
                Some(b'"') => {
                    self.bump();
                    self.push(TokenKind::StringLit, start, loc);
                    return Ok(true);
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn punct(&mut self, start: usize, loc: Location) -> Result<bool, Diagnostic> {
        use TokenKind::*;
        let c = self.bytes[self.pos];
        self.bump();
        let kind = match c {
            b'+' => Plus,
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.bump();
                    Arrow
                } else {
                    Minus
                }
            }
            b'*' => Star,
            b'/' => Slash,
            b'%' => Percent,
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    EqEq
                } else {
                    Equal
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    BangEq
                } else {
                    Bang
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Le
                } else {
                    Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ge
                } else {
                    Gt
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.bump();
                    AmpAmp
                } else {
                    Amp
                }
            }
            b'|' if self.peek() == Some(b'|') => {
                self.bump();
                PipePipe
            }
            b'#' => Hash,
            b'(' => LParen,
            b')' => RParen,
            b'{' => LBrace,
            b'}' => RBrace,
            b'[' => LBracket,
            b']' => RBracket,
            b',' => Comma,
            b';' => Semicolon,
            b':' => {
                if self.peek() == Some(b':') {
                    self.bump();
                    ColonColon
                } else {
                    Colon
                }
            }
            b'.' => {
                if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'.') {
                    self.bump();
                    self.bump();
                    Ellipsis
                } else {
                    Dot
                }
            }
            _ => {
                return Err(Diagnostic::error()
                    .text("Unexpected character.\n")
                    .snippet(Location { size: 1, ..loc }));
            }
        };
        self.push(kind, start, loc);
        Ok(true)
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump(); // '/'
        self.bump(); // '*'
        while let Some(c) = self.peek() {
            if c == b'*' && self.peek_at(1) == Some(b'/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }
}

fn keyword(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match text {
        "bool" => KwBool,
        "borrow" => KwBorrow,
        "else" => KwElse,
        "extern" => KwExtern,
        "f32" => KwF32,
        "f64" => KwF64,
        "false" => KwFalse,
        "func" => KwFunc,
        "i8" => KwI8,
        "i16" => KwI16,
        "i32" => KwI32,
        "i64" => KwI64,
        "if" => KwIf,
        "let" => KwLet,
        "module" => KwModule,
        "move" => KwMove,
        "return" => KwReturn,
        "struct" => KwStruct,
        "true" => KwTrue,
        "unit" => KwUnit,
        "while" => KwWhile,
        _ => return None,
    };
    Some(kind)
}
