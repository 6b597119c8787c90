//! The MysoreScript lexer.
//!
//! A single-pass cursor over the source bytes producing spanned tokens.
//! Whitespace, `//` line comments and `/* … */` block comments are skipped.

use crate::token::{Keyword, Token, TokenKind};
use mysore_core::{MysoreError, MysoreResult, Span};

/// The lexer, consumed by [`tokenize`] or driven token by token.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
}

impl<'src> Lexer<'src> {
    /// Create a lexer over a source string.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Produce the next token, or a syntax error.
    pub fn next_token(&mut self) -> MysoreResult<Token> {
        self.skip_trivia()?;

        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, Span::empty(start as u32)));
        };

        let kind = match c {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,
            b':' => TokenKind::Colon,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'=' => {
                if self.eat(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    TokenKind::NotEqual
                } else {
                    return Err(self.error("unexpected '!'", start));
                }
            }
            b'<' => {
                if self.eat(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.eat(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            b'"' => self.lex_string(start)?,
            b'0'..=b'9' => self.lex_number(start)?,
            c if is_ident_start(c) => self.lex_ident(start),
            c => {
                return Err(self.error(format!("unexpected character '{}'", c as char), start));
            }
        };

        Ok(Token::new(kind, Span::new(start as u32, self.pos as u32)))
    }

    fn lex_string(&mut self, start: usize) -> MysoreResult<TokenKind> {
        // The opening quote is already consumed. MysoreScript strings have
        // no escape sequences; the literal runs to the next double quote.
        let content_start = self.pos;
        loop {
            match self.bump() {
                Some(b'"') => {
                    let text = self.source[content_start..self.pos - 1].to_owned();
                    return Ok(TokenKind::Str(text));
                }
                Some(_) => {}
                None => return Err(self.error("unterminated string literal", start)),
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> MysoreResult<TokenKind> {
        while self.first().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let text = &self.source[start..self.pos];
        let value: i64 = text
            .parse()
            .map_err(|_| self.error(format!("integer literal '{text}' out of range"), start))?;
        Ok(TokenKind::Number(value))
    }

    fn lex_ident(&mut self, start: usize) -> TokenKind {
        while self.first().is_some_and(is_ident_continue) {
            self.bump();
        }
        let text = &self.source[start..self.pos];
        match Keyword::from_ident(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(text.to_owned()),
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> MysoreResult<()> {
        loop {
            match self.first() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.second() == Some(b'/') => {
                    while self.first().is_some_and(|c| c != b'\n') {
                        self.bump();
                    }
                }
                Some(b'/') if self.second() == Some(b'*') => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    loop {
                        match self.first() {
                            Some(b'*') if self.second() == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => return Err(self.error("unterminated block comment", start)),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn first(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn second(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.first()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.first() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>, start: usize) -> MysoreError {
        MysoreError::syntax(message, Span::new(start as u32, self.pos as u32))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Lex an entire source string, including the trailing EOF token.
pub fn tokenize(source: &str) -> MysoreResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
