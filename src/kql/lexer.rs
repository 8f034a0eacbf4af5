//! Lexer for KQL expressions
//!
//! Tokenizes a KQL source string into a stream of position-tagged tokens.
//! Reserved words `and`, `or` and `not` match case-insensitively and only as
//! standalone words; everything else is case-sensitive.

use crate::error::{DecodeError, Result};
use crate::reader::{Position, SourceReader};

/// Token kinds for KQL parsing
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An unquoted literal with escapes resolved
    Literal(String),
    /// An unquoted literal containing at least one unescaped `*`
    Wildcard(String),
    /// The contents of a double-quoted string, escapes resolved
    Quoted(String),

    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `=`, reserved but never valid in a query
    Eq,
    /// `:` field/value separator
    Colon,
    /// `(` grouping
    LParen,
    /// `)` grouping
    RParen,
    /// `{` nested object block
    LBrace,
    /// `}` nested object block
    RBrace,

    /// `and` keyword
    And,
    /// `or` keyword
    Or,
    /// `not` keyword
    Not,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Human description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Literal(v) | TokenKind::Wildcard(v) => format!("literal `{v}`"),
            TokenKind::Quoted(_) => "quoted string".to_string(),
            TokenKind::Lt => "`<`".to_string(),
            TokenKind::Lte => "`<=`".to_string(),
            TokenKind::Gt => "`>`".to_string(),
            TokenKind::Gte => "`>=`".to_string(),
            TokenKind::Eq => "`=`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
            TokenKind::And => "`and`".to_string(),
            TokenKind::Or => "`or`".to_string(),
            TokenKind::Not => "`not`".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// A token with the position it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// Lexer for tokenizing KQL sources
pub struct KqlLexer {
    reader: SourceReader,
}

impl KqlLexer {
    /// Create a new lexer for the given source.
    pub fn new(input: &str) -> Self {
        Self {
            reader: SourceReader::new(input),
        }
    }

    /// Get the next token. After the input is exhausted, keeps returning
    /// [`TokenKind::Eof`] at the end-of-input position.
    pub fn next_token(&mut self) -> Result<Token> {
        self.reader.skip_whitespace();
        let position = self.reader.position();

        let Some(ch) = self.reader.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position,
            });
        };

        let kind = match ch {
            ':' => self.single(TokenKind::Colon),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '=' => self.single(TokenKind::Eq),
            '<' => self.comparison(TokenKind::Lt, TokenKind::Lte),
            '>' => self.comparison(TokenKind::Gt, TokenKind::Gte),
            '"' => self.read_quoted(position)?,
            _ => self.read_literal(position)?,
        };

        Ok(Token { kind, position })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.reader.advance();
        kind
    }

    fn comparison(&mut self, bare: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.reader.advance();
        if self.reader.peek() == Some('=') {
            self.reader.advance();
            with_eq
        } else {
            bare
        }
    }

    /// Read an unquoted literal. Backslash escapes the following character;
    /// an unescaped `*` turns the whole literal into a wildcard token.
    fn read_literal(&mut self, start: Position) -> Result<TokenKind> {
        let mut value = String::new();
        let mut escaped = false;
        let mut wildcard = false;

        while let Some(ch) = self.reader.peek() {
            match ch {
                ch if ch.is_whitespace() => break,
                ':' | '(' | ')' | '{' | '}' | '"' | '<' | '>' | '=' => break,
                '\\' => {
                    let escape_position = self.reader.position();
                    self.reader.advance();
                    match self.reader.advance() {
                        Some(escaped_char) => value.push(escaped_char),
                        None => {
                            return Err(DecodeError::new(
                                escape_position,
                                "dangling escape character at end of input",
                            ))
                        }
                    }
                    escaped = true;
                }
                '*' => {
                    wildcard = true;
                    value.push(ch);
                    self.reader.advance();
                }
                _ => {
                    value.push(ch);
                    self.reader.advance();
                }
            }
        }

        if value.is_empty() {
            // Unreachable from next_token, which only dispatches here on a
            // valid literal start.
            return Err(DecodeError::new(start, "expected a literal"));
        }

        // Reserved words only match whole, unescaped literals.
        if !escaped {
            match value.to_lowercase().as_str() {
                "and" => return Ok(TokenKind::And),
                "or" => return Ok(TokenKind::Or),
                "not" => return Ok(TokenKind::Not),
                _ => {}
            }
        }

        if wildcard {
            Ok(TokenKind::Wildcard(value))
        } else {
            Ok(TokenKind::Literal(value))
        }
    }

    /// Read a double-quoted string. Supports `\\`, `\"`, `\n`, `\r`, `\t`
    /// and `\uXXXX`; any other escaped character stands for itself.
    fn read_quoted(&mut self, open: Position) -> Result<TokenKind> {
        self.reader.advance();
        let mut value = String::new();

        loop {
            let Some(ch) = self.reader.peek() else {
                return Err(DecodeError::new(open, "unterminated quoted string"));
            };
            match ch {
                '"' => {
                    self.reader.advance();
                    return Ok(TokenKind::Quoted(value));
                }
                '\\' => {
                    let escape_position = self.reader.position();
                    self.reader.advance();
                    match self.reader.advance() {
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('u') => value.push(self.read_unicode_escape(open, escape_position)?),
                        Some(escaped_char) => value.push(escaped_char),
                        None => {
                            return Err(DecodeError::new(open, "unterminated quoted string"));
                        }
                    }
                }
                _ => {
                    value.push(ch);
                    self.reader.advance();
                }
            }
        }
    }

    /// Read the 4 hex digits of a `\uXXXX` escape. Running off the end of
    /// input here is an unterminated string, reported at the opening quote;
    /// a non-hex character is an invalid escape, reported at the backslash.
    fn read_unicode_escape(&mut self, open: Position, escape_position: Position) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(ch) = self.reader.peek() else {
                return Err(DecodeError::new(open, "unterminated quoted string"));
            };
            let digit = ch.to_digit(16).ok_or_else(|| {
                DecodeError::new(escape_position, "invalid unicode escape, expected 4 hex digits")
            })?;
            code = code * 16 + digit;
            self.reader.advance();
        }
        char::from_u32(code)
            .ok_or_else(|| DecodeError::new(escape_position, "invalid unicode escape"))
    }
}
