//! Lexer for Lucene query syntax
//!
//! Tokenizes Lucene-style query strings into a stream of position-tagged
//! tokens. Boolean operator keywords (`AND`, `OR`, `NOT`, `TO`) match in
//! upper case only, as the server's query parser requires; lower-case
//! spellings are ordinary terms.

use crate::error::{DecodeError, Result};
use crate::reader::{Position, SourceReader};

/// Token kinds for Lucene query strings
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A bare term, possibly containing `*` and `?` wildcards
    Term(String),
    /// A quoted phrase
    Phrase(String),
    /// A `/.../` regular expression
    Regex(String),

    /// `AND` or `&&`
    And,
    /// `OR` or `||`
    Or,
    /// `NOT` or `!`
    Not,
    /// `TO` range separator
    To,
    /// `:` field separator
    Colon,

    /// `+` required-term prefix
    Plus,
    /// `-` excluded-term prefix
    Minus,
    /// `~` with optional proximity or fuzziness argument
    Tilde(Option<f32>),
    /// `^` with optional boost argument
    Caret(Option<f32>),

    /// `(` grouping
    LParen,
    /// `)` grouping
    RParen,
    /// `[` inclusive range delimiter
    LBracket,
    /// `]` inclusive range delimiter
    RBracket,
    /// `{` exclusive range delimiter
    LBrace,
    /// `}` exclusive range delimiter
    RBrace,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Human description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Term(v) => format!("term `{v}`"),
            TokenKind::Phrase(_) => "quoted phrase".to_string(),
            TokenKind::Regex(_) => "regular expression".to_string(),
            TokenKind::And => "`AND`".to_string(),
            TokenKind::Or => "`OR`".to_string(),
            TokenKind::Not => "`NOT`".to_string(),
            TokenKind::To => "`TO`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Tilde(_) => "`~`".to_string(),
            TokenKind::Caret(_) => "`^`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
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

/// Lexer for tokenizing Lucene query strings
pub struct LuceneLexer {
    reader: SourceReader,
}

impl LuceneLexer {
    /// Create a new lexer for the given input.
    pub fn new(input: &str) -> Self {
        Self {
            reader: SourceReader::new(input),
        }
    }

    /// Get the next token from the input.
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
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '!' => self.single(TokenKind::Not),
            '~' => {
                self.reader.advance();
                TokenKind::Tilde(self.read_number())
            }
            '^' => {
                self.reader.advance();
                TokenKind::Caret(self.read_number())
            }
            '&' => self.double(position, '&', TokenKind::And)?,
            '|' => self.double(position, '|', TokenKind::Or)?,
            '"' => self.read_phrase(position)?,
            '/' => self.read_regex(position)?,
            _ => self.read_term(position)?,
        };

        Ok(Token { kind, position })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.reader.advance();
        kind
    }

    fn double(&mut self, position: Position, ch: char, kind: TokenKind) -> Result<TokenKind> {
        self.reader.advance();
        if self.reader.peek() == Some(ch) {
            self.reader.advance();
            Ok(kind)
        } else {
            Err(DecodeError::new(
                position,
                format!("expected `{ch}{ch}`, found a lone `{ch}`"),
            ))
        }
    }

    fn read_phrase(&mut self, open: Position) -> Result<TokenKind> {
        self.reader.advance();
        let mut value = String::new();
        loop {
            match self.reader.advance() {
                None => return Err(DecodeError::new(open, "unterminated quoted phrase")),
                Some('"') => return Ok(TokenKind::Phrase(value)),
                Some('\\') => match self.reader.advance() {
                    None => return Err(DecodeError::new(open, "unterminated quoted phrase")),
                    Some(escaped) => value.push(escaped),
                },
                Some(ch) => value.push(ch),
            }
        }
    }

    fn read_regex(&mut self, open: Position) -> Result<TokenKind> {
        self.reader.advance();
        let mut value = String::new();
        loop {
            match self.reader.advance() {
                None => {
                    return Err(DecodeError::new(open, "unterminated regular expression"))
                }
                Some('/') => return Ok(TokenKind::Regex(value)),
                Some('\\') => match self.reader.advance() {
                    None => {
                        return Err(DecodeError::new(open, "unterminated regular expression"))
                    }
                    Some(escaped) => {
                        value.push('\\');
                        value.push(escaped);
                    }
                },
                Some(ch) => value.push(ch),
            }
        }
    }

    fn read_term(&mut self, start: Position) -> Result<TokenKind> {
        let mut value = String::new();
        while let Some(ch) = self.reader.peek() {
            match ch {
                ch if ch.is_whitespace() => break,
                ':' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '~' | '^' | '!' | '/' => break,
                // A lone `&` or `|` is an ordinary term character; the
                // doubled forms are operators.
                '&' | '|' => {
                    if self.reader.peek_at(1) == Some(ch) {
                        break;
                    }
                    value.push(ch);
                    self.reader.advance();
                }
                '\\' => {
                    self.reader.advance();
                    match self.reader.advance() {
                        Some(escaped) => {
                            value.push('\\');
                            value.push(escaped);
                        }
                        None => {
                            return Err(DecodeError::new(
                                start,
                                "dangling escape character at end of input",
                            ))
                        }
                    }
                }
                _ => {
                    value.push(ch);
                    self.reader.advance();
                }
            }
        }

        if value.is_empty() {
            return Err(DecodeError::new(start, "expected a term"));
        }

        Ok(match value.as_str() {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "TO" => TokenKind::To,
            _ => TokenKind::Term(value),
        })
    }

    fn read_number(&mut self) -> Option<f32> {
        let mut number = String::new();
        let mut has_dot = false;
        while let Some(ch) = self.reader.peek() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.reader.advance();
            } else if ch == '.' && !has_dot && self.reader.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                has_dot = true;
                number.push(ch);
                self.reader.advance();
            } else {
                break;
            }
        }
        number.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<TokenKind> {
        let mut lexer = LuceneLexer::new(input);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        kinds
    }

    fn term(value: &str) -> TokenKind {
        TokenKind::Term(value.to_string())
    }

    #[test]
    fn test_field_value() {
        assert_eq!(
            tokenize("title:rust"),
            vec![term("title"), TokenKind::Colon, term("rust"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(
            tokenize("a AND b OR c NOT d"),
            vec![
                term("a"),
                TokenKind::And,
                term("b"),
                TokenKind::Or,
                term("c"),
                TokenKind::Not,
                term("d"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_symbolic_operators() {
        assert_eq!(
            tokenize("a && b || !c"),
            vec![
                term("a"),
                TokenKind::And,
                term("b"),
                TokenKind::Or,
                TokenKind::Not,
                term("c"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lowercase_operators_are_terms() {
        assert_eq!(
            tokenize("a and b"),
            vec![term("a"), term("and"), term("b"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lone_ampersand_stays_in_term() {
        assert_eq!(tokenize("AT&T"), vec![term("AT&T"), TokenKind::Eof]);
    }

    #[test]
    fn test_phrase() {
        assert_eq!(
            tokenize("\"hello world\"~2"),
            vec![
                TokenKind::Phrase("hello world".to_string()),
                TokenKind::Tilde(Some(2.0)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_fuzzy_and_boost() {
        assert_eq!(
            tokenize("rust~ speed^2.5"),
            vec![
                term("rust"),
                TokenKind::Tilde(None),
                term("speed"),
                TokenKind::Caret(Some(2.5)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_range_brackets() {
        assert_eq!(
            tokenize("year:[2020 TO 2024]"),
            vec![
                term("year"),
                TokenKind::Colon,
                TokenKind::LBracket,
                term("2020"),
                TokenKind::To,
                term("2024"),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_exclusive_range_braces() {
        assert_eq!(
            tokenize("{10 TO 20}"),
            vec![
                TokenKind::LBrace,
                term("10"),
                TokenKind::To,
                term("20"),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_plus_minus() {
        assert_eq!(
            tokenize("+required -excluded"),
            vec![
                TokenKind::Plus,
                term("required"),
                TokenKind::Minus,
                term("excluded"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_wildcard_terms() {
        assert_eq!(tokenize("prog*"), vec![term("prog*"), TokenKind::Eof]);
        assert_eq!(tokenize("te?t"), vec![term("te?t"), TokenKind::Eof]);
    }

    #[test]
    fn test_regex() {
        assert_eq!(
            tokenize("name:/joh?n(ath[oa]n)/"),
            vec![
                term("name"),
                TokenKind::Colon,
                TokenKind::Regex("joh?n(ath[oa]n)".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_escaped_special_characters() {
        assert_eq!(
            tokenize(r"file\:name"),
            vec![term(r"file\:name"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_phrase() {
        let mut lexer = LuceneLexer::new("\"unterminated");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("unterminated"), "{}", err.message);
    }

    #[test]
    fn test_unterminated_regex() {
        let mut lexer = LuceneLexer::new("name:/never");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_lone_ampersand_before_space_errors() {
        let mut lexer = LuceneLexer::new("a & b");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert!(err.message.contains("&&"), "{}", err.message);
    }
}
