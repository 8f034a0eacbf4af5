//! Structural validator for Lucene query syntax
//!
//! # Grammar
//!
//! ```text
//! query       := or_expr
//! or_expr     := and_expr (OR and_expr)*
//! and_expr    := not_expr (AND? not_expr)*
//! not_expr    := (NOT | '!')* ('+' | '-')? primary
//! primary     := field_query | grouped | range | term_expr
//! field_query := TERM ':' (range | grouped | value)
//! range       := ('[' | '{') value TO value (']' | '}')
//! value       := TERM | PHRASE | REGEX
//! grouped     := '(' or_expr ')'
//! modifiers   := ('~' number?)* ('^' number?)*
//! ```
//!
//! The walk checks structure only: balanced delimiters, terminated phrases
//! and regular expressions, and operators in positions where an operand is
//! expected or present. No tree is built; a well-formed input becomes a
//! single `query_string` query holding the original source, leaving
//! semantics to the server's own Lucene parser. This trades early semantic
//! errors for exact behavioral parity with the server.

use crate::error::{DecodeError, Result};
use crate::lucene::lexer::{LuceneLexer, Token, TokenKind};
use crate::query::ast::Query;
use crate::reader::Position;

/// Validating parser for Lucene query strings
pub struct LuceneParser {
    lexer: LuceneLexer,
    current: Token,
}

impl LuceneParser {
    /// Validate a Lucene source and wrap it into a query tree.
    ///
    /// Empty and whitespace-only input matches everything, as an empty
    /// search bar does.
    pub fn parse(source: &str) -> Result<Query> {
        let mut lexer = LuceneLexer::new(source);
        let current = lexer.next_token()?;
        if current.kind == TokenKind::Eof {
            return Ok(Query::MatchAll);
        }

        let mut parser = Self { lexer, current };
        parser.parse_or_expr()?;
        if parser.current.kind != TokenKind::Eof {
            return Err(DecodeError::new(
                parser.current.position,
                format!("unexpected {} after the query", parser.current.kind.describe()),
            ));
        }

        Ok(Query::QueryString {
            query: source.to_string(),
        })
    }

    /// Parse: or_expr := and_expr (OR and_expr)*
    fn parse_or_expr(&mut self) -> Result<()> {
        self.parse_and_expr()?;
        while self.current.kind == TokenKind::Or {
            self.advance()?;
            self.parse_and_expr()?;
        }
        Ok(())
    }

    /// Parse: and_expr := not_expr (AND? not_expr)*
    ///
    /// Adjacent operands without an explicit operator are valid Lucene; the
    /// server combines them with its default operator.
    fn parse_and_expr(&mut self) -> Result<()> {
        self.parse_not_expr()?;
        loop {
            if self.current.kind == TokenKind::And {
                self.advance()?;
                self.parse_not_expr()?;
            } else if self.is_start_of_not_expr() {
                self.parse_not_expr()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Parse: not_expr := (NOT | '!')* ('+' | '-')? primary
    fn parse_not_expr(&mut self) -> Result<()> {
        while self.current.kind == TokenKind::Not {
            self.advance()?;
        }
        if matches!(self.current.kind, TokenKind::Plus | TokenKind::Minus) {
            self.advance()?;
        }
        self.parse_primary()
    }

    /// Parse: primary := field_query | grouped | range | term_expr
    fn parse_primary(&mut self) -> Result<()> {
        match &self.current.kind {
            TokenKind::LParen => {
                let open = self.current.position;
                self.advance()?;
                self.parse_or_expr()?;
                self.expect_closing(TokenKind::RParen, open)?;
                self.parse_modifiers()
            }
            TokenKind::Term(_) => {
                self.advance()?;
                if self.current.kind == TokenKind::Colon {
                    self.advance()?;
                    self.parse_field_value()
                } else {
                    self.parse_modifiers()
                }
            }
            TokenKind::Phrase(_) | TokenKind::Regex(_) => {
                self.advance()?;
                self.parse_modifiers()
            }
            TokenKind::LBracket | TokenKind::LBrace => self.parse_range(),
            _ => Err(DecodeError::new(
                self.current.position,
                format!("expected a term, found {}", self.current.kind.describe()),
            )),
        }
    }

    /// Parse the value side of `field:`.
    fn parse_field_value(&mut self) -> Result<()> {
        match &self.current.kind {
            TokenKind::LBracket | TokenKind::LBrace => self.parse_range(),
            TokenKind::LParen => {
                let open = self.current.position;
                self.advance()?;
                self.parse_or_expr()?;
                self.expect_closing(TokenKind::RParen, open)?;
                self.parse_modifiers()
            }
            TokenKind::Term(_) | TokenKind::Phrase(_) | TokenKind::Regex(_) => {
                self.advance()?;
                self.parse_modifiers()
            }
            _ => Err(DecodeError::new(
                self.current.position,
                format!(
                    "expected a value after `:`, found {}",
                    self.current.kind.describe()
                ),
            )),
        }
    }

    /// Parse: range := ('[' | '{') value TO value (']' | '}')
    ///
    /// Lucene permits mixing inclusive and exclusive delimiters.
    fn parse_range(&mut self) -> Result<()> {
        let open = self.current.position;
        self.advance()?;
        self.parse_range_value()?;
        if self.current.kind != TokenKind::To {
            return Err(DecodeError::new(
                self.current.position,
                format!("expected `TO`, found {}", self.current.kind.describe()),
            ));
        }
        self.advance()?;
        self.parse_range_value()?;
        match self.current.kind {
            TokenKind::RBracket | TokenKind::RBrace => {
                self.advance()?;
                self.parse_modifiers()
            }
            TokenKind::Eof => Err(DecodeError::new(open, "unterminated range")),
            _ => Err(DecodeError::new(
                self.current.position,
                format!(
                    "expected `]` or `}}` to close the range, found {}",
                    self.current.kind.describe()
                ),
            )),
        }
    }

    fn parse_range_value(&mut self) -> Result<()> {
        // A leading minus makes a negative bound.
        if self.current.kind == TokenKind::Minus {
            self.advance()?;
        }
        match &self.current.kind {
            TokenKind::Term(_) | TokenKind::Phrase(_) => {
                self.advance()?;
                Ok(())
            }
            _ => Err(DecodeError::new(
                self.current.position,
                format!(
                    "expected a range value, found {}",
                    self.current.kind.describe()
                ),
            )),
        }
    }

    /// Consume any `~`/`^` postfix modifiers.
    fn parse_modifiers(&mut self) -> Result<()> {
        while matches!(self.current.kind, TokenKind::Tilde(_) | TokenKind::Caret(_)) {
            self.advance()?;
        }
        Ok(())
    }

    fn is_start_of_not_expr(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Term(_)
                | TokenKind::Phrase(_)
                | TokenKind::Regex(_)
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Not
                | TokenKind::Plus
                | TokenKind::Minus
        )
    }

    /// Consume an expected closing delimiter, reporting a missing one at
    /// end of input against the opening delimiter.
    fn expect_closing(&mut self, expected: TokenKind, open: Position) -> Result<()> {
        if self.current.kind == expected {
            self.advance()?;
            return Ok(());
        }
        if self.current.kind == TokenKind::Eof {
            return Err(DecodeError::new(open, "unmatched `(`"));
        }
        Err(DecodeError::new(
            self.current.position,
            format!(
                "expected {}, found {}",
                expected.describe(),
                self.current.kind.describe()
            ),
        ))
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Query {
        LuceneParser::parse(input).unwrap()
    }

    fn assert_preserved(input: &str) {
        assert_eq!(
            parse(input),
            Query::QueryString {
                query: input.to_string(),
            },
            "source should be preserved verbatim for {input:?}"
        );
    }

    #[test]
    fn test_valid_queries_become_query_string() {
        for input in [
            "rust",
            "a:b AND c:d",
            "title:rust AND (tags:tutorial OR tags:guide)",
            "+required -excluded",
            "a && b || !c",
            "content:\"exact phrase\"~2",
            "title:prog*",
            "te?t",
            "author:john~",
            "author:john~1",
            "speed^2.5",
            "year:[2020 TO 2024]",
            "year:{2020 TO 2024}",
            "year:[2020 TO 2024}",
            "year:[* TO 2024]",
            "price:[-5 TO 5]",
            "[a TO b]",
            "created:[2024-01-01 TO 2024-12-31]",
            "name:/joh?n(ath[oa]n)/",
            "NOT draft",
            "NOT NOT draft",
            "a b c",
            "title:(rust OR go)",
            "\"a phrase\"^3",
        ] {
            assert_preserved(input);
        }
    }

    #[test]
    fn test_empty_input_matches_all() {
        assert_eq!(LuceneParser::parse("").unwrap(), Query::MatchAll);
        assert_eq!(LuceneParser::parse("   \n ").unwrap(), Query::MatchAll);
    }

    #[test]
    fn test_invalid_queries() {
        for input in [
            "(rust AND go",
            "rust AND",
            "AND rust",
            "OR",
            "a OR OR b",
            "a && || b",
            "year:[2020 TO",
            "year:[2020 2024]",
            "year:[TO 2024]",
            "field:",
            "\"unterminated",
            "name:/never",
            "a & b",
            "+",
            "-",
            "NOT",
            "~2",
            "^2",
        ] {
            assert!(
                LuceneParser::parse(input).is_err(),
                "expected failure for {input:?}"
            );
        }
    }

    #[test]
    fn test_error_position_for_unmatched_paren() {
        let err = LuceneParser::parse("title:(rust AND go").unwrap_err();
        assert_eq!(err.offset, 6);
        assert_eq!(err.column, 7);
    }

    #[test]
    fn test_error_position_for_misplaced_operator() {
        let err = LuceneParser::parse("a OR OR b").unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn test_whitespace_is_preserved_in_query_string() {
        assert_preserved("a:b   AND\tc:d");
    }
}
