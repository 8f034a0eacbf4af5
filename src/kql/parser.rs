//! Recursive descent parser for KQL expressions
//!
//! # Grammar
//!
//! ```text
//! query       := or_query
//! or_query    := and_query (OR and_query)*
//! and_query   := expression (AND expression)*
//! expression  := NOT expression | '(' query ')' | field_expr | value_expr
//! field_expr  := field RANGE_OP literal
//!              | field ':' RANGE_OP literal
//!              | field ':' '{' or_query '}'
//!              | field ':' '(' or_value_list ')'
//!              | field ':' (QUOTED | literal+)
//! value_expr  := QUOTED | literal+
//! ```
//!
//! `not` binds tighter than `and`, which binds tighter than `or`. A field is
//! a single literal token whose dot-joined segments may include wildcards; a
//! lone `*` field means "all fields". Adjacent unquoted literals in value
//! position join into one value separated by single spaces.

use crate::error::{DecodeError, Result};
use crate::kql::lexer::{KqlLexer, Token, TokenKind};
use crate::kql::ParseOptions;
use crate::query::ast::Query;
use crate::query::types::{MatchOperator, NestedScoreMode, RangeBounds, Value};
use crate::reader::Position;

/// Parser for KQL sources
pub struct KqlParser {
    lexer: KqlLexer,
    current: Token,
    allow_leading_wildcards: bool,
}

/// A run of adjacent unquoted value literals.
struct ValueRun {
    joined: String,
    has_wildcard: bool,
    has_lone_star: bool,
}

impl KqlParser {
    /// Parse a KQL source into a query tree.
    pub fn parse(source: &str, options: &ParseOptions) -> Result<Query> {
        let mut lexer = KqlLexer::new(source);
        let current = lexer.next_token()?;
        if current.kind == TokenKind::Eof {
            return Ok(Query::MatchAll);
        }

        let mut parser = Self {
            lexer,
            current,
            allow_leading_wildcards: options.allow_leading_wildcards,
        };
        let query = parser.parse_or_query("")?;

        if parser.current.kind != TokenKind::Eof {
            return Err(DecodeError::new(
                parser.current.position,
                format!("unexpected {} after the query", parser.current.kind.describe()),
            ));
        }
        Ok(query)
    }

    /// Parse: or_query := and_query (OR and_query)*
    fn parse_or_query(&mut self, prefix: &str) -> Result<Query> {
        let mut clauses = vec![self.parse_and_query(prefix)?];
        while self.current.kind == TokenKind::Or {
            self.advance()?;
            clauses.push(self.parse_and_query(prefix)?);
        }
        Ok(Query::any_of(clauses))
    }

    /// Parse: and_query := expression (AND expression)*
    fn parse_and_query(&mut self, prefix: &str) -> Result<Query> {
        let mut clauses = vec![self.parse_expression(prefix)?];
        while self.current.kind == TokenKind::And {
            self.advance()?;
            clauses.push(self.parse_expression(prefix)?);
        }
        Ok(Query::all_of(clauses))
    }

    /// Parse a single expression, with an optional leading `not`.
    fn parse_expression(&mut self, prefix: &str) -> Result<Query> {
        if self.current.kind == TokenKind::Not {
            self.advance()?;
            let inner = self.parse_expression_body(prefix, true)?;
            return Ok(Query::negate(inner));
        }
        self.parse_expression_body(prefix, false)
    }

    fn parse_expression_body(&mut self, prefix: &str, negated: bool) -> Result<Query> {
        match &self.current.kind {
            TokenKind::LParen => {
                let open = self.current.position;
                self.advance()?;
                let query = self.parse_or_query(prefix)?;
                self.expect_closing(TokenKind::RParen, open)?;
                Ok(query)
            }
            TokenKind::Literal(_) | TokenKind::Wildcard(_) => {
                let head = self.current.clone();
                self.advance()?;
                self.parse_after_head(prefix, head, negated)
            }
            TokenKind::Quoted(_) => {
                let head = self.current.clone();
                self.advance()?;
                match self.current.kind {
                    TokenKind::Colon | TokenKind::Lt | TokenKind::Lte | TokenKind::Gt
                    | TokenKind::Gte => self.parse_after_head(prefix, head, negated),
                    // A quoted literal with no field is a field-less phrase.
                    _ => Ok(Query::MatchPhrase {
                        field: "*".to_string(),
                        value: token_text(&head).to_string().into(),
                    }),
                }
            }
            _ => Err(DecodeError::new(
                self.current.position,
                format!("expected an expression, found {}", self.current.kind.describe()),
            )),
        }
    }

    /// Parse what follows a leading literal: a range operator, a `:` and a
    /// field value, or more field-less value literals.
    fn parse_after_head(&mut self, prefix: &str, head: Token, negated: bool) -> Result<Query> {
        match self.current.kind {
            TokenKind::Gt => self.parse_range(prefix, &head, RangeOp::Gt),
            TokenKind::Gte => self.parse_range(prefix, &head, RangeOp::Gte),
            TokenKind::Lt => self.parse_range(prefix, &head, RangeOp::Lt),
            TokenKind::Lte => self.parse_range(prefix, &head, RangeOp::Lte),
            TokenKind::Colon => {
                let colon = self.current.position;
                self.advance()?;
                self.parse_field_value(prefix, &head, negated, colon)
            }
            _ => {
                // No field: the head starts a field-less value run.
                let mut run = self.run_from(&head)?;
                self.extend_value_run(&mut run)?;
                Ok(Self::value_expression("*", run))
            }
        }
    }

    /// Parse the value side of `field: ...`.
    fn parse_field_value(
        &mut self,
        prefix: &str,
        head: &Token,
        negated: bool,
        colon: Position,
    ) -> Result<Query> {
        let head_text = token_text(head);
        let field = if head_text == "*" {
            // A lone wildcard field searches all fields, even inside a
            // nested block.
            "*".to_string()
        } else {
            format!("{prefix}{head_text}")
        };

        match &self.current.kind {
            TokenKind::LBrace => {
                if negated {
                    return Err(DecodeError::new(
                        colon,
                        "a nested query cannot directly follow `not`",
                    ));
                }
                let open = self.current.position;
                self.advance()?;
                let inner_prefix = format!("{field}.");
                let query = self.parse_or_query(&inner_prefix)?;
                self.expect_closing(TokenKind::RBrace, open)?;
                Ok(Query::Nested {
                    path: field,
                    query: Box::new(query),
                    score_mode: NestedScoreMode::None,
                })
            }
            TokenKind::LParen => {
                let open = self.current.position;
                self.advance()?;
                let query = self.parse_or_value_list(&field)?;
                self.expect_closing(TokenKind::RParen, open)?;
                Ok(query)
            }
            TokenKind::Quoted(value) => {
                let value = value.clone();
                self.advance()?;
                Ok(Query::MatchPhrase {
                    field,
                    value: value.into(),
                })
            }
            TokenKind::Literal(_) | TokenKind::Wildcard(_) => {
                let run = self.collect_value_run()?;
                Ok(Self::value_expression(&field, run))
            }
            TokenKind::Gt => self.parse_range_for(field, RangeOp::Gt),
            TokenKind::Gte => self.parse_range_for(field, RangeOp::Gte),
            TokenKind::Lt => self.parse_range_for(field, RangeOp::Lt),
            TokenKind::Lte => self.parse_range_for(field, RangeOp::Lte),
            _ => Err(DecodeError::new(
                self.current.position,
                format!("expected a field value, found {}", self.current.kind.describe()),
            )),
        }
    }

    /// Parse: list_value := '(' and_value_list (OR and_value_list)* ')'
    fn parse_or_value_list(&mut self, field: &str) -> Result<Query> {
        let mut clauses = vec![self.parse_and_value_list(field)?];
        while self.current.kind == TokenKind::Or {
            self.advance()?;
            clauses.push(self.parse_and_value_list(field)?);
        }
        Ok(Query::any_of(clauses))
    }

    fn parse_and_value_list(&mut self, field: &str) -> Result<Query> {
        let mut clauses = Vec::new();
        loop {
            let negated = if self.current.kind == TokenKind::Not {
                self.advance()?;
                true
            } else {
                false
            };

            let clause = match &self.current.kind {
                TokenKind::LParen => {
                    let open = self.current.position;
                    self.advance()?;
                    let query = self.parse_or_value_list(field)?;
                    self.expect_closing(TokenKind::RParen, open)?;
                    query
                }
                TokenKind::Quoted(value) => {
                    let value = value.clone();
                    self.advance()?;
                    Query::MatchPhrase {
                        field: field.to_string(),
                        value: value.into(),
                    }
                }
                TokenKind::Literal(_) | TokenKind::Wildcard(_) => {
                    let run = self.collect_value_run()?;
                    Self::value_expression(field, run)
                }
                _ => {
                    return Err(DecodeError::new(
                        self.current.position,
                        format!("expected a value, found {}", self.current.kind.describe()),
                    ))
                }
            };

            clauses.push(if negated { Query::negate(clause) } else { clause });

            if self.current.kind != TokenKind::And {
                break;
            }
            self.advance()?;
        }
        Ok(Query::all_of(clauses))
    }

    /// Start a value run from an already consumed token.
    fn run_from(&self, head: &Token) -> Result<ValueRun> {
        let is_wildcard = matches!(head.kind, TokenKind::Wildcard(_));
        let text = token_text(head);
        self.check_leading_wildcard(text, is_wildcard, head.position)?;
        Ok(ValueRun {
            joined: text.to_string(),
            has_wildcard: is_wildcard,
            has_lone_star: is_wildcard && text == "*",
        })
    }

    /// Collect a run of adjacent unquoted literals into one space-joined
    /// value. The current token must be the first literal of the run.
    fn collect_value_run(&mut self) -> Result<ValueRun> {
        let head = self.current.clone();
        self.advance()?;
        let mut run = self.run_from(&head)?;
        self.extend_value_run(&mut run)?;
        Ok(run)
    }

    fn extend_value_run(&mut self, run: &mut ValueRun) -> Result<()> {
        loop {
            let is_wildcard = match &self.current.kind {
                TokenKind::Literal(_) => false,
                TokenKind::Wildcard(_) => true,
                _ => break,
            };
            let part = token_text(&self.current).to_string();
            self.check_leading_wildcard(&part, is_wildcard, self.current.position)?;
            run.has_wildcard |= is_wildcard;
            run.has_lone_star |= is_wildcard && part == "*";
            run.joined.push(' ');
            run.joined.push_str(&part);
            self.advance()?;
        }
        Ok(())
    }

    /// Map a collected value run onto a query for the given field.
    fn value_expression(field: &str, run: ValueRun) -> Query {
        if field == "*" {
            if run.has_lone_star {
                Query::MatchAll
            } else if run.has_wildcard {
                // A cross-field wildcard search is delegated to the server's
                // own query parser.
                Query::QueryString { query: run.joined }
            } else {
                Query::Match {
                    field: "*".to_string(),
                    value: run.joined.into(),
                    operator: MatchOperator::Or,
                }
            }
        } else if run.has_lone_star {
            Query::Exists {
                field: field.to_string(),
            }
        } else if run.has_wildcard {
            Query::Wildcard {
                field: field.to_string(),
                value: run.joined,
            }
        } else {
            Query::Match {
                field: field.to_string(),
                value: run.joined.into(),
                operator: MatchOperator::Or,
            }
        }
    }

    fn parse_range(&mut self, prefix: &str, head: &Token, op: RangeOp) -> Result<Query> {
        let field = format!("{prefix}{}", token_text(head));
        self.parse_range_for(field, op)
    }

    /// Parse the bound literal of a range expression. The operator token is
    /// the current token when called.
    fn parse_range_for(&mut self, field: String, op: RangeOp) -> Result<Query> {
        self.advance()?;
        let bound = match &self.current.kind {
            TokenKind::Literal(v) | TokenKind::Wildcard(v) => Value::promoted(v),
            _ => {
                return Err(DecodeError::new(
                    self.current.position,
                    format!("expected a range value, found {}", self.current.kind.describe()),
                ))
            }
        };
        self.advance()?;

        let mut bounds = RangeBounds::default();
        match op {
            RangeOp::Gt => bounds.gt = Some(bound),
            RangeOp::Gte => bounds.gte = Some(bound),
            RangeOp::Lt => bounds.lt = Some(bound),
            RangeOp::Lte => bounds.lte = Some(bound),
        }
        Ok(Query::Range { field, bounds })
    }

    fn check_leading_wildcard(
        &self,
        value: &str,
        is_wildcard: bool,
        position: Position,
    ) -> Result<()> {
        if !self.allow_leading_wildcards && is_wildcard && value.starts_with('*') {
            return Err(DecodeError::new(position, "leading wildcards are forbidden"));
        }
        Ok(())
    }

    /// Consume an expected closing delimiter. A missing delimiter at end of
    /// input is reported at the opening one.
    fn expect_closing(&mut self, expected: TokenKind, open: Position) -> Result<()> {
        if self.current.kind == expected {
            self.advance()?;
            return Ok(());
        }
        if self.current.kind == TokenKind::Eof {
            let what = if expected == TokenKind::RParen { "(" } else { "{" };
            return Err(DecodeError::new(open, format!("unmatched `{what}`")));
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

fn token_text(token: &Token) -> &str {
    match &token.kind {
        TokenKind::Literal(v) | TokenKind::Wildcard(v) | TokenKind::Quoted(v) => v,
        _ => "",
    }
}

enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}
