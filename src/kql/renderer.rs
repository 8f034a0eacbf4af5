//! Renders a query tree back to KQL source
//!
//! The inverse of the KQL parser for the tree shapes KQL can express.
//! Precedence lost by tree construction is reintroduced with parentheses,
//! and literals are escaped with the inverse of the lexer's escape rules.
//! Variants that KQL has no syntax for fail with a [`DecodeError`] naming
//! the variant.

use crate::error::{DecodeError, Result};
use crate::query::ast::Query;
use crate::query::types::{MatchOperator, MultiMatchType, NestedScoreMode, Value};

/// Render a query tree as KQL source.
pub fn render(query: &Query) -> Result<String> {
    render_query(query, "", false, false)
}

/// Recursive walk. `prefix` is the nested field prefix to strip, `in_and`
/// and `in_not` tell whether the surrounding context requires parentheses
/// around multi-clause output.
fn render_query(query: &Query, prefix: &str, in_and: bool, in_not: bool) -> Result<String> {
    match query {
        Query::MatchAll => Ok("*".to_string()),
        Query::Exists { field } => {
            let field = strip_prefix(field, prefix, "exists")?;
            Ok(format!("{}: *", escape_literal(field)))
        }
        Query::Match {
            field,
            value,
            operator,
        } => {
            if *operator == MatchOperator::And {
                return Err(not_representable("a match query with the `and` operator"));
            }
            if field == "*" {
                return Ok(escape_literal(&value.to_literal()));
            }
            let field = strip_prefix(field, prefix, "match")?;
            Ok(format!(
                "{}: {}",
                escape_literal(field),
                escape_literal(&value.to_literal())
            ))
        }
        Query::MatchPhrase { field, value } => {
            if field == "*" {
                return Ok(format!("\"{}\"", escape_quoted(&value.to_literal())));
            }
            let field = strip_prefix(field, prefix, "match_phrase")?;
            Ok(format!(
                "{}: \"{}\"",
                escape_literal(field),
                escape_quoted(&value.to_literal())
            ))
        }
        Query::MultiMatch {
            query_type,
            value,
            fields,
            operator,
        } => {
            if fields.is_some() {
                return Err(not_representable("a multi-match query with explicit fields"));
            }
            if operator == &Some(MatchOperator::And) {
                return Err(not_representable("a multi-match query with the `and` operator"));
            }
            match query_type {
                None | Some(MultiMatchType::BestFields) => Ok(escape_literal(value)),
                Some(MultiMatchType::Phrase) => Ok(format!("\"{}\"", escape_quoted(value))),
                Some(other) => Err(not_representable(&format!(
                    "a multi-match query of type {}",
                    other.as_str()
                ))),
            }
        }
        Query::Wildcard { field, value } => {
            let field = strip_prefix(field, prefix, "wildcard")?;
            Ok(format!("{}: {}", escape_literal(field), escape_literal(value)))
        }
        Query::QueryString { query } => Ok(query.clone()),
        Query::Nested {
            path,
            query,
            score_mode,
        } => {
            if *score_mode != NestedScoreMode::None {
                return Err(not_representable(&format!(
                    "a nested query with score mode {}",
                    score_mode.as_str()
                )));
            }
            let stripped = strip_prefix(path, prefix, "nested")?;
            let inner_prefix = format!("{path}.");
            let inner = render_query(query, &inner_prefix, false, false)?;
            Ok(format!("{}: {{ {} }}", escape_literal(stripped), inner))
        }
        Query::Range { field, bounds } => {
            if bounds.time_zone.is_some() {
                return Err(not_representable("a range query with a time zone"));
            }
            let field = strip_prefix(field, prefix, "range")?;
            let field = escape_literal(field);
            let mut comparisons = Vec::new();
            for (op, bound) in [
                (">", &bounds.gt),
                (">=", &bounds.gte),
                ("<", &bounds.lt),
                ("<=", &bounds.lte),
            ] {
                if let Some(bound) = bound {
                    comparisons.push(format!("{field} {op} {}", render_bound(bound)));
                }
            }
            if comparisons.len() > 1 && in_not {
                Ok(format!("({})", comparisons.join(" and ")))
            } else {
                Ok(comparisons.join(" and "))
            }
        }
        Query::Bool {
            must,
            should,
            must_not,
            filter,
            minimum_should_match,
        } => render_bool(
            must,
            should,
            must_not,
            filter,
            *minimum_should_match,
            prefix,
            in_and,
            in_not,
        ),
        Query::MatchNone => Err(not_representable("a match_none query")),
        Query::Term { .. } => Err(not_representable("a term query")),
        Query::MatchPhrasePrefix { .. } => Err(not_representable("a match_phrase_prefix query")),
        Query::Regexp { .. } => Err(not_representable("a regexp query")),
        Query::Fuzzy { .. } => Err(not_representable("a fuzzy query")),
        Query::Prefix { .. } => Err(not_representable("a prefix query")),
    }
}

#[allow(clippy::too_many_arguments)]
fn render_bool(
    must: &[Query],
    should: &[Query],
    must_not: &[Query],
    filter: &[Query],
    minimum_should_match: Option<u64>,
    prefix: &str,
    in_and: bool,
    in_not: bool,
) -> Result<String> {
    // `minimum_should_match` equal to the number of should clauses turns the
    // OR into an AND; 1 (or unset) is a plain OR. Anything in between has no
    // KQL spelling.
    let mut and_clauses: Vec<&Query> = must.iter().chain(filter.iter()).collect();
    let mut or_clauses: Vec<&Query> = should.iter().collect();
    match minimum_should_match {
        Some(n) if !or_clauses.is_empty() && n == or_clauses.len() as u64 => {
            and_clauses.append(&mut or_clauses);
        }
        None | Some(1) => {}
        Some(0) => {}
        Some(_) => {
            return Err(not_representable(
                "a boolean query with a partial minimum_should_match",
            ))
        }
    }

    if and_clauses.is_empty() && must_not.is_empty() {
        // Pure OR clause.
        if or_clauses.is_empty() {
            return Err(not_representable("an empty boolean query"));
        }
        let multiple = or_clauses.len() > 1;
        let rendered = or_clauses
            .iter()
            .map(|clause| {
                render_query(clause, prefix, in_and && !multiple, in_not && !multiple)
            })
            .collect::<Result<Vec<_>>>()?
            .join(" or ");
        if multiple && (in_and || in_not) {
            return Ok(format!("({rendered})"));
        }
        return Ok(rendered);
    }

    // AND clause, with the OR and NOT groups as members.
    let member_count = and_clauses.len()
        + usize::from(!or_clauses.is_empty())
        + usize::from(!must_not.is_empty());
    let multiple = member_count > 1;

    let mut parts = Vec::with_capacity(member_count);
    for clause in &and_clauses {
        parts.push(render_query(
            clause,
            prefix,
            in_and || multiple,
            in_not && !multiple,
        )?);
    }

    match or_clauses.len() {
        0 => {}
        1 => parts.push(render_query(
            or_clauses[0],
            prefix,
            in_and || multiple,
            in_not && !multiple,
        )?),
        _ => {
            let rendered = or_clauses
                .iter()
                .map(|clause| render_query(clause, prefix, false, false))
                .collect::<Result<Vec<_>>>()?
                .join(" or ");
            parts.push(format!("({rendered})"));
        }
    }

    match must_not.len() {
        0 => {}
        1 => parts.push(format!(
            "not {}",
            render_query(&must_not[0], prefix, false, true)?
        )),
        _ => {
            let rendered = must_not
                .iter()
                .map(|clause| render_query(clause, prefix, false, false))
                .collect::<Result<Vec<_>>>()?
                .join(" or ");
            parts.push(format!("not ({rendered})"));
        }
    }

    let rendered = parts.join(" and ");
    if in_not && multiple {
        Ok(format!("({rendered})"))
    } else {
        Ok(rendered)
    }
}

fn render_bound(bound: &Value) -> String {
    escape_literal(&bound.to_literal())
}

fn not_representable(what: &str) -> DecodeError {
    DecodeError::sourceless(format!("{what} is not representable in KQL"))
}

fn strip_prefix<'a>(field: &'a str, prefix: &str, what: &str) -> Result<&'a str> {
    field.strip_prefix(prefix).ok_or_else(|| {
        DecodeError::sourceless(format!(
            "{what} field `{field}` does not start with the nested prefix `{prefix}`"
        ))
    })
}

/// Escape a bare literal so the lexer reads it back as one token. The `*`
/// wildcard is deliberately left alone.
fn escape_literal(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '\\' | '(' | ')' | ':' | '<' | '>' | '"' | '{' | '}' | '=') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escape the contents of a double-quoted string.
fn escape_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
