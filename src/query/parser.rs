//! ES query DSL decoder
//!
//! Parses a JSON query DSL document back into a [`Query`] tree. The accepted
//! syntax is the subset of the ElasticSearch query DSL that the tree can
//! hold; unknown query types fail with a [`DecodeError`] naming the JSON
//! path at which decoding stopped.

use serde_json::{Map, Value as Json};

use crate::error::{DecodeError, Result};
use crate::query::ast::Query;
use crate::query::types::{MatchOperator, MultiMatchType, NestedScoreMode, RangeBounds, Value};

/// Decoder for JSON query DSL documents
pub struct EsQueryParser;

impl EsQueryParser {
    /// Parse a decoded JSON value into a query tree.
    ///
    /// # Example
    ///
    /// ```
    /// use kuery::query::EsQueryParser;
    ///
    /// let dsl = serde_json::json!({"bool": {"filter": [{"match": {"a": "b"}}]}});
    /// let query = EsQueryParser::parse(&dsl).unwrap();
    /// ```
    pub fn parse(json: &Json) -> Result<Query> {
        Self::parse_at(json, "")
    }

    /// Parse a JSON string into a query tree.
    pub fn parse_str(json: &str) -> Result<Query> {
        let value: Json = serde_json::from_str(json)
            .map_err(|e| DecodeError::sourceless(format!("invalid JSON: {e}")))?;
        Self::parse(&value)
    }

    fn parse_at(json: &Json, path: &str) -> Result<Query> {
        let map = json
            .as_object()
            .ok_or_else(|| fail(path, "query must be a JSON object"))?;

        // Handle the wrapped form: { "query": { ... } }
        if map.len() == 1 {
            if let Some(query) = map.get("query") {
                if path.is_empty() {
                    return Self::parse_at(query, path);
                }
            }
        }

        if map.len() != 1 {
            return Err(fail(path, "query must have exactly one key"));
        }
        let (kind, content) = map.iter().next().unwrap();

        match kind.as_str() {
            "bool" => Self::parse_bool(content, path),
            "match" => Self::parse_match(content, path),
            "match_phrase" => Self::parse_phrase(content, path, false),
            "match_phrase_prefix" => Self::parse_phrase(content, path, true),
            "multi_match" => Self::parse_multi_match(content, path),
            "match_all" => Self::parse_empty_body(content, path, "match_all", Query::MatchAll),
            "match_none" => Self::parse_empty_body(content, path, "match_none", Query::MatchNone),
            "term" => Self::parse_term(content, path),
            "exists" => Self::parse_exists(content, path),
            "range" => Self::parse_range(content, path),
            "wildcard" => Self::parse_pattern(content, path, "wildcard"),
            "regexp" => Self::parse_pattern(content, path, "regexp"),
            "prefix" => Self::parse_pattern(content, path, "prefix"),
            "fuzzy" => Self::parse_fuzzy(content, path),
            "nested" => Self::parse_nested(content, path),
            "query_string" => Self::parse_query_string(content, path),
            other => Err(fail(path, format!("unknown query type `{other}`"))),
        }
    }

    fn parse_bool(content: &Json, path: &str) -> Result<Query> {
        let map = object(content, path, "bool")?;
        check_known_keys(
            map,
            &["must", "should", "must_not", "filter", "minimum_should_match"],
            path,
            "bool",
        )?;
        let mut clauses = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];

        for (slot, key) in ["must", "should", "must_not", "filter"].iter().enumerate() {
            if let Some(value) = map.get(*key) {
                clauses[slot] = Self::parse_clause_array(value, &format!("{path}bool[{key}"))?;
            }
        }
        let [must, should, must_not, filter] = clauses;

        let minimum_should_match = match map.get("minimum_should_match") {
            None => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                fail(path, "minimum_should_match must be a non-negative integer")
            })?),
        };

        if must.is_empty() && should.is_empty() && must_not.is_empty() && filter.is_empty() {
            return Ok(Query::MatchAll);
        }

        Ok(Query::Bool {
            must,
            should,
            must_not,
            filter,
            minimum_should_match,
        })
    }

    /// Parse a clause set, accepting both an array and a single object.
    fn parse_clause_array(value: &Json, path: &str) -> Result<Vec<Query>> {
        match value {
            Json::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::parse_at(item, &format!("{path}{i}].")))
                .collect(),
            Json::Object(_) => Ok(vec![Self::parse_at(value, &format!("{path}0]."))?]),
            _ => Err(fail(path, "clause must be an array or object")),
        }
    }

    /// Parse `match` in both short and long form:
    /// `{"field": "text"}` or `{"field": {"query": "text", "operator": "and"}}`.
    fn parse_match(content: &Json, path: &str) -> Result<Query> {
        let (field, spec) = single_field(content, path, "match")?;
        match spec {
            Json::Object(spec) => {
                check_known_keys(spec, &["query", "operator"], path, "match")?;
                let value = scalar(
                    spec.get("query")
                        .ok_or_else(|| fail(path, "match query spec must have a `query` key"))?,
                    path,
                )?;
                let operator = match spec.get("operator").and_then(Json::as_str) {
                    Some("and") => MatchOperator::And,
                    _ => MatchOperator::Or,
                };
                Ok(Query::Match {
                    field,
                    value,
                    operator,
                })
            }
            other => Ok(Query::Match {
                field,
                value: scalar(other, path)?,
                operator: MatchOperator::Or,
            }),
        }
    }

    fn parse_phrase(content: &Json, path: &str, prefix: bool) -> Result<Query> {
        let (field, spec) = single_field(content, path, "match_phrase")?;
        let value = match spec {
            Json::Object(spec) => {
                check_known_keys(spec, &["query"], path, "phrase")?;
                scalar(
                    spec.get("query")
                        .ok_or_else(|| fail(path, "phrase query spec must have a `query` key"))?,
                    path,
                )?
            }
            other => scalar(other, path)?,
        };
        if prefix {
            Ok(Query::MatchPhrasePrefix { field, value })
        } else {
            Ok(Query::MatchPhrase { field, value })
        }
    }

    fn parse_multi_match(content: &Json, path: &str) -> Result<Query> {
        let map = object(content, path, "multi_match")?;
        check_known_keys(map, &["type", "query", "fields", "operator"], path, "multi_match")?;
        let value = map
            .get("query")
            .and_then(Json::as_str)
            .ok_or_else(|| fail(path, "multi_match must have a string `query`"))?
            .to_string();

        let query_type = match map.get("type").and_then(Json::as_str) {
            None => None,
            Some(s) => Some(
                MultiMatchType::from_str_opt(s)
                    .ok_or_else(|| fail(path, format!("unknown multi_match type `{s}`")))?,
            ),
        };
        let fields = match map.get("fields") {
            None => None,
            Some(Json::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| fail(path, "multi_match fields must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(_) => return Err(fail(path, "multi_match fields must be an array")),
        };
        let operator = match map.get("operator").and_then(Json::as_str) {
            Some("and") => Some(MatchOperator::And),
            Some("or") => Some(MatchOperator::Or),
            _ => None,
        };

        Ok(Query::MultiMatch {
            query_type,
            value,
            fields,
            operator,
        })
    }

    fn parse_empty_body(content: &Json, path: &str, kind: &str, query: Query) -> Result<Query> {
        let map = object(content, path, kind)?;
        check_known_keys(map, &[], path, kind)?;
        Ok(query)
    }

    fn parse_term(content: &Json, path: &str) -> Result<Query> {
        let (field, spec) = single_field(content, path, "term")?;
        let value = match spec {
            Json::Object(spec) => {
                check_known_keys(spec, &["value"], path, "term")?;
                scalar(
                    spec.get("value")
                        .ok_or_else(|| fail(path, "term query spec must have a `value` key"))?,
                    path,
                )?
            }
            other => scalar(other, path)?,
        };
        Ok(Query::Term { field, value })
    }

    fn parse_exists(content: &Json, path: &str) -> Result<Query> {
        let map = object(content, path, "exists")?;
        check_known_keys(map, &["field"], path, "exists")?;
        let field = map
            .get("field")
            .and_then(Json::as_str)
            .ok_or_else(|| fail(path, "exists must have a string `field`"))?;
        if field.is_empty() {
            return Err(fail(path, "exists field must not be empty"));
        }
        Ok(Query::Exists {
            field: field.to_string(),
        })
    }

    fn parse_range(content: &Json, path: &str) -> Result<Query> {
        let (field, spec) = single_field(content, path, "range")?;
        let map = object(spec, path, "range bounds")?;

        let mut bounds = RangeBounds::default();
        for (key, value) in map {
            match key.as_str() {
                "gt" => bounds.gt = Some(scalar(value, path)?),
                "gte" => bounds.gte = Some(scalar(value, path)?),
                "lt" => bounds.lt = Some(scalar(value, path)?),
                "lte" => bounds.lte = Some(scalar(value, path)?),
                "time_zone" => {
                    bounds.time_zone = Some(
                        value
                            .as_str()
                            .ok_or_else(|| fail(path, "time_zone must be a string"))?
                            .to_string(),
                    )
                }
                other => return Err(fail(path, format!("unknown range key `{other}`"))),
            }
        }
        if !bounds.is_bounded() {
            return Err(fail(path, "range query must set at least one bound"));
        }
        Ok(Query::Range { field, bounds })
    }

    fn parse_pattern(content: &Json, path: &str, kind: &str) -> Result<Query> {
        let (field, spec) = single_field(content, path, kind)?;
        let value = match spec {
            Json::Object(spec) => {
                check_known_keys(spec, &["value"], path, kind)?;
                spec.get("value")
                    .and_then(Json::as_str)
                    .ok_or_else(|| fail(path, format!("{kind} query spec must have a `value` key")))?
                    .to_string()
            }
            Json::String(s) => s.clone(),
            _ => return Err(fail(path, format!("{kind} value must be a string"))),
        };
        Ok(match kind {
            "wildcard" => Query::Wildcard { field, value },
            "regexp" => Query::Regexp { field, value },
            _ => Query::Prefix { field, value },
        })
    }

    fn parse_fuzzy(content: &Json, path: &str) -> Result<Query> {
        let (field, spec) = single_field(content, path, "fuzzy")?;
        match spec {
            Json::Object(spec) => {
                check_known_keys(spec, &["value", "fuzziness"], path, "fuzzy")?;
                let value = spec
                    .get("value")
                    .and_then(Json::as_str)
                    .ok_or_else(|| fail(path, "fuzzy query spec must have a `value` key"))?
                    .to_string();
                let fuzziness = match spec.get("fuzziness") {
                    None => None,
                    Some(f) => Some(
                        f.as_u64()
                            .and_then(|f| u32::try_from(f).ok())
                            .ok_or_else(|| fail(path, "fuzziness must be a small integer"))?,
                    ),
                };
                Ok(Query::Fuzzy {
                    field,
                    value,
                    fuzziness,
                })
            }
            Json::String(s) => Ok(Query::Fuzzy {
                field,
                value: s.clone(),
                fuzziness: None,
            }),
            _ => Err(fail(path, "fuzzy value must be a string")),
        }
    }

    fn parse_nested(content: &Json, path: &str) -> Result<Query> {
        let map = object(content, path, "nested")?;
        check_known_keys(map, &["path", "query", "score_mode"], path, "nested")?;
        let nested_path = map
            .get("path")
            .and_then(Json::as_str)
            .ok_or_else(|| fail(path, "nested must have a string `path`"))?
            .to_string();
        let query = Self::parse_at(
            map.get("query")
                .ok_or_else(|| fail(path, "nested must have a `query`"))?,
            &format!("{path}nested[query]."),
        )?;
        let score_mode = match map.get("score_mode").and_then(Json::as_str) {
            None => NestedScoreMode::default(),
            Some(s) => NestedScoreMode::from_str_opt(s)
                .ok_or_else(|| fail(path, format!("unknown score_mode `{s}`")))?,
        };
        Ok(Query::Nested {
            path: nested_path,
            query: Box::new(query),
            score_mode,
        })
    }

    fn parse_query_string(content: &Json, path: &str) -> Result<Query> {
        let map = object(content, path, "query_string")?;
        check_known_keys(map, &["query"], path, "query_string")?;
        let query = map
            .get("query")
            .and_then(Json::as_str)
            .ok_or_else(|| fail(path, "query_string must have a string `query`"))?;
        if query.is_empty() {
            return Err(fail(path, "query_string query must not be empty"));
        }
        Ok(Query::QueryString {
            query: query.to_string(),
        })
    }
}

/// Reject any key outside the allow-list. Query bodies are closed shapes:
/// a key the decoder does not model is an error, not something to ignore.
fn check_known_keys(
    map: &Map<String, Json>,
    allowed: &[&str],
    path: &str,
    what: &str,
) -> Result<()> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(fail(path, format!("unknown {what} key `{key}`")));
        }
    }
    Ok(())
}

fn fail(path: &str, message: impl Into<String>) -> DecodeError {
    let message = message.into();
    if path.is_empty() {
        DecodeError::sourceless(message)
    } else {
        DecodeError::sourceless(format!("at {path}: {message}"))
    }
}

fn object<'a>(value: &'a Json, path: &str, what: &str) -> Result<&'a Map<String, Json>> {
    value
        .as_object()
        .ok_or_else(|| fail(path, format!("{what} must be an object")))
}

/// Extract the `{field: spec}` single-entry form shared by the match, term,
/// range and pattern query families.
fn single_field<'a>(content: &'a Json, path: &str, what: &str) -> Result<(String, &'a Json)> {
    let map = object(content, path, what)?;
    if map.len() != 1 {
        return Err(fail(path, format!("{what} must have exactly one field")));
    }
    let (field, spec) = map.iter().next().unwrap();
    if field.is_empty() {
        return Err(fail(path, format!("{what} field must not be empty")));
    }
    Ok((field.clone(), spec))
}

fn scalar(value: &Json, path: &str) -> Result<Value> {
    match value {
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Value::Long(v))
            } else if let Some(v) = n.as_f64() {
                Ok(Value::Double(v))
            } else {
                Err(fail(path, format!("unsupported number {n}")))
            }
        }
        _ => Err(fail(path, "expected a scalar value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_match_short_form() {
        let query = EsQueryParser::parse(&json!({"match": {"message": "hello world"}})).unwrap();
        assert_eq!(
            query,
            Query::Match {
                field: "message".to_string(),
                value: "hello world".into(),
                operator: MatchOperator::Or,
            }
        );
    }

    #[test]
    fn test_parse_match_long_form() {
        let query = EsQueryParser::parse(
            &json!({"match": {"message": {"query": "hello", "operator": "and"}}}),
        )
        .unwrap();
        assert_eq!(
            query,
            Query::Match {
                field: "message".to_string(),
                value: "hello".into(),
                operator: MatchOperator::And,
            }
        );
    }

    #[test]
    fn test_parse_bool_with_single_object_clause() {
        let query =
            EsQueryParser::parse(&json!({"bool": {"filter": {"match": {"a": "b"}}}})).unwrap();
        let Query::Bool { filter, .. } = &query else {
            panic!("expected bool, got {query:?}");
        };
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_parse_wrapped_query() {
        let query = EsQueryParser::parse(&json!({"query": {"match_all": {}}})).unwrap();
        assert_eq!(query, Query::MatchAll);
    }

    #[test]
    fn test_parse_range_rejects_unbounded() {
        let result = EsQueryParser::parse(&json!({"range": {"year": {}}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_range_keeps_json_scalars() {
        let query =
            EsQueryParser::parse(&json!({"range": {"year": {"gte": 2020, "lt": "now"}}})).unwrap();
        assert_eq!(
            query,
            Query::Range {
                field: "year".to_string(),
                bounds: RangeBounds {
                    gte: Some(Value::Long(2020)),
                    lt: Some(Value::String("now".to_string())),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_parse_unknown_query_type() {
        let err = EsQueryParser::parse(&json!({"knn": {}})).unwrap_err();
        assert!(err.message.contains("unknown query type"), "{}", err.message);
    }

    #[test]
    fn test_unknown_body_keys_are_rejected() {
        let bodies = [
            json!({"multi_match": {"query": "hello", "lenient": true}}),
            json!({"match": {"a": {"query": "b", "boost": 2.0}}}),
            json!({"match_phrase": {"a": {"query": "b", "slop": 1}}}),
            json!({"match_all": {"boost": 1.5}}),
            json!({"bool": {"must": [{"match": {"a": "b"}}], "boost": 1.5}}),
            json!({"exists": {"field": "a", "boost": 1.0}}),
            json!({"term": {"a": {"value": "b", "case_insensitive": true}}}),
            json!({"wildcard": {"a": {"value": "b*", "rewrite": "top_terms_10"}}}),
            json!({"fuzzy": {"a": {"value": "b", "transpositions": false}}}),
            json!({"nested": {"path": "u", "query": {"match_all": {}}, "ignore_unmapped": true}}),
            json!({"query_string": {"query": "a:b", "default_field": "a"}}),
        ];
        for body in bodies {
            let err = EsQueryParser::parse(&body).unwrap_err();
            assert!(err.message.contains("unknown"), "for {body}: {}", err.message);
        }
    }

    #[test]
    fn test_error_names_json_path() {
        let err = EsQueryParser::parse(&json!({"bool": {"filter": [{"match": {}}]}})).unwrap_err();
        assert!(err.message.contains("bool[filter0]."), "{}", err.message);
    }

    #[test]
    fn test_parse_nested() {
        let query = EsQueryParser::parse(&json!({
            "nested": {
                "path": "user",
                "query": {"match": {"user.name": "alice"}},
                "score_mode": "none",
            }
        }))
        .unwrap();
        let Query::Nested { path, score_mode, .. } = &query else {
            panic!("expected nested, got {query:?}");
        };
        assert_eq!(path, "user");
        assert_eq!(*score_mode, NestedScoreMode::None);
    }

    #[test]
    fn test_parse_multi_match() {
        let query = EsQueryParser::parse(&json!({
            "multi_match": {"type": "phrase", "query": "hello", "fields": ["a", "b"]}
        }))
        .unwrap();
        assert_eq!(
            query,
            Query::MultiMatch {
                query_type: Some(MultiMatchType::Phrase),
                value: "hello".to_string(),
                fields: Some(vec!["a".to_string(), "b".to_string()]),
                operator: None,
            }
        );
    }

    #[test]
    fn test_parse_str_rejects_malformed_json() {
        assert!(EsQueryParser::parse_str("{not json").is_err());
    }

    #[test]
    fn test_round_trip_through_render() {
        // Single-clause arrays come back in the canonical object form.
        let dsl = json!({
            "bool": {
                "must": [{"match": {"title": "rust"}}],
                "filter": [{"range": {"year": {"gte": 2020}}}],
            }
        });
        let query = EsQueryParser::parse(&dsl).unwrap();
        assert_eq!(
            query.render(),
            json!({
                "bool": {
                    "must": {"match": {"title": "rust"}},
                    "filter": {"range": {"year": {"gte": 2020}}},
                }
            })
        );
    }
}
