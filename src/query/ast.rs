//! Query tree and JSON rendering
//!
//! The [`Query`] enum is the unified output of every parser in this crate
//! and a strict subset of the ElasticSearch query DSL. Trees are built once,
//! never mutated, and rendered with [`Query::render`].

use serde_json::Map;

use crate::query::types::{MatchOperator, MultiMatchType, NestedScoreMode, RangeBounds, Value};

/// A query tree node
///
/// # Example
///
/// ```
/// let query = kuery::parse_kql("NOT http.request.method: GET").unwrap();
/// assert_eq!(
///     query.render(),
///     serde_json::json!({"bool": {"must_not": {"match": {"http.request.method": "GET"}}}}),
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Matches every document
    MatchAll,
    /// Matches no document
    MatchNone,
    /// Full-text match on one field
    Match {
        field: String,
        value: Value,
        operator: MatchOperator,
    },
    /// Exact phrase match on one field
    MatchPhrase { field: String, value: Value },
    /// Phrase match where the last term is a prefix
    MatchPhrasePrefix { field: String, value: Value },
    /// Full-text match across several fields
    MultiMatch {
        query_type: Option<MultiMatchType>,
        value: String,
        fields: Option<Vec<String>>,
        operator: Option<MatchOperator>,
    },
    /// Exact value match, no analysis
    Term { field: String, value: Value },
    /// Matches documents where the field is present
    Exists { field: String },
    /// Bounded comparison on one field
    Range { field: String, bounds: RangeBounds },
    /// Pattern match with `*` and `?` wildcards
    Wildcard { field: String, value: String },
    /// Regular expression match
    Regexp { field: String, value: String },
    /// Edit-distance match
    Fuzzy {
        field: String,
        value: String,
        fuzziness: Option<u32>,
    },
    /// Term prefix match
    Prefix { field: String, value: String },
    /// Query against nested objects under a path
    Nested {
        path: String,
        query: Box<Query>,
        score_mode: NestedScoreMode,
    },
    /// Raw query in Lucene syntax, parsed server-side
    QueryString { query: String },
    /// Boolean combination of clauses
    Bool {
        must: Vec<Query>,
        should: Vec<Query>,
        must_not: Vec<Query>,
        filter: Vec<Query>,
        minimum_should_match: Option<u64>,
    },
}

impl Query {
    /// Combine clauses with AND semantics.
    ///
    /// Clauses that are themselves pure-AND booleans are spliced in rather
    /// than re-wrapped, so consecutive ANDs flatten. When every flattened
    /// clause matches exactly (term, range, exists) the combination goes in
    /// the cacheable `filter` clause, otherwise in `must`. An empty clause
    /// list collapses to [`Query::MatchAll`].
    pub fn all_of(clauses: Vec<Query>) -> Query {
        let mut flattened = Vec::with_capacity(clauses.len());
        for clause in clauses {
            match clause {
                Query::Bool {
                    must,
                    should,
                    must_not,
                    filter,
                    minimum_should_match: None,
                } if should.is_empty() && must_not.is_empty() && (must.is_empty() || filter.is_empty()) => {
                    flattened.extend(must);
                    flattened.extend(filter);
                }
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => Query::MatchAll,
            1 => flattened.into_iter().next().unwrap(),
            _ => {
                if flattened.iter().all(Query::is_filter_safe) {
                    Query::Bool {
                        must: Vec::new(),
                        should: Vec::new(),
                        must_not: Vec::new(),
                        filter: flattened,
                        minimum_should_match: None,
                    }
                } else {
                    Query::Bool {
                        must: flattened,
                        should: Vec::new(),
                        must_not: Vec::new(),
                        filter: Vec::new(),
                        minimum_should_match: None,
                    }
                }
            }
        }
    }

    /// Combine clauses with OR semantics.
    ///
    /// Clauses that are pure-OR booleans are spliced in, so consecutive ORs
    /// flatten. An empty clause list collapses to [`Query::MatchAll`].
    pub fn any_of(clauses: Vec<Query>) -> Query {
        let mut flattened = Vec::with_capacity(clauses.len());
        for clause in clauses {
            match clause {
                Query::Bool {
                    must,
                    should,
                    must_not,
                    filter,
                    minimum_should_match,
                } if must.is_empty()
                    && must_not.is_empty()
                    && filter.is_empty()
                    && matches!(minimum_should_match, None | Some(1)) =>
                {
                    flattened.extend(should);
                }
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => Query::MatchAll,
            1 => flattened.into_iter().next().unwrap(),
            _ => Query::Bool {
                must: Vec::new(),
                should: flattened,
                must_not: Vec::new(),
                filter: Vec::new(),
                minimum_should_match: Some(1),
            },
        }
    }

    /// Negate a clause.
    pub fn negate(clause: Query) -> Query {
        Query::Bool {
            must: Vec::new(),
            should: Vec::new(),
            must_not: vec![clause],
            filter: Vec::new(),
            minimum_should_match: None,
        }
    }

    /// Whether this query matches exactly, making it safe for the cacheable
    /// `filter` clause of a boolean query.
    pub fn is_filter_safe(&self) -> bool {
        matches!(
            self,
            Query::Term { .. } | Query::Range { .. } | Query::Exists { .. }
        )
    }

    /// Render as an ElasticSearch query DSL value.
    ///
    /// The output always has exactly one top-level key, and key order within
    /// each query object is canonical, so rendering is deterministic.
    pub fn render(&self) -> serde_json::Value {
        match self {
            Query::MatchAll => wrap("match_all", serde_json::Value::Object(Map::new())),
            Query::MatchNone => wrap("match_none", serde_json::Value::Object(Map::new())),
            Query::Match {
                field,
                value,
                operator,
            } => {
                let inner = match operator {
                    MatchOperator::Or => value.to_json(),
                    MatchOperator::And => {
                        let mut spec = Map::new();
                        spec.insert("query".to_string(), value.to_json());
                        spec.insert("operator".to_string(), operator.as_str().into());
                        serde_json::Value::Object(spec)
                    }
                };
                wrap("match", field_object(field, inner))
            }
            Query::MatchPhrase { field, value } => {
                wrap("match_phrase", field_object(field, value.to_json()))
            }
            Query::MatchPhrasePrefix { field, value } => {
                wrap("match_phrase_prefix", field_object(field, value.to_json()))
            }
            Query::MultiMatch {
                query_type,
                value,
                fields,
                operator,
            } => {
                let mut inner = Map::new();
                if let Some(query_type) = query_type {
                    inner.insert("type".to_string(), query_type.as_str().into());
                }
                inner.insert("query".to_string(), value.clone().into());
                if let Some(fields) = fields {
                    inner.insert("fields".to_string(), fields.clone().into());
                }
                if let Some(operator) = operator {
                    inner.insert("operator".to_string(), operator.as_str().into());
                }
                wrap("multi_match", serde_json::Value::Object(inner))
            }
            Query::Term { field, value } => {
                let mut inner = Map::new();
                inner.insert("value".to_string(), value.to_json());
                wrap("term", field_object(field, serde_json::Value::Object(inner)))
            }
            Query::Exists { field } => {
                let mut inner = Map::new();
                inner.insert("field".to_string(), field.clone().into());
                wrap("exists", serde_json::Value::Object(inner))
            }
            Query::Range { field, bounds } => {
                let mut inner = Map::new();
                if let Some(gt) = &bounds.gt {
                    inner.insert("gt".to_string(), gt.to_json());
                }
                if let Some(gte) = &bounds.gte {
                    inner.insert("gte".to_string(), gte.to_json());
                }
                if let Some(lt) = &bounds.lt {
                    inner.insert("lt".to_string(), lt.to_json());
                }
                if let Some(lte) = &bounds.lte {
                    inner.insert("lte".to_string(), lte.to_json());
                }
                if let Some(tz) = &bounds.time_zone {
                    inner.insert("time_zone".to_string(), tz.clone().into());
                }
                wrap("range", field_object(field, serde_json::Value::Object(inner)))
            }
            Query::Wildcard { field, value } => {
                let mut inner = Map::new();
                inner.insert("value".to_string(), value.clone().into());
                wrap(
                    "wildcard",
                    field_object(field, serde_json::Value::Object(inner)),
                )
            }
            Query::Regexp { field, value } => {
                let mut inner = Map::new();
                inner.insert("value".to_string(), value.clone().into());
                wrap(
                    "regexp",
                    field_object(field, serde_json::Value::Object(inner)),
                )
            }
            Query::Fuzzy {
                field,
                value,
                fuzziness,
            } => {
                let mut inner = Map::new();
                inner.insert("value".to_string(), value.clone().into());
                if let Some(fuzziness) = fuzziness {
                    inner.insert("fuzziness".to_string(), (*fuzziness).into());
                }
                wrap("fuzzy", field_object(field, serde_json::Value::Object(inner)))
            }
            Query::Prefix { field, value } => {
                let mut inner = Map::new();
                inner.insert("value".to_string(), value.clone().into());
                wrap(
                    "prefix",
                    field_object(field, serde_json::Value::Object(inner)),
                )
            }
            Query::Nested {
                path,
                query,
                score_mode,
            } => {
                let mut inner = Map::new();
                inner.insert("path".to_string(), path.clone().into());
                inner.insert("query".to_string(), query.render());
                inner.insert("score_mode".to_string(), score_mode.as_str().into());
                wrap("nested", serde_json::Value::Object(inner))
            }
            Query::QueryString { query } => {
                let mut inner = Map::new();
                inner.insert("query".to_string(), query.clone().into());
                wrap("query_string", serde_json::Value::Object(inner))
            }
            Query::Bool {
                must,
                should,
                must_not,
                filter,
                minimum_should_match,
            } => {
                let mut inner = Map::new();
                for (key, clauses) in [
                    ("must", must),
                    ("should", should),
                    ("must_not", must_not),
                    ("filter", filter),
                ] {
                    if clauses.is_empty() {
                        continue;
                    }
                    // A single clause is emitted as an object, not a
                    // one-element list.
                    let rendered = if clauses.len() == 1 {
                        clauses[0].render()
                    } else {
                        clauses.iter().map(Query::render).collect()
                    };
                    inner.insert(key.to_string(), rendered);
                }
                if let Some(msm) = minimum_should_match {
                    inner.insert("minimum_should_match".to_string(), (*msm).into());
                }
                wrap("bool", serde_json::Value::Object(inner))
            }
        }
    }
}

fn wrap(key: &str, inner: serde_json::Value) -> serde_json::Value {
    let mut outer = Map::new();
    outer.insert(key.to_string(), inner);
    serde_json::Value::Object(outer)
}

fn field_object(field: &str, inner: serde_json::Value) -> serde_json::Value {
    let mut object = Map::new();
    object.insert(field.to_string(), inner);
    serde_json::Value::Object(object)
}
