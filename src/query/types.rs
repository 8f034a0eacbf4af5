//! Core types for the query tree

use serde::{Deserialize, Serialize};

/// Operator for combining terms in a match query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    /// All terms must match (AND)
    And,
    /// At least one term must match (OR)
    #[default]
    Or,
}

impl MatchOperator {
    /// Canonical DSL spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchOperator::And => "and",
            MatchOperator::Or => "or",
        }
    }
}

/// Scalar value carried by match, term and range queries
///
/// KQL sources produce strings; range bounds are promoted to `Long`/`Double`
/// when the literal parses losslessly as a number. The ES DSL decoder keeps
/// whatever scalar type the JSON document used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// Boolean
    Bool(bool),
    /// String (keywords, dates, date math such as `now-2w`)
    String(String),
}

impl Value {
    /// Promote a source literal to a number when it parses losslessly.
    pub fn promoted(literal: &str) -> Self {
        if let Ok(v) = literal.parse::<i64>() {
            return Value::Long(v);
        }
        if let Ok(v) = literal.parse::<f64>() {
            if v.is_finite() {
                return Value::Double(v);
            }
        }
        Value::String(literal.to_string())
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Long(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Value::from(*v),
            Value::Bool(v) => serde_json::Value::from(*v),
            Value::String(v) => serde_json::Value::from(v.clone()),
        }
    }

    /// Render as bare source text, as it would appear in a KQL literal.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Long(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::String(v) => v.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

/// Range bounds for range queries
///
/// A valid range query carries at least one bound; the parsers and the DSL
/// decoder enforce this at construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Greater than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Greater than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Less than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Less than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    /// IANA time zone applied to date bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RangeBounds {
    /// Whether at least one of the four bounds is set.
    pub fn is_bounded(&self) -> bool {
        self.gt.is_some() || self.gte.is_some() || self.lt.is_some() || self.lte.is_some()
    }
}

/// Multi-match query type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    /// Match any field, score with the best field
    #[default]
    BestFields,
    /// Run a `match_phrase` query on each field
    Phrase,
    /// Run a `match_phrase_prefix` query on each field
    PhrasePrefix,
}

impl MultiMatchType {
    /// Canonical DSL spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            MultiMatchType::BestFields => "best_fields",
            MultiMatchType::Phrase => "phrase",
            MultiMatchType::PhrasePrefix => "phrase_prefix",
        }
    }

    /// Parse the canonical DSL spelling.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "best_fields" => Some(MultiMatchType::BestFields),
            "phrase" => Some(MultiMatchType::Phrase),
            "phrase_prefix" => Some(MultiMatchType::PhrasePrefix),
            _ => None,
        }
    }
}

/// Mode in which a nested query affects the root document's score
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestedScoreMode {
    /// Mean relevance score of matching child objects
    #[default]
    Avg,
    /// Highest relevance score of matching child objects
    Max,
    /// Lowest relevance score of matching child objects
    Min,
    /// Ignore child object scores
    None,
    /// Sum of child object scores
    Sum,
}

impl NestedScoreMode {
    /// Canonical DSL spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            NestedScoreMode::Avg => "avg",
            NestedScoreMode::Max => "max",
            NestedScoreMode::Min => "min",
            NestedScoreMode::None => "none",
            NestedScoreMode::Sum => "sum",
        }
    }

    /// Parse the canonical DSL spelling.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "avg" => Some(NestedScoreMode::Avg),
            "max" => Some(NestedScoreMode::Max),
            "min" => Some(NestedScoreMode::Min),
            "none" => Some(NestedScoreMode::None),
            "sum" => Some(NestedScoreMode::Sum),
            _ => None,
        }
    }
}
