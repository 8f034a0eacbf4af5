//! Parsers for search query languages targeting the ElasticSearch query DSL
//!
//! `kuery` turns human-written search expressions into ElasticSearch
//! queries. It understands the Kibana Query Language (KQL) and the classical
//! Lucene query syntax, funnels both into one [`Query`] tree that is a
//! strict subset of the query DSL, and renders that tree to DSL JSON. The
//! KQL direction is reversible: a tree can be printed back to KQL source.
//!
//! Every entry point is a pure function over its input; calls share no
//! state and may run concurrently without synchronization.
//!
//! # Example
//!
//! ```
//! let query = kuery::parse_kql("http.request.method: GET AND status: >= 400").unwrap();
//! let dsl = query.render();
//! assert_eq!(dsl["bool"]["must"][1]["range"]["status"]["gte"], 400);
//! ```

pub mod error;
pub mod kql;
pub mod lucene;
pub mod query;
pub mod reader;

pub use error::{DecodeError, Result};
pub use kql::ParseOptions;
pub use query::{MatchOperator, MultiMatchType, NestedScoreMode, Query, RangeBounds, Value};
pub use reader::Position;

use tracing::trace;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a KQL expression into a query tree.
///
/// Empty and whitespace-only input yields [`Query::MatchAll`].
///
/// # Example
///
/// ```
/// let query = kuery::parse_kql("user.name: \"Alice\"").unwrap();
/// assert_eq!(
///     query.render(),
///     serde_json::json!({"match_phrase": {"user.name": "Alice"}}),
/// );
/// ```
pub fn parse_kql(source: &str) -> Result<Query> {
    parse_kql_with_options(source, &ParseOptions::default())
}

/// Parse a KQL expression with explicit parser options.
pub fn parse_kql_with_options(source: &str, options: &ParseOptions) -> Result<Query> {
    trace!(len = source.len(), "parsing KQL source");
    kql::KqlParser::parse(source, options)
}

/// Validate a Lucene query string and wrap it into a query tree.
///
/// The returned tree delegates Lucene semantics to the server's own
/// `query_string` parser; only the structure is checked here.
///
/// # Example
///
/// ```
/// let query = kuery::parse_lucene("a:b AND c:d").unwrap();
/// assert_eq!(
///     query.render(),
///     serde_json::json!({"query_string": {"query": "a:b AND c:d"}}),
/// );
/// ```
pub fn parse_lucene(source: &str) -> Result<Query> {
    trace!(len = source.len(), "parsing Lucene source");
    lucene::LuceneParser::parse(source)
}

/// Render a query tree as KQL source.
///
/// Fails with a [`DecodeError`] when the tree uses a feature KQL cannot
/// express, naming the offending variant.
pub fn render_as_kql(query: &Query) -> Result<String> {
    kql::renderer::render(query)
}

/// Parse a decoded JSON query DSL value into a query tree.
pub fn parse_es(value: &serde_json::Value) -> Result<Query> {
    query::EsQueryParser::parse(value)
}

/// Parse a JSON query DSL string into a query tree.
pub fn parse_es_str(json: &str) -> Result<Query> {
    query::EsQueryParser::parse_str(json)
}
