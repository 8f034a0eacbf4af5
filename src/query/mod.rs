//! Query tree and ES DSL decoding
//!
//! This module defines the unified query tree shared by the KQL and Lucene
//! parsers, its JSON rendering, and the decoder that reads a JSON query DSL
//! document back into a tree:
//! - Boolean queries (`must`, `should`, `must_not`, `filter`)
//! - Match queries (`match`, `match_phrase`, `match_phrase_prefix`,
//!   `multi_match`)
//! - Term-level queries (`term`, `exists`, `range`, `wildcard`, `regexp`,
//!   `fuzzy`, `prefix`)
//! - Nested object queries and the raw `query_string` escape hatch
//!
//! # JSON DSL example
//!
//! ```json
//! {
//!   "bool": {
//!     "must": { "match": { "content": "rust parser" } },
//!     "filter": { "range": { "created_at": { "gte": "2024-01-01" } } }
//!   }
//! }
//! ```

pub mod ast;
pub mod parser;
pub mod types;

pub use ast::Query;
pub use parser::EsQueryParser;
pub use types::{MatchOperator, MultiMatchType, NestedScoreMode, RangeBounds, Value};
