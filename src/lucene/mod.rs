//! Lucene query string validation
//!
//! The Lucene front end checks structure only and hands the source to the
//! server's `query_string` parser, which is the authoritative Lucene
//! implementation. See [`parser`] for the accepted grammar.
//!
//! # Example
//!
//! ```
//! let query = kuery::parse_lucene("title:rust AND tags:tutorial").unwrap();
//! assert_eq!(
//!     query.render(),
//!     serde_json::json!({"query_string": {"query": "title:rust AND tags:tutorial"}}),
//! );
//! ```

pub mod lexer;
pub mod parser;

pub use lexer::{LuceneLexer, Token, TokenKind};
pub use parser::LuceneParser;
