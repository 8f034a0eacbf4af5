//! KQL parsing and rendering
//!
//! The Kibana Query Language front end: a lexer, a recursive descent parser
//! producing [`crate::query::Query`] trees, and a renderer that prints a
//! tree back to KQL source.
//!
//! # Example
//!
//! ```
//! let query = kuery::parse_kql("http.response.status_code: 400").unwrap();
//! assert_eq!(kuery::render_as_kql(&query).unwrap(), "http.response.status_code: 400");
//! ```

use serde::{Deserialize, Serialize};

pub mod lexer;
pub mod parser;
pub mod renderer;

pub use lexer::{KqlLexer, Token, TokenKind};
pub use parser::KqlParser;

/// Options for the KQL parser
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Whether a value may start with a `*` wildcard. Leading wildcards are
    /// expensive server-side, so some deployments reject them up front.
    pub allow_leading_wildcards: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_leading_wildcards: true,
        }
    }
}
