//! Source cursor with line and column tracking
//!
//! Both lexers read their input through a [`SourceReader`], which walks the
//! source one code point at a time and keeps the position bookkeeping that
//! diagnostics rely on.

use serde::{Deserialize, Serialize};

/// Position within a query source.
///
/// `offset` counts code points from 0; `line` and `column` count from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// The start of any input.
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

/// Sequential cursor over a query source.
///
/// Supports single-character lookahead by index, whitespace skipping, and
/// backtracking by restoring a previously recorded [`Position`]. A reader is
/// single-use: it is built for one parse and discarded with it.
pub struct SourceReader {
    input: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
}

impl SourceReader {
    /// Create a new reader over the given source.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Current position, suitable for token metadata and diagnostics.
    pub fn position(&self) -> Position {
        Position {
            offset: self.position as u32,
            line: self.line,
            column: self.column,
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Look `k` characters past the current one without consuming anything.
    pub fn peek_at(&self, k: usize) -> Option<char> {
        self.input.get(self.position + k).copied()
    }

    /// Consume and return the current character, updating line/column.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Record the current position for a later [`SourceReader::restore`].
    pub fn mark(&self) -> Position {
        self.position()
    }

    /// Rewind to a position previously obtained from [`SourceReader::mark`].
    pub fn restore(&mut self, mark: Position) {
        self.position = mark.offset as usize;
        self.line = mark.line;
        self.column = mark.column;
    }

    /// Consume any run of Unicode whitespace.
    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Whether the whole input has been consumed.
    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_columns() {
        let mut reader = SourceReader::new("ab");
        assert_eq!(reader.position(), Position { offset: 0, line: 1, column: 1 });
        assert_eq!(reader.advance(), Some('a'));
        assert_eq!(reader.position(), Position { offset: 1, line: 1, column: 2 });
        assert_eq!(reader.advance(), Some('b'));
        assert!(reader.is_eof());
        assert_eq!(reader.advance(), None);
    }

    #[test]
    fn test_newline_resets_column() {
        let mut reader = SourceReader::new("a\nb");
        reader.advance();
        reader.advance();
        assert_eq!(reader.position(), Position { offset: 2, line: 2, column: 1 });
        assert_eq!(reader.peek(), Some('b'));
    }

    #[test]
    fn test_mark_and_restore() {
        let mut reader = SourceReader::new("abc");
        reader.advance();
        let mark = reader.mark();
        reader.advance();
        reader.advance();
        assert!(reader.is_eof());
        reader.restore(mark);
        assert_eq!(reader.peek(), Some('b'));
        assert_eq!(reader.position().column, 2);
    }

    #[test]
    fn test_skip_whitespace() {
        let mut reader = SourceReader::new("  \t\n  x");
        reader.skip_whitespace();
        assert_eq!(reader.peek(), Some('x'));
        assert_eq!(reader.position().line, 2);
    }

    #[test]
    fn test_peek_at() {
        let reader = SourceReader::new("xyz");
        assert_eq!(reader.peek_at(0), Some('x'));
        assert_eq!(reader.peek_at(2), Some('z'));
        assert_eq!(reader.peek_at(3), None);
    }
}
