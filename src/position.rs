use std::fmt;

/// A span of ADQL source text. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub begin_line: u32,
    pub begin_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl TextPosition {
    /// A position covering a single character.
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            begin_line: line,
            begin_column: column,
            end_line: line,
            end_column: column,
        }
    }

    pub fn with_end(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            begin_line: line,
            begin_column: column,
            end_line,
            end_column,
        }
    }

    /// The smallest position covering both `begin` and `end`.
    pub fn span(begin: TextPosition, end: TextPosition) -> Self {
        Self {
            begin_line: begin.begin_line,
            begin_column: begin.begin_column,
            end_line: end.end_line,
            end_column: end.end_column,
        }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[l.{} c.{} - l.{} c.{}]",
            self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let pos = TextPosition::with_end(1, 8, 1, 12);
        assert_eq!("[l.1 c.8 - l.1 c.12]", pos.to_string());
    }

    #[test]
    fn span_covers_both_ends() {
        let pos = TextPosition::span(TextPosition::new(2, 3), TextPosition::with_end(2, 9, 4, 1));
        assert_eq!(TextPosition::with_end(2, 3, 4, 1), pos);
    }
}
