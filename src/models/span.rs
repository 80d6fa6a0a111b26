//! Text spans addressed by line and character.
//!
//! Lines are 1-based and characters are 0-based offsets (in Unicode scalar
//! values) within the line, so a span can cross line boundaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A position inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub char: usize,
}

impl Position {
    pub fn new(line: usize, char: usize) -> Self {
        Self { line, char }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.char)
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parses `LINE.CHAR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, char) = s
            .split_once('.')
            .ok_or_else(|| format!("expected LINE.CHAR, got '{}'", s))?;
        let line = line
            .trim()
            .parse()
            .map_err(|_| format!("invalid line number in '{}'", s))?;
        let char = char
            .trim()
            .parse()
            .map_err(|_| format!("invalid character offset in '{}'", s))?;
        Ok(Self { line, char })
    }
}

/// Half-open range `[start, end)` of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Span on a single line.
    pub fn on_line(line: usize, start_char: usize, end_char: usize) -> Self {
        Self {
            start: Position::new(line, start_char),
            end: Position::new(line, end_char),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether two spans share at least one character.
    ///
    /// Touching spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        let (a_start, a_end) = self.ordered();
        let (b_start, b_end) = other.ordered();
        !(a_end <= b_start || a_start >= b_end)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    fn ordered(&self) -> (Position, Position) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Span {
    type Err = String;

    /// Parses `LINE.CHAR-LINE.CHAR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected LINE.CHAR-LINE.CHAR, got '{}'", s))?;
        Ok(Self {
            start: start.parse()?,
            end: end.parse()?,
        })
    }
}
