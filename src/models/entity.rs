//! Annotated entity spans.

use serde::{Deserialize, Serialize};

use super::span::{Position, Span};

/// Generate a fresh entity or relation identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A tagged span of a document.
///
/// Several entities may share the same `id`; together they form a merge
/// group that refers to one real-world referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    pub end_char: usize,
    pub text: String,
    pub tag: String,
    /// Created by automated matching (dictionary, NER, copy) rather than by hand.
    #[serde(default)]
    pub propagated: bool,
}

impl Entity {
    pub fn new(span: Span, text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            start_line: span.start.line,
            start_char: span.start.char,
            end_line: span.end.line,
            end_char: span.end.char,
            text: text.into(),
            tag: tag.into(),
            propagated: false,
        }
    }

    pub fn propagated(mut self) -> Self {
        self.propagated = true;
        self
    }

    pub fn span(&self) -> Span {
        Span::new(self.start(), self.end())
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_char)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_char)
    }

    /// Ordering key used for display and serialization.
    pub fn sort_key(&self) -> (Position, Position, &str) {
        (self.start(), self.end(), self.tag.as_str())
    }
}
