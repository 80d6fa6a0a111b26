//! Plain-text document content with line/character addressing.

use std::path::Path;

use super::span::{Position, Span};

/// Text of a document, indexed by line for span lookups.
///
/// Lines are separated by `\n`; a trailing `\r` stays part of its line.
/// Offsets everywhere are counted in characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    text: String,
    lines: Vec<String>,
    /// Character offset of the first character of each line.
    line_offsets: Vec<usize>,
    char_len: usize,
}

impl DocumentText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut lines = Vec::new();
        let mut line_offsets = Vec::new();
        let mut offset = 0;
        for line in text.split('\n') {
            line_offsets.push(offset);
            let len = line.chars().count();
            offset += len + 1;
            lines.push(line.to_string());
        }
        let char_len = offset.saturating_sub(1);
        Self {
            text,
            lines,
            line_offsets,
            char_len,
        }
    }

    /// Read a UTF-8 text file.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line by 1-based number.
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().map(|(i, l)| (i + 1, l.as_str()))
    }

    pub fn line_len(&self, line: usize) -> Option<usize> {
        self.line(line).map(|l| l.chars().count())
    }

    pub fn contains_position(&self, pos: Position) -> bool {
        self.line_len(pos.line).is_some_and(|len| pos.char <= len)
    }

    /// Whether `span` is non-empty, ordered and inside the document.
    pub fn contains_span(&self, span: &Span) -> bool {
        !span.is_empty() && self.contains_position(span.start) && self.contains_position(span.end)
    }

    /// Absolute character offset of a position.
    pub fn to_offset(&self, pos: Position) -> Option<usize> {
        if !self.contains_position(pos) {
            return None;
        }
        Some(self.line_offsets[pos.line - 1] + pos.char)
    }

    /// Position of an absolute character offset.
    ///
    /// An offset pointing at a newline maps to the end of its line.
    pub fn to_position(&self, offset: usize) -> Option<Position> {
        if offset > self.char_len {
            return None;
        }
        let index = match self.line_offsets.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Some(Position::new(index + 1, offset - self.line_offsets[index]))
    }

    /// Span covering the absolute character range `[start, end)`.
    pub fn span_from_offsets(&self, start: usize, end: usize) -> Option<Span> {
        if start >= end {
            return None;
        }
        Some(Span::new(self.to_position(start)?, self.to_position(end)?))
    }

    /// Absolute character range of a span.
    pub fn offsets(&self, span: &Span) -> Option<(usize, usize)> {
        Some((self.to_offset(span.start)?, self.to_offset(span.end)?))
    }

    /// Text covered by a span, newlines included.
    pub fn slice(&self, span: &Span) -> Option<String> {
        if !self.contains_span(span) {
            return None;
        }
        let (start, end) = self.offsets(span)?;
        Some(self.slice_offsets(start, end))
    }

    pub fn slice_offsets(&self, start: usize, end: usize) -> String {
        self.text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// Character ranges of every non-overlapping occurrence of `needle`.
    pub fn find_all(&self, needle: &str) -> Vec<(usize, usize)> {
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() {
            return Vec::new();
        }
        let haystack: Vec<char> = self.text.chars().collect();
        let mut found = Vec::new();
        let mut i = 0;
        while i + needle.len() <= haystack.len() {
            if haystack[i..i + needle.len()] == needle[..] {
                found.push((i, i + needle.len()));
                i += needle.len();
            } else {
                i += 1;
            }
        }
        found
    }
}
