//! CoNLL-2003 style IOB2: `token TAG` per line, sentences separated by blank
//! lines, documents introduced by `-DOCSTART- O`.
//!
//! Every non-empty text line becomes one sentence. Tokens are runs of word
//! characters or single punctuation characters. On import tokens of a
//! sentence are joined with single spaces and sentences with newlines, so
//! the original spacing is not restored.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::models::{DocumentText, Position};
use crate::services::Workspace;

use super::tokenize::tokenize;
use super::{
    exportable_documents, ExportReport, FormatError, ImportedDocument, LabeledRange, ParsedImport,
};

const DOCSTART: &str = "-DOCSTART-";
const OUTSIDE: &str = "O";

/// Write every entity-bearing document of the session in IOB2.
pub fn export(workspace: &mut Workspace, out: &mut impl Write) -> Result<ExportReport, FormatError> {
    let mut report = ExportReport::default();
    for (text, ranges) in exportable_documents(workspace, &mut report) {
        let mut block = String::new();
        let dropped = write_document(&text, &ranges, &mut block);
        report.documents += 1;
        report.entities += ranges.len() - dropped;
        report.dropped_overlaps += dropped;
        out.write_all(block.as_bytes())?;
    }
    out.flush()?;
    if report.dropped_overlaps > 0 {
        warn!(
            "CoNLL cannot represent overlapping entities; dropped {}",
            report.dropped_overlaps
        );
    }
    info!(
        "Exported {} documents with {} entities as CoNLL",
        report.documents, report.entities
    );
    Ok(report)
}

/// Render one document, returning how many overlapping ranges were dropped.
///
/// `ranges` must be sorted; of two overlapping ranges the later one goes.
pub fn write_document(text: &DocumentText, ranges: &[LabeledRange], out: &mut String) -> usize {
    let mut kept: Vec<&LabeledRange> = Vec::new();
    let mut dropped = 0;
    for range in ranges {
        match kept.last() {
            Some(last) if range.start < last.end => dropped += 1,
            _ => kept.push(range),
        }
    }

    out.push_str(DOCSTART);
    out.push(' ');
    out.push_str(OUTSIDE);
    out.push_str("\n\n");

    for (number, line) in text.lines() {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }
        let line_start = text.to_offset(Position::new(number, 0)).unwrap_or(0);
        let mut previous: Option<usize> = None;
        for token in tokens {
            let (start, end) = (line_start + token.start, line_start + token.end);
            let entity = kept.iter().position(|r| r.start < end && start < r.end);
            let tag = match entity {
                Some(index) if previous == Some(index) => format!("I-{}", kept[index].label),
                Some(index) => format!("B-{}", kept[index].label),
                None => OUTSIDE.to_string(),
            };
            previous = entity;
            out.push_str(token.text);
            out.push(' ');
            out.push_str(&tag);
            out.push('\n');
        }
        out.push('\n');
    }
    dropped
}

/// Builds one document while reading token lines.
#[derive(Default)]
struct DocumentBuilder {
    text: String,
    char_len: usize,
    sentence_open: bool,
    entities: Vec<LabeledRange>,
    open: Option<LabeledRange>,
}

impl DocumentBuilder {
    fn push_token(&mut self, token: &str, tag: &str) {
        if self.sentence_open {
            self.text.push(' ');
            self.char_len += 1;
        } else if !self.text.is_empty() {
            self.text.push('\n');
            self.char_len += 1;
        }
        self.sentence_open = true;

        let start = self.char_len;
        self.text.push_str(token);
        self.char_len += token.chars().count();
        let end = self.char_len;

        let (prefix, label) = split_tag(tag);
        match (prefix, label) {
            (_, None) => self.close(),
            (Some('I'), Some(label)) | (None, Some(label))
                if self.open.as_ref().is_some_and(|o| o.label == label) =>
            {
                if let Some(open) = self.open.as_mut() {
                    open.end = end;
                }
            }
            (_, Some(label)) => {
                self.close();
                self.open = Some(LabeledRange::new(start, end, label));
            }
        }
    }

    fn end_sentence(&mut self) {
        self.close();
        self.sentence_open = false;
    }

    fn close(&mut self) {
        if let Some(open) = self.open.take() {
            self.entities.push(open);
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn finish(mut self) -> ImportedDocument {
        self.close();
        ImportedDocument {
            text: self.text,
            entities: self.entities,
        }
    }
}

/// Split `B-PER` into `(Some('B'), Some("PER"))`; `O` has no label.
///
/// Tags without a `B-`/`I-` prefix are read as IO tags.
fn split_tag(tag: &str) -> (Option<char>, Option<&str>) {
    if tag == OUTSIDE {
        return (None, None);
    }
    match tag.split_once('-') {
        Some((prefix @ ("B" | "I"), label)) if !label.is_empty() => {
            (prefix.chars().next(), Some(label))
        }
        _ => (None, Some(tag)),
    }
}

/// Parse CoNLL content. Lines need at least a token and a tag; the tag is
/// the last column. Lines with a single column are counted as malformed.
pub fn parse(content: &str) -> ParsedImport {
    let mut parsed = ParsedImport::default();
    let mut current = DocumentBuilder::default();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            current.end_sentence();
            continue;
        }
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.first() == Some(&DOCSTART) {
            let finished = std::mem::take(&mut current);
            if !finished.is_empty() {
                parsed.documents.push(finished.finish());
            }
            continue;
        }
        let (Some(token), Some(tag)) = (columns.first(), columns.last()) else {
            continue;
        };
        if columns.len() < 2 {
            debug!("Skipping malformed CoNLL line {}: {:?}", number + 1, line);
            parsed.malformed += 1;
            continue;
        }
        current.push_token(token, tag);
    }
    if !current.is_empty() {
        parsed.documents.push(current.finish());
    }
    if parsed.malformed > 0 {
        warn!("Skipped {} malformed CoNLL lines", parsed.malformed);
    }
    parsed
}

pub fn load(path: &Path) -> Result<ParsedImport, FormatError> {
    let content = std::fs::read_to_string(path).map_err(|source| FormatError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&content))
}
