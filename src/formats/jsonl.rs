//! JSONL: one `{"text", "ents": [{"start", "end", "label"}]}` object per
//! document, offsets in characters of the full text.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::Workspace;

use super::{
    exportable_documents, ExportReport, FormatError, ImportedDocument, LabeledRange, ParsedImport,
};

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    text: String,
    #[serde(default)]
    ents: Vec<RecordEntity>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordEntity {
    start: usize,
    end: usize,
    label: String,
}

/// Write every entity-bearing document of the session as one JSON line.
pub fn export(workspace: &mut Workspace, out: &mut impl Write) -> Result<ExportReport, FormatError> {
    let mut report = ExportReport::default();
    for (text, ranges) in exportable_documents(workspace, &mut report) {
        report.documents += 1;
        report.entities += ranges.len();
        let record = Record {
            text: text.as_str().to_string(),
            ents: ranges
                .into_iter()
                .map(|r| RecordEntity {
                    start: r.start,
                    end: r.end,
                    label: r.label,
                })
                .collect(),
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    info!(
        "Exported {} documents with {} entities as JSONL",
        report.documents, report.entities
    );
    Ok(report)
}

/// Parse JSONL content; blank lines are ignored, unparsable lines counted.
pub fn parse(content: &str) -> ParsedImport {
    let mut parsed = ParsedImport::default();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => {
                let mut entities: Vec<LabeledRange> = record
                    .ents
                    .into_iter()
                    .map(|e| LabeledRange::new(e.start, e.end, e.label))
                    .collect();
                entities.sort();
                parsed.documents.push(ImportedDocument {
                    text: record.text,
                    entities,
                });
            }
            Err(e) => {
                warn!("Skipping malformed JSONL line {}: {}", number + 1, e);
                parsed.malformed += 1;
            }
        }
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
