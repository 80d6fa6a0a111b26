//! Interchange formats: JSONL (spaCy style) and CoNLL-2003 IOB2.
//!
//! Both formats carry entities only; relations and merge groups are not
//! representable and are left out of exports.

pub mod conll;
pub mod jsonl;
mod tokenize;

pub use tokenize::{tokenize, Token};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{DocumentText, Entity, SchemaKind, Session, SessionFlags, TagSchema};
use crate::services::Workspace;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An entity as a character range of a whole document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabeledRange {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

impl LabeledRange {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }
}

/// A document read from an interchange file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedDocument {
    pub text: String,
    pub entities: Vec<LabeledRange>,
}

/// Documents parsed from an import file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub documents: Vec<ImportedDocument>,
    /// Lines that could not be parsed.
    pub malformed: usize,
}

/// What to do with entity labels missing from the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownTagPolicy {
    /// Add the label to the schema.
    #[default]
    Add,
    /// Drop the entity.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub documents: usize,
    pub entities: usize,
    pub malformed: usize,
    /// Entities with invalid ranges, whitespace-only text or an exact duplicate.
    pub rejected: usize,
    /// Imported entities that intersect another entity of their document.
    pub overlapping: usize,
    /// Entities dropped because of an unknown label.
    pub unknown_dropped: usize,
    pub tags_added: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub documents: usize,
    pub entities: usize,
    /// Entities left out because the format cannot represent overlaps.
    pub dropped_overlaps: usize,
    pub skipped_files: Vec<PathBuf>,
}

/// Name of the `index`-th (0-based) synthetic file of an import.
pub fn imported_file_name(index: usize) -> String {
    format!("imported_{:04}.txt", index + 1)
}

/// Entity-bearing documents of a session, as text plus sorted ranges.
///
/// Files that cannot be read are skipped with a warning and recorded in
/// the report.
pub(crate) fn exportable_documents(
    workspace: &mut Workspace,
    report: &mut ExportReport,
) -> Vec<(DocumentText, Vec<LabeledRange>)> {
    let files = workspace.session().files.clone();
    let mut documents = Vec::new();
    for path in &files {
        let entities: Vec<Entity> = match workspace.session().document(path) {
            Some(doc) if !doc.entities.is_empty() => doc.entities.clone(),
            _ => continue,
        };
        let text = match workspace.text(path) {
            Ok(text) => text.clone(),
            Err(e) => {
                warn!("Skipping {} during export: {}", path.display(), e);
                report.skipped_files.push(path.clone());
                continue;
            }
        };

        let mut ranges: Vec<LabeledRange> = entities
            .iter()
            .filter_map(|e| {
                let (start, end) = text.offsets(&e.span())?;
                Some(LabeledRange::new(start, end, e.tag.clone()))
            })
            .collect();
        ranges.sort();
        ranges.dedup();
        debug!("Exporting {} entities from {}", ranges.len(), path.display());
        documents.push((text, ranges));
    }
    documents
}

/// Write imported documents as `imported_NNNN.txt` files and build a
/// session over them.
pub fn build_session(
    parsed: ParsedImport,
    out_dir: &Path,
    mut schema: TagSchema,
    flags: SessionFlags,
    policy: UnknownTagPolicy,
) -> Result<(Session, ImportReport), FormatError> {
    std::fs::create_dir_all(out_dir).map_err(|source| FormatError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut report = ImportReport {
        malformed: parsed.malformed,
        ..Default::default()
    };
    let files: Vec<PathBuf> = (0..parsed.documents.len())
        .map(|index| out_dir.join(imported_file_name(index)))
        .collect();
    if let Some(existing) = files.iter().find(|path| path.exists()) {
        return Err(FormatError::AlreadyExists(existing.clone()));
    }
    for (path, imported) in files.iter().zip(&parsed.documents) {
        std::fs::write(path, &imported.text).map_err(|source| FormatError::Write {
            path: path.clone(),
            source,
        })?;
    }
    let pending: Vec<(PathBuf, ImportedDocument)> =
        files.iter().cloned().zip(parsed.documents).collect();

    let mut session = Session::new(files, TagSchema::default(), flags);
    for (path, imported) in pending {
        let text = DocumentText::new(imported.text);
        let document = session.document_mut(&path);
        for range in imported.entities {
            if !schema.has_tag(&range.label) {
                match policy {
                    UnknownTagPolicy::Add => {
                        if schema
                            .add(SchemaKind::EntityTag, &range.label)
                            .is_ok()
                        {
                            report.tags_added.insert(range.label.clone());
                        }
                    }
                    UnknownTagPolicy::Skip => {
                        report.unknown_dropped += 1;
                        continue;
                    }
                }
                if !schema.has_tag(&range.label) {
                    // Label clashes case-insensitively with an existing tag.
                    report.unknown_dropped += 1;
                    continue;
                }
            }

            let Some(span) = text.span_from_offsets(range.start, range.end) else {
                report.rejected += 1;
                continue;
            };
            let Some(covered) = text.slice(&span) else {
                report.rejected += 1;
                continue;
            };
            // Input overlaps are kept; the session switches to multi-label mode below.
            if covered.trim().is_empty() || document.admit(&span, &range.label, true).is_err() {
                report.rejected += 1;
                continue;
            }
            if document.find_overlap(&span).is_some() {
                report.overlapping += 1;
            }
            document.insert_entity(Entity::new(span, covered, range.label));
            report.entities += 1;
        }
        report.documents += 1;
    }
    session.annotations.retain(|_, doc| !doc.is_empty());
    session.schema = schema;
    if report.overlapping > 0 && !session.flags.allow_overlap {
        info!(
            "Imported {} overlapping entities; enabling allow_overlap",
            report.overlapping
        );
        session.flags.allow_overlap = true;
    }

    Ok((session, report))
}
