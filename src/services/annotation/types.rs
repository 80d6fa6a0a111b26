//! Types shared across annotation operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{SchemaError, Span};

/// Errors from entity and relation edits.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not part of the session: {0}")]
    UnknownFile(PathBuf),

    #[error("No file is selected")]
    NoCurrentFile,

    #[error("Span {0} is empty or outside the document")]
    InvalidSpan(Span),

    #[error("Span {0} covers only whitespace")]
    WhitespaceOnly(Span),

    #[error("Text not found in document: {0}")]
    TextNotFound(String),

    #[error("Unknown entity tag: {0}")]
    UnknownTag(String),

    #[error("Unknown relation type: {0}")]
    UnknownRelationType(String),

    #[error("Span {span} overlaps existing entity '{existing}' at {existing_span}")]
    Overlap {
        span: Span,
        existing: String,
        existing_span: Span,
    },

    #[error("An entity tagged {tag} already covers {span}")]
    DuplicateEntity { span: Span, tag: String },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("No entity instance at index {0}")]
    InstanceNotFound(usize),

    #[error("Entity instance at index {0} is not part of a merge group")]
    NotMerged(usize),

    #[error("Merging needs at least two distinct entities, got {0}")]
    MergeNeedsTwo(usize),

    #[error("A relation needs exactly two distinct entities, got {0}")]
    RelationSelection(usize),

    #[error("Relation {relation_type} from {head} to {tail} already exists")]
    DuplicateRelation {
        relation_type: String,
        head: String,
        tail: String,
    },

    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Outcome of merging entities into one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Id now shared by every merged instance.
    pub canonical_id: String,
    /// Instances whose id was rewritten.
    pub instances_rewritten: usize,
    /// Relations whose endpoints were rewritten.
    pub relations_rewritten: usize,
    /// Relations dropped because the rewrite made them duplicates.
    pub duplicates_removed: usize,
    /// Relations that now point from the group to itself.
    pub self_loops: usize,
}

/// What a removal took out of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub entities: usize,
    pub relations: usize,
}
