//! Service layer for annotation logic.
//!
//! This module contains domain logic separated from UI concerns.
//! Services operate on a `Workspace` and can be driven by the CLI or tests.

pub mod annotation;
pub mod dictionary;
pub mod ner;
pub mod propagation;

pub use annotation::{AnnotationError, MergeOutcome, Removal, Workspace};
pub use dictionary::{Dictionary, DictionaryError};
pub use ner::{NerBackend, NerConfig, NerError, NerEvent, NerReport, NerService, Prediction};
pub use propagation::{
    propagate_document, PropagationOptions, PropagationReport, PropagationRules,
};
