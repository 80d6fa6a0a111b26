//! AI-assisted pre-annotation through a pluggable NER backend.

mod backend;
mod chunker;
mod service;

pub use backend::{parse_predictions, CommandNerBackend, NerBackend, NerConfig, Prediction};
pub use chunker::{merge_predictions, Chunk, Chunker};
pub use service::{infer, DocumentOutcome, NerEvent, NerReport, NerService};

use thiserror::Error;

/// Errors from NER backends and runs.
#[derive(Debug, Error)]
pub enum NerError {
    #[error("No NER command configured (set ner.command in the config file)")]
    NotConfigured,

    #[error("NER backend {backend} is not available: {hint}")]
    Unavailable { backend: String, hint: String },

    #[error("Window of {window} characters cannot overlap by {overlap}")]
    InvalidWindow { window: usize, overlap: usize },

    #[error("NER command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid NER output: {0}")]
    InvalidOutput(#[source] serde_json::Error),

    #[error("NER worker stopped: {0}")]
    Worker(String),
}
