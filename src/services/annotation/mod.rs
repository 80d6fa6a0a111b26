//! Manual annotation: entity and relation edits over a session workspace.

mod entities;
mod relations;
mod types;
mod workspace;

pub use types::{AnnotationError, MergeOutcome, Removal};
pub use workspace::Workspace;
