//! File-backed persistence for sessions and annotation exports.

mod annotations_file;
mod session_store;

pub use annotations_file::{
    default_export_path, export_annotations, load_annotations, save_annotations,
    AnnotationsLoadReport,
};
pub use session_store::{LoadedSession, SessionError, SessionStore};
