//! Standalone annotation exports: every document's entities and relations
//! keyed by path relative to the session's first file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::models::{file_name, DocumentAnnotations, Session};

use super::session_store::{write_atomic, SessionError};

/// Outcome of loading an annotations file into a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationsLoadReport {
    pub documents: usize,
    pub entities: usize,
    pub relations: usize,
    /// Keys that matched no file of the session.
    pub unmatched: Vec<String>,
}

/// Key for a file: relative to `base` when inside it, else the file name.
fn export_key(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|b| path.strip_prefix(b).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_else(|| file_name(path))
}

/// Default export file name: `<dir>_annotations.json` next to the first file.
pub fn default_export_path(session: &Session) -> PathBuf {
    match session.base_dir() {
        Some(dir) => {
            let stem = dir
                .file_name()
                .map(|n| format!("{}_annotations.json", n.to_string_lossy()))
                .unwrap_or_else(|| "annotations.json".to_string());
            dir.join(stem)
        }
        None => PathBuf::from("annotations.json"),
    }
}

/// Annotations of every non-empty document, sorted for stable output.
pub fn export_annotations(session: &Session) -> BTreeMap<String, DocumentAnnotations> {
    let base = session.base_dir();
    let mut exported = BTreeMap::new();
    for path in &session.files {
        let Some(document) = session.document(path).filter(|d| !d.is_empty()) else {
            continue;
        };
        let mut document = document.clone();
        document.sort_entities();
        document.relations.sort_by(|a, b| {
            (&a.relation_type, &a.head_id).cmp(&(&b.relation_type, &b.head_id))
        });
        exported.insert(export_key(path, base), document);
    }
    exported
}

/// Write the annotations export, returning the number of documents written.
pub fn save_annotations(session: &Session, path: &Path) -> Result<usize, SessionError> {
    let exported = export_annotations(session);
    let json = serde_json::to_string_pretty(&exported)?;
    write_atomic(path, json.as_bytes()).map_err(|source| SessionError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "Saved annotations for {} documents to {}",
        exported.len(),
        path.display()
    );
    Ok(exported.len())
}

/// Load an annotations export into a session.
///
/// Each key is resolved against the session's base directory, falling back
/// to a unique file-name match. A matched document's annotations replace
/// the session's; unmatched keys are reported and skipped.
pub fn load_annotations(
    session: &mut Session,
    path: &Path,
) -> Result<AnnotationsLoadReport, SessionError> {
    let content = std::fs::read_to_string(path).map_err(|source| SessionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded: BTreeMap<String, DocumentAnnotations> =
        serde_json::from_str(&content).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let base = session.base_dir().map(Path::to_path_buf);
    let mut report = AnnotationsLoadReport::default();
    for (key, mut document) in loaded {
        let Some(target) = resolve_key(session, base.as_deref(), &key) else {
            warn!("No session file matches annotations for {}", key);
            report.unmatched.push(key);
            continue;
        };
        document.sort_entities();
        report.documents += 1;
        report.entities += document.entities.len();
        report.relations += document.relations.len();
        *session.document_mut(&target) = document;
    }
    Ok(report)
}

fn resolve_key(session: &Session, base: Option<&Path>, key: &str) -> Option<PathBuf> {
    if let Some(base) = base {
        let candidate = base.join(key);
        if session.files.contains(&candidate) {
            return Some(candidate);
        }
    }
    let name = file_name(Path::new(key));
    let mut matches = session.files.iter().filter(|f| file_name(f) == name);
    match (matches.next(), matches.next()) {
        (Some(found), None) => Some(found.clone()),
        _ => None,
    }
}
