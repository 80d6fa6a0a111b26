//! Session plus the document texts it annotates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::models::{DocumentAnnotations, DocumentText, Entity, Session, Span, TagSchema};

use super::types::AnnotationError;

/// A session with lazily loaded document texts.
///
/// Texts are read from disk on first use and cached for the lifetime of
/// the workspace.
pub struct Workspace {
    session: Session,
    texts: HashMap<PathBuf, DocumentText>,
}

impl Workspace {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            texts: HashMap::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Register text for a path without touching the filesystem.
    pub fn insert_text(&mut self, path: impl Into<PathBuf>, text: DocumentText) {
        self.texts.insert(path.into(), text);
    }

    /// Text of a document, read on first access.
    pub fn text(&mut self, path: &Path) -> Result<&DocumentText, AnnotationError> {
        if !self.texts.contains_key(path) {
            debug!("Loading text of {}", path.display());
            let text = DocumentText::read(path).map_err(|source| AnnotationError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            self.texts.insert(path.to_path_buf(), text);
        }
        self.texts
            .get(path)
            .ok_or_else(|| AnnotationError::UnknownFile(path.to_path_buf()))
    }

    /// Path of a session file chosen by name, or the current file.
    pub fn resolve_file(&self, query: Option<&str>) -> Result<PathBuf, AnnotationError> {
        match query {
            Some(q) => self
                .session
                .find_file(q)
                .map(|i| self.session.files[i].clone())
                .ok_or_else(|| AnnotationError::UnknownFile(PathBuf::from(q))),
            None => self
                .session
                .current_file()
                .map(Path::to_path_buf)
                .ok_or(AnnotationError::NoCurrentFile),
        }
    }

    fn ensure_in_session(&self, path: &Path) -> Result<(), AnnotationError> {
        if self.session.files.iter().any(|f| f == path) {
            Ok(())
        } else {
            Err(AnnotationError::UnknownFile(path.to_path_buf()))
        }
    }

    /// Borrow a document's text together with its annotations and the schema.
    pub fn document_parts(
        &mut self,
        path: &Path,
    ) -> Result<(&DocumentText, &mut DocumentAnnotations, &mut TagSchema), AnnotationError> {
        self.ensure_in_session(path)?;
        self.text(path)?;
        let text = self
            .texts
            .get(path)
            .ok_or_else(|| AnnotationError::UnknownFile(path.to_path_buf()))?;
        let Session {
            schema,
            annotations,
            ..
        } = &mut self.session;
        let document = annotations.entry(Session::key(path)).or_default();
        Ok((text, document, schema))
    }

    /// Tag a span of a document.
    pub fn add_entity(
        &mut self,
        path: &Path,
        span: Span,
        tag: &str,
    ) -> Result<Entity, AnnotationError> {
        let allow_overlap = self.session.flags.allow_overlap;
        let (text, document, schema) = self.document_parts(path)?;
        document
            .add_entity(text, schema, span, tag, allow_overlap)
            .cloned()
    }

    /// Tag the `occurrence`-th (1-based) appearance of `needle` in a document.
    pub fn add_entity_by_text(
        &mut self,
        path: &Path,
        needle: &str,
        occurrence: usize,
        tag: &str,
    ) -> Result<Entity, AnnotationError> {
        let span = {
            let text = self.text(path)?;
            let (start, end) = text
                .find_all(needle)
                .get(occurrence.saturating_sub(1))
                .copied()
                .ok_or_else(|| AnnotationError::TextNotFound(needle.to_string()))?;
            text.span_from_offsets(start, end)
                .ok_or_else(|| AnnotationError::TextNotFound(needle.to_string()))?
        };
        self.add_entity(path, span, tag)
    }

    /// Annotations of a document, created empty on first access.
    pub fn document_mut(&mut self, path: &Path) -> Result<&mut DocumentAnnotations, AnnotationError> {
        self.ensure_in_session(path)?;
        Ok(self.session.document_mut(path))
    }
}
