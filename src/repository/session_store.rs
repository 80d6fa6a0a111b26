//! Session files on disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Session, SESSION_VERSION, SESSION_VERSION_PREFIX};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session file not found: {0}")]
    NotFound(PathBuf),

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

    #[error("Invalid session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A loaded session plus the files it lists that are missing from disk.
///
/// Missing files keep their place and annotations; readers skip them.
#[derive(Debug)]
pub struct LoadedSession {
    pub session: Session,
    pub missing_files: Vec<PathBuf>,
}

/// Reads and writes session JSON files.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the session, reporting files that are gone from disk.
    pub fn load(&self) -> Result<LoadedSession, SessionError> {
        if !self.exists() {
            return Err(SessionError::NotFound(self.path.clone()));
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| SessionError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut session: Session =
            serde_json::from_str(&content).map_err(|source| SessionError::Parse {
                path: self.path.clone(),
                source,
            })?;

        if session.version != SESSION_VERSION {
            if session.version.starts_with(SESSION_VERSION_PREFIX) {
                warn!(
                    "Session {} has version {}, reading it as {}",
                    self.path.display(),
                    session.version,
                    SESSION_VERSION
                );
            } else {
                warn!(
                    "Session {} has unrecognized version {:?}; attempting to read it anyway",
                    self.path.display(),
                    session.version
                );
            }
            session.version = SESSION_VERSION.to_string();
        }

        let missing_files: Vec<PathBuf> = session
            .files
            .iter()
            .filter(|f| !f.is_file())
            .cloned()
            .collect();
        for path in &missing_files {
            warn!("Session file no longer exists, skipping: {}", path.display());
        }

        if session
            .current_file_index
            .is_some_and(|i| i >= session.files.len())
        {
            session.current_file_index = if session.files.is_empty() { None } else { Some(0) };
        }
        for document in session.annotations.values_mut() {
            document.sort_entities();
        }

        debug!(
            "Loaded session {} ({} files, {} entities)",
            self.path.display(),
            session.files.len(),
            session.entity_count()
        );
        Ok(LoadedSession {
            session,
            missing_files,
        })
    }

    /// Write the session as pretty JSON, replacing the file atomically.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(session)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|source| SessionError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!("Saved session to {}", self.path.display());
        Ok(())
    }
}

/// Write through a sibling temporary file and rename it into place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionFlags, Span, TagSchema};

    #[test]
    fn test_load_keeps_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        std::fs::write(&kept, "Alice").unwrap();
        let gone = dir.path().join("gone.txt");

        let mut session = Session::new(
            vec![gone.clone(), kept.clone()],
            TagSchema::default(),
            SessionFlags::default(),
        );
        session.set_current(1);
        session
            .document_mut(&gone)
            .insert_entity(crate::models::Entity::new(Span::on_line(1, 0, 1), "x", "Other"));

        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&session).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.missing_files, vec![gone.clone()]);
        assert_eq!(loaded.session.files, vec![gone, kept.clone()]);
        assert_eq!(loaded.session.current_file(), Some(kept.as_path()));
        assert_eq!(loaded.session.entity_count(), 1);
    }

    #[test]
    fn test_missing_file_annotations_survive_resave() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "Alice").unwrap();
        std::fs::write(&b, "Bob").unwrap();

        let mut session = Session::new(
            vec![a.clone(), b.clone()],
            TagSchema::default(),
            SessionFlags::default(),
        );
        session
            .document_mut(&b)
            .insert_entity(crate::models::Entity::new(Span::on_line(1, 0, 3), "Bob", "Person"));
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&session).unwrap();

        let hidden = dir.path().join("b.txt.hidden");
        std::fs::rename(&b, &hidden).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.missing_files, vec![b.clone()]);
        store.save(&loaded.session).unwrap();

        std::fs::rename(&hidden, &b).unwrap();
        let reloaded = store.load().unwrap();
        assert!(reloaded.missing_files.is_empty());
        assert_eq!(reloaded.session.files, vec![a, b.clone()]);
        assert_eq!(reloaded.session.document(&b).map(|d| d.entities.len()), Some(1));
    }

    #[test]
    fn test_load_tolerates_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"version": "annie-session/0", "files": [], "entity_tags": ["Person"],
                "relation_types": ["knows"]}"#,
        )
        .unwrap();
        let loaded = SessionStore::new(&path).load().unwrap();
        assert_eq!(loaded.session.version, SESSION_VERSION);
        assert_eq!(loaded.session.schema.entity_tags, vec!["Person"]);
        assert!(!loaded.session.flags.allow_overlap);
    }

    #[test]
    fn test_missing_and_invalid_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("none.json"));
        assert!(matches!(store.load(), Err(SessionError::NotFound(_))));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            SessionStore::new(&path).load(),
            Err(SessionError::Parse { .. })
        ));
    }
}
