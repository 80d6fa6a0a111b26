//! Annotation session: file list, schema, flags and all annotations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::annotations::DocumentAnnotations;
use super::schema::TagSchema;

/// Version tag written to every session file.
pub const SESSION_VERSION: &str = "annie-session/1";

/// Prefix shared by all session versions this build can read.
pub const SESSION_VERSION_PREFIX: &str = "annie-session/";

/// Global annotation behavior stored with the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    /// Widen propagated matches to whole words.
    #[serde(default)]
    pub extend_to_word: bool,
    /// Multi-label mode: intersecting spans are accepted.
    #[serde(default)]
    pub allow_overlap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub version: String,
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub current_file_index: Option<usize>,
    #[serde(flatten)]
    pub schema: TagSchema,
    #[serde(flatten)]
    pub flags: SessionFlags,
    /// Annotations keyed by file path as listed in `files`.
    #[serde(default)]
    pub annotations: BTreeMap<String, DocumentAnnotations>,
}

impl Session {
    pub fn new(files: Vec<PathBuf>, schema: TagSchema, flags: SessionFlags) -> Self {
        let current_file_index = if files.is_empty() { None } else { Some(0) };
        Self {
            version: SESSION_VERSION.to_string(),
            files,
            current_file_index,
            schema,
            flags,
            annotations: BTreeMap::new(),
        }
    }

    /// Start a session over every `.txt` file of a directory, sorted by name.
    pub fn open_directory(
        dir: &Path,
        schema: TagSchema,
        flags: SessionFlags,
    ) -> std::io::Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_text_file(path))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(Self::new(files, schema, flags))
    }

    /// Annotation map key for a file.
    pub fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file_index
            .and_then(|i| self.files.get(i))
            .map(PathBuf::as_path)
    }

    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.files.len() {
            self.current_file_index = Some(index);
            true
        } else {
            false
        }
    }

    /// Locate a file by index, full path, file name or unique name prefix.
    pub fn find_file(&self, query: &str) -> Option<usize> {
        if let Some(index) = self
            .files
            .iter()
            .position(|f| f.as_os_str() == query || file_name(f) == query)
        {
            return Some(index);
        }
        let mut matches = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| file_name(f).starts_with(query));
        match (matches.next(), matches.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }

    pub fn document(&self, path: &Path) -> Option<&DocumentAnnotations> {
        self.annotations.get(&Self::key(path))
    }

    /// Annotations for a file, created empty on first access.
    pub fn document_mut(&mut self, path: &Path) -> &mut DocumentAnnotations {
        self.annotations.entry(Self::key(path)).or_default()
    }

    pub fn entity_count(&self) -> usize {
        self.annotations.values().map(|d| d.entities.len()).sum()
    }

    pub fn relation_count(&self) -> usize {
        self.annotations.values().map(|d| d.relations.len()).sum()
    }

    /// Directory of the first file, used as base for relative annotation keys.
    pub fn base_dir(&self) -> Option<&Path> {
        self.files.first().and_then(|f| f.parent())
    }
}

pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_directory_lists_sorted_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.TXT"), "a").unwrap();
        std::fs::write(dir.path().join("notes.md"), "x").unwrap();

        let session =
            Session::open_directory(dir.path(), TagSchema::default(), SessionFlags::default())
                .unwrap();
        let names: Vec<String> = session.files.iter().map(|f| file_name(f)).collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
        assert_eq!(session.current_file_index, Some(0));
    }

    #[test]
    fn test_find_file() {
        let files = vec![
            PathBuf::from("/d/alpha.txt"),
            PathBuf::from("/d/beta.txt"),
            PathBuf::from("/d/betamax.txt"),
        ];
        let session = Session::new(files, TagSchema::default(), SessionFlags::default());
        assert_eq!(session.find_file("alpha"), Some(0));
        assert_eq!(session.find_file("beta.txt"), Some(1));
        assert_eq!(session.find_file("bet"), None);
        assert_eq!(session.find_file("/d/betamax.txt"), Some(2));
    }
}
