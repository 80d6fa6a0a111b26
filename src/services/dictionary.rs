//! Dictionary files: `text<TAB>tag` lines feeding propagation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::TagSchema;

use super::propagation::PropagationRules;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parsed dictionary plus bookkeeping about what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    /// Entries whose tag is in the schema.
    pub entries: BTreeMap<String, String>,
    /// Entries whose tag is not in the schema.
    pub unknown_entries: BTreeMap<String, String>,
    pub lines_read: usize,
    /// Blank and comment lines.
    pub ignored: usize,
    /// Lines without a text and a tag.
    pub malformed: usize,
}

impl Dictionary {
    /// Parse dictionary content against a schema.
    ///
    /// Each line is split on a tab; failing that, on its last whitespace run
    /// so that multi-word texts work without tabs. A later entry for the same
    /// text replaces an earlier one.
    pub fn parse(content: &str, schema: &TagSchema) -> Self {
        let mut dictionary = Self::default();
        for (number, raw) in content.lines().enumerate() {
            dictionary.lines_read += 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                dictionary.ignored += 1;
                continue;
            }

            let Some((text, tag)) = split_entry(line) else {
                warn!("Skipping malformed dictionary line {}: {:?}", number + 1, line);
                dictionary.malformed += 1;
                continue;
            };

            let target = if schema.has_tag(tag) {
                dictionary.unknown_entries.remove(text);
                &mut dictionary.entries
            } else {
                dictionary.entries.remove(text);
                &mut dictionary.unknown_entries
            };
            if let Some(previous) = target.insert(text.to_string(), tag.to_string()) {
                if previous != tag {
                    debug!(
                        "Dictionary line {}: {:?} redefined from {} to {}",
                        number + 1,
                        text,
                        previous,
                        tag
                    );
                }
            }
        }
        dictionary
    }

    pub fn load(path: &Path, schema: &TagSchema) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content, schema))
    }

    /// Distinct tags that are missing from the schema.
    pub fn unknown_tags(&self) -> BTreeSet<&str> {
        self.unknown_entries.values().map(String::as_str).collect()
    }

    /// Accept unknown-tag entries, for use after their tags were added.
    pub fn adopt_unknown(&mut self) {
        let unknown = std::mem::take(&mut self.unknown_entries);
        self.entries.extend(unknown);
    }

    pub fn rules(&self) -> PropagationRules {
        PropagationRules::new(self.entries.clone())
    }
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = line.split('\t').collect();
    let (text, tag) = match parts[..] {
        [text, tag] => (text, tag),
        _ => line.rsplit_once(char::is_whitespace)?,
    };
    let (text, tag) = (text.trim(), tag.trim());
    if text.is_empty() || tag.is_empty() {
        return None;
    }
    Some((text, tag))
}
