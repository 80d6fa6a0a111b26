//! Entity propagation: copy `text → tag` pairs onto every matching span.
//!
//! Documents are scanned line by line for exact matches, longest text first,
//! so that "New York City" wins over "York". Matches are filtered through the
//! word-boundary and overlap policies before they become propagated entities.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::models::{DocumentAnnotations, DocumentText, Entity, Span};

use super::annotation::Workspace;

/// How matches are filtered and shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationOptions {
    /// Skip matches touching a letter or digit on either side.
    pub whole_word: bool,
    /// Widen matches to the enclosing word. Ignored for matches that already
    /// pass `whole_word`, since they cannot be widened.
    pub extend_to_word: bool,
    /// Accept matches that intersect existing entities.
    pub allow_overlap: bool,
}

/// Totals of a propagation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub added: usize,
    pub files_affected: usize,
    /// Files that could not be read.
    pub files_skipped: Vec<PathBuf>,
}

/// `text → tag` pairs ordered longest text first.
#[derive(Debug, Clone, Default)]
pub struct PropagationRules {
    rules: Vec<(String, String)>,
}

impl PropagationRules {
    /// Build rules from pairs; a later pair for the same text wins.
    ///
    /// Whitespace-only texts are dropped, as are texts spanning several
    /// lines, which a line scan can never match.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut map = BTreeMap::new();
        for (text, tag) in pairs {
            if text.trim().is_empty() || tag.is_empty() {
                continue;
            }
            if text.contains('\n') {
                debug!("Skipping multi-line propagation text {:?}", text);
                continue;
            }
            map.insert(text, tag);
        }
        let mut rules: Vec<(String, String)> = map.into_iter().collect();
        rules.sort_by(|(a, _), (b, _)| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        Self { rules }
    }

    /// Rules from the text and tag of each entity.
    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        Self::new(
            entities
                .into_iter()
                .map(|e| (e.text.clone(), e.tag.clone())),
        )
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(t, g)| (t.as_str(), g.as_str()))
    }

    fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.rules.retain(|(t, g)| keep(t, g));
    }
}

/// Apply rules to one document, returning the number of entities added.
pub fn propagate_document(
    text: &DocumentText,
    annotations: &mut DocumentAnnotations,
    rules: &PropagationRules,
    options: PropagationOptions,
) -> usize {
    let lines: Vec<(usize, Vec<char>)> = text
        .lines()
        .map(|(number, line)| (number, line.chars().collect()))
        .collect();
    let mut added = 0;

    for (needle, tag) in rules.iter() {
        let needle: Vec<char> = needle.chars().collect();
        for (number, line) in &lines {
            let mut from = 0;
            while let Some(found) = find_chars(line, &needle, from) {
                let (mut start, mut end) = (found, found + needle.len());
                let bounded = is_word_bounded(line, start, end);

                if options.whole_word && !bounded {
                    from = found + 1;
                    continue;
                }
                if options.extend_to_word && !bounded {
                    (start, end) = extend_to_word(line, start, end);
                }

                let span = Span::on_line(*number, start, end);
                if annotations.admit(&span, tag, options.allow_overlap).is_ok() {
                    let matched: String = line[start..end].iter().collect();
                    annotations.insert_entity(Entity::new(span, matched, tag).propagated());
                    added += 1;
                }
                from = end.max(found + 1);
            }
        }
    }
    added
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn is_word_bounded(line: &[char], start: usize, end: usize) -> bool {
    let before = start
        .checked_sub(1)
        .and_then(|i| line.get(i))
        .is_some_and(|c| c.is_alphanumeric());
    let after = line.get(end).is_some_and(|c| c.is_alphanumeric());
    !before && !after
}

fn extend_to_word(line: &[char], mut start: usize, mut end: usize) -> (usize, usize) {
    while start > 0 && line[start - 1].is_alphanumeric() {
        start -= 1;
    }
    while end < line.len() && line[end].is_alphanumeric() {
        end += 1;
    }
    (start, end)
}

impl Workspace {
    /// Propagate rules across every file of the session.
    ///
    /// Rules with tags missing from the schema are dropped with a warning.
    /// `on_file` is called once per file, after it has been processed.
    pub fn propagate(
        &mut self,
        rules: &PropagationRules,
        options: PropagationOptions,
        mut on_file: impl FnMut(&Path),
    ) -> PropagationReport {
        let mut rules = rules.clone();
        let schema = &self.session().schema;
        rules.retain(|text, tag| {
            let known = schema.has_tag(tag);
            if !known {
                warn!("Not propagating {:?}: unknown tag {}", text, tag);
            }
            known
        });

        let mut report = PropagationReport::default();
        let files = self.session().files.clone();
        for path in &files {
            match self.document_parts(path) {
                Ok((text, document, _)) => {
                    let added = propagate_document(text, document, &rules, options);
                    if added > 0 {
                        debug!("Propagated {} entities into {}", added, path.display());
                        report.added += added;
                        report.files_affected += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping {} during propagation: {}", path.display(), e);
                    report.files_skipped.push(path.clone());
                }
            }
            on_file(path);
        }
        info!(
            "Propagation added {} entities across {} files",
            report.added, report.files_affected
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> PropagationRules {
        PropagationRules::new(
            pairs
                .iter()
                .map(|(t, g)| (t.to_string(), g.to_string())),
        )
    }

    #[test]
    fn test_rules_sorted_longest_first() {
        let r = rules(&[("York", "Location"), ("New York City", "Location"), (" ", "Other")]);
        let texts: Vec<&str> = r.iter().map(|(t, _)| t).collect();
        assert_eq!(texts, vec!["New York City", "York"]);
    }

    #[test]
    fn test_longest_match_wins() {
        let text = DocumentText::new("She moved to New York City.");
        let mut ann = DocumentAnnotations::default();
        let added = propagate_document(
            &text,
            &mut ann,
            &rules(&[("York", "Location"), ("New York City", "Location")]),
            PropagationOptions::default(),
        );
        assert_eq!(added, 1);
        assert_eq!(ann.entities[0].text, "New York City");
        assert!(ann.entities[0].propagated);
    }

    #[test]
    fn test_whole_word_skips_embedded_matches() {
        let text = DocumentText::new("Ann met Anna and Ann.");
        let mut ann = DocumentAnnotations::default();
        let options = PropagationOptions {
            whole_word: true,
            ..Default::default()
        };
        let added = propagate_document(&text, &mut ann, &rules(&[("Ann", "Person")]), options);
        assert_eq!(added, 2);
        let spans: Vec<Span> = ann.entities.iter().map(|e| e.span()).collect();
        assert_eq!(spans, vec![Span::on_line(1, 0, 3), Span::on_line(1, 17, 20)]);
    }

    #[test]
    fn test_extend_to_word() {
        let text = DocumentText::new("Microsoftware ships.");
        let mut ann = DocumentAnnotations::default();
        let options = PropagationOptions {
            extend_to_word: true,
            ..Default::default()
        };
        propagate_document(&text, &mut ann, &rules(&[("soft", "Organization")]), options);
        assert_eq!(ann.entities[0].text, "Microsoftware");
        assert_eq!(ann.entities[0].span(), Span::on_line(1, 0, 13));
    }

    #[test]
    fn test_overlaps_are_skipped() {
        let text = DocumentText::new("John Smith and John.");
        let mut ann = DocumentAnnotations::default();
        ann.insert_entity(Entity::new(Span::on_line(1, 0, 10), "John Smith", "Person"));
        let added = propagate_document(
            &text,
            &mut ann,
            &rules(&[("John", "Person")]),
            PropagationOptions::default(),
        );
        assert_eq!(added, 1);
        assert_eq!(ann.entities[1].span(), Span::on_line(1, 15, 19));

        // Multi-label mode still refuses an identical span and tag.
        let added = propagate_document(
            &text,
            &mut ann,
            &rules(&[("John", "Person")]),
            PropagationOptions {
                allow_overlap: true,
                ..Default::default()
            },
        );
        assert_eq!(added, 1);
        assert_eq!(ann.entities.len(), 3);
    }
}
