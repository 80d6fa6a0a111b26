//! Entity tag and relation type schema, including tag colors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENTITY_TAGS: [&str; 5] = ["Person", "Organization", "Location", "Date", "Other"];

pub const DEFAULT_RELATION_TYPES: [&str; 5] =
    ["spouse_of", "works_at", "located_in", "born_on", "produces"];

const DEFAULT_TAG_COLORS: [(&str, &str); 5] = [
    ("Person", "#ffcccc"),
    ("Organization", "#ccffcc"),
    ("Location", "#ccccff"),
    ("Date", "#ffffcc"),
    ("Other", "#ccffff"),
];

/// Colors handed out, in order, to tags without a predefined color.
const COLOR_PALETTE: [&str; 10] = [
    "#e6e6fa", "#ffe4e1", "#f0fff0", "#fffacd", "#add8e6", "#f5f5dc", "#d3ffd3", "#fafad2",
    "#ffebcd", "#e0ffff",
];

/// Which list of names an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    EntityTag,
    RelationType,
}

impl SchemaKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EntityTag => "entity tag",
            Self::RelationType => "relation type",
        }
    }
}

/// Errors from schema edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{kind} name must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} '{name}' already exists (case-insensitive)")]
    Duplicate { kind: &'static str, name: String },

    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: &'static str, name: String },

    #[error("cannot remove the last {kind}")]
    LastItem { kind: &'static str },
}

/// Tag/type vocabulary plus the color assigned to each entity tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSchema {
    pub entity_tags: Vec<String>,
    pub relation_types: Vec<String>,
    #[serde(default)]
    pub tag_colors: BTreeMap<String, String>,
}

impl Default for TagSchema {
    fn default() -> Self {
        Self::new(
            DEFAULT_ENTITY_TAGS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_RELATION_TYPES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl TagSchema {
    /// Build a schema and assign colors for every tag.
    pub fn new(entity_tags: Vec<String>, relation_types: Vec<String>) -> Self {
        let mut schema = Self {
            entity_tags: Vec::new(),
            relation_types,
            tag_colors: BTreeMap::new(),
        };
        for tag in entity_tags {
            if !schema.has_tag(&tag) {
                schema.color_for(&tag);
                schema.entity_tags.push(tag);
            }
        }
        schema
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.entity_tags.iter().any(|t| t == tag)
    }

    pub fn has_relation_type(&self, relation_type: &str) -> bool {
        self.relation_types.iter().any(|t| t == relation_type)
    }

    /// Color for a tag, assigning the next palette color on first use.
    pub fn color_for(&mut self, tag: &str) -> String {
        if let Some(color) = self.tag_colors.get(tag) {
            return color.clone();
        }
        let color = DEFAULT_TAG_COLORS
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, color)| color.to_string())
            .unwrap_or_else(|| {
                let assigned = self
                    .tag_colors
                    .values()
                    .filter(|c| COLOR_PALETTE.contains(&c.as_str()))
                    .count();
                COLOR_PALETTE[assigned % COLOR_PALETTE.len()].to_string()
            });
        self.tag_colors.insert(tag.to_string(), color.clone());
        color
    }

    pub fn add(&mut self, kind: SchemaKind, name: &str) -> Result<(), SchemaError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SchemaError::Empty { kind: kind.label() });
        }
        let list = self.list(kind);
        if list.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            return Err(SchemaError::Duplicate {
                kind: kind.label(),
                name: name.to_string(),
            });
        }
        if kind == SchemaKind::EntityTag {
            self.color_for(name);
        }
        self.list_mut(kind).push(name.to_string());
        Ok(())
    }

    /// Remove a name from the schema.
    ///
    /// Entities or relations already using it are left untouched. The color
    /// mapping is kept so that re-adding the tag restores its color.
    pub fn remove(&mut self, kind: SchemaKind, name: &str) -> Result<(), SchemaError> {
        let list = self.list_mut(kind);
        let index = list
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| SchemaError::NotFound {
                kind: kind.label(),
                name: name.to_string(),
            })?;
        if list.len() == 1 {
            return Err(SchemaError::LastItem { kind: kind.label() });
        }
        list.remove(index);
        Ok(())
    }

    pub fn list(&self, kind: SchemaKind) -> &[String] {
        match kind {
            SchemaKind::EntityTag => &self.entity_tags,
            SchemaKind::RelationType => &self.relation_types,
        }
    }

    fn list_mut(&mut self, kind: SchemaKind) -> &mut Vec<String> {
        match kind {
            SchemaKind::EntityTag => &mut self.entity_tags,
            SchemaKind::RelationType => &mut self.relation_types,
        }
    }
}
