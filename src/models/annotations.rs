//! Per-document annotation collections.

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::relation::Relation;
use super::span::Span;

/// Entities and relations recorded for one document.
///
/// Entities are kept sorted by document position; relations are unordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnnotations {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl DocumentAnnotations {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Insert an entity at its sorted position.
    pub fn insert_entity(&mut self, entity: Entity) -> usize {
        let index = self
            .entities
            .partition_point(|e| e.sort_key() <= entity.sort_key());
        self.entities.insert(index, entity);
        index
    }

    pub fn sort_entities(&mut self) {
        self.entities.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// All instances sharing `id`.
    pub fn instances<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities.iter().filter(move |e| e.id == id)
    }

    pub fn has_entity(&self, id: &str) -> bool {
        self.entities.iter().any(|e| e.id == id)
    }

    /// First instance (by position) of an id.
    pub fn resolve(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Whether more than one instance carries this id.
    pub fn is_merged(&self, id: &str) -> bool {
        self.entities.iter().filter(|e| e.id == id).nth(1).is_some()
    }

    pub fn relation(&self, id: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == id)
    }

    /// First entity intersecting `span`.
    pub fn find_overlap(&self, span: &Span) -> Option<&Entity> {
        self.entities.iter().find(|e| e.span().overlaps(span))
    }

    /// Entity with exactly this span and tag.
    pub fn find_exact(&self, span: &Span, tag: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.span() == *span && e.tag == tag)
    }

    /// Relations whose endpoints no longer resolve to an entity.
    pub fn dangling_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations
            .iter()
            .filter(|r| !self.has_entity(&r.head_id) || !self.has_entity(&r.tail_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'d>(document: &'d DocumentAnnotations, id: String) -> Option<&'d Entity> {
        document.resolve(&id)
    }

    #[test]
    fn test_resolve_outlives_id() {
        let mut document = DocumentAnnotations::default();
        let first = Entity::new(Span::on_line(1, 0, 5), "Alice", "Person");
        let mut second = Entity::new(Span::on_line(2, 0, 5), "Alice", "Person");
        second.id = first.id.clone();
        let id = first.id.clone();
        document.insert_entity(second);
        document.insert_entity(first);

        let found = lookup(&document, id.clone());
        assert_eq!(found.map(|e| e.span()), Some(Span::on_line(1, 0, 5)));
        assert!(document.is_merged(&id));
        assert!(lookup(&document, "missing".to_string()).is_none());
    }
}
