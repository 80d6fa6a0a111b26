//! Entity edits on a single document: add, remove, merge, demerge and relabel.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::models::{new_id, DocumentAnnotations, DocumentText, Entity, Span, TagSchema};

use super::types::{AnnotationError, MergeOutcome, Removal};

impl DocumentAnnotations {
    /// Check that an entity with this span and tag may be added.
    ///
    /// An identical span with the same tag is always rejected. Intersecting
    /// spans are rejected unless `allow_overlap` is set.
    pub fn admit(
        &self,
        span: &Span,
        tag: &str,
        allow_overlap: bool,
    ) -> Result<(), AnnotationError> {
        if self.find_exact(span, tag).is_some() {
            return Err(AnnotationError::DuplicateEntity {
                span: *span,
                tag: tag.to_string(),
            });
        }
        if !allow_overlap {
            if let Some(existing) = self.find_overlap(span) {
                return Err(AnnotationError::Overlap {
                    span: *span,
                    existing: existing.text.clone(),
                    existing_span: existing.span(),
                });
            }
        }
        Ok(())
    }

    /// Tag a span of `doc` as a new entity with a fresh id.
    pub fn add_entity(
        &mut self,
        doc: &DocumentText,
        schema: &TagSchema,
        span: Span,
        tag: &str,
        allow_overlap: bool,
    ) -> Result<&Entity, AnnotationError> {
        if !schema.has_tag(tag) {
            return Err(AnnotationError::UnknownTag(tag.to_string()));
        }
        let text = doc.slice(&span).ok_or(AnnotationError::InvalidSpan(span))?;
        if text.trim().is_empty() {
            return Err(AnnotationError::WhitespaceOnly(span));
        }
        self.admit(&span, tag, allow_overlap)?;

        let index = self.insert_entity(Entity::new(span, text, tag));
        debug!("Added entity {} at {}", self.entities[index].id, span);
        Ok(&self.entities[index])
    }

    /// Remove every instance of an entity and every relation touching it.
    pub fn remove_entity(&mut self, id: &str) -> Result<Removal, AnnotationError> {
        let before = self.entities.len();
        self.entities.retain(|e| e.id != id);
        let entities = before - self.entities.len();
        if entities == 0 {
            return Err(AnnotationError::EntityNotFound(id.to_string()));
        }
        let relations = self.drop_relations_touching(id);
        Ok(Removal {
            entities,
            relations,
        })
    }

    /// Remove one instance by its index in the sorted entity list.
    ///
    /// Relations are only dropped when the last instance of the id goes away.
    pub fn remove_instance(&mut self, index: usize) -> Result<Removal, AnnotationError> {
        if index >= self.entities.len() {
            return Err(AnnotationError::InstanceNotFound(index));
        }
        let removed = self.entities.remove(index);
        let relations = if self.has_entity(&removed.id) {
            0
        } else {
            self.drop_relations_touching(&removed.id)
        };
        Ok(Removal {
            entities: 1,
            relations,
        })
    }

    fn drop_relations_touching(&mut self, id: &str) -> usize {
        let before = self.relations.len();
        self.relations.retain(|r| !r.touches(id));
        before - self.relations.len()
    }

    /// Merge entities so they share one id.
    ///
    /// The surviving id is that of the earliest-positioned instance among the
    /// selection. Relation endpoints are rewritten and duplicates that result
    /// from the rewrite are dropped.
    pub fn merge(&mut self, ids: &[String]) -> Result<MergeOutcome, AnnotationError> {
        let mut selected: Vec<&str> = Vec::new();
        for id in ids {
            if !selected.contains(&id.as_str()) {
                selected.push(id);
            }
        }
        for id in &selected {
            if !self.has_entity(id) {
                return Err(AnnotationError::EntityNotFound(id.to_string()));
            }
        }
        if selected.len() < 2 {
            return Err(AnnotationError::MergeNeedsTwo(selected.len()));
        }

        let group: HashSet<String> = selected.iter().map(|s| s.to_string()).collect();
        let canonical_id = self
            .entities
            .iter()
            .find(|e| group.contains(&e.id))
            .map(|e| e.id.clone())
            .ok_or_else(|| AnnotationError::EntityNotFound(ids.join(", ")))?;

        let mut instances_rewritten = 0;
        for entity in self.entities.iter_mut() {
            if group.contains(&entity.id) && entity.id != canonical_id {
                entity.id = canonical_id.clone();
                instances_rewritten += 1;
            }
        }

        let mut relations_rewritten = 0;
        for relation in self.relations.iter_mut() {
            let mut changed = false;
            if group.contains(&relation.head_id) && relation.head_id != canonical_id {
                relation.head_id = canonical_id.clone();
                changed = true;
            }
            if group.contains(&relation.tail_id) && relation.tail_id != canonical_id {
                relation.tail_id = canonical_id.clone();
                changed = true;
            }
            if changed {
                relations_rewritten += 1;
            }
        }

        let before = self.relations.len();
        let mut seen = HashSet::new();
        self.relations.retain(|r| {
            seen.insert((
                r.head_id.clone(),
                r.tail_id.clone(),
                r.relation_type.clone(),
            ))
        });
        let duplicates_removed = before - self.relations.len();

        let self_loops = self
            .relations
            .iter()
            .filter(|r| r.is_self_loop() && r.head_id == canonical_id)
            .count();
        if self_loops > 0 {
            warn!(
                "Merge left {} relation(s) from entity {} to itself",
                self_loops, canonical_id
            );
        }

        Ok(MergeOutcome {
            canonical_id,
            instances_rewritten,
            relations_rewritten,
            duplicates_removed,
            self_loops,
        })
    }

    /// Detach one instance from its merge group under a fresh id.
    ///
    /// Relations stay attached to the remaining group.
    pub fn demerge(&mut self, index: usize) -> Result<String, AnnotationError> {
        let id = self
            .entities
            .get(index)
            .map(|e| e.id.clone())
            .ok_or(AnnotationError::InstanceNotFound(index))?;
        if !self.is_merged(&id) {
            return Err(AnnotationError::NotMerged(index));
        }
        let fresh = new_id();
        self.entities[index].id = fresh.clone();
        Ok(fresh)
    }

    /// Change the tag of every instance of the given ids.
    pub fn relabel(
        &mut self,
        ids: &[String],
        tag: &str,
        schema: &TagSchema,
    ) -> Result<usize, AnnotationError> {
        if !schema.has_tag(tag) {
            return Err(AnnotationError::UnknownTag(tag.to_string()));
        }
        if let Some(missing) = ids.iter().find(|id| !self.has_entity(id)) {
            return Err(AnnotationError::EntityNotFound(missing.clone()));
        }
        let mut changed = 0;
        for entity in self.entities.iter_mut() {
            if ids.contains(&entity.id) && entity.tag != tag {
                entity.tag = tag.to_string();
                changed += 1;
            }
        }
        self.sort_entities();
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Relation;

    fn setup() -> (DocumentText, TagSchema, DocumentAnnotations) {
        let doc = DocumentText::new("John Smith met Mary.\nHe called John later.");
        (doc, TagSchema::default(), DocumentAnnotations::default())
    }

    #[test]
    fn test_add_rejects_overlap_unless_allowed() {
        let (doc, schema, mut ann) = setup();
        ann.add_entity(&doc, &schema, Span::on_line(1, 0, 10), "Person", false)
            .unwrap();
        let err = ann
            .add_entity(&doc, &schema, Span::on_line(1, 5, 10), "Person", false)
            .unwrap_err();
        assert!(matches!(err, AnnotationError::Overlap { .. }));

        // Touching spans do not overlap.
        ann.add_entity(&doc, &schema, Span::on_line(1, 10, 14), "Other", false)
            .unwrap();

        ann.add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", true)
            .unwrap();
        let err = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", true)
            .unwrap_err();
        assert!(matches!(err, AnnotationError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_add_validates_input() {
        let (doc, schema, mut ann) = setup();
        assert!(matches!(
            ann.add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Nope", false),
            Err(AnnotationError::UnknownTag(_))
        ));
        assert!(matches!(
            ann.add_entity(&doc, &schema, Span::on_line(1, 4, 5), "Person", false),
            Err(AnnotationError::WhitespaceOnly(_))
        ));
        assert!(matches!(
            ann.add_entity(&doc, &schema, Span::on_line(3, 0, 1), "Person", false),
            Err(AnnotationError::InvalidSpan(_))
        ));
    }

    #[test]
    fn test_entities_stay_sorted() {
        let (doc, schema, mut ann) = setup();
        ann.add_entity(&doc, &schema, Span::on_line(2, 10, 14), "Person", false)
            .unwrap();
        ann.add_entity(&doc, &schema, Span::on_line(1, 15, 19), "Person", false)
            .unwrap();
        ann.add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", false)
            .unwrap();
        let texts: Vec<&str> = ann.entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["John", "Mary", "John"]);
    }

    #[test]
    fn test_remove_cascades_to_relations() {
        let (doc, schema, mut ann) = setup();
        let john = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 10), "Person", false)
            .unwrap()
            .id
            .clone();
        let mary = ann
            .add_entity(&doc, &schema, Span::on_line(1, 15, 19), "Person", false)
            .unwrap()
            .id
            .clone();
        ann.relations.push(Relation::new("spouse_of", &john, &mary));

        let removal = ann.remove_entity(&mary).unwrap();
        assert_eq!(removal, Removal { entities: 1, relations: 1 });
        assert!(ann.relations.is_empty());
        assert!(ann.dangling_relations().next().is_none());
        assert!(matches!(
            ann.remove_entity(&mary),
            Err(AnnotationError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_merge_keeps_earliest_id_and_dedups_relations() {
        let (doc, schema, mut ann) = setup();
        let mary = ann
            .add_entity(&doc, &schema, Span::on_line(1, 15, 19), "Person", false)
            .unwrap()
            .id
            .clone();
        let late_john = ann
            .add_entity(&doc, &schema, Span::on_line(2, 10, 14), "Person", false)
            .unwrap()
            .id
            .clone();
        let early_john = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 10), "Person", false)
            .unwrap()
            .id
            .clone();
        ann.relations
            .push(Relation::new("spouse_of", &early_john, &mary));
        ann.relations
            .push(Relation::new("spouse_of", &late_john, &mary));

        let outcome = ann
            .merge(&[late_john.clone(), early_john.clone()])
            .unwrap();
        assert_eq!(outcome.canonical_id, early_john);
        assert_eq!(outcome.instances_rewritten, 1);
        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(ann.relations.len(), 1);
        assert!(ann.is_merged(&early_john));
        assert!(!ann.has_entity(&late_john));
    }

    #[test]
    fn test_merge_reports_self_loops() {
        let (doc, schema, mut ann) = setup();
        let a = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", false)
            .unwrap()
            .id
            .clone();
        let b = ann
            .add_entity(&doc, &schema, Span::on_line(2, 10, 14), "Person", false)
            .unwrap()
            .id
            .clone();
        ann.relations.push(Relation::new("spouse_of", &a, &b));
        let outcome = ann.merge(&[a.clone(), b]).unwrap();
        assert_eq!(outcome.self_loops, 1);
        assert!(ann.relations[0].is_self_loop());
    }

    #[test]
    fn test_merge_needs_two_distinct() {
        let (doc, schema, mut ann) = setup();
        let a = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", false)
            .unwrap()
            .id
            .clone();
        assert!(matches!(
            ann.merge(&[a.clone(), a.clone()]),
            Err(AnnotationError::MergeNeedsTwo(1))
        ));
        assert!(matches!(
            ann.merge(&[a, "missing".to_string()]),
            Err(AnnotationError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_demerge_assigns_fresh_id() {
        let (doc, schema, mut ann) = setup();
        let a = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", false)
            .unwrap()
            .id
            .clone();
        let b = ann
            .add_entity(&doc, &schema, Span::on_line(2, 10, 14), "Person", false)
            .unwrap()
            .id
            .clone();
        assert!(matches!(ann.demerge(0), Err(AnnotationError::NotMerged(0))));

        ann.merge(&[a.clone(), b]).unwrap();
        let fresh = ann.demerge(1).unwrap();
        assert_ne!(fresh, a);
        assert_eq!(ann.entities[0].id, a);
        assert_eq!(ann.entities[1].id, fresh);
        assert!(!ann.is_merged(&a));
    }

    #[test]
    fn test_remove_instance_keeps_group_relations() {
        let (doc, schema, mut ann) = setup();
        let a = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", false)
            .unwrap()
            .id
            .clone();
        let b = ann
            .add_entity(&doc, &schema, Span::on_line(2, 10, 14), "Person", false)
            .unwrap()
            .id
            .clone();
        let mary = ann
            .add_entity(&doc, &schema, Span::on_line(1, 15, 19), "Person", false)
            .unwrap()
            .id
            .clone();
        ann.merge(&[a.clone(), b]).unwrap();
        ann.relations.push(Relation::new("spouse_of", &a, &mary));

        // Entities sorted: John(1.0), Mary(1.15), John(2.10)
        let removal = ann.remove_instance(2).unwrap();
        assert_eq!(removal.relations, 0);
        let removal = ann.remove_instance(0).unwrap();
        assert_eq!(removal.relations, 1);
    }

    #[test]
    fn test_relabel_changes_every_instance() {
        let (doc, schema, mut ann) = setup();
        let a = ann
            .add_entity(&doc, &schema, Span::on_line(1, 0, 4), "Person", false)
            .unwrap()
            .id
            .clone();
        let b = ann
            .add_entity(&doc, &schema, Span::on_line(2, 10, 14), "Person", false)
            .unwrap()
            .id
            .clone();
        ann.merge(&[a.clone(), b]).unwrap();
        let changed = ann
            .relabel(&[a.clone()], "Organization", &schema)
            .unwrap();
        assert_eq!(changed, 2);
        assert!(ann.entities.iter().all(|e| e.tag == "Organization"));
        assert!(matches!(
            ann.relabel(&[a], "Nope", &schema),
            Err(AnnotationError::UnknownTag(_))
        ));
    }
}
