//! Relation edits: add, flip and remove.

use crate::models::{DocumentAnnotations, Relation, TagSchema};

use super::types::AnnotationError;

impl DocumentAnnotations {
    /// Add a relation from the first selected entity to the second.
    pub fn add_relation(
        &mut self,
        selection: &[String],
        relation_type: &str,
        schema: &TagSchema,
    ) -> Result<&Relation, AnnotationError> {
        let mut distinct: Vec<&String> = Vec::new();
        for id in selection {
            if !distinct.contains(&id) {
                distinct.push(id);
            }
        }
        let [head, tail] = distinct[..] else {
            return Err(AnnotationError::RelationSelection(distinct.len()));
        };
        for id in [head, tail] {
            if !self.has_entity(id) {
                return Err(AnnotationError::EntityNotFound(id.clone()));
            }
        }
        if !schema.has_relation_type(relation_type) {
            return Err(AnnotationError::UnknownRelationType(
                relation_type.to_string(),
            ));
        }
        self.ensure_unique(head, tail, relation_type)?;

        self.relations
            .push(Relation::new(relation_type, head.clone(), tail.clone()));
        Ok(&self.relations[self.relations.len() - 1])
    }

    /// Swap head and tail of a relation.
    pub fn flip_relation(&mut self, id: &str) -> Result<&Relation, AnnotationError> {
        let index = self.relation_index(id)?;
        let (head, tail, relation_type) = {
            let r = &self.relations[index];
            (r.head_id.clone(), r.tail_id.clone(), r.relation_type.clone())
        };
        if head != tail {
            self.ensure_unique(&tail, &head, &relation_type)?;
        }
        let relation = &mut self.relations[index];
        std::mem::swap(&mut relation.head_id, &mut relation.tail_id);
        Ok(&*relation)
    }

    pub fn remove_relation(&mut self, id: &str) -> Result<Relation, AnnotationError> {
        let index = self.relation_index(id)?;
        Ok(self.relations.remove(index))
    }

    fn relation_index(&self, id: &str) -> Result<usize, AnnotationError> {
        self.relations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AnnotationError::RelationNotFound(id.to_string()))
    }

    fn ensure_unique(
        &self,
        head: &str,
        tail: &str,
        relation_type: &str,
    ) -> Result<(), AnnotationError> {
        if self
            .relations
            .iter()
            .any(|r| r.signature() == (head, tail, relation_type))
        {
            return Err(AnnotationError::DuplicateRelation {
                relation_type: relation_type.to_string(),
                head: head.to_string(),
                tail: tail.to_string(),
            });
        }
        Ok(())
    }
}
