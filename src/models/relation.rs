//! Directed, typed relations between entities.

use serde::{Deserialize, Serialize};

use super::entity::new_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    pub head_id: String,
    pub tail_id: String,
}

impl Relation {
    pub fn new(
        relation_type: impl Into<String>,
        head_id: impl Into<String>,
        tail_id: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            relation_type: relation_type.into(),
            head_id: head_id.into(),
            tail_id: tail_id.into(),
        }
    }

    /// Identity of a relation ignoring its own id.
    pub fn signature(&self) -> (&str, &str, &str) {
        (&self.head_id, &self.tail_id, &self.relation_type)
    }

    pub fn is_self_loop(&self) -> bool {
        self.head_id == self.tail_id
    }

    pub fn touches(&self, entity_id: &str) -> bool {
        self.head_id == entity_id || self.tail_id == entity_id
    }
}
