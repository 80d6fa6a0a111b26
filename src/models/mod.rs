//! Data models for annotation sessions.

mod annotations;
mod document;
mod entity;
mod relation;
mod schema;
mod session;
mod span;

pub use annotations::DocumentAnnotations;
pub use document::DocumentText;
pub use entity::{new_id, Entity};
pub use relation::Relation;
pub use schema::{
    SchemaError, SchemaKind, TagSchema, DEFAULT_ENTITY_TAGS, DEFAULT_RELATION_TYPES,
};
pub use session::{
    file_name, is_text_file, Session, SessionFlags, SESSION_VERSION, SESSION_VERSION_PREFIX,
};
pub use span::{Position, Span};
