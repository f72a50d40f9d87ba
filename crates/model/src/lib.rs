//! Entity shapes for the Books and Author resources.
//!
//! Every field is optional: an entity that has not been persisted yet has no
//! identifier, and a partial update carries only the fields being changed.
//! Absent fields are omitted from the JSON body entirely.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

mod author;
mod book;

pub use author::Author;
pub use book::Book;

/// Server-assigned entity identifier.
pub type EntityId = i64;

/// A record synchronized with a REST resource collection.
pub trait Entity:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Path segment of the collection endpoint, mounted under `api/`.
    const RESOURCE: &'static str;

    fn id(&self) -> Option<EntityId>;

    fn set_id(&mut self, id: EntityId);

    /// An entity without an identifier has not been persisted.
    fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Strip values that only exist for the form layer (empty selections,
    /// blank inputs) before the entity is sent to the server.
    fn clean(self) -> Self {
        self
    }
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Untyped view of an entity body, used by code that merges partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEntity(pub serde_json::Map<String, serde_json::Value>);

impl RawEntity {
    pub fn from_entity<E: Entity>(entity: &E) -> serde_json::Result<Self> {
        match serde_json::to_value(entity)? {
            serde_json::Value::Object(map) => Ok(Self(map)),
            _ => Ok(Self::default()),
        }
    }

    /// Names of the fields present in the body.
    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_without_id_is_new() {
        assert!(Book::default().is_new());
        assert!(Author::default().is_new());

        let book = Book {
            id: Some(1),
            ..Book::default()
        };
        assert!(!book.is_new());
    }

    #[test]
    fn default_entity_serializes_to_empty_object() {
        let body = serde_json::to_string(&Book::default()).unwrap();
        assert_eq!(body, "{}");
        let body = serde_json::to_string(&Author::default()).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn raw_entity_lists_only_present_fields() {
        let book = Book {
            id: Some(3),
            price: Some(12.5),
            ..Book::default()
        };
        let raw = RawEntity::from_entity(&book).unwrap();
        let mut fields = raw.fields();
        fields.sort_unstable();
        assert_eq!(fields, vec!["id", "price"]);
    }
}
