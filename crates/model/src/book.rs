use serde::{Deserialize, Serialize};

use crate::{blank_to_none, Author, Entity, EntityId};

/// A book, optionally linked to its author by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier, assigned by the server on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Author reference; carries at least the author id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

impl Book {
    pub fn new(title: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            title: Some(title.into()),
            price: Some(price),
            author: None,
        }
    }

    pub fn with_author(mut self, author_id: EntityId) -> Self {
        self.author = Some(Author::reference(author_id));
        self
    }

    pub fn author_id(&self) -> Option<EntityId> {
        self.author.as_ref().and_then(|author| author.id)
    }
}

impl Entity for Book {
    const RESOURCE: &'static str = "books";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn clean(self) -> Self {
        Self {
            id: self.id,
            title: blank_to_none(self.title),
            price: self.price,
            author: self.author.filter(|author| author.id.is_some()),
        }
    }
}
