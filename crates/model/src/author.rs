use serde::{Deserialize, Serialize};

use crate::{blank_to_none, Book, Entity, EntityId};

/// An author and, when loaded, the books linked to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub books: Option<Vec<Book>>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            books: None,
        }
    }

    /// Reference to an existing author, as embedded in a [`Book`].
    pub fn reference(id: EntityId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

impl Entity for Author {
    const RESOURCE: &'static str = "author";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn clean(self) -> Self {
        Self {
            id: self.id,
            name: blank_to_none(self.name),
            books: self
                .books
                .map(|books| books.into_iter().filter(|b| b.id.is_some()).collect()),
        }
    }
}
