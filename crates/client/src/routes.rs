//! Client routing surface: `/{resource}`, `/{resource}/new`,
//! `/{resource}/:id`, `/{resource}/:id/edit`, `/{resource}/:id/delete`.

use std::{fmt, str::FromStr};

use bookshelf_model::EntityId;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("empty route")]
    Empty,

    #[error("invalid entity id '{0}'")]
    InvalidId(String),

    #[error("unknown route '{0}'")]
    Unknown(String),
}

/// Which view of a resource a route selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    List,
    New,
    Detail(EntityId),
    Edit(EntityId),
    Delete(EntityId),
}

impl Page {
    pub fn id(self) -> Option<EntityId> {
        match self {
            Page::List | Page::New => None,
            Page::Detail(id) | Page::Edit(id) | Page::Delete(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub resource: String,
    pub page: Page,
}

impl Route {
    pub fn new(resource: impl Into<String>, page: Page) -> Self {
        Self {
            resource: resource.into(),
            page,
        }
    }
}

fn parse_id(raw: &str) -> Result<EntityId, RouteError> {
    raw.parse()
        .map_err(|_| RouteError::InvalidId(raw.to_string()))
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let page = match segments.as_slice() {
            [] => return Err(RouteError::Empty),
            [_] => Page::List,
            [_, "new"] => Page::New,
            [_, id] => Page::Detail(parse_id(id)?),
            [_, id, "edit"] => Page::Edit(parse_id(id)?),
            [_, id, "delete"] => Page::Delete(parse_id(id)?),
            _ => return Err(RouteError::Unknown(path.to_string())),
        };

        Ok(Self::new(segments[0], page))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Page::List => write!(f, "/{}", self.resource),
            Page::New => write!(f, "/{}/new", self.resource),
            Page::Detail(id) => write!(f, "/{}/{}", self.resource, id),
            Page::Edit(id) => write!(f, "/{}/{}/edit", self.resource, id),
            Page::Delete(id) => write!(f, "/{}/{}/delete", self.resource, id),
        }
    }
}
