//! Client-side synchronization of bookshelf REST resources.
//!
//! An [`EntityGateway`] issues exactly one HTTP request per operation against
//! `api/<resource>`. An [`EntityStore`] owns the canonical local copy of the
//! collection and the current entity, and reduces every request outcome into
//! its [`EntityState`]. Views read the store and dispatch operations on it.

pub mod error;
pub mod gateway;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod views;

pub use bookshelf_model::{Author, Book, Entity, EntityId};
pub use error::ClientError;
pub use gateway::{ApiResponse, EntityGateway, HttpGateway, TOTAL_COUNT_HEADER};
pub use query::QueryParams;
pub use state::{Action, EntityState, Operation};
pub use store::EntityStore;

/// Store for the `api/books` resource.
pub type BooksStore = EntityStore<Book>;

/// Store for the `api/author` resource.
pub type AuthorStore = EntityStore<Author>;
