//! In-memory entity repository.
//!
//! Rows live in an ordered map behind a read/write lock; identifiers come from
//! a per-repository sequence starting at 1. Filtering and ordering are
//! supplied by the caller, paging is applied here.

use std::{cmp::Ordering, collections::BTreeMap, str::FromStr};

use bookshelf_model::{Entity, EntityId};
use parking_lot::RwLock;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SortError {
    #[error("empty sort expression")]
    Empty,

    #[error("invalid sort direction '{0}'; expected asc or desc")]
    Direction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Parsed `field[,asc|desc]` sort expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl FromStr for Sort {
    type Err = SortError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split(',').map(str::trim);
        let field = parts.next().filter(|f| !f.is_empty()).ok_or(SortError::Empty)?;
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(other) => return Err(SortError::Direction(other.to_string())),
        };

        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pageable {
    pub page: u64,
    pub size: u64,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of matching rows plus the number of rows matching overall.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub content: Vec<E>,
    pub total: u64,
}

struct Rows<E> {
    by_id: BTreeMap<EntityId, E>,
    sequence: EntityId,
}

pub struct Repository<E> {
    rows: RwLock<Rows<E>>,
}

impl<E: Entity> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Repository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Rows {
                by_id: BTreeMap::new(),
                sequence: 0,
            }),
        }
    }

    /// Insert or replace `entity`, assigning the next id when it has none.
    pub fn save(&self, mut entity: E) -> E {
        let mut rows = self.rows.write();
        let id = match entity.id() {
            Some(id) => {
                rows.sequence = rows.sequence.max(id);
                id
            }
            None => {
                rows.sequence += 1;
                let id = rows.sequence;
                entity.set_id(id);
                id
            }
        };
        rows.by_id.insert(id, entity.clone());
        tracing::trace!(resource = E::RESOURCE, id, "row saved");
        entity
    }

    pub fn find_by_id(&self, id: EntityId) -> Option<E> {
        self.rows.read().by_id.get(&id).cloned()
    }

    pub fn exists_by_id(&self, id: EntityId) -> bool {
        self.rows.read().by_id.contains_key(&id)
    }

    /// Remove the row; missing ids are ignored.
    pub fn delete_by_id(&self, id: EntityId) -> bool {
        self.rows.write().by_id.remove(&id).is_some()
    }

    pub fn count(&self, filter: impl Fn(&E) -> bool) -> u64 {
        self.rows.read().by_id.values().filter(|e| filter(*e)).count() as u64
    }

    /// Matching rows ordered by `order` (id order when `None`), then paged.
    pub fn find_all(
        &self,
        filter: impl Fn(&E) -> bool,
        order: Option<&dyn Fn(&E, &E) -> Ordering>,
        pageable: Pageable,
    ) -> Page<E> {
        let mut matching: Vec<E> = self
            .rows
            .read()
            .by_id
            .values()
            .filter(|e| filter(*e))
            .cloned()
            .collect();

        if let Some(order) = order {
            matching.sort_by(|a, b| order(a, b));
        }

        let total = matching.len() as u64;
        let skip = pageable.page.saturating_mul(pageable.size) as usize;
        let content = matching
            .into_iter()
            .skip(skip)
            .take(pageable.size as usize)
            .collect();

        Page { content, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_model::Book;

    fn seeded() -> Repository<Book> {
        let repo = Repository::new();
        for (title, price) in [("Dune", 9.99), ("Emma", 4.5), ("Ulysses", 15.0)] {
            repo.save(Book::new(title, price));
        }
        repo
    }

    #[test]
    fn save_assigns_sequential_ids() {
        let repo = seeded();
        assert_eq!(repo.find_by_id(1).and_then(|b| b.title).as_deref(), Some("Dune"));
        assert_eq!(repo.find_by_id(3).and_then(|b| b.title).as_deref(), Some("Ulysses"));
        assert_eq!(repo.save(Book::new("Next", 1.0)).id, Some(4));
    }

    #[test]
    fn save_with_id_replaces_row() {
        let repo = seeded();
        repo.save(Book {
            id: Some(2),
            ..Book::new("Persuasion", 6.0)
        });
        assert_eq!(repo.count(|_| true), 3);
        assert_eq!(repo.find_by_id(2).and_then(|b| b.title).as_deref(), Some("Persuasion"));
    }

    #[test]
    fn delete_missing_id_is_noop() {
        let repo = seeded();
        assert!(repo.delete_by_id(1));
        assert!(!repo.delete_by_id(1));
        assert!(!repo.exists_by_id(1));
    }

    #[test]
    fn find_all_pages_and_counts_total() {
        let repo = seeded();
        let page = repo.find_all(|_| true, None, Pageable { page: 1, size: 2 });
        assert_eq!(page.total, 3);
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].id, Some(3));
    }

    #[test]
    fn find_all_applies_filter_and_order() {
        let repo = seeded();
        let by_price_desc =
            |a: &Book, b: &Book| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal);
        let page = repo.find_all(
            |b| b.price.is_some_and(|p| p > 5.0),
            Some(&by_price_desc),
            Pageable::default(),
        );
        let titles: Vec<_> = page.content.into_iter().filter_map(|b| b.title).collect();
        assert_eq!(titles, vec!["Ulysses", "Dune"]);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn parses_sort_expressions() {
        assert_eq!(
            "title,desc".parse::<Sort>(),
            Ok(Sort {
                field: "title".into(),
                direction: Direction::Desc
            })
        );
        assert_eq!("price".parse::<Sort>().map(|s| s.direction), Ok(Direction::Asc));
        assert_eq!("".parse::<Sort>(), Err(SortError::Empty));
        assert_eq!(
            "id,up".parse::<Sort>(),
            Err(SortError::Direction("up".into()))
        );
    }
}
