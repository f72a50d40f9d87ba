//! Generic REST resource: validation, persistence, listing and events for
//! one entity type. Each resource module instantiates it once.

pub mod filter;
pub mod openapi;
pub mod routes;

use std::{cmp::Ordering, collections::HashMap, fmt::Debug, sync::Arc};

use bookshelf_db::{Direction, Page, Pageable, Repository, Sort};
use bookshelf_events::EventBus;
use bookshelf_http::{AppError, AppResult};
use bookshelf_model::{Entity, EntityId};

pub type Comparator<E> = fn(&E, &E) -> Ordering;

/// Server-side behavior an entity needs to be exposed as a resource.
pub trait ServerEntity: Entity {
    type Criteria: Criteria<Self>;

    /// Copy every field set on `patch` onto `self`.
    fn merge(&mut self, patch: Self);

    /// Ordering for a sortable field, `None` when the field is not sortable.
    fn comparator(field: &str) -> Option<Comparator<Self>>;
}

/// Filters parsed from list query parameters.
pub trait Criteria<E>: Debug + Default + Send + Sync + Sized + 'static {
    fn from_params(params: &HashMap<String, String>) -> AppResult<Self>;

    fn matches(&self, entity: &E) -> bool;
}

/// Links from an entity to rows owned by other resources.
///
/// Only the linked ids are stored; the owning resource is the source of
/// truth for everything else.
pub trait References<E>: Send + Sync {
    /// Reduce links to bare ids, rejecting ids that do not exist.
    fn on_save(&self, entity: E) -> AppResult<E>;

    /// Expand stored ids into the current linked rows.
    fn on_read(&self, entity: E) -> E;
}

pub struct ResourceService<E> {
    repository: Repository<E>,
    events: Option<(EventBus, &'static str)>,
    references: Option<Arc<dyn References<E>>>,
}

impl<E: ServerEntity> Default for ResourceService<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ServerEntity> ResourceService<E> {
    pub fn new() -> Self {
        Self {
            repository: Repository::new(),
            events: None,
            references: None,
        }
    }

    pub fn with_references(mut self, references: Arc<dyn References<E>>) -> Self {
        self.references = Some(references);
        self
    }

    fn store(&self, entity: E) -> AppResult<E> {
        let entity = match &self.references {
            Some(references) => references.on_save(entity)?,
            None => entity,
        };
        Ok(self.expand(self.repository.save(entity)))
    }

    fn expand(&self, entity: E) -> E {
        match &self.references {
            Some(references) => references.on_read(entity),
            None => entity,
        }
    }

    /// Publish every newly created entity as JSON on `topic`.
    pub fn with_events(mut self, bus: EventBus, topic: &'static str) -> Self {
        self.events = Some((bus, topic));
        self
    }

    pub fn create(&self, entity: E) -> AppResult<E> {
        tracing::debug!(resource = E::RESOURCE, ?entity, "Request to save");
        if !entity.is_new() {
            return Err(AppError::bad_request(
                E::RESOURCE,
                "idexists",
                format!("A new {} cannot already have an ID", E::RESOURCE),
            ));
        }

        let saved = self.store(entity)?;
        if let Some((bus, topic)) = &self.events {
            let payload = serde_json::to_string(&saved)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize event: {e}")))?;
            bus.publish(topic, payload);
        }
        Ok(saved)
    }

    /// Full replace of the entity at `id`.
    pub fn update(&self, id: EntityId, entity: E) -> AppResult<E> {
        tracing::debug!(resource = E::RESOURCE, id, ?entity, "Request to update");
        self.check_target(id, &entity)?;
        self.store(entity)
    }

    /// Merge the fields set on `patch` into the stored entity.
    pub fn partial_update(&self, id: EntityId, patch: E) -> AppResult<E> {
        tracing::debug!(resource = E::RESOURCE, id, ?patch, "Request to partially update");
        self.check_target(id, &patch)?;

        let mut existing = self
            .repository
            .find_by_id(id)
            .ok_or_else(|| AppError::not_found(format!("{} {} not found", E::RESOURCE, id)))?;
        existing.merge(patch);
        self.store(existing)
    }

    pub fn find_one(&self, id: EntityId) -> AppResult<E> {
        self.repository
            .find_by_id(id)
            .map(|entity| self.expand(entity))
            .ok_or_else(|| AppError::not_found(format!("{} {} not found", E::RESOURCE, id)))
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.repository.exists_by_id(id)
    }

    pub fn find_by_criteria(
        &self,
        criteria: &E::Criteria,
        sort: Option<&Sort>,
        pageable: Pageable,
    ) -> AppResult<Page<E>> {
        tracing::debug!(resource = E::RESOURCE, ?criteria, ?sort, ?pageable, "find by criteria");

        let order = match sort {
            Some(sort) => {
                let compare = E::comparator(&sort.field).ok_or_else(|| {
                    AppError::bad_request(
                        E::RESOURCE,
                        "invalidsort",
                        format!("cannot sort {} by '{}'", E::RESOURCE, sort.field),
                    )
                })?;
                let direction = sort.direction;
                Some(move |a: &E, b: &E| match direction {
                    Direction::Asc => compare(a, b),
                    Direction::Desc => compare(a, b).reverse(),
                })
            }
            None => None,
        };

        let page = self.repository.find_all(
            |entity| criteria.matches(entity),
            order.as_ref().map(|f| f as &dyn Fn(&E, &E) -> Ordering),
            pageable,
        );
        Ok(Page {
            content: page.content.into_iter().map(|e| self.expand(e)).collect(),
            total: page.total,
        })
    }

    pub fn count_by_criteria(&self, criteria: &E::Criteria) -> u64 {
        self.repository.count(|entity| criteria.matches(entity))
    }

    /// Delete by id; unknown ids are not an error.
    pub fn delete(&self, id: EntityId) {
        tracing::debug!(resource = E::RESOURCE, id, "Request to delete");
        self.repository.delete_by_id(id);
    }

    fn check_target(&self, id: EntityId, entity: &E) -> AppResult<()> {
        let Some(body_id) = entity.id() else {
            return Err(AppError::bad_request(E::RESOURCE, "idnull", "Invalid id"));
        };
        if body_id != id {
            return Err(AppError::bad_request(E::RESOURCE, "idinvalid", "Invalid ID"));
        }
        if !self.repository.exists_by_id(id) {
            return Err(AppError::bad_request(
                E::RESOURCE,
                "idnotfound",
                "Entity not found",
            ));
        }
        Ok(())
    }
}
