//! Injectable state container for one resource collection.

use std::sync::Arc;

use bookshelf_model::{Entity, EntityId};
use tokio::sync::watch;

use crate::{
    error::{serialize_error, ClientError},
    gateway::{total_count, ApiResponse, EntityGateway, HttpGateway},
    state::{Action, EntityState, Operation},
    QueryParams,
};

/// Holds the canonical local state of a resource and runs its operations.
///
/// Clones share the same state cell. Operations never fail: a failed request
/// is recorded in [`EntityState::error_message`] and the settled state is
/// returned. Concurrent mutations are not fenced; whichever response is
/// reduced last wins.
pub struct EntityStore<E: Entity, G = HttpGateway<E>> {
    gateway: Arc<G>,
    state: Arc<watch::Sender<EntityState<E>>>,
}

impl<E: Entity, G> Clone for EntityStore<E, G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Entity> EntityStore<E, HttpGateway<E>> {
    /// Store talking to `{server_url}/api/{E::RESOURCE}`.
    pub fn connect(client: reqwest::Client, server_url: &str) -> Result<Self, ClientError> {
        Ok(Self::new(HttpGateway::new(client, server_url)?))
    }
}

impl<E: Entity, G: EntityGateway<E>> EntityStore<E, G> {
    pub fn new(gateway: G) -> Self {
        let (state, _) = watch::channel(EntityState::default());
        Self {
            gateway: Arc::new(gateway),
            state: Arc::new(state),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> EntityState<E> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<EntityState<E>> {
        self.state.subscribe()
    }

    pub fn dispatch(&self, action: Action<E>) {
        self.state.send_modify(|state| {
            let current = std::mem::take(state);
            *state = current.reduce(action);
        });
    }

    /// Synchronously restore the initial empty state.
    pub fn reset(&self) {
        self.dispatch(Action::Reset);
    }

    pub async fn list(&self, params: QueryParams) -> EntityState<E> {
        self.dispatch(Action::Pending(Operation::List));
        self.fetch_list(&params).await;
        self.state()
    }

    pub async fn get(&self, id: EntityId) -> EntityState<E> {
        self.dispatch(Action::Pending(Operation::Get));
        match self.gateway.get(id).await {
            Ok(response) => self.dispatch(Action::GetFulfilled(response.data)),
            Err(err) => self.reject(Operation::Get, &err),
        }
        self.state()
    }

    pub async fn create(&self, entity: E) -> EntityState<E> {
        self.dispatch(Action::Pending(Operation::Create));
        let result = self.gateway.create(&entity.clean()).await;
        self.settle_save(Operation::Create, result).await
    }

    /// Full replace of an existing entity.
    pub async fn update(&self, entity: E) -> EntityState<E> {
        self.dispatch(Action::Pending(Operation::Update));
        let result = match required_id(&entity) {
            Ok(id) => self.gateway.update(id, &entity.clean()).await,
            Err(err) => Err(err),
        };
        self.settle_save(Operation::Update, result).await
    }

    /// Send only the fields set on `entity`; the current entity becomes the
    /// server's merged result.
    pub async fn partial_update(&self, entity: E) -> EntityState<E> {
        self.dispatch(Action::Pending(Operation::PartialUpdate));
        let result = match required_id(&entity) {
            Ok(id) => self.gateway.partial_update(id, &entity.clean()).await,
            Err(err) => Err(err),
        };
        self.settle_save(Operation::PartialUpdate, result).await
    }

    pub async fn delete(&self, id: EntityId) -> EntityState<E> {
        self.dispatch(Action::Pending(Operation::Delete));
        match self.gateway.delete(id).await {
            Ok(_) => {
                self.dispatch(Action::Pending(Operation::List));
                self.dispatch(Action::DeleteFulfilled);
                self.fetch_list(&QueryParams::default()).await;
            }
            Err(err) => self.reject(Operation::Delete, &err),
        }
        self.state()
    }

    async fn settle_save(
        &self,
        operation: Operation,
        result: Result<ApiResponse<E>, ClientError>,
    ) -> EntityState<E> {
        match result {
            Ok(response) => {
                // The refresh is in flight before the save is reduced.
                self.dispatch(Action::Pending(Operation::List));
                self.dispatch(Action::SaveFulfilled(response.data));
                self.fetch_list(&QueryParams::default()).await;
            }
            Err(err) => self.reject(operation, &err),
        }
        self.state()
    }

    async fn fetch_list(&self, params: &QueryParams) {
        let result = match self.gateway.list(params).await {
            Ok(response) => total_count(&response.headers).map(|total| (response.data, total)),
            Err(err) => Err(err),
        };

        match result {
            Ok((entities, total_items)) => self.dispatch(Action::ListFulfilled {
                entities,
                total_items,
            }),
            Err(err) => self.reject(Operation::List, &err),
        }
    }

    fn reject(&self, operation: Operation, err: &ClientError) {
        tracing::warn!(
            resource = E::RESOURCE,
            operation = operation.as_str(),
            status = ?err.status(),
            error = %err,
            "resource request failed"
        );
        self.dispatch(Action::Rejected {
            operation,
            message: serialize_error(err),
        });
    }
}

fn required_id<E: Entity>(entity: &E) -> Result<EntityId, ClientError> {
    entity.id().ok_or(ClientError::MissingId {
        resource: E::RESOURCE,
    })
}
