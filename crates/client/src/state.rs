//! Store state and the reducer that drives it.
//!
//! ```text
//! operation ──→ Pending ──→ gateway ──→ Fulfilled / Rejected ──→ state
//! ```
//!
//! `EntityState::reduce` is the only place state transitions happen.

use bookshelf_model::Entity;

/// Request kinds a store can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    PartialUpdate,
    Delete,
}

impl Operation {
    /// Mutations flag `updating`; reads flag `loading`.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Operation::List | Operation::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::PartialUpdate => "partial_update",
            Operation::Delete => "delete",
        }
    }
}

/// Outcome of a request phase, fed to [`EntityState::reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action<E> {
    Pending(Operation),
    ListFulfilled { entities: Vec<E>, total_items: u64 },
    GetFulfilled(E),
    /// Create, update or partial update confirmed by the server
    SaveFulfilled(E),
    DeleteFulfilled,
    Rejected { operation: Operation, message: String },
    Reset,
}

/// Canonical client-side copy of one resource collection.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState<E> {
    pub loading: bool,
    pub error_message: Option<String>,
    pub entities: Vec<E>,
    /// Entity under detail view or edit; the empty default when none
    pub entity: E,
    pub updating: bool,
    pub total_items: u64,
    pub update_success: bool,
}

impl<E: Entity> Default for EntityState<E> {
    fn default() -> Self {
        Self {
            loading: false,
            error_message: None,
            entities: Vec::new(),
            entity: E::default(),
            updating: false,
            total_items: 0,
            update_success: false,
        }
    }
}

impl<E: Entity> EntityState<E> {
    pub fn reduce(self, action: Action<E>) -> Self {
        match action {
            Action::Pending(operation) if operation.is_mutation() => Self {
                error_message: None,
                update_success: false,
                updating: true,
                ..self
            },
            Action::Pending(_) => Self {
                error_message: None,
                update_success: false,
                loading: true,
                ..self
            },
            Action::ListFulfilled {
                entities,
                total_items,
            } => Self {
                loading: false,
                entities,
                total_items,
                ..self
            },
            Action::GetFulfilled(entity) => Self {
                loading: false,
                entity,
                ..self
            },
            Action::SaveFulfilled(entity) => Self {
                updating: false,
                loading: false,
                update_success: true,
                entity,
                ..self
            },
            Action::DeleteFulfilled => Self {
                updating: false,
                update_success: true,
                entity: E::default(),
                ..self
            },
            Action::Rejected { message, .. } => Self {
                loading: false,
                updating: false,
                update_success: false,
                error_message: Some(message),
                ..self
            },
            Action::Reset => Self::default(),
        }
    }

    /// True while any request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.loading || self.updating
    }
}
