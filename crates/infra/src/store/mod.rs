//! Transactional storage boundary for groups, items and the audit log.
//!
//! A mutation runs against one `ConfigTx`: every read and write inside it is
//! isolated from concurrent transactions, and nothing becomes visible until
//! `commit`. Dropping a transaction without committing rolls it back. This is
//! what lets the configuration service write a change and its audit entry
//! atomically.
//!
//! Backends enforce the relational constraints themselves (unique group
//! name, unique item scope, item -> group reference, cascade on group
//! delete) so a racing writer that slipped past the service's pre-checks is
//! still rejected.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use configserver_catalog::{AuditEntry, EntityType, Environment, Group, Item, ItemScope};
use configserver_core::{DomainError, GroupId, ItemId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryConfigStore;
pub use postgres::PostgresConfigStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation error.
///
/// These are infrastructure errors; the service maps them onto the domain
/// taxonomy (`UniqueViolation` -> Conflict, `ForeignKeyViolation` -> NotFound,
/// `Backend` -> Storage).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => DomainError::conflict(msg),
            StoreError::ForeignKeyViolation(msg) => DomainError::not_found(msg),
            StoreError::Backend(msg) => DomainError::storage(msg),
        }
    }
}

/// Optional narrowing of item listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub group_id: Option<GroupId>,
    pub environment: Option<Environment>,
}

impl ItemFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn group(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            environment: None,
        }
    }

    pub fn group_env(group_id: GroupId, environment: Environment) -> Self {
        Self {
            group_id: Some(group_id),
            environment: Some(environment),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.group_id.is_none_or(|g| item.group_id == g)
            && self.environment.is_none_or(|e| item.environment == e)
    }
}

/// Persisted groups. Listings are ordered by name.
#[async_trait]
pub trait GroupStore: Send {
    async fn group(&mut self, id: GroupId) -> StoreResult<Option<Group>>;

    /// Exact, case-sensitive lookup.
    async fn group_by_name(&mut self, name: &str) -> StoreResult<Option<Group>>;

    async fn groups(&mut self) -> StoreResult<Vec<Group>>;

    /// Fails `UniqueViolation` when another group already has the name.
    async fn insert_group(&mut self, group: &Group) -> StoreResult<()>;

    /// Returns `false` when no row has `group.id`.
    async fn update_group(&mut self, group: &Group) -> StoreResult<bool>;

    /// Deletes the group and every item it owns.
    ///
    /// Returns the number of cascaded items, or `None` when the group did not
    /// exist.
    async fn delete_group(&mut self, id: GroupId) -> StoreResult<Option<u64>>;
}

/// Persisted items. Listings are ordered by key, then environment literal.
#[async_trait]
pub trait ItemStore: Send {
    async fn item(&mut self, id: ItemId) -> StoreResult<Option<Item>>;

    async fn item_in_scope(&mut self, scope: &ItemScope) -> StoreResult<Option<Item>>;

    async fn items(&mut self, filter: ItemFilter) -> StoreResult<Vec<Item>>;

    /// Fails `ForeignKeyViolation` when the group is missing and
    /// `UniqueViolation` when the scope is taken.
    async fn insert_item(&mut self, item: &Item) -> StoreResult<()>;

    /// Same constraint errors as `insert_item`; `false` when the id is unknown.
    async fn update_item(&mut self, item: &Item) -> StoreResult<bool>;

    async fn delete_item(&mut self, id: ItemId) -> StoreResult<bool>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditLog: Send {
    async fn append(&mut self, entry: &AuditEntry) -> StoreResult<()>;

    /// Entries for one entity, oldest first.
    async fn entries_for(
        &mut self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> StoreResult<Vec<AuditEntry>>;

    /// The latest `limit` entries, newest first.
    async fn recent(&mut self, limit: usize) -> StoreResult<Vec<AuditEntry>>;
}

/// One unit of work across all three stores.
#[async_trait]
pub trait ConfigTx: GroupStore + ItemStore + AuditLog {
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Factory for transactions.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn ConfigTx>>;
}

#[async_trait]
impl<S> ConfigStore for std::sync::Arc<S>
where
    S: ConfigStore + ?Sized,
{
    async fn begin(&self) -> StoreResult<Box<dyn ConfigTx>> {
        (**self).begin().await
    }
}

/// Sort key shared by every backend for item listings.
pub(crate) fn item_order(a: &Item, b: &Item) -> core::cmp::Ordering {
    a.key
        .cmp(&b.key)
        .then_with(|| a.environment.as_str().cmp(b.environment.as_str()))
        .then_with(|| a.group_id.cmp(&b.group_id))
}
