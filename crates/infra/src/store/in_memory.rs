//! In-memory backend for development and tests.
//!
//! Transactions are serialized through a single async mutex. The first write
//! in a transaction snapshots the state; an uncommitted transaction restores
//! that snapshot when dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use configserver_catalog::{AuditEntry, EntityType, Group, Item, ItemScope};
use configserver_core::{Entity, GroupId, ItemId};

use super::{
    AuditLog, ConfigStore, ConfigTx, GroupStore, ItemFilter, ItemStore, StoreError, StoreResult,
    item_order,
};

#[derive(Debug, Clone, Default)]
struct State {
    groups: BTreeMap<GroupId, Group>,
    items: BTreeMap<ItemId, Item>,
    audit: Vec<AuditEntry>,
}

impl State {
    fn name_taken(&self, name: &str, except: Option<GroupId>) -> bool {
        self.groups
            .values()
            .any(|g| g.name == name && Some(g.id) != except)
    }

    fn scope_taken(&self, scope: &ItemScope, except: Option<ItemId>) -> bool {
        self.items.values().any(|i| {
            i.key == scope.key
                && i.environment == scope.environment
                && i.group_id == scope.group_id
                && Some(i.id) != except
        })
    }

    fn check_item(&self, item: &Item, except: Option<ItemId>) -> StoreResult<()> {
        if !self.groups.contains_key(&item.group_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "config_items.group_id references missing group {}",
                item.group_id
            )));
        }
        if self.scope_taken(&item.scope(), except) {
            return Err(StoreError::UniqueViolation(format!(
                "config_items (key, environment, group_id) = ({}, {}, {})",
                item.key, item.environment, item.group_id
            )));
        }
        Ok(())
    }
}

/// Shared in-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn begin(&self) -> StoreResult<Box<dyn ConfigTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemoryTx {
            guard,
            backup: None,
            committed: false,
        }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    backup: Option<State>,
    committed: bool,
}

impl InMemoryTx {
    fn read(&self) -> &State {
        &self.guard
    }

    fn write(&mut self) -> &mut State {
        if self.backup.is_none() {
            self.backup = Some(self.guard.clone());
        }
        &mut self.guard
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        if !self.committed {
            if let Some(backup) = self.backup.take() {
                *self.guard = backup;
            }
        }
    }
}

#[async_trait]
impl GroupStore for InMemoryTx {
    async fn group(&mut self, id: GroupId) -> StoreResult<Option<Group>> {
        Ok(self.read().groups.get(&id).cloned())
    }

    async fn group_by_name(&mut self, name: &str) -> StoreResult<Option<Group>> {
        Ok(self.read().groups.values().find(|g| g.name == name).cloned())
    }

    async fn groups(&mut self) -> StoreResult<Vec<Group>> {
        let mut groups: Vec<Group> = self.read().groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn insert_group(&mut self, group: &Group) -> StoreResult<()> {
        if self.read().name_taken(&group.name, None) {
            return Err(StoreError::UniqueViolation(format!(
                "config_groups.name = {}",
                group.name
            )));
        }
        self.write().groups.insert(*group.id(), group.clone());
        Ok(())
    }

    async fn update_group(&mut self, group: &Group) -> StoreResult<bool> {
        if !self.read().groups.contains_key(&group.id) {
            return Ok(false);
        }
        if self.read().name_taken(&group.name, Some(group.id)) {
            return Err(StoreError::UniqueViolation(format!(
                "config_groups.name = {}",
                group.name
            )));
        }
        self.write().groups.insert(*group.id(), group.clone());
        Ok(true)
    }

    async fn delete_group(&mut self, id: GroupId) -> StoreResult<Option<u64>> {
        if !self.read().groups.contains_key(&id) {
            return Ok(None);
        }
        let state = self.write();
        state.groups.remove(&id);
        let before = state.items.len();
        state.items.retain(|_, item| item.group_id != id);
        Ok(Some((before - state.items.len()) as u64))
    }
}

#[async_trait]
impl ItemStore for InMemoryTx {
    async fn item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.read().items.get(&id).cloned())
    }

    async fn item_in_scope(&mut self, scope: &ItemScope) -> StoreResult<Option<Item>> {
        Ok(self
            .read()
            .items
            .values()
            .find(|i| i.key == scope.key && i.environment == scope.environment && i.group_id == scope.group_id)
            .cloned())
    }

    async fn items(&mut self, filter: ItemFilter) -> StoreResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .read()
            .items
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        items.sort_by(item_order);
        Ok(items)
    }

    async fn insert_item(&mut self, item: &Item) -> StoreResult<()> {
        self.read().check_item(item, None)?;
        self.write().items.insert(*item.id(), item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &Item) -> StoreResult<bool> {
        if !self.read().items.contains_key(&item.id) {
            return Ok(false);
        }
        self.read().check_item(item, Some(item.id))?;
        self.write().items.insert(*item.id(), item.clone());
        Ok(true)
    }

    async fn delete_item(&mut self, id: ItemId) -> StoreResult<bool> {
        if !self.read().items.contains_key(&id) {
            return Ok(false);
        }
        self.write().items.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl AuditLog for InMemoryTx {
    async fn append(&mut self, entry: &AuditEntry) -> StoreResult<()> {
        self.write().audit.push(entry.clone());
        Ok(())
    }

    async fn entries_for(
        &mut self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> StoreResult<Vec<AuditEntry>> {
        Ok(self
            .read()
            .audit
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn recent(&mut self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        Ok(self.read().audit.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl ConfigTx for InMemoryTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.committed = true;
        tx.backup = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configserver_catalog::{ActingUser, GroupDraft, ItemDraft};

    fn group(name: &str) -> Group {
        Group::create(&GroupDraft::new(name, "")).unwrap()
    }

    fn item(key: &str, env: &str, group_id: GroupId) -> Item {
        Item::create(&ItemDraft::new(key, "v", env, group_id)).unwrap()
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryConfigStore::new();
        let g = group("api");

        let mut tx = store.begin().await.unwrap();
        tx.insert_group(&g).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.group(g.id).await.unwrap(), Some(g));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back_every_write() {
        let store = InMemoryConfigStore::new();
        let g = group("api");

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_group(&g).await.unwrap();
            tx.insert_item(&item("db.url", "DEV", g.id)).await.unwrap();
            tx.append(&AuditEntry::created(&g, &ActingUser::system(), chrono::Utc::now()))
                .await
                .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.groups().await.unwrap().is_empty());
        assert!(tx.items(ItemFilter::all()).await.unwrap().is_empty());
        assert!(tx.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn constraints_mirror_the_relational_schema() {
        let store = InMemoryConfigStore::new();
        let g = group("api");
        let mut tx = store.begin().await.unwrap();
        tx.insert_group(&g).await.unwrap();

        let dup = tx.insert_group(&group("api")).await.unwrap_err();
        assert!(matches!(dup, StoreError::UniqueViolation(_)));

        let orphan = tx.insert_item(&item("k", "DEV", GroupId::new())).await.unwrap_err();
        assert!(matches!(orphan, StoreError::ForeignKeyViolation(_)));

        tx.insert_item(&item("k", "DEV", g.id)).await.unwrap();
        let clash = tx.insert_item(&item("k", "DEV", g.id)).await.unwrap_err();
        assert!(matches!(clash, StoreError::UniqueViolation(_)));
        tx.insert_item(&item("k", "PROD", g.id)).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_group_cascades_to_its_items() {
        let store = InMemoryConfigStore::new();
        let a = group("a");
        let b = group("b");
        let mut tx = store.begin().await.unwrap();
        tx.insert_group(&a).await.unwrap();
        tx.insert_group(&b).await.unwrap();
        tx.insert_item(&item("x", "DEV", a.id)).await.unwrap();
        tx.insert_item(&item("y", "DEV", a.id)).await.unwrap();
        tx.insert_item(&item("x", "DEV", b.id)).await.unwrap();

        assert_eq!(tx.delete_group(a.id).await.unwrap(), Some(2));
        assert_eq!(tx.delete_group(a.id).await.unwrap(), None);
        let left = tx.items(ItemFilter::all()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].group_id, b.id);
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let store = InMemoryConfigStore::new();
        let g = group("api");
        let actor = ActingUser::new("alice");
        let first = AuditEntry::created(&g, &actor, chrono::Utc::now());
        let second = AuditEntry::deleted(&g, &actor, chrono::Utc::now());

        let mut tx = store.begin().await.unwrap();
        tx.append(&first).await.unwrap();
        tx.append(&second).await.unwrap();

        let recent = tx.recent(1).await.unwrap();
        assert_eq!(recent, vec![second.clone()]);
        let trail = tx.entries_for(EntityType::Group, *g.id.as_uuid()).await.unwrap();
        assert_eq!(trail, vec![first, second]);
    }
}
