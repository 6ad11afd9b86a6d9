//! Configuration service: the only path through which groups and items change.
//!
//! ## Mutation flow
//!
//! ```text
//! draft ─▶ validate ─▶ begin tx ─▶ pre-checks ─▶ store write ─▶ audit append ─▶ commit
//!                                     │               │              │
//!                                     └───────────────┴──────────────┴─▶ error: tx dropped (rollback)
//! ```
//!
//! The change and its audit entry commit together or not at all.
//!
//! ## Error mapping
//!
//! | Condition | DomainError |
//! |-----------|-------------|
//! | blank name/key, unknown environment | `Validation` |
//! | unknown id, missing group | `NotFound` |
//! | duplicate group name or item scope | `Conflict` |
//! | backend failure | `Storage` |

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use configserver_catalog::{
    ActingUser, AuditEntry, EntityType, Environment, Group, GroupDraft, Item, ItemDraft,
};
use configserver_core::{DomainError, DomainResult, GroupId, ItemId};

use crate::store::{ConfigStore, ConfigTx, ItemFilter, StoreError};

pub const DEFAULT_AUDIT_LIMIT: usize = 50;
pub const MAX_AUDIT_LIMIT: usize = 500;

pub struct ConfigurationService {
    store: Arc<dyn ConfigStore>,
}

impl ConfigurationService {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    async fn begin(&self) -> DomainResult<Box<dyn ConfigTx>> {
        Ok(self.store.begin().await?)
    }

    // ---- groups ----------------------------------------------------------

    pub async fn list_groups(&self) -> DomainResult<Vec<Group>> {
        let mut tx = self.begin().await?;
        Ok(tx.groups().await?)
    }

    pub async fn get_group(&self, id: GroupId) -> DomainResult<Group> {
        let mut tx = self.begin().await?;
        require_group(tx.as_mut(), id).await
    }

    pub async fn get_group_by_name(&self, name: &str) -> DomainResult<Group> {
        let mut tx = self.begin().await?;
        tx.group_by_name(name)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("group '{name}' not found")))
    }

    pub async fn create_group(&self, draft: &GroupDraft, actor: &ActingUser) -> DomainResult<Group> {
        let group = Group::create(draft)?;
        let mut tx = self.begin().await?;

        if tx.group_by_name(&group.name).await?.is_some() {
            return Err(group_name_taken(&group.name));
        }
        tx.insert_group(&group)
            .await
            .map_err(|e| on_group_write(e, &group.name))?;
        tx.append(&AuditEntry::created(&group, actor, Utc::now())).await?;
        tx.commit().await?;

        info!(group_id = %group.id, name = %group.name, actor = %actor, "group created");
        Ok(group)
    }

    pub async fn update_group(
        &self,
        id: GroupId,
        draft: &GroupDraft,
        actor: &ActingUser,
    ) -> DomainResult<Group> {
        draft.validate()?;
        let mut tx = self.begin().await?;
        let before = require_group(tx.as_mut(), id).await?;
        let after = before.revised(draft)?;

        if let Some(holder) = tx.group_by_name(&after.name).await? {
            if holder.id != id {
                return Err(group_name_taken(&after.name));
            }
        }
        if !tx
            .update_group(&after)
            .await
            .map_err(|e| on_group_write(e, &after.name))?
        {
            return Err(group_not_found(id));
        }
        tx.append(&AuditEntry::updated(&before, &after, actor, Utc::now()))
            .await?;
        tx.commit().await?;

        info!(group_id = %id, name = %after.name, actor = %actor, "group updated");
        Ok(after)
    }

    /// Deletes the group and, in the same transaction, every item it owns.
    pub async fn delete_group(&self, id: GroupId, actor: &ActingUser) -> DomainResult<()> {
        let mut tx = self.begin().await?;
        let group = require_group(tx.as_mut(), id).await?;
        let cascaded = tx
            .delete_group(id)
            .await?
            .ok_or_else(|| group_not_found(id))?;
        tx.append(&AuditEntry::deleted(&group, actor, Utc::now())).await?;
        tx.commit().await?;

        info!(group_id = %id, name = %group.name, items_removed = cascaded, actor = %actor, "group deleted");
        Ok(())
    }

    // ---- items -----------------------------------------------------------

    pub async fn list_items(&self) -> DomainResult<Vec<Item>> {
        let mut tx = self.begin().await?;
        Ok(tx.items(ItemFilter::all()).await?)
    }

    pub async fn get_item(&self, id: ItemId) -> DomainResult<Item> {
        let mut tx = self.begin().await?;
        require_item(tx.as_mut(), id).await
    }

    pub async fn list_items_by_group(&self, group_id: GroupId) -> DomainResult<Vec<Item>> {
        let mut tx = self.begin().await?;
        require_group(tx.as_mut(), group_id).await?;
        Ok(tx.items(ItemFilter::group(group_id)).await?)
    }

    pub async fn list_items_by_group_and_env(
        &self,
        group_id: GroupId,
        environment: &str,
    ) -> DomainResult<Vec<Item>> {
        let environment: Environment = environment.parse()?;
        let mut tx = self.begin().await?;
        require_group(tx.as_mut(), group_id).await?;
        Ok(tx.items(ItemFilter::group_env(group_id, environment)).await?)
    }

    pub async fn create_item(&self, draft: &ItemDraft, actor: &ActingUser) -> DomainResult<Item> {
        let item = Item::create(draft)?;
        let mut tx = self.begin().await?;

        let group = require_group(tx.as_mut(), item.group_id).await?;
        if tx.item_in_scope(&item.scope()).await?.is_some() {
            return Err(item_scope_taken(&item, &group.name));
        }
        tx.insert_item(&item)
            .await
            .map_err(|e| on_item_write(e, &item, &group.name))?;
        tx.append(&AuditEntry::created(&item, actor, Utc::now())).await?;
        tx.commit().await?;

        info!(item_id = %item.id, key = %item.key, environment = %item.environment, group_id = %item.group_id, actor = %actor, "item created");
        Ok(item)
    }

    /// Replaces every field of the item. The uniqueness scope is only
    /// re-checked when key, environment or group changes.
    pub async fn update_item(
        &self,
        id: ItemId,
        draft: &ItemDraft,
        actor: &ActingUser,
    ) -> DomainResult<Item> {
        draft.validate()?;
        let mut tx = self.begin().await?;
        let before = require_item(tx.as_mut(), id).await?;
        let after = before.revised(draft)?;

        let group = require_group(tx.as_mut(), after.group_id).await?;
        if before.scope_changed(&after) {
            if let Some(holder) = tx.item_in_scope(&after.scope()).await? {
                if holder.id != id {
                    return Err(item_scope_taken(&after, &group.name));
                }
            }
        }
        if !tx
            .update_item(&after)
            .await
            .map_err(|e| on_item_write(e, &after, &group.name))?
        {
            return Err(item_not_found(id));
        }
        tx.append(&AuditEntry::updated(&before, &after, actor, Utc::now()))
            .await?;
        tx.commit().await?;

        info!(item_id = %id, key = %after.key, environment = %after.environment, actor = %actor, "item updated");
        Ok(after)
    }

    pub async fn delete_item(&self, id: ItemId, actor: &ActingUser) -> DomainResult<()> {
        let mut tx = self.begin().await?;
        let item = require_item(tx.as_mut(), id).await?;
        if !tx.delete_item(id).await? {
            return Err(item_not_found(id));
        }
        tx.append(&AuditEntry::deleted(&item, actor, Utc::now())).await?;
        tx.commit().await?;

        info!(item_id = %id, key = %item.key, actor = %actor, "item deleted");
        Ok(())
    }

    // ---- audit -----------------------------------------------------------

    /// Trail for one entity, oldest first.
    pub async fn audit_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> DomainResult<Vec<AuditEntry>> {
        let mut tx = self.begin().await?;
        Ok(tx.entries_for(entity_type, entity_id).await?)
    }

    /// Newest entries first. `limit` defaults to 50 and is clamped to 1..=500.
    pub async fn recent_audit(&self, limit: Option<usize>) -> DomainResult<Vec<AuditEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT);
        let mut tx = self.begin().await?;
        Ok(tx.recent(limit).await?)
    }
}

async fn require_group(tx: &mut dyn ConfigTx, id: GroupId) -> DomainResult<Group> {
    tx.group(id).await?.ok_or_else(|| group_not_found(id))
}

async fn require_item(tx: &mut dyn ConfigTx, id: ItemId) -> DomainResult<Item> {
    tx.item(id).await?.ok_or_else(|| item_not_found(id))
}

fn group_not_found(id: GroupId) -> DomainError {
    DomainError::not_found(format!("group {id} not found"))
}

fn item_not_found(id: ItemId) -> DomainError {
    DomainError::not_found(format!("item {id} not found"))
}

fn group_name_taken(name: &str) -> DomainError {
    DomainError::conflict(format!("group with name '{name}' already exists"))
}

fn item_scope_taken(item: &Item, group_name: &str) -> DomainError {
    DomainError::conflict(format!(
        "item with key '{}' already exists in environment {} of group '{group_name}'",
        item.key, item.environment
    ))
}

// A concurrent writer can still win between the pre-check and the write;
// the backend constraint then reports it.
fn on_group_write(err: StoreError, name: &str) -> DomainError {
    match err {
        StoreError::UniqueViolation(_) => group_name_taken(name),
        other => other.into(),
    }
}

fn on_item_write(err: StoreError, item: &Item, group_name: &str) -> DomainError {
    match err {
        StoreError::UniqueViolation(_) => item_scope_taken(item, group_name),
        StoreError::ForeignKeyViolation(_) => group_not_found(item.group_id),
        other => other.into(),
    }
}
