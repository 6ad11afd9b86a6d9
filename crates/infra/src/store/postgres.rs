//! Postgres backend.
//!
//! Each `ConfigTx` wraps one `sqlx::Transaction`; dropping it without commit
//! rolls back. Uniqueness, the item -> group reference and the cascade are
//! enforced by the schema in `migrations/0001_schema.sql`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use configserver_catalog::{AuditEntry, EntityType, Environment, Group, Item, ItemScope};
use configserver_core::{AuditEntryId, GroupId, ItemId};

use super::{
    AuditLog, ConfigStore, ConfigTx, GroupStore, ItemFilter, ItemStore, StoreResult,
};
use crate::pg::{map_sqlx_error, parse_column};

/// Postgres-backed store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresConfigStore {
    pool: PgPool,
}

impl PostgresConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    async fn begin(&self) -> StoreResult<Box<dyn ConfigTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

const GROUP_COLUMNS: &str = "id, name, description";
const ITEM_COLUMNS: &str = "id, key, value, description, environment, group_id";
const AUDIT_COLUMNS: &str =
    r#"id, action, entity_type, entity_id, old_value, new_value, user_id, "timestamp""#;

fn group_from_row(row: &PgRow) -> StoreResult<Group> {
    let read = |e: sqlx::Error| map_sqlx_error("decode config_groups row", e);
    Ok(Group {
        id: GroupId::from_uuid(row.try_get("id").map_err(read)?),
        name: row.try_get("name").map_err(read)?,
        description: row.try_get("description").map_err(read)?,
    })
}

fn item_from_row(row: &PgRow) -> StoreResult<Item> {
    let read = |e: sqlx::Error| map_sqlx_error("decode config_items row", e);
    let environment: String = row.try_get("environment").map_err(read)?;
    Ok(Item {
        id: ItemId::from_uuid(row.try_get("id").map_err(read)?),
        key: row.try_get("key").map_err(read)?,
        value: row.try_get("value").map_err(read)?,
        description: row.try_get("description").map_err(read)?,
        environment: parse_column::<Environment>("environment", &environment)?,
        group_id: GroupId::from_uuid(row.try_get("group_id").map_err(read)?),
    })
}

fn audit_from_row(row: &PgRow) -> StoreResult<AuditEntry> {
    let read = |e: sqlx::Error| map_sqlx_error("decode audit_logs row", e);
    let action: String = row.try_get("action").map_err(read)?;
    let entity_type: String = row.try_get("entity_type").map_err(read)?;
    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(row.try_get("id").map_err(read)?),
        action: parse_column("action", &action)?,
        entity_type: parse_column("entity_type", &entity_type)?,
        entity_id: row.try_get("entity_id").map_err(read)?,
        old_value: row.try_get("old_value").map_err(read)?,
        new_value: row.try_get("new_value").map_err(read)?,
        user_id: row.try_get("user_id").map_err(read)?,
        timestamp: row.try_get("timestamp").map_err(read)?,
    })
}

#[async_trait]
impl GroupStore for PostgresTx {
    #[instrument(skip(self), fields(group_id = %id), err)]
    async fn group(&mut self, id: GroupId) -> StoreResult<Option<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM config_groups WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("group", e))?;
        row.as_ref().map(group_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn group_by_name(&mut self, name: &str) -> StoreResult<Option<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM config_groups WHERE name = $1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("group_by_name", e))?;
        row.as_ref().map(group_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn groups(&mut self) -> StoreResult<Vec<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM config_groups ORDER BY name");
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("groups", e))?;
        rows.iter().map(group_from_row).collect()
    }

    #[instrument(skip(self, group), fields(group_id = %group.id), err)]
    async fn insert_group(&mut self, group: &Group) -> StoreResult<()> {
        sqlx::query("INSERT INTO config_groups (id, name, description) VALUES ($1, $2, $3)")
            .bind(group.id.as_uuid())
            .bind(&group.name)
            .bind(&group.description)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_group", e))?;
        Ok(())
    }

    #[instrument(skip(self, group), fields(group_id = %group.id), err)]
    async fn update_group(&mut self, group: &Group) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE config_groups SET name = $2, description = $3 WHERE id = $1")
            .bind(group.id.as_uuid())
            .bind(&group.name)
            .bind(&group.description)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_group", e))?;
        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(group_id = %id), err)]
    async fn delete_group(&mut self, id: GroupId) -> StoreResult<Option<u64>> {
        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM config_items WHERE group_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_group", e))?;
        let done = sqlx::query("DELETE FROM config_groups WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_group", e))?;
        Ok((done.rows_affected() == 1).then_some(owned as u64))
    }
}

#[async_trait]
impl ItemStore for PostgresTx {
    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM config_items WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn item_in_scope(&mut self, scope: &ItemScope) -> StoreResult<Option<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM config_items \
             WHERE key = $1 AND environment = $2 AND group_id = $3"
        );
        let row = sqlx::query(&sql)
            .bind(&scope.key)
            .bind(scope.environment.as_str())
            .bind(scope.group_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("item_in_scope", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn items(&mut self, filter: ItemFilter) -> StoreResult<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM config_items \
             WHERE ($1::uuid IS NULL OR group_id = $1) \
               AND ($2::text IS NULL OR environment = $2) \
             ORDER BY key, environment, group_id"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.group_id.map(|g| *g.as_uuid()))
            .bind(filter.environment.map(|e| e.as_str()))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id, key = %item.key), err)]
    async fn insert_item(&mut self, item: &Item) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO config_items (id, key, value, description, environment, group_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id.as_uuid())
        .bind(&item.key)
        .bind(&item.value)
        .bind(&item.description)
        .bind(item.environment.as_str())
        .bind(item.group_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id, key = %item.key), err)]
    async fn update_item(&mut self, item: &Item) -> StoreResult<bool> {
        let done = sqlx::query(
            "UPDATE config_items \
             SET key = $2, value = $3, description = $4, environment = $5, group_id = $6 \
             WHERE id = $1",
        )
        .bind(item.id.as_uuid())
        .bind(&item.key)
        .bind(&item.value)
        .bind(&item.description)
        .bind(item.environment.as_str())
        .bind(item.group_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;
        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete_item(&mut self, id: ItemId) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM config_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(done.rows_affected() == 1)
    }
}

#[async_trait]
impl AuditLog for PostgresTx {
    #[instrument(
        skip(self, entry),
        fields(action = %entry.action, entity_type = %entry.entity_type, entity_id = %entry.entity_id),
        err
    )]
    async fn append(&mut self, entry: &AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO audit_logs
               (id, action, entity_type, entity_id, old_value, new_value, user_id, "timestamp")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(&entry.user_id)
        .bind(entry.timestamp)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn entries_for(
        &mut self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> StoreResult<Vec<AuditEntry>> {
        let sql = format!(
            r#"SELECT {AUDIT_COLUMNS} FROM audit_logs
               WHERE entity_type = $1 AND entity_id = $2
               ORDER BY "timestamp" ASC, id ASC"#
        );
        let rows = sqlx::query(&sql)
            .bind(entity_type.as_str())
            .bind(entity_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("entries_for", e))?;
        rows.iter().map(audit_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn recent(&mut self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let sql = format!(
            r#"SELECT {AUDIT_COLUMNS} FROM audit_logs
               ORDER BY "timestamp" DESC, id DESC
               LIMIT $1"#
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("recent_audit", e))?;
        rows.iter().map(audit_from_row).collect()
    }
}

#[async_trait]
impl ConfigTx for PostgresTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PostgresTx { tx } = *self;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}
