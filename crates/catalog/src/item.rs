use serde::{Deserialize, Serialize};

use configserver_core::{DomainError, DomainResult, Entity, GroupId, ItemId};

use crate::audit::{Audited, EntityType};
use crate::environment::Environment;

/// A single key/value pair scoped to a group and an environment.
///
/// # Invariants
/// - `key` is non-blank.
/// - `(key, environment, group_id)` is unique across items (store-enforced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub environment: Environment,
    pub group_id: GroupId,
}

/// The uniqueness scope of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemScope {
    pub key: String,
    pub environment: Environment,
    pub group_id: GroupId,
}

/// Caller-supplied fields for creating or replacing an item.
///
/// `environment` is kept as the raw wire string so that validation happens in
/// one place and yields a `Validation` error rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub environment: String,
    pub group_id: GroupId,
}

impl ItemDraft {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        environment: impl Into<String>,
        group_id: GroupId,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
            environment: environment.into(),
            group_id,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the draft without touching any store.
    pub fn validate(&self) -> DomainResult<ItemScope> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(DomainError::validation("item key must not be blank"));
        }
        let environment: Environment = self.environment.parse()?;
        Ok(ItemScope {
            key: key.to_string(),
            environment,
            group_id: self.group_id,
        })
    }
}

impl Item {
    /// Build a new item with a freshly generated id.
    pub fn create(draft: &ItemDraft) -> DomainResult<Self> {
        Self::build(ItemId::new(), draft)
    }

    /// Return the item with every field replaced from `draft`; identity is kept.
    pub fn revised(&self, draft: &ItemDraft) -> DomainResult<Self> {
        Self::build(self.id, draft)
    }

    fn build(id: ItemId, draft: &ItemDraft) -> DomainResult<Self> {
        let scope = draft.validate()?;
        Ok(Self {
            id,
            key: scope.key,
            value: draft.value.clone(),
            description: draft.description.clone(),
            environment: scope.environment,
            group_id: scope.group_id,
        })
    }

    pub fn scope(&self) -> ItemScope {
        ItemScope {
            key: self.key.clone(),
            environment: self.environment,
            group_id: self.group_id,
        }
    }

    /// Whether moving from `self` to `other` touches the uniqueness scope.
    ///
    /// Value/description-only edits never need a conflict re-check.
    pub fn scope_changed(&self, other: &Item) -> bool {
        self.key != other.key
            || self.environment != other.environment
            || self.group_id != other.group_id
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Audited for Item {
    const ENTITY_TYPE: EntityType = EntityType::ConfigItem;

    fn audit_id(&self) -> uuid::Uuid {
        *self.id.as_uuid()
    }

    fn snapshot(&self) -> String {
        format!(
            "key: {}, value: {}, env: {}, groupId: {}",
            self.key, self.value, self.environment, self.group_id
        )
    }
}
