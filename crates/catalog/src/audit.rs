//! Append-only audit trail model.
//!
//! One `AuditEntry` is produced per successful group/item mutation. Old and
//! new values are opaque, human-readable snapshots (see `Audited::snapshot`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use configserver_core::{AuditEntryId, DomainError, Entity};

/// Identity attributed to the sentinel actor used by seeding and other
/// unauthenticated internal paths.
pub const SYSTEM_ACTOR: &str = "system";

/// Kind of mutation recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            other => Err(DomainError::validation(format!("invalid audit action '{other}'"))),
        }
    }
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Group,
    ConfigItem,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Group => "Group",
            EntityType::ConfigItem => "ConfigItem",
        }
    }
}

impl core::fmt::Display for EntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Group" => Ok(EntityType::Group),
            "ConfigItem" => Ok(EntityType::ConfigItem),
            other => Err(DomainError::validation(format!(
                "invalid entity type '{other}' (expected Group or ConfigItem)"
            ))),
        }
    }
}

/// Identity string a mutation is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActingUser(String);

impl ActingUser {
    /// Blank identities collapse to the system sentinel.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            Self::system()
        } else {
            Self(id)
        }
    }

    pub fn system() -> Self {
        Self(SYSTEM_ACTOR.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_ACTOR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Option<String>> for ActingUser {
    fn from(value: Option<String>) -> Self {
        value.map(ActingUser::new).unwrap_or_else(ActingUser::system)
    }
}

impl core::fmt::Display for ActingUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity whose mutations are recorded in the audit trail.
pub trait Audited {
    const ENTITY_TYPE: EntityType;

    fn audit_id(&self) -> Uuid;

    /// Readable `field: value` summary stored as old/new value.
    fn snapshot(&self) -> String;
}

/// Immutable record of a single mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: EntityType,
        entity_id: Uuid,
        old_value: Option<String>,
        new_value: Option<String>,
        actor: &ActingUser,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            action,
            entity_type,
            entity_id,
            old_value,
            new_value,
            user_id: actor.as_str().to_string(),
            timestamp,
        }
    }

    pub fn created<T: Audited>(entity: &T, actor: &ActingUser, at: DateTime<Utc>) -> Self {
        Self::new(
            AuditAction::Create,
            T::ENTITY_TYPE,
            entity.audit_id(),
            None,
            Some(entity.snapshot()),
            actor,
            at,
        )
    }

    pub fn updated<T: Audited>(
        before: &T,
        after: &T,
        actor: &ActingUser,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            AuditAction::Update,
            T::ENTITY_TYPE,
            after.audit_id(),
            Some(before.snapshot()),
            Some(after.snapshot()),
            actor,
            at,
        )
    }

    pub fn deleted<T: Audited>(entity: &T, actor: &ActingUser, at: DateTime<Utc>) -> Self {
        Self::new(
            AuditAction::Delete,
            T::ENTITY_TYPE,
            entity.audit_id(),
            Some(entity.snapshot()),
            None,
            actor,
            at,
        )
    }
}

impl Entity for AuditEntry {
    type Id = AuditEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Group, GroupDraft};

    #[test]
    fn blank_actor_falls_back_to_system() {
        assert!(ActingUser::new("  ").is_system());
        assert!(ActingUser::from(None).is_system());
        assert_eq!(ActingUser::new("alice").as_str(), "alice");
    }

    #[test]
    fn created_entry_has_only_new_value() {
        let group = Group::create(&GroupDraft::new("api-service", "API")).unwrap();
        let entry = AuditEntry::created(&group, &ActingUser::new("admin"), Utc::now());
        assert_eq!(entry.action, AuditAction::Create);
        assert_eq!(entry.entity_type, EntityType::Group);
        assert_eq!(entry.entity_id, *group.id.as_uuid());
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value.as_deref(), Some("name: api-service, description: API"));
        assert_eq!(entry.user_id, "admin");
    }

    #[test]
    fn updated_entry_carries_both_snapshots() {
        let group = Group::create(&GroupDraft::new("api-service", "API")).unwrap();
        let revised = group.revised(&GroupDraft::new("gateway", "API")).unwrap();
        let entry = AuditEntry::updated(&group, &revised, &ActingUser::system(), Utc::now());
        assert_eq!(entry.action, AuditAction::Update);
        assert!(entry.old_value.unwrap().contains("api-service"));
        assert!(entry.new_value.unwrap().contains("gateway"));
        assert_eq!(entry.user_id, SYSTEM_ACTOR);
    }

    #[test]
    fn deleted_entry_has_only_old_value() {
        let group = Group::create(&GroupDraft::new("api-service", "API")).unwrap();
        let entry = AuditEntry::deleted(&group, &ActingUser::new("bob"), Utc::now());
        assert_eq!(entry.action, AuditAction::Delete);
        assert!(entry.old_value.is_some());
        assert_eq!(entry.new_value, None);
    }

    #[test]
    fn labels_round_trip() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        for ty in [EntityType::Group, EntityType::ConfigItem] {
            assert_eq!(ty.as_str().parse::<EntityType>().unwrap(), ty);
        }
        assert!("Item".parse::<EntityType>().is_err());
    }
}
