use serde::{Deserialize, Serialize};

use configserver_core::{DomainError, DomainResult, Entity, GroupId};

use crate::audit::{Audited, EntityType};

/// A named collection of configuration items, usually one per service.
///
/// # Invariants
/// - `name` is non-blank and stored trimmed.
/// - `name` is unique across groups (enforced by the store, not here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
}

/// Caller-supplied fields for creating or replacing a group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    pub description: Option<String>,
}

impl GroupDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }

    /// Check the draft without building a group.
    pub fn validate(&self) -> DomainResult<()> {
        self.normalized().map(|_| ())
    }

    fn normalized(&self) -> DomainResult<(String, String)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("group name must not be blank"));
        }
        let description = self.description.clone().unwrap_or_default();
        Ok((name.to_string(), description))
    }
}

impl Group {
    /// Build a new group with a freshly generated id.
    pub fn create(draft: &GroupDraft) -> DomainResult<Self> {
        let (name, description) = draft.normalized()?;
        Ok(Self {
            id: GroupId::new(),
            name,
            description,
        })
    }

    /// Return the group with name/description replaced; identity is kept.
    pub fn revised(&self, draft: &GroupDraft) -> DomainResult<Self> {
        let (name, description) = draft.normalized()?;
        Ok(Self {
            id: self.id,
            name,
            description,
        })
    }
}

impl Entity for Group {
    type Id = GroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Audited for Group {
    const ENTITY_TYPE: EntityType = EntityType::Group;

    fn audit_id(&self) -> uuid::Uuid {
        *self.id.as_uuid()
    }

    fn snapshot(&self) -> String {
        format!("name: {}, description: {}", self.name, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trims_name_and_defaults_description() {
        let draft = GroupDraft {
            name: "  api-service ".to_string(),
            description: None,
        };
        let group = Group::create(&draft).unwrap();
        assert_eq!(group.name, "api-service");
        assert_eq!(group.description, "");
    }

    #[test]
    fn create_rejects_blank_name() {
        let err = Group::create(&GroupDraft::new("   ", "x")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn validate_matches_create() {
        assert!(GroupDraft::new(" ok ", "").validate().is_ok());
        assert!(matches!(
            GroupDraft::new("", "").validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn revised_keeps_identity() {
        let group = Group::create(&GroupDraft::new("api-service", "API")).unwrap();
        let revised = group
            .revised(&GroupDraft::new("gateway", "API gateway"))
            .unwrap();
        assert_eq!(revised.id, group.id);
        assert_eq!(revised.name, "gateway");
        assert_eq!(revised.description, "API gateway");
    }

    #[test]
    fn snapshot_lists_fields() {
        let group = Group::create(&GroupDraft::new("api-service", "API Gateway")).unwrap();
        assert_eq!(group.snapshot(), "name: api-service, description: API Gateway");
    }
}
