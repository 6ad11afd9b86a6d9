//! Wire types. JSON field names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use configserver_auth::{NewUser, Role, User, UserUpdate};
use configserver_catalog::{AuditEntry, Group, GroupDraft, Item, ItemDraft};
use configserver_core::{DomainResult, GroupId, ItemId, UserId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl GroupRequest {
    pub fn into_draft(self) -> GroupDraft {
        GroupDraft {
            name: self.name,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    pub environment: String,
    pub group_id: String,
}

impl ItemRequest {
    pub fn into_draft(self) -> DomainResult<ItemDraft> {
        let group_id: GroupId = self.group_id.parse()?;
        Ok(ItemDraft {
            key: self.key,
            value: self.value,
            description: self.description,
            environment: self.environment,
            group_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub role: String,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> DomainResult<NewUser> {
        Ok(NewUser {
            username: self.username,
            email: self.email,
            role: self.role.parse::<Role>()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl UpdateUserRequest {
    pub fn into_update(self) -> DomainResult<UserUpdate> {
        Ok(UserUpdate {
            email: self.email,
            role: self.role.parse::<Role>()?,
            enabled: self.enabled,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: GroupId,
    pub name: String,
    pub description: String,
}

impl From<Group> for GroupResponse {
    fn from(g: Group) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: ItemId,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub environment: &'static str,
    pub group_id: GroupId,
}

impl From<Item> for ItemResponse {
    fn from(i: Item) -> Self {
        Self {
            id: i.id,
            key: i.key,
            value: i.value,
            description: i.description,
            environment: i.environment.as_str(),
            group_id: i.group_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: *e.id.as_uuid(),
            action: e.action.as_str(),
            entity_type: e.entity_type.as_str(),
            entity_id: e.entity_id,
            old_value: e.old_value,
            new_value: e.new_value,
            user_id: e.user_id,
            timestamp: e.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: UserId,
    pub token: String,
    pub username: String,
    pub role: Role,
}

/// Account view; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            enabled: u.enabled,
            created_at: u.created_at,
            last_login: u.last_login,
        }
    }
}

pub fn list<T, R: From<T>>(items: Vec<T>) -> Vec<R> {
    items.into_iter().map(R::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_request_reads_camel_case_and_rejects_bad_group_ids() {
        let gid = GroupId::new();
        let req: ItemRequest = serde_json::from_value(json!({
            "key": "k",
            "value": "v",
            "environment": "DEV",
            "groupId": gid.to_string(),
        }))
        .unwrap();
        assert_eq!(req.into_draft().unwrap().group_id, gid);

        let bad: ItemRequest = serde_json::from_value(json!({
            "key": "k",
            "environment": "DEV",
            "groupId": "12",
        }))
        .unwrap();
        assert!(bad.into_draft().is_err());
    }

    #[test]
    fn user_response_omits_the_hash() {
        let user = User {
            id: UserId::new(),
            username: "amy".to_string(),
            email: "amy@example.com".to_string(),
            password_hash: "$2b$secret".to_string(),
            role: Role::Editor,
            enabled: true,
            created_at: Utc::now(),
            last_login: None,
        };
        let body = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(body["role"], "EDITOR");
        assert!(body["createdAt"].is_string());
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("password_hash").is_none());
    }
}
