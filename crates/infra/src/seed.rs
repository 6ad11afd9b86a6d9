//! Startup data: default accounts and optional sample configuration.
//!
//! Seeding is idempotent; anything that already exists is left untouched.

use tracing::{info, warn};

use configserver_auth::{NewUser, Role};
use configserver_catalog::{ActingUser, Environment, GroupDraft, ItemDraft};
use configserver_core::{DomainError, DomainResult};

use crate::config_service::ConfigurationService;
use crate::user_service::UserService;

const DEFAULT_USERS: [(&str, &str, &str, Role); 2] = [
    ("admin", "admin@example.com", "admin123", Role::Admin),
    ("user", "user@example.com", "user123", Role::ReadOnly),
];

const SAMPLE_GROUPS: [(&str, &str); 4] = [
    ("api-service", "API Gateway Configuration"),
    ("user-service", "User Management Service Configuration"),
    ("payment-service", "Payment Processing Service Configuration"),
    ("notification-service", "Notification Service Configuration"),
];

/// (group, key, [DEV, STAGE, PROD] values)
const SAMPLE_ITEMS: [(&str, &str, [&str; 3]); 8] = [
    ("api-service", "api.timeout", ["30", "20", "10"]),
    ("api-service", "api.max-connections", ["100", "200", "500"]),
    ("user-service", "user.session.timeout", ["60", "45", "30"]),
    ("user-service", "user.password.expiry", ["90", "60", "30"]),
    ("payment-service", "payment.retry.count", ["3", "3", "5"]),
    (
        "payment-service",
        "payment.gateway.url",
        [
            "https://dev-payment-gateway.example.com",
            "https://stage-payment-gateway.example.com",
            "https://payment-gateway.example.com",
        ],
    ),
    (
        "notification-service",
        "notification.email.from",
        ["dev-noreply@example.com", "stage-noreply@example.com", "noreply@example.com"],
    ),
    ("notification-service", "notification.sms.enabled", ["true", "true", "true"]),
];

const SAMPLE_ENVIRONMENTS: [Environment; 3] = [Environment::Dev, Environment::Stage, Environment::Prod];

/// Create the `admin` and `user` accounts when absent.
pub async fn seed_default_users(users: &UserService) -> DomainResult<()> {
    for (username, email, password, role) in DEFAULT_USERS {
        let draft = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            role,
        };
        match users.provision_user(&draft, password).await {
            Ok(_) => info!(username, %role, "default user created"),
            Err(DomainError::Conflict(_)) => info!(username, "default user already exists"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Write the sample groups and items, attributed to the system actor.
pub async fn seed_sample_data(config: &ConfigurationService) -> DomainResult<()> {
    let actor = ActingUser::system();
    let mut created = 0usize;

    for (name, description) in SAMPLE_GROUPS {
        match config.create_group(&GroupDraft::new(name, description), &actor).await {
            Ok(_) => created += 1,
            Err(DomainError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    for (group_name, key, values) in SAMPLE_ITEMS {
        let group = config.get_group_by_name(group_name).await?;
        for (environment, value) in SAMPLE_ENVIRONMENTS.iter().zip(values) {
            let draft = ItemDraft::new(key, value, environment.as_str(), group.id);
            match config.create_item(&draft, &actor).await {
                Ok(_) => created += 1,
                Err(DomainError::Conflict(_)) => {}
                Err(e) => {
                    warn!(key, %environment, error = %e, "failed to seed sample item");
                    return Err(e);
                }
            }
        }
    }

    info!(created, "sample configuration data seeded");
    Ok(())
}
