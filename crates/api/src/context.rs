use configserver_auth::{Principal, Role};
use configserver_catalog::ActingUser;
use configserver_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    /// Identity recorded in the audit trail for mutations made by this request.
    pub fn acting_user(&self) -> ActingUser {
        ActingUser::new(self.principal.username.clone())
    }
}
