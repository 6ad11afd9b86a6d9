//! API-side authorization guard.
//!
//! Permission checks happen in the handler, before any service call, so the
//! services stay auth-agnostic.

use configserver_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check that the request's principal holds `required`.
pub fn authorize_request(
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), AuthzError> {
    authorize(principal.principal(), required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use configserver_auth::{Principal, Role};
    use configserver_core::UserId;

    fn ctx(role: Role) -> PrincipalContext {
        PrincipalContext::new(Principal {
            user_id: UserId::new(),
            username: "pat".to_string(),
            role,
        })
    }

    #[test]
    fn read_only_may_read_but_not_write() {
        let ro = ctx(Role::ReadOnly);
        assert!(authorize_request(&ro, &Permission::CONFIG_READ).is_ok());
        assert!(authorize_request(&ro, &Permission::CONFIG_WRITE).is_err());
        assert!(authorize_request(&ro, &Permission::AUDIT_READ).is_err());
    }

    #[test]
    fn acting_user_is_the_username() {
        assert_eq!(ctx(Role::Editor).acting_user().as_str(), "pat");
    }
}
