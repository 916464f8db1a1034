// Authentication primitives and the authenticated caller.

pub mod password;
pub mod permissions;
pub mod throttle;
pub mod tokens;

use std::collections::BTreeSet;

use crate::config::WorkflowConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Role, User};

pub use password::{check_strength, hash_password, verify_password};
pub use permissions::{catalog, system_roles, Action, Permission, Resource};
pub use throttle::LoginThrottle;
pub use tokens::{generate_token, parse_bearer, token_digest};

/// The user behind a valid bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub role: Role,
    pub permissions: BTreeSet<String>,
    /// Digest of the presented token, used by logout
    pub session_id: String,
}

impl CurrentUser {
    pub fn new(user: User, role: Role, session_id: String) -> Self {
        let permissions = role.permissions.iter().cloned().collect();
        Self {
            user,
            role,
            permissions,
            session_id,
        }
    }

    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn can(&self, resource: Resource, action: Action) -> bool {
        self.permissions
            .contains(&Permission::new(resource, action).code())
    }

    pub fn require(&self, resource: Resource, action: Action) -> ApiResult<()> {
        if self.can(resource, action) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user.id,
                permission = %Permission::new(resource, action),
                "Permission denied"
            );
            Err(ApiError::Forbidden(format!(
                "missing permission {}",
                Permission::new(resource, action)
            )))
        }
    }

    /// Allowed to bypass opportunity stage gating
    pub fn may_override_stages(&self, workflow: &WorkflowConfig) -> bool {
        self.can(Resource::Opportunities, Action::Override)
            || workflow
                .executive_roles
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&self.role.name))
    }
}
