use serde::Serialize;
use tracing::{info, warn};

use super::App;
use crate::auth::permissions::ADMIN_ROLE;
use crate::auth::{catalog, hash_password, system_roles};
use crate::error::ApiResult;
use crate::models::{new_id, AuditMeta, PermissionEntry, Role, User};
use crate::store::Filter;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub permissions: usize,
    pub roles_created: usize,
    pub roles_updated: usize,
    pub admin_created: bool,
}

/// Idempotently create the permission catalog, system roles and bootstrap admin
pub async fn run(app: &App) -> ApiResult<SeedReport> {
    let mut report = SeedReport::default();

    let entries = app.collection::<PermissionEntry>();
    for permission in catalog() {
        let code = permission.code();
        if entries.get_live(&code).await?.is_none() {
            let entry = PermissionEntry {
                id: code,
                resource: permission.resource.as_str().to_string(),
                action: permission.action.as_str().to_string(),
                description: permission.description(),
                meta: AuditMeta::new(None),
            };
            entries.insert(&entry).await?;
        }
        report.permissions += 1;
    }

    let roles = app.collection::<Role>();
    for (name, description, permissions) in system_roles() {
        let codes: Vec<String> = permissions.iter().map(|p| p.code()).collect();
        match roles.find(&Filter::new().eq("name", name)).await?.pop() {
            Some(mut role) => {
                if role.permissions != codes || !role.is_system {
                    role.permissions = codes;
                    role.is_system = true;
                    roles.update(&role).await?;
                    report.roles_updated += 1;
                }
            }
            None => {
                let role = Role {
                    id: new_id(),
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    permissions: codes,
                    is_system: true,
                    meta: AuditMeta::new(None),
                };
                roles.insert(&role).await?;
                report.roles_created += 1;
            }
        }
    }

    report.admin_created = seed_admin(app).await?;
    info!(
        permissions = report.permissions,
        roles_created = report.roles_created,
        roles_updated = report.roles_updated,
        admin_created = report.admin_created,
        "Seed complete"
    );
    Ok(report)
}

async fn seed_admin(app: &App) -> ApiResult<bool> {
    let auth = &app.config.auth;
    let email = auth.bootstrap_admin_email.trim().to_lowercase();
    let users = app.collection::<User>();
    if !users
        .find(&Filter::new().eq("email", email.as_str()))
        .await?
        .is_empty()
    {
        return Ok(false);
    }
    let Some(password) = auth.bootstrap_admin_password.as_deref() else {
        warn!(email = %email, "No bootstrap admin password configured, skipping admin creation");
        return Ok(false);
    };
    let Some(admin_role) = app
        .collection::<Role>()
        .find(&Filter::new().eq("name", ADMIN_ROLE))
        .await?
        .pop()
    else {
        warn!("Admin role missing, skipping admin creation");
        return Ok(false);
    };

    let admin = User {
        id: new_id(),
        email,
        full_name: "Administrator".to_string(),
        phone: None,
        role_id: admin_role.id,
        password_hash: hash_password(password, auth.bcrypt_cost).await?,
        is_active: true,
        photo_attachment_id: None,
        last_login_at: None,
        meta: AuditMeta::new(None),
    };
    users.insert(&admin).await?;
    info!(email = %admin.email, "Bootstrap admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotedeskConfig;
    use crate::store::MemoryDocumentStore;
    use std::sync::Arc;

    fn app(password: Option<&str>) -> App {
        let mut config = QuotedeskConfig::default();
        config.auth.bcrypt_cost = 4;
        config.auth.bootstrap_admin_password = password.map(str::to_string);
        App::new(Arc::new(MemoryDocumentStore::new()), config)
    }

    #[tokio::test]
    async fn seeding_twice_changes_nothing_the_second_time() {
        let app = app(Some("admin-pass1"));
        let first = run(&app).await.unwrap();
        assert_eq!(first.roles_created, 4);
        assert!(first.admin_created);
        assert_eq!(first.permissions, catalog().len());

        let second = run(&app).await.unwrap();
        assert_eq!(second.roles_created, 0);
        assert_eq!(second.roles_updated, 0);
        assert!(!second.admin_created);
    }

    #[tokio::test]
    async fn admin_is_skipped_without_a_password() {
        let app = app(None);
        let report = run(&app).await.unwrap();
        assert_eq!(report.roles_created, 4);
        assert!(!report.admin_created);
    }
}
