use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::core::shared::enums::UserRole;

/// Functional area a record type belongs to. Access is granted per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Crm,
    Hr,
    Projects,
    Users,
}

impl Module {
    pub const ALL: [Module; 4] = [Self::Crm, Self::Hr, Self::Projects, Self::Users];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Read,
    Write,
}

/// Role matrix, module by module.
pub fn permissions(role: UserRole) -> HashSet<(Module, Permission)> {
    use Module::*;
    use Permission::*;

    let (read, write): (&[Module], &[Module]) = match role {
        UserRole::Admin => (&[Crm, Hr, Projects, Users], &[Crm, Hr, Projects, Users]),
        UserRole::Manager => (&[Crm, Hr, Projects], &[Crm, Hr, Projects]),
        UserRole::Hr => (&[Hr, Projects], &[Hr]),
        UserRole::Sales => (&[Crm, Projects], &[Crm]),
        UserRole::Support => (&[Crm], &[]),
        UserRole::Employee => (&[Projects], &[Projects]),
    };

    let mut perms = HashSet::new();
    perms.extend(read.iter().map(|m| (*m, Read)));
    perms.extend(write.iter().map(|m| (*m, Write)));
    perms
}

pub fn can_read(role: UserRole, module: Module) -> bool {
    permissions(role).contains(&(module, Permission::Read))
}

pub fn can_write(role: UserRole, module: Module) -> bool {
    permissions(role).contains(&(module, Permission::Write))
}

/// Identity attached to a request once its bearer token has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_permission(&self, module: Module, permission: Permission) -> bool {
        permissions(self.role).contains(&(module, permission))
    }

    pub fn require(&self, module: Module, permission: Permission) -> Result<(), super::AuthError> {
        if self.has_permission(module, permission) {
            Ok(())
        } else {
            Err(super::AuthError::InsufficientPermissions)
        }
    }

    pub fn require_read(&self, module: Module) -> Result<(), super::AuthError> {
        self.require(module, Permission::Read)
    }

    pub fn require_write(&self, module: Module) -> Result<(), super::AuthError> {
        self.require(module, Permission::Write)
    }
}
