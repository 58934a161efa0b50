#[cfg(test)]
mod tests {
    use super::super::types::*;
    use super::super::*;
    use crate::core::shared::enums::UserRole;
    use axum::http::StatusCode;

    #[test]
    fn test_admin_has_everything() {
        for module in Module::ALL {
            assert!(can_read(UserRole::Admin, module));
            assert!(can_write(UserRole::Admin, module));
        }
    }

    #[test]
    fn test_users_module_is_admin_only() {
        for role in UserRole::ALL.iter().filter(|r| **r != UserRole::Admin) {
            assert!(!can_read(*role, Module::Users), "{role} can read users");
            assert!(!can_write(*role, Module::Users), "{role} can write users");
        }
    }

    #[test]
    fn test_role_matrix() {
        assert!(can_write(UserRole::Manager, Module::Hr));
        assert!(can_read(UserRole::Hr, Module::Projects));
        assert!(!can_write(UserRole::Hr, Module::Projects));
        assert!(!can_read(UserRole::Hr, Module::Crm));
        assert!(can_write(UserRole::Sales, Module::Crm));
        assert!(!can_write(UserRole::Sales, Module::Projects));
        assert!(can_read(UserRole::Support, Module::Crm));
        assert!(!can_write(UserRole::Support, Module::Crm));
        assert!(can_write(UserRole::Employee, Module::Projects));
        assert!(!can_read(UserRole::Employee, Module::Crm));
    }

    #[test]
    fn test_write_implies_read() {
        for role in UserRole::ALL {
            for module in Module::ALL {
                if can_write(*role, module) {
                    assert!(can_read(*role, module), "{role} writes {module:?} without read");
                }
            }
        }
    }

    #[test]
    fn test_require_helpers() {
        let support = AuthenticatedUser::new(uuid::Uuid::new_v4(), "helpdesk", UserRole::Support);
        assert!(support.require_read(Module::Crm).is_ok());
        assert_eq!(
            support.require_write(Module::Crm),
            Err(AuthError::InsufficientPermissions)
        );
        assert!(!support.is_admin());
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::ExpiredToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::AccountDisabled.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_auth_error_codes() {
        assert_eq!(AuthError::MissingToken.error_code(), "missing_token");
        assert_eq!(AuthError::InvalidCredentials.error_code(), "invalid_credentials");
        assert_eq!(AuthError::AccountDisabled.error_code(), "account_disabled");
    }

    #[test]
    fn test_anonymous_paths() {
        let config = AuthConfig::default();
        assert!(config.is_anonymous_allowed("/health"));
        assert!(config.is_anonymous_allowed("/api/v1/auth/login"));
        assert!(!config.is_anonymous_allowed("/api/v1/auth/me"));
        assert!(!config.is_anonymous_allowed("/api/v1/companies"));
        assert!(!config.is_anonymous_allowed("/healthcheck"));

        let config = config.add_anonymous_path("/api/v1/status");
        assert!(config.is_anonymous_allowed("/api/v1/status"));
    }
}
