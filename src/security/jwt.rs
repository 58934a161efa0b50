use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::UserRole;

pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_token_expiry_minutes: i64,
    pub leeway_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "crmserver".into(),
            audience: "crmserver-api".into(),
            access_token_expiry_minutes: 60,
            leeway_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("JWT secret must be at least {MIN_SECRET_LENGTH} characters")]
    WeakSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
    pub username: String,
    pub role: UserRole,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        username: &str,
        role: UserRole,
        config: &JwtConfig,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expiry = issued_at + Duration::minutes(config.access_token_expiry_minutes);
        Self {
            sub: user_id.to_string(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp: expiry.timestamp(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            username: username.to_string(),
            role,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|e| TokenError::Invalid(format!("bad subject: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager").field("config", &self.config).finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(config: JwtConfig, secret: &str) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn issue(&self, user_id: Uuid, username: &str, role: UserRole) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, username, role, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        username: &str,
        role: UserRole,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(user_id, username, role, &self.config, issued_at);
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.config.access_token_expiry_minutes * 60,
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = self.config.leeway_seconds;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "this-is-a-very-long-secret-key-for-testing-purposes-only";

    fn create_test_manager() -> JwtManager {
        JwtManager::new(JwtConfig::default(), SECRET).expect("Failed to create manager")
    }

    #[test]
    fn test_issue_and_validate() {
        let manager = create_test_manager();
        let user_id = Uuid::new_v4();

        let issued = manager.issue(user_id, "admin", UserRole::Admin).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = manager.validate(&issued.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let manager = create_test_manager();
        let issued = manager
            .issue_at(Uuid::new_v4(), "old", UserRole::Sales, Utc::now() - Duration::hours(3))
            .unwrap();

        assert_eq!(manager.validate(&issued.access_token), Err(TokenError::Expired));
    }

    #[test]
    fn test_invalid_token() {
        let manager = create_test_manager();
        assert!(matches!(manager.validate("invalid.token.here"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let other = JwtManager::new(JwtConfig::default(), &"z".repeat(40)).unwrap();
        let issued = other.issue(Uuid::new_v4(), "mallory", UserRole::Admin).unwrap();

        assert!(matches!(
            create_test_manager().validate(&issued.access_token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_weak_secret_rejected() {
        assert_eq!(
            JwtManager::new(JwtConfig::default(), "short").unwrap_err(),
            TokenError::WeakSecret
        );
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
