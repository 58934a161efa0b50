pub mod auth_api;
pub mod cors;
pub mod jwt;
pub mod password;
pub mod validation;

pub use cors::create_cors_layer;
pub use jwt::{Claims, JwtConfig, JwtManager, TokenError};
pub use password::{Argon2Config, PasswordHasher};
pub use validation::{Validate, ValidationError, ValidationResult, Validator};
