use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::error::StatsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Teacher,
    Student,
    #[serde(other)]
    Unknown,
}

/// Identity of the caller, supplied by the auth collaborator.
pub trait AuthProvider {
    fn current_user_id(&self) -> Option<Uuid>;
    fn current_user_role(&self) -> Option<Role>;
}

/// Resolved caller for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Fails with Unauthenticated when the provider cannot name the caller
    pub fn from_provider(provider: &dyn AuthProvider) -> Result<Self, StatsError> {
        let user_id = provider
            .current_user_id()
            .ok_or_else(|| StatsError::unauthenticated("no current user"))?;
        let role = provider
            .current_user_role()
            .ok_or_else(|| StatsError::unauthenticated("current user has no role"))?;
        Ok(Self { user_id, role })
    }

    pub fn is_superuser(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Role gate for callers exposing statistics: students and unknown roles are rejected.
    pub fn require_staff(&self) -> Result<(), StatsError> {
        match self.role {
            Role::SuperAdmin | Role::Admin | Role::Teacher => Ok(()),
            Role::Student | Role::Unknown => Err(StatsError::unauthorized(format!(
                "role {:?} may not view statistics",
                self.role
            ))),
        }
    }
}

/// Token claims issued by the external auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl AuthProvider for Claims {
    fn current_user_id(&self) -> Option<Uuid> {
        Some(self.sub)
    }

    fn current_user_role(&self) -> Option<Role> {
        Some(self.role)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Authorization header must use Bearer token format")]
    InvalidHeader,
    #[error("Empty JWT token")]
    EmptyToken,
    #[error("JWT secret not configured")]
    InvalidSecret,
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Decode an `Authorization` header value (`Bearer <jwt>`) into claims
pub fn decode_bearer(header: Option<&str>, secret: &str) -> Result<Claims, AuthError> {
    let auth_str = header.ok_or(AuthError::MissingHeader)?;
    let token = auth_str.strip_prefix("Bearer ").ok_or(AuthError::InvalidHeader)?;
    if token.trim().is_empty() {
        return Err(AuthError::EmptyToken);
    }
    validate_jwt(token.trim(), secret)
}

/// `decode_bearer` against the configured signing secret
pub fn decode_bearer_with_config(header: Option<&str>, security: &SecurityConfig) -> Result<Claims, AuthError> {
    decode_bearer(header, &security.jwt_secret)
}

fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}
