//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const INSECURE_SECRET: &str = "change-me-in-production";

/// Upper bound for generated passwords, well inside bcrypt's 72-byte input.
const MAX_GENERATED_PASSWORD_LEN: usize = 64;

/// Policy for server-generated passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub length: usize,
    pub include_special: bool,
    pub include_uppercase: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: 25,
            include_special: true,
            include_uppercase: false,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Supports `env:VAR_NAME`.
    pub jwt_secret: Option<String>,

    /// Value of the `iss` claim.
    pub issuer: String,

    /// Token lifetime in hours.
    pub token_ttl_hours: i64,

    /// bcrypt work factor.
    pub bcrypt_cost: u32,

    /// Generated password policy.
    pub password: PasswordPolicy,

    /// Allowed CORS origins. Empty disables CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: "blog-api".to_string(),
            token_ttl_hours: 8,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            password: PasswordPolicy::default(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => match value.strip_prefix("env:") {
                Some(var_name) => match std::env::var(var_name) {
                    Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                    Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                    Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                },
                None => Ok(Some(value.clone())),
            },
        }
    }

    /// Resolve and check the secret, returning it ready for key construction.
    pub fn signing_secret(&self) -> Result<String, ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;
        if secret == INSECURE_SECRET {
            return Err(ConfigValidationError::InsecureJwtSecret);
        }
        if secret.len() < 32 {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }
        Ok(secret)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.signing_secret()?;

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigValidationError::InvalidBcryptCost(self.bcrypt_cost));
        }
        if self.token_ttl_hours <= 0 {
            return Err(ConfigValidationError::InvalidTokenTtl(self.token_ttl_hours));
        }
        if self.password.length < 8 {
            return Err(ConfigValidationError::PasswordTooShort(self.password.length));
        }
        if self.password.length > MAX_GENERATED_PASSWORD_LEN {
            return Err(ConfigValidationError::PasswordTooLong(self.password.length));
        }

        Ok(())
    }

    /// Generate a random 64-character secret suitable for `jwt_secret`.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error(
        "JWT secret is required. Set BLOG_AUTH__JWT_SECRET or auth.jwt_secret in the config file."
    )]
    MissingJwtSecret,

    #[error("JWT secret cannot be the placeholder value. Please configure a secure secret.")]
    InsecureJwtSecret,

    #[error("JWT secret must be at least 32 characters long.")]
    JwtSecretTooShort,

    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),

    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),

    #[error("bcrypt cost must be between 4 and 31, got {0}.")]
    InvalidBcryptCost(u32),

    #[error("Token lifetime must be positive, got {0} hours.")]
    InvalidTokenTtl(i64),

    #[error("Generated passwords must be at least 8 characters, got {0}.")]
    PasswordTooShort(usize),

    #[error("Generated passwords must be at most 64 characters, got {0}.")]
    PasswordTooLong(usize),
}
