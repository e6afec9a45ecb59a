use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Decides whether a username/password pair may use the admin routes.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("admin username must not be empty")]
    EmptyUsername,
    #[error("admin password must not be empty")]
    EmptyPassword,
    #[error("admin password hash is not a valid PHC string: {0}")]
    InvalidHash(String),
    #[error("failed to hash admin password: {0}")]
    Hashing(String),
}

/// The single admin account, password stored as an Argon2id PHC string.
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn from_hash(username: &str, password_hash: &str) -> Result<Self, CredentialError> {
        if username.is_empty() {
            return Err(CredentialError::EmptyUsername);
        }
        PasswordHash::new(password_hash).map_err(|e| CredentialError::InvalidHash(e.to_string()))?;
        Ok(Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    /// Hash `password` now. Meant for development setups that keep the
    /// password itself in the environment.
    pub fn from_plaintext(username: &str, password: &str) -> Result<Self, CredentialError> {
        if password.is_empty() {
            return Err(CredentialError::EmptyPassword);
        }
        let hash = hash_password(password)?;
        Self::from_hash(username, &hash)
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl CredentialVerifier for AdminCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Argon2id PHC string for `password`, e.g. for `DEEPSSH_ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}
