use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

/// Values that ship in examples and must never sign real tokens.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "changeme", "secret"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPassword {
    Hash(String),
    Plaintext(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: AdminPassword,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("DEEPSSH_JWT_SECRET is a placeholder value; generate a real secret")]
    PlaceholderSecret,
    #[error("DEEPSSH_PORT is not a valid port: {0}")]
    InvalidPort(String),
    #[error("DEEPSSH_STORAGE must be 'sqlite' or 'memory', got '{0}'")]
    InvalidStorage(String),
    #[error("set only one of DEEPSSH_ADMIN_PASSWORD_HASH and DEEPSSH_ADMIN_PASSWORD")]
    ConflictingPassword,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(vars, name);

        let port = match get("DEEPSSH_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?,
            None => 3000,
        };

        let storage = match get("DEEPSSH_STORAGE").map(str::to_ascii_lowercase).as_deref() {
            None | Some("sqlite") => StorageKind::Sqlite,
            Some("memory") => StorageKind::Memory,
            Some(other) => return Err(ConfigError::InvalidStorage(other.to_string())),
        };

        let jwt_secret = get("DEEPSSH_JWT_SECRET").ok_or(ConfigError::Missing("DEEPSSH_JWT_SECRET"))?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret) {
            return Err(ConfigError::PlaceholderSecret);
        }

        let admin_password = match (get("DEEPSSH_ADMIN_PASSWORD_HASH"), get("DEEPSSH_ADMIN_PASSWORD")) {
            (Some(hash), None) => AdminPassword::Hash(hash.to_string()),
            (None, Some(plain)) => AdminPassword::Plaintext(plain.to_string()),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingPassword),
            (None, None) => return Err(ConfigError::Missing("DEEPSSH_ADMIN_PASSWORD_HASH")),
        };

        Ok(Self {
            host: get("DEEPSSH_HOST").unwrap_or("0.0.0.0").to_string(),
            port,
            storage,
            db_path: PathBuf::from(get("DEEPSSH_DB_PATH").unwrap_or("deepssh.db")),
            jwt_secret: jwt_secret.to_string(),
            admin_username: get("DEEPSSH_ADMIN_USERNAME").unwrap_or("admin").to_string(),
            admin_password,
        })
    }
}

/// Unset and blank both count as missing.
fn lookup<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}
