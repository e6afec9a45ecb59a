use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use deepssh_types::models::{Server, ServerPatch, ServerType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields ({0} is empty)")]
    MissingField(&'static str),
}

/// Admin form contents for creating or editing a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerDraft {
    #[serde(rename = "type")]
    pub server_type: ServerType,
    pub username: String,
    pub host: String,
    pub password: String,
    pub port: String,
    pub is_online: bool,
    pub custom_config: String,
}

impl Default for ServerDraft {
    fn default() -> Self {
        Self {
            server_type: ServerType::V2ray,
            username: String::new(),
            host: String::new(),
            password: String::new(),
            port: String::new(),
            is_online: true,
            custom_config: String::new(),
        }
    }
}

impl ServerDraft {
    /// Prefill the form from an existing record.
    pub fn from_server(server: &Server) -> Self {
        Self {
            server_type: server.server_type,
            username: server.username.clone(),
            host: server.host.clone(),
            password: server.password.clone(),
            port: server.port.clone().unwrap_or_default(),
            is_online: server.is_online,
            custom_config: server.custom_config.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("username", &self.username),
            ("host", &self.host),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }

    pub fn into_server(self, id: String, created_at: String) -> Result<Server, ValidationError> {
        self.validate()?;
        Ok(Server {
            id,
            server_type: self.server_type,
            username: self.username,
            host: self.host,
            password: self.password,
            port: non_empty(self.port),
            is_online: self.is_online,
            custom_config: non_empty(self.custom_config),
            created_at,
        })
    }

    /// Patch that rewrites every form field. `id` and `createdAt` are never
    /// part of it.
    pub fn into_patch(self) -> Result<ServerPatch, ValidationError> {
        self.validate()?;
        Ok(ServerPatch {
            server_type: Some(self.server_type),
            username: Some(self.username),
            host: Some(self.host),
            password: Some(self.password),
            port: Some(non_empty(self.port)),
            is_online: Some(self.is_online),
            custom_config: Some(non_empty(self.custom_config)),
            ..Default::default()
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

static LAST_ISSUED_ID: AtomicI64 = AtomicI64::new(0);

/// New server id: epoch milliseconds as a decimal string, bumped past the
/// last id issued by this process so back-to-back calls never collide.
pub fn next_server_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ISSUED_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ISSUED_ID.compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}
