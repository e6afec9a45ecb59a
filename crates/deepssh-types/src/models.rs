use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Connection flavour a server record belongs to. Also the tab a server is
/// listed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    V2ray,
    Websocket,
    Udp,
}

impl ServerType {
    pub const ALL: [ServerType; 3] = [ServerType::V2ray, ServerType::Websocket, ServerType::Udp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2ray => "v2ray",
            Self::Websocket => "websocket",
            Self::Udp => "udp",
        }
    }

    /// Human-facing tab title.
    pub fn label(&self) -> &'static str {
        match self {
            Self::V2ray => "V2Ray",
            Self::Websocket => "WebSocket",
            Self::Udp => "UDP",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown server type '{0}'")]
pub struct UnknownServerType(pub String);

impl FromStr for ServerType {
    type Err = UnknownServerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v2ray" => Ok(Self::V2ray),
            "websocket" => Ok(Self::Websocket),
            "udp" => Ok(Self::Udp),
            _ => Err(UnknownServerType(s.to_string())),
        }
    }
}

/// A connection profile: one proxy/VPN endpoint and its credentials.
///
/// Field names serialize in camelCase so persisted values keep the layout
/// existing installs already have on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
    pub username: String,
    pub host: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<String>,
    pub created_at: String,
}

impl Server {
    /// Field-merge `patch` over this record. Fields absent from the patch
    /// are left untouched.
    pub fn apply(&mut self, patch: ServerPatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(server_type) = patch.server_type {
            self.server_type = server_type;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(host) = patch.host {
            self.host = host;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(is_online) = patch.is_online {
            self.is_online = is_online;
        }
        if let Some(custom_config) = patch.custom_config {
            self.custom_config = custom_config;
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }
    }
}

/// Partial update for a [`Server`].
///
/// `port` and `custom_config` are doubly optional: an absent key leaves the
/// field alone, an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub server_type: Option<ServerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub port: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Maps a present key (even `null`) to `Some`, so `null` can mean "clear".
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Global banner shown to every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub welcome_message: String,
    pub update_number: String,
}

impl AppSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(welcome_message) = patch.welcome_message {
            self.welcome_message = welcome_message;
        }
        if let Some(update_number) = patch.update_number {
            self.update_number = update_number;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_number: Option<String>,
}
