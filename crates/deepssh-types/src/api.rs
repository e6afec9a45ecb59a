use serde::{Deserialize, Serialize};

use crate::models::{AppSettings, Server};

// -- JWT Claims --

/// JWT claims issued to a logged-in admin and checked by the admin routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// -- Servers --

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerInfoResponse {
    pub id: String,
    pub text: String,
}

// -- Home screen --

/// Everything the list screen renders on mount: the banner plus the
/// servers under the selected tab.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub settings: AppSettings,
    pub servers: Vec<Server>,
}

// -- Errors / health --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub load_status: String,
    pub server_count: usize,
    pub gateway_connections: usize,
    pub revision: u64,
}
