use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use deepssh_gateway::dispatcher::Dispatcher;
use deepssh_store::Store;
use deepssh_types::api::{Claims, LoginRequest, LoginResponse};

use crate::credentials::CredentialVerifier;
use crate::error::ApiError;

/// How long an admin token stays valid.
pub const TOKEN_LIFETIME_HOURS: i64 = 12;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<Store>,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub verifier: Arc<dyn CredentialVerifier>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.verifier.verify(&req.username, &req.password) {
        warn!("Rejected admin login for '{}'", req.username);
        return Err(ApiError::InvalidCredentials);
    }

    let (token, expires_at) = create_token(&state.jwt_secret, &req.username)?;
    info!("Admin '{}' logged in", req.username);

    Ok(Json(LoginResponse {
        username: req.username,
        token,
        expires_at,
    }))
}

pub fn create_token(
    secret: &str,
    username: &str,
) -> Result<(String, chrono::DateTime<Utc>), ApiError> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(TOKEN_LIFETIME_HOURS);
    let claims = Claims {
        sub: username.to_string(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))?;

    Ok((token, expires_at))
}
