use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use deepssh_store::card;
use deepssh_store::defaults::timestamp_now;
use deepssh_store::validation::next_server_id;
use deepssh_store::{ServerDraft, ValidationError};
use deepssh_types::api::{Claims, ServerInfoResponse};
use deepssh_types::models::{Server, ServerPatch, ServerType};

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ServerQuery {
    /// Tab filter; all servers when absent.
    #[serde(rename = "type")]
    pub server_type: Option<ServerType>,
}

pub async fn list_servers(
    State(state): State<AppState>,
    Query(query): Query<ServerQuery>,
) -> Json<Vec<Server>> {
    let servers = match query.server_type {
        Some(server_type) => state.store.servers_of_type(server_type).await,
        None => state.store.get_servers().await,
    };
    Json(servers)
}

pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Server>, ApiError> {
    state
        .store
        .get_server(&id)
        .await
        .map(Json)
        .ok_or(ApiError::ServerNotFound(id))
}

/// The "copy all" text for one server.
pub async fn server_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServerInfoResponse>, ApiError> {
    let server = state
        .store
        .get_server(&id)
        .await
        .ok_or_else(|| ApiError::ServerNotFound(id.clone()))?;

    Ok(Json(ServerInfoResponse {
        text: card::server_info_text(&server),
        id,
    }))
}

pub async fn create_server(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<ServerDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let server = draft.into_server(next_server_id(), timestamp_now())?;
    info!("{} adding {} server {}", claims.sub, server.server_type, server.id);

    state.store.add_server(server.clone()).await?;

    Ok((StatusCode::CREATED, Json(server)))
}

/// Replace every form field of an existing server.
pub async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<ServerDraft>,
) -> Result<Json<Server>, ApiError> {
    let patch = draft.into_patch()?;
    apply_patch(&state, id, patch, &claims).await
}

/// Change only the fields present in the body.
pub async fn patch_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(patch): Json<ServerPatch>,
) -> Result<Json<Server>, ApiError> {
    for (field, value) in [
        ("username", &patch.username),
        ("host", &patch.host),
        ("password", &patch.password),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ValidationError::MissingField(field).into());
        }
    }

    // Identity is fixed once created
    let patch = ServerPatch {
        id: None,
        created_at: None,
        ..patch
    };
    apply_patch(&state, id, patch, &claims).await
}

async fn apply_patch(
    state: &AppState,
    id: String,
    patch: ServerPatch,
    claims: &Claims,
) -> Result<Json<Server>, ApiError> {
    if !state.store.update_server(&id, patch).await? {
        return Err(ApiError::ServerNotFound(id));
    }
    info!("{} updated server {}", claims.sub, id);

    state
        .store
        .get_server(&id)
        .await
        .map(Json)
        .ok_or(ApiError::ServerNotFound(id))
}

pub async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_server(&id).await? {
        return Err(ApiError::ServerNotFound(id));
    }
    info!("{} deleted server {}", claims.sub, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Wipe storage and go back to the built-in data.
pub async fn clear_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .clear_all_data()
        .await
        .map_err(|e| ApiError::Internal(format!("failed to clear data: {}", e)))?;
    info!("{} reset all data to defaults", claims.sub);
    Ok(StatusCode::NO_CONTENT)
}
