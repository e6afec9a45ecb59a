use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::info;

use deepssh_types::api::{Claims, OverviewResponse};
use deepssh_types::models::{AppSettings, ServerType, SettingsPatch};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn get_settings(State(state): State<AppState>) -> Json<AppSettings> {
    Json(state.store.get_settings().await)
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<AppSettings>, ApiError> {
    let settings = state.store.update_settings(patch).await?;
    info!("{} saved app settings", claims.sub);
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    #[serde(rename = "type", default)]
    pub server_type: ServerType,
}

/// Banner plus one tab of servers; the first tab when none is chosen.
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Json<OverviewResponse> {
    Json(OverviewResponse {
        settings: state.store.get_settings().await,
        servers: state.store.servers_of_type(query.server_type).await,
    })
}
