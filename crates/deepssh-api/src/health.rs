use axum::{Json, extract::State};

use deepssh_types::api::HealthResponse;

use crate::auth::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let server_count = state.store.get_servers().await.len();
    let load_status = state.store.load_status().await;

    Json(HealthResponse {
        status: if load_status.is_recovered() { "degraded" } else { "ok" }.to_string(),
        storage: state.store.backend_name().to_string(),
        load_status: load_status.to_string(),
        server_count,
        gateway_connections: state.dispatcher.connection_count().await,
        revision: state.dispatcher.revision(),
    })
}
