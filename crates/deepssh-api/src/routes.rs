use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{self, AppState};
use crate::health;
use crate::middleware::require_auth;
use crate::servers;
use crate::settings;

/// Every HTTP route except the gateway upgrade.
///
/// Reads and login are public; anything under `/admin` needs a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/auth/login", post(auth::login))
        .route("/overview", get(settings::overview))
        .route("/settings", get(settings::get_settings))
        .route("/servers", get(servers::list_servers))
        .route("/servers/{id}", get(servers::get_server))
        .route("/servers/{id}/info", get(servers::server_info));

    let admin_routes = Router::new()
        .route("/admin/servers", post(servers::create_server))
        .route(
            "/admin/servers/{id}",
            put(servers::update_server)
                .patch(servers::patch_server)
                .delete(servers::delete_server),
        )
        .route("/admin/settings", put(settings::update_settings))
        .route("/admin/data", delete(servers::clear_data))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
