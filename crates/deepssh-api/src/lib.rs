pub mod auth;
pub mod credentials;
pub mod error;
pub mod health;
pub mod middleware;
pub mod routes;
pub mod servers;
pub mod settings;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
