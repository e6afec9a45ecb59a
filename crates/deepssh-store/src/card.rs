//! Text shown on a server card and copied to the clipboard.

use deepssh_types::models::Server;
use thiserror::Error;

const RULE: &str = "==================";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("No custom configuration available for this server")]
    NoConfig,
}

/// The "copy all" block for one server.
pub fn server_info_text(server: &Server) -> String {
    let port = server.port.as_deref().filter(|p| !p.is_empty()).unwrap_or("N/A");
    let status = if server.is_online { "Online ✅" } else { "Offline ❌" };

    [
        "DeepSSH Server Info".to_string(),
        RULE.to_string(),
        format!("Type: {}", server.server_type.as_str().to_uppercase()),
        format!("Username: {}", server.username),
        format!("Host: {}", server.host),
        format!("Password: {}", server.password),
        format!("Port: {}", port),
        format!("Status: {}", status),
        RULE.to_string(),
    ]
    .join("\n")
}

/// One bullet per character.
pub fn masked_password(password: &str) -> String {
    "•".repeat(password.chars().count())
}

pub fn status_label(is_online: bool) -> &'static str {
    if is_online { "● Online" } else { "● Offline" }
}

pub fn custom_config(server: &Server) -> Result<&str, CardError> {
    server
        .custom_config
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(CardError::NoConfig)
}
