use chrono::{SecondsFormat, Utc};
use deepssh_types::models::{AppSettings, Server, ServerType};

pub const SERVERS_STORAGE_KEY: &str = "@deepssh_servers";
pub const SETTINGS_STORAGE_KEY: &str = "@deepssh_settings";

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "🎉 Welcome to DeepSSH! New servers added. Check them out! 🚀";
pub const DEFAULT_UPDATE_NUMBER: &str = "v1.0.0";

/// Starting data for a store: used on fresh installs, when storage cannot be
/// read, and after a full reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub servers: Vec<Server>,
    pub settings: AppSettings,
}

impl Seed {
    pub fn new(servers: Vec<Server>, settings: AppSettings) -> Self {
        Self { servers, settings }
    }

    /// Empty server list with the default banner.
    pub fn empty() -> Self {
        Self::new(Vec::new(), default_settings())
    }
}

impl Default for Seed {
    /// The six demo servers, stamped with the current time.
    fn default() -> Self {
        Self::new(default_servers(&timestamp_now()), default_settings())
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g.
/// `2026-10-19T08:15:02.123Z`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn default_settings() -> AppSettings {
    AppSettings {
        welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
        update_number: DEFAULT_UPDATE_NUMBER.to_string(),
    }
}

pub fn default_servers(created_at: &str) -> Vec<Server> {
    let demo = |id: &str,
                server_type: ServerType,
                username: &str,
                host: &str,
                password: &str,
                port: &str,
                is_online: bool,
                custom_config: &str| Server {
        id: id.to_string(),
        server_type,
        username: username.to_string(),
        host: host.to_string(),
        password: password.to_string(),
        port: Some(port.to_string()),
        is_online,
        custom_config: Some(custom_config.to_string()),
        created_at: created_at.to_string(),
    };

    vec![
        demo(
            "1",
            ServerType::V2ray,
            "demo_user_v2ray",
            "v2ray.deepssh.net",
            "demo_pass_123",
            "443",
            true,
            "vmess://eyJhZGQiOiJ2MnJheS5kZWVwc3NoLm5ldCIsImFpZCI6IjAiLCJob3N0IjoiIiwiaWQiOiJkZW1vX3VzZXJfdjJyYXkiLCJuZXQiOiJ3cyIsInBhdGgiOiIvIiwicG9ydCI6IjQ0MyIsInBzIjoiRGVlcFNTSCBWMlJheSIsInRscyI6InRscyIsInR5cGUiOiJub25lIiwidiI6IjIifQ==",
        ),
        demo(
            "2",
            ServerType::V2ray,
            "demo_user_v2ray_2",
            "v2ray2.deepssh.net",
            "demo_pass_456",
            "8443",
            false,
            "vmess://eyJhZGQiOiJ2MnJheTIuZGVlcHNzaC5uZXQiLCJhaWQiOiIwIiwiaG9zdCI6IiIsImlkIjoiZGVtb191c2VyX3YycmF5XzIiLCJuZXQiOiJ3cyIsInBhdGgiOiIvIiwicG9ydCI6Ijg0NDMiLCJwcyI6IkRlZXBTU0ggVjJSYXkgMiIsInRscyI6InRscyIsInR5cGUiOiJub25lIiwidiI6IjIifQ==",
        ),
        demo(
            "3",
            ServerType::Websocket,
            "ws_demo_user",
            "ws.deepssh.net",
            "ws_pass_789",
            "80",
            true,
            "ws://ws.deepssh.net:80?user=ws_demo_user&pass=ws_pass_789",
        ),
        demo(
            "4",
            ServerType::Websocket,
            "ws_demo_user_2",
            "ws2.deepssh.net",
            "ws_pass_012",
            "8080",
            true,
            "ws://ws2.deepssh.net:8080?user=ws_demo_user_2&pass=ws_pass_012",
        ),
        demo(
            "5",
            ServerType::Udp,
            "udp_demo_user",
            "udp.deepssh.net",
            "udp_pass_345",
            "7300",
            true,
            "udp://udp.deepssh.net:7300#user=udp_demo_user&pass=udp_pass_345",
        ),
        demo(
            "6",
            ServerType::Udp,
            "udp_demo_user_2",
            "udp2.deepssh.net",
            "udp_pass_678",
            "7301",
            false,
            "udp://udp2.deepssh.net:7301#user=udp_demo_user_2&pass=udp_pass_678",
        ),
    ]
}
