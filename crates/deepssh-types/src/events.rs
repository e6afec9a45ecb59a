use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed to clients over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Sent once right after the socket is accepted
    Ready { connection_id: Uuid, revision: u64 },

    /// The store changed; clients should re-read servers and settings
    DataChanged { revision: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_changed_wire_shape() {
        let json = serde_json::to_value(GatewayEvent::DataChanged { revision: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "DataChanged", "data": { "revision": 3 } }));
    }
}
