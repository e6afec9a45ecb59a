use deepssh_types::models::{Server, ServerType};

/// Servers of one type, keeping their relative order.
pub fn servers_of_type(servers: &[Server], server_type: ServerType) -> Vec<Server> {
    servers
        .iter()
        .filter(|s| s.server_type == server_type)
        .cloned()
        .collect()
}

/// Number of servers under each tab, in tab order.
pub fn count_by_type(servers: &[Server]) -> [(ServerType, usize); 3] {
    ServerType::ALL.map(|t| (t, servers.iter().filter(|s| s.server_type == t).count()))
}
