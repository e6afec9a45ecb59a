//! Restart round-trips: a second store over the same storage must see what
//! the first one wrote, never the built-in defaults.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deepssh_db::Database;
use deepssh_store::{
    LoadStatus, MemoryBackend, SERVERS_STORAGE_KEY, SqliteBackend, StorageBackend, Store, listing,
};
use deepssh_types::models::{Server, ServerPatch, ServerType, SettingsPatch};

fn server(id: &str) -> Server {
    Server {
        id: id.into(),
        server_type: ServerType::V2ray,
        username: "x".into(),
        host: "h".into(),
        password: "p".into(),
        port: None,
        is_online: true,
        custom_config: None,
        created_at: "2026-10-19T10:00:00.000Z".into(),
    }
}

/// Shared storage whose server-list writes stall for the queued delays, one
/// per write, in order.
struct StallingBackend {
    inner: Arc<MemoryBackend>,
    delays: Mutex<VecDeque<Duration>>,
}

impl StallingBackend {
    fn new(inner: Arc<MemoryBackend>, delays: &[Duration]) -> Self {
        Self {
            inner,
            delays: Mutex::new(delays.iter().copied().collect()),
        }
    }
}

impl StorageBackend for StallingBackend {
    fn name(&self) -> &'static str {
        "stalling"
    }

    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if key == SERVERS_STORAGE_KEY {
            let delay = self.delays.lock().unwrap().pop_front();
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
        }
        self.inner.set_item(key, value)
    }

    fn remove_items(&self, keys: &[&str]) -> anyhow::Result<()> {
        self.inner.remove_items(keys)
    }
}

fn stored_ids(servers: Vec<Server>) -> Vec<String> {
    servers.into_iter().map(|s| s.id).collect()
}

#[tokio::test]
async fn sqlite_restart_restores_last_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deepssh.db");

    {
        let db = Arc::new(Database::open(&path).unwrap());
        let store = Store::new(Arc::new(SqliteBackend::new(db)));
        store.add_server(server("7")).await.unwrap();
        store.delete_server("1").await.unwrap();
        store
            .update_server("5", ServerPatch {
                is_online: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .update_settings(SettingsPatch {
                update_number: Some("v2.0.0".into()),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let db = Arc::new(Database::open(&path).unwrap());
    let store = Store::new(Arc::new(SqliteBackend::new(db)));

    let servers = store.get_servers().await;
    assert_eq!(store.load_status().await, LoadStatus::Restored);
    let ids: Vec<_> = servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["2", "3", "4", "5", "6", "7"]);
    assert_eq!(servers.last(), Some(&server("7")));
    assert!(!servers.iter().find(|s| s.id == "5").unwrap().is_online);
    assert_eq!(store.get_settings().await.update_number, "v2.0.0");
}

#[tokio::test]
async fn shared_memory_backend_simulates_restart() {
    let backend = Arc::new(MemoryBackend::new());

    let first = Store::new(backend.clone());
    first.replace_servers(vec![server("a"), server("b")]).await.unwrap();
    let written = first.get_servers().await;
    drop(first);

    let second = Store::new(backend.clone());
    assert_eq!(second.get_servers().await, written);
}

#[tokio::test]
async fn seed_timestamps_are_kept_across_restart() {
    let backend = Arc::new(MemoryBackend::new());
    let first = Store::new(backend.clone());
    let seeded = first.get_servers().await;

    let second = Store::new(backend);
    assert_eq!(second.get_servers().await, seeded);
}

#[tokio::test]
async fn listeners_fire_before_mutation_returns() {
    let store = Arc::new(Store::in_memory());
    let seen = Arc::new(AtomicUsize::new(0));

    let observer = {
        let seen = seen.clone();
        store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };

    store.add_server(server("7")).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    observer.unsubscribe();
    store.delete_server("7").await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn udp_tab_scenario() {
    let store = Store::in_memory();
    let udp = listing::servers_of_type(&store.get_servers().await, ServerType::Udp);
    let names: Vec<_> = udp.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(names, ["udp_demo_user", "udp_demo_user_2"]);
    assert_eq!(store.servers_of_type(ServerType::Udp).await, udp);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn write_during_seed_write_back_survives_restart() {
    let storage = Arc::new(MemoryBackend::new());
    let backend = StallingBackend::new(storage.clone(), &[Duration::from_millis(300)]);
    let store = Arc::new(Store::new(Arc::new(backend)));

    let loading = tokio::spawn({
        let store = store.clone();
        async move { store.get_servers().await }
    });
    while !store.is_initialized().await {
        tokio::task::yield_now().await;
    }
    store.add_server(server("7")).await.unwrap();
    loading.await.unwrap();

    let restarted = Store::new(storage);
    assert_eq!(
        stored_ids(restarted.get_servers().await),
        ["1", "2", "3", "4", "5", "6", "7"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_writes_reach_storage_in_memory_order() {
    let storage = Arc::new(MemoryBackend::new());
    // Seed write-back goes straight through; the first add stalls.
    let backend = StallingBackend::new(storage.clone(), &[Duration::ZERO, Duration::from_millis(300)]);
    let store = Arc::new(Store::new(Arc::new(backend)));
    store.load().await;

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.add_server(server("a")).await }
    });
    while store.get_server("a").await.is_none() {
        tokio::task::yield_now().await;
    }
    store.add_server(server("b")).await.unwrap();
    first.await.unwrap().unwrap();

    let restarted = Store::new(storage);
    assert_eq!(
        stored_ids(restarted.get_servers().await),
        ["1", "2", "3", "4", "5", "6", "a", "b"]
    );
}
