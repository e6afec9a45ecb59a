use std::sync::Arc;

use deepssh_types::models::{AppSettings, Server, ServerPatch, ServerType, SettingsPatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::backend::{NullBackend, StorageBackend};
use crate::defaults::{SERVERS_STORAGE_KEY, SETTINGS_STORAGE_KEY, Seed};
use crate::error::StoreError;
use crate::listing;
use crate::status::LoadStatus;
use crate::subscription::{Listeners, Subscription};

/// Single source of truth for the server list and the app settings.
///
/// Every mutation is two-phase: the in-memory change is applied and visible
/// at once, then the returned future completes when the durable write has
/// finished. A failed write is logged and reported as
/// [`StoreError::Persist`] but never rolls the in-memory change back.
/// Listeners fire after every mutation, before the future resolves.
pub struct Store {
    backend: Arc<dyn StorageBackend>,
    seed: Seed,
    state: RwLock<StoreState>,
    /// Held for the whole load sequence so concurrent first reads load once.
    load_gate: Mutex<()>,
    /// Held from mutation to durable write so the backend sees writes in
    /// the same order memory did.
    write_gate: Mutex<()>,
    listeners: Arc<Listeners>,
}

struct StoreState {
    servers: Vec<Server>,
    settings: AppSettings,
    initialized: bool,
    load_status: LoadStatus,
}

/// What the load sequence found for one collection.
enum Loaded<T> {
    Found(T),
    Missing,
}

impl Store {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_seed(backend, Seed::default())
    }

    /// Store without durability; the seed is the starting data.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NullBackend))
    }

    pub fn with_seed(backend: Arc<dyn StorageBackend>, seed: Seed) -> Self {
        let durable = backend.is_durable();
        let state = StoreState {
            servers: seed.servers.clone(),
            settings: seed.settings.clone(),
            initialized: !durable,
            load_status: if durable {
                LoadStatus::Pending
            } else {
                LoadStatus::Ephemeral
            },
        };

        Self {
            backend,
            seed,
            state: RwLock::new(state),
            load_gate: Mutex::new(()),
            write_gate: Mutex::new(()),
            listeners: Arc::new(Listeners::default()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_durable(&self) -> bool {
        self.backend.is_durable()
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    pub async fn load_status(&self) -> LoadStatus {
        self.state.read().await.load_status.clone()
    }

    // -- Reads --

    pub async fn get_servers(&self) -> Vec<Server> {
        self.ensure_initialized().await;
        self.state.read().await.servers.clone()
    }

    pub async fn get_settings(&self) -> AppSettings {
        self.ensure_initialized().await;
        self.state.read().await.settings.clone()
    }

    pub async fn get_server(&self, id: &str) -> Option<Server> {
        self.ensure_initialized().await;
        self.state.read().await.servers.iter().find(|s| s.id == id).cloned()
    }

    /// Servers of one type in insertion order.
    pub async fn servers_of_type(&self, server_type: ServerType) -> Vec<Server> {
        self.ensure_initialized().await;
        listing::servers_of_type(&self.state.read().await.servers, server_type)
    }

    // -- Subscriptions --

    /// Register `listener` to run after every mutation. Registering the same
    /// callback twice makes it fire twice.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.register(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // -- Server mutations --

    /// Append `server`. Ids are not checked for uniqueness.
    pub async fn add_server(&self, server: Server) -> Result<(), StoreError> {
        self.ensure_initialized().await;
        let _write = self.write_gate.lock().await;

        let snapshot = {
            let mut state = self.state.write().await;
            info!("Server added: {} ({})", server.id, server.server_type);
            state.servers.push(server);
            state.servers.clone()
        };

        self.persist_then_notify(SERVERS_STORAGE_KEY, &snapshot).await
    }

    /// Merge `patch` into the server with `id`. Returns whether a server
    /// matched; an unknown id changes nothing but still persists and
    /// notifies.
    pub async fn update_server(&self, id: &str, patch: ServerPatch) -> Result<bool, StoreError> {
        self.ensure_initialized().await;
        let _write = self.write_gate.lock().await;

        let (matched, snapshot) = {
            let mut state = self.state.write().await;
            let matched = match state.servers.iter_mut().find(|s| s.id == id) {
                Some(server) => {
                    server.apply(patch);
                    true
                }
                None => false,
            };
            (matched, state.servers.clone())
        };

        if matched {
            info!("Server updated: {}", id);
        } else {
            debug!("Update for unknown server {} ignored", id);
        }

        self.persist_then_notify(SERVERS_STORAGE_KEY, &snapshot).await?;
        Ok(matched)
    }

    /// Remove the server with `id`. Returns whether one was removed.
    pub async fn delete_server(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_initialized().await;
        let _write = self.write_gate.lock().await;

        let (removed, snapshot) = {
            let mut state = self.state.write().await;
            let removed = match state.servers.iter().position(|s| s.id == id) {
                Some(index) => {
                    state.servers.remove(index);
                    true
                }
                None => false,
            };
            (removed, state.servers.clone())
        };

        if removed {
            info!("Server deleted: {}", id);
        } else {
            debug!("Delete for unknown server {} ignored", id);
        }

        self.persist_then_notify(SERVERS_STORAGE_KEY, &snapshot).await?;
        Ok(removed)
    }

    /// Overwrite the whole server list.
    pub async fn replace_servers(&self, servers: Vec<Server>) -> Result<(), StoreError> {
        self.ensure_initialized().await;
        let _write = self.write_gate.lock().await;

        let snapshot = {
            let mut state = self.state.write().await;
            state.servers = servers;
            info!("Server list replaced: {} servers", state.servers.len());
            state.servers.clone()
        };

        self.persist_then_notify(SERVERS_STORAGE_KEY, &snapshot).await
    }

    // -- Settings mutations --

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<AppSettings, StoreError> {
        self.ensure_initialized().await;
        let _write = self.write_gate.lock().await;

        let settings = {
            let mut state = self.state.write().await;
            state.settings.apply(patch);
            info!("App settings updated: {}", state.settings.update_number);
            state.settings.clone()
        };

        self.persist_then_notify(SETTINGS_STORAGE_KEY, &settings).await?;
        Ok(settings)
    }

    // -- Lifecycle --

    /// Run the load sequence if it has not run yet.
    pub async fn load(&self) {
        self.ensure_initialized().await;
    }

    /// Run the load sequence again, replacing memory with what storage holds.
    pub async fn reload(&self) {
        let _load = self.load_gate.lock().await;
        self.run_load().await;
    }

    /// Delete both keys from storage and reset memory to the seed.
    ///
    /// Both keys are removed together. If storage refuses, neither key is
    /// removed and memory is left as it was.
    pub async fn clear_all_data(&self) -> Result<(), StoreError> {
        self.ensure_initialized().await;
        let _write = self.write_gate.lock().await;

        if self.backend.is_durable() {
            if let Err(e) = self.remove_keys(&[SERVERS_STORAGE_KEY, SETTINGS_STORAGE_KEY]).await {
                error!("Error clearing data: {}", e);
                return Err(e);
            }
        }

        {
            let mut state = self.state.write().await;
            state.servers = self.seed.servers.clone();
            state.settings = self.seed.settings.clone();
            state.initialized = true;
        }

        info!("All data cleared, reset to defaults");
        self.notify();
        Ok(())
    }

    // -- Internals --

    async fn ensure_initialized(&self) {
        if self.state.read().await.initialized {
            return;
        }

        let _load = self.load_gate.lock().await;
        if self.state.read().await.initialized {
            return;
        }
        self.run_load().await;
    }

    /// Read both collections, seeding whatever is missing. Any read or
    /// parse failure falls back to the seed and still counts as initialized,
    /// so a broken storage is not retried on every access.
    async fn run_load(&self) {
        if !self.backend.is_durable() {
            let mut state = self.state.write().await;
            state.initialized = true;
            state.load_status = LoadStatus::Ephemeral;
            return;
        }

        // Held through the seed write-back; mutations wait for it.
        let _write = self.write_gate.lock().await;
        debug!("Loading data from {} storage", self.backend.name());

        let loaded = async {
            let servers = self.read_key::<Vec<Server>>(SERVERS_STORAGE_KEY).await?;
            let settings = self.read_key::<AppSettings>(SETTINGS_STORAGE_KEY).await?;
            Ok::<_, StoreError>((servers, settings))
        }
        .await;

        let (servers, settings) = match loaded {
            Ok(found) => found,
            Err(e) => {
                error!("Error loading data from {} storage: {}", self.backend.name(), e);
                let mut state = self.state.write().await;
                state.servers = self.seed.servers.clone();
                state.settings = self.seed.settings.clone();
                state.initialized = true;
                state.load_status = LoadStatus::Recovered {
                    error: format!("{}", e),
                };
                return;
            }
        };

        let seeded_servers = matches!(servers, Loaded::Missing);
        let seeded_settings = matches!(settings, Loaded::Missing);

        let (server_snapshot, settings_snapshot, status) = {
            let mut state = self.state.write().await;
            state.servers = match servers {
                Loaded::Found(servers) => {
                    debug!("Servers loaded from storage: {} servers", servers.len());
                    servers
                }
                Loaded::Missing => {
                    debug!("No stored servers found, using defaults");
                    self.seed.servers.clone()
                }
            };
            state.settings = match settings {
                Loaded::Found(settings) => {
                    debug!("Settings loaded from storage");
                    settings
                }
                Loaded::Missing => {
                    debug!("No stored settings found, using defaults");
                    self.seed.settings.clone()
                }
            };
            state.initialized = true;
            state.load_status = if seeded_servers || seeded_settings {
                LoadStatus::Seeded {
                    servers: seeded_servers,
                    settings: seeded_settings,
                }
            } else {
                LoadStatus::Restored
            };
            (state.servers.clone(), state.settings.clone(), state.load_status.clone())
        };

        // Write-back failures are logged by persist(); the load still counts.
        if seeded_servers {
            let _ = self.persist(SERVERS_STORAGE_KEY, &server_snapshot).await;
        }
        if seeded_settings {
            let _ = self.persist(SETTINGS_STORAGE_KEY, &settings_snapshot).await;
        }

        info!(
            "Store initialized from {}: {} servers ({})",
            self.backend.name(),
            server_snapshot.len(),
            status
        );
        self.notify();
    }

    async fn read_key<T>(&self, key: &'static str) -> Result<Loaded<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let backend = self.backend.clone();
        let raw = tokio::task::spawn_blocking(move || backend.get_item(key))
            .await
            .map_err(|e| StoreError::Read {
                key,
                message: e.to_string(),
            })?
            .map_err(|e| StoreError::Read {
                key,
                message: format!("{:#}", e),
            })?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Loaded::Found)
                .map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(Loaded::Missing),
        }
    }

    async fn persist<T>(&self, key: &'static str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        if !self.backend.is_durable() {
            return Ok(());
        }

        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize { key, source })?;

        let backend = self.backend.clone();
        let result = tokio::task::spawn_blocking(move || backend.set_item(key, &json))
            .await
            .map_err(|e| StoreError::Persist {
                key,
                message: e.to_string(),
            })
            .and_then(|r| {
                r.map_err(|e| StoreError::Persist {
                    key,
                    message: format!("{:#}", e),
                })
            });

        match &result {
            Ok(()) => debug!("{} saved to storage", key),
            Err(e) => error!("Error saving to {} storage: {}", self.backend.name(), e),
        }
        result
    }

    async fn remove_keys(&self, keys: &'static [&'static str]) -> Result<(), StoreError> {
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.remove_items(keys))
            .await
            .map_err(|e| StoreError::Clear {
                message: e.to_string(),
            })?
            .map_err(|e| StoreError::Clear {
                message: format!("{:#}", e),
            })
    }

    async fn persist_then_notify<T>(&self, key: &'static str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let result = self.persist(key, value).await;
        self.notify();
        result
    }

    fn notify(&self) {
        let notified = self.listeners.notify();
        if notified > 0 {
            debug!("Notified {} listeners", notified);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn server(id: &str, server_type: ServerType, username: &str) -> Server {
        Server {
            id: id.into(),
            server_type,
            username: username.into(),
            host: "h".into(),
            password: "p".into(),
            port: None,
            is_online: true,
            custom_config: None,
            created_at: "2026-10-19T00:00:00.000Z".into(),
        }
    }

    fn counting(store: &Store) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let sub = store.subscribe(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, sub)
    }

    #[tokio::test]
    async fn in_memory_store_starts_initialized_with_seed() {
        let store = Store::in_memory();
        assert!(store.is_initialized().await);
        assert_eq!(store.load_status().await, LoadStatus::Ephemeral);
        assert_eq!(store.get_servers().await.len(), 6);
    }

    #[tokio::test]
    async fn add_preserves_insertion_order() {
        let store = Store::with_seed(Arc::new(NullBackend), Seed::empty());
        for i in 0..5 {
            store
                .add_server(server(&i.to_string(), ServerType::V2ray, "u"))
                .await
                .unwrap();
        }
        let ids: Vec<_> = store.get_servers().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn add_appends_exact_record_and_leaves_others() {
        let store = Store::in_memory();
        let before = store.get_servers().await;
        let new = server("7", ServerType::V2ray, "x");

        store.add_server(new.clone()).await.unwrap();

        let after = store.get_servers().await;
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.last(), Some(&new));
    }

    #[tokio::test]
    async fn update_changes_only_present_fields() {
        let store = Store::in_memory();
        let original = store.get_server("3").await.unwrap();

        let matched = store
            .update_server(
                "3",
                ServerPatch {
                    host: Some("new.host".into()),
                    is_online: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matched);

        let updated = store.get_server("3").await.unwrap();
        assert_eq!(updated.host, "new.host");
        assert!(!updated.is_online);
        assert_eq!(updated.username, original.username);
        assert_eq!(updated.password, original.password);
        assert_eq!(updated.port, original.port);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[tokio::test]
    async fn update_unknown_id_is_noop() {
        let store = Store::in_memory();
        let before = store.get_servers().await;
        let matched = store
            .update_server("nope", ServerPatch {
                username: Some("zzz".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!matched);
        assert_eq!(store.get_servers().await, before);
    }

    #[tokio::test]
    async fn delete_shrinks_by_one_or_zero() {
        let store = Store::in_memory();
        assert!(store.delete_server("2").await.unwrap());
        assert_eq!(store.get_servers().await.len(), 5);
        assert!(!store.delete_server("2").await.unwrap());
        assert_eq!(store.get_servers().await.len(), 5);
    }

    #[tokio::test]
    async fn settings_patch_keeps_welcome_message() {
        let store = Store::in_memory();
        let welcome = store.get_settings().await.welcome_message;
        store
            .update_settings(SettingsPatch {
                update_number: Some("v2.0.0".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let settings = store.get_settings().await;
        assert_eq!(settings.welcome_message, welcome);
        assert_eq!(settings.update_number, "v2.0.0");
    }

    #[tokio::test]
    async fn every_mutation_notifies_each_listener_once() {
        let store = Store::in_memory();
        let (a, _sub_a) = counting(&store);
        let (b, _sub_b) = counting(&store);

        store.add_server(server("9", ServerType::Udp, "u")).await.unwrap();
        assert_eq!((a.load(Ordering::SeqCst), b.load(Ordering::SeqCst)), (1, 1));

        store.update_server("9", ServerPatch::default()).await.unwrap();
        store.delete_server("9").await.unwrap();
        store.update_settings(SettingsPatch::default()).await.unwrap();
        assert_eq!((a.load(Ordering::SeqCst), b.load(Ordering::SeqCst)), (4, 4));
    }

    #[tokio::test]
    async fn unsubscribe_silences_only_that_listener() {
        let store = Store::in_memory();
        let (a, sub_a) = counting(&store);
        let (b, _sub_b) = counting(&store);

        assert!(sub_a.unsubscribe());
        assert!(!sub_a.unsubscribe());
        store.delete_server("1").await.unwrap();

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 1);
    }

    #[tokio::test]
    async fn lazy_load_seeds_and_writes_back_on_fresh_storage() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        assert!(!store.is_initialized().await);

        assert_eq!(store.get_servers().await.len(), 6);
        assert_eq!(
            store.load_status().await,
            LoadStatus::Seeded {
                servers: true,
                settings: true
            }
        );
        assert_eq!(backend.write_count(), 2);
        assert!(backend.raw(SERVERS_STORAGE_KEY).is_some());
        assert!(backend.raw(SETTINGS_STORAGE_KEY).is_some());
    }

    #[tokio::test]
    async fn load_runs_once() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        let (hits, _sub) = counting(&store);

        store.get_servers().await;
        store.get_settings().await;
        store.load().await;

        assert_eq!(backend.write_count(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_failure_falls_back_once_without_retry() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_reads(true);
        let store = Store::new(backend.clone());

        assert_eq!(store.get_servers().await.len(), 6);
        assert!(store.load_status().await.is_recovered());
        assert_eq!(backend.write_count(), 0);

        // Storage recovers, but the store already initialized.
        backend.set_fail_reads(false);
        backend.insert_raw(SERVERS_STORAGE_KEY, "[]");
        assert_eq!(store.get_servers().await.len(), 6);

        store.reload().await;
        assert!(store.get_servers().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_value_recovers_with_defaults() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_raw(SERVERS_STORAGE_KEY, "{not json");
        let store = Store::new(backend.clone());

        assert_eq!(store.get_servers().await.len(), 6);
        match store.load_status().await {
            LoadStatus::Recovered { error } => assert!(error.contains(SERVERS_STORAGE_KEY)),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn write_failure_keeps_memory_and_still_notifies() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        store.load().await;
        let (hits, _sub) = counting(&store);

        backend.set_fail_writes(true);
        let err = store
            .add_server(server("42", ServerType::Websocket, "w"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persist { key: SERVERS_STORAGE_KEY, .. }));

        assert!(store.get_server("42").await.is_some());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_all_data_resets_to_seed_and_removes_keys() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        store.delete_server("1").await.unwrap();
        store
            .update_settings(SettingsPatch {
                welcome_message: Some("changed".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        store.clear_all_data().await.unwrap();

        assert_eq!(store.get_servers().await.len(), 6);
        assert_eq!(store.get_settings().await.welcome_message, crate::defaults::DEFAULT_WELCOME_MESSAGE);
        assert!(backend.raw(SERVERS_STORAGE_KEY).is_none());
        assert!(backend.raw(SETTINGS_STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn clear_all_data_refused_leaves_state() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        store.delete_server("1").await.unwrap();

        backend.set_fail_writes(true);
        assert!(store.clear_all_data().await.is_err());
        assert_eq!(store.get_servers().await.len(), 5);
    }

    #[tokio::test]
    async fn clear_all_data_removes_both_keys_or_neither() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());
        store.delete_server("1").await.unwrap();
        let saved = backend.raw(SERVERS_STORAGE_KEY);
        assert!(saved.is_some());

        backend.refuse_key(SETTINGS_STORAGE_KEY);
        let err = store.clear_all_data().await.unwrap_err();
        assert!(matches!(err, StoreError::Clear { .. }));

        assert_eq!(store.get_servers().await.len(), 5);
        assert_eq!(backend.raw(SERVERS_STORAGE_KEY), saved);
        assert!(backend.raw(SETTINGS_STORAGE_KEY).is_some());

        let restarted = Store::new(backend);
        assert_eq!(restarted.get_servers().await.len(), 5);
        assert_eq!(restarted.load_status().await, LoadStatus::Restored);
    }

    #[tokio::test]
    async fn clear_before_first_read_records_a_load_status() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::new(backend.clone());

        store.clear_all_data().await.unwrap();

        assert_eq!(
            store.load_status().await,
            LoadStatus::Seeded {
                servers: true,
                settings: true
            }
        );
        assert!(backend.raw(SERVERS_STORAGE_KEY).is_none());
        assert_eq!(store.get_servers().await.len(), 6);
    }

    #[tokio::test]
    async fn replace_servers_overwrites_list() {
        let store = Store::in_memory();
        store
            .replace_servers(vec![server("a", ServerType::Udp, "only")])
            .await
            .unwrap();
        let servers = store.get_servers().await;
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].username, "only");
    }
}
