use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use deepssh_store::{Store, Subscription};
use deepssh_types::events::GatewayEvent;

const BROADCAST_CAPACITY: usize = 256;

/// Fans store change notifications out to every connected client.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// All connected clients receive all events
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Bumped once per store notification
    revision: AtomicU64,

    /// Open connection ids
    connections: RwLock<HashSet<Uuid>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                revision: AtomicU64::new(0),
                connections: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Subscribe this dispatcher to `store`; every mutation becomes a
    /// `DataChanged` event. Keep the returned handle to detach later.
    pub fn attach(&self, store: &Store) -> Subscription {
        let dispatcher = self.clone();
        store.subscribe(move || {
            dispatcher.data_changed();
        })
    }

    /// Record one change and broadcast it.
    pub fn data_changed(&self) -> u64 {
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.broadcast(GatewayEvent::DataChanged { revision });
        revision
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Send to every connected client. Having no clients is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        if self.inner.broadcast_tx.send(event).is_err() {
            debug!("No gateway clients to notify");
        }
    }

    pub async fn connection_opened(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.connections.write().await.insert(id);
        id
    }

    pub async fn connection_closed(&self, id: Uuid) {
        self.inner.connections.write().await.remove(&id);
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepssh_types::models::SettingsPatch;

    #[tokio::test]
    async fn store_mutations_become_data_changed_events() {
        let store = Store::in_memory();
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        let attachment = dispatcher.attach(&store);

        store.delete_server("1").await.unwrap();
        store.update_settings(SettingsPatch::default()).await.unwrap();

        match rx.recv().await.unwrap() {
            GatewayEvent::DataChanged { revision } => assert_eq!(revision, 1),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            GatewayEvent::DataChanged { revision } => assert_eq!(revision, 2),
            other => panic!("unexpected event {:?}", other),
        }

        assert!(attachment.unsubscribe());
        store.delete_server("2").await.unwrap();
        assert_eq!(dispatcher.revision(), 2);
    }

    #[tokio::test]
    async fn broadcast_without_clients_is_fine() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.data_changed(), 1);
    }

    #[tokio::test]
    async fn tracks_connections() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.connection_opened().await;
        let b = dispatcher.connection_opened().await;
        assert_eq!(dispatcher.connection_count().await, 2);
        dispatcher.connection_closed(a).await;
        dispatcher.connection_closed(a).await;
        assert_eq!(dispatcher.connection_count().await, 1);
        dispatcher.connection_closed(b).await;
        assert_eq!(dispatcher.connection_count().await, 0);
    }
}
