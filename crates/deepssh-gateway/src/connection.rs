use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use deepssh_types::events::GatewayEvent;

use crate::dispatcher::Dispatcher;

/// Server sends a Ping every 15 seconds; two missed Pongs drop the client.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serve one WebSocket client until it leaves or stops answering pings.
///
/// The client gets `Ready` with the current revision, then one
/// `DataChanged` per store mutation. A client that fell behind the
/// broadcast buffer is sent a fresh `DataChanged` so it re-reads once.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before Ready so no change between the two is missed
    let mut broadcast_rx = dispatcher.subscribe();
    let connection_id = dispatcher.connection_opened().await;
    info!("Gateway client {} connected", connection_id);

    let ready = GatewayEvent::Ready {
        connection_id,
        revision: dispatcher.revision(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        dispatcher.connection_closed(connection_id).await;
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;
    let lag_dispatcher = dispatcher.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(n)) => {
                            warn!("Gateway client {} lagged by {} events", connection_id, n);
                            GatewayEvent::DataChanged { revision: lag_dispatcher.revision() }
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping {}", missed_heartbeats, connection_id);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Clients only listen; anything but Pong/Close is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => pong_flag_recv.store(true, Ordering::Release),
                Message::Close(_) => break,
                Message::Text(text) => {
                    debug!("Ignoring client text frame ({} bytes)", text.len());
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.connection_closed(connection_id).await;
    info!("Gateway client {} disconnected", connection_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return Err(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
