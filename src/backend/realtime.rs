//! Change-feed subscriber over the backend's realtime websocket.
//!
//! One socket per client, one Phoenix-style channel join per watched
//! table. Subscribers register a callback for a table and get back a
//! `Subscription` handle; dropping it (or calling `unsubscribe`) removes
//! the callback, so a discarded view can never leak listener invocations.
//! The connection task reconnects with exponential backoff plus jitter
//! and rejoins every watched table after a reconnect.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use rand::RngExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::config::RealtimeConfig;
use crate::types::{ChangeEvent, ChangeKind};

/// Phoenix heartbeat cadence.
const HEARTBEAT_SECS: u64 = 30;
const INITIAL_BACKOFF_SECS: u64 = 1;

type Callback = Box<dyn Fn(ChangeEvent) + Send + Sync>;

struct Listener {
    table: String,
    callback: Callback,
}

type Registry = Arc<DashMap<u64, Listener>>;

/// Handle to one table subscription. Dropping it stops further callback
/// invocations; the socket stays up for remaining subscribers.
pub struct Subscription {
    id: u64,
    table: String,
    registry: Registry,
}

impl Subscription {
    /// Explicit release; equivalent to dropping the handle.
    pub fn unsubscribe(self) {}

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        log::debug!("Realtime: unsubscribed from {}", self.table);
    }
}

/// Live connection to the backend change feed.
pub struct RealtimeClient {
    registry: Registry,
    next_id: AtomicU64,
    join_tx: mpsc::UnboundedSender<String>,
    task: tokio::task::JoinHandle<()>,
}

impl RealtimeClient {
    /// Spawn the connection task. Must be called from a tokio runtime.
    pub fn start(base: &Url, key: &str, config: &RealtimeConfig) -> Self {
        let registry: Registry = Arc::new(DashMap::new());
        let (join_tx, join_rx) = mpsc::unbounded_channel();
        let url = realtime_url(base, key);
        let task = tokio::spawn(run_connection(
            url,
            registry.clone(),
            join_rx,
            config.max_backoff_secs.max(INITIAL_BACKOFF_SECS),
        ));
        Self {
            registry,
            next_id: AtomicU64::new(1),
            join_tx,
            task,
        }
    }

    /// Register `callback` for every insert/update/delete on `table`.
    pub fn subscribe(
        &self,
        table: &str,
        callback: impl Fn(ChangeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.insert(
            id,
            Listener {
                table: table.to_string(),
                callback: Box::new(callback),
            },
        );
        // Ask the connection task to join the channel; a no-op if already
        // joined, harmless if the socket is currently down (rejoin on
        // reconnect covers it).
        let _ = self.join_tx.send(table.to_string());
        log::debug!("Realtime: subscribed to {}", table);
        Subscription {
            id,
            table: table.to_string(),
            registry: self.registry.clone(),
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Derive the websocket endpoint from the backend base URL.
fn realtime_url(base: &Url, key: &str) -> String {
    let scheme = if base.scheme() == "http" { "ws" } else { "wss" };
    let host = base.host_str().unwrap_or_default();
    let port = base
        .port()
        .map(|p| format!(":{}", p))
        .unwrap_or_default();
    format!(
        "{}://{}{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        scheme, host, port, key
    )
}

fn channel_topic(table: &str) -> String {
    format!("realtime:public:{}", table)
}

/// Invoke every listener registered for the event's table.
fn dispatch(registry: &Registry, event: &ChangeEvent) {
    for entry in registry.iter() {
        if entry.table == event.table {
            (entry.callback)(event.clone());
        }
    }
}

/// Parse one inbound socket frame into a change event. Phoenix control
/// frames (replies, heartbeats, presence) return None.
fn parse_change_event(text: &str) -> Option<ChangeEvent> {
    let value: Value = serde_json::from_str(text).ok()?;
    let kind = match value.get("event")?.as_str()? {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };
    let topic = value.get("topic")?.as_str()?;
    let table = topic.rsplit(':').next()?.to_string();
    let payload = value.get("payload");
    Some(ChangeEvent {
        table,
        kind,
        record: payload.and_then(|p| p.get("record")).cloned(),
        old_record: payload.and_then(|p| p.get("old_record")).cloned(),
    })
}

async fn run_connection(
    url: String,
    registry: Registry,
    mut join_rx: mpsc::UnboundedReceiver<String>,
    max_backoff_secs: u64,
) {
    let mut backoff_secs = INITIAL_BACKOFF_SECS;
    loop {
        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                log::info!("Realtime: connected");
                backoff_secs = INITIAL_BACKOFF_SECS;
                let mut msg_ref: u64 = 0;

                // Join every table with a live listener; new tables arrive
                // over join_rx while the socket is up.
                let mut joined: HashSet<String> = HashSet::new();
                let initial: Vec<String> =
                    registry.iter().map(|e| e.table.clone()).collect();
                for table in initial {
                    if joined.insert(table.clone()) {
                        msg_ref += 1;
                        let join = json!({
                            "topic": channel_topic(&table),
                            "event": "phx_join",
                            "payload": {},
                            "ref": msg_ref.to_string(),
                        });
                        if ws.send(Message::Text(join.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }

                let mut heartbeat =
                    tokio::time::interval(Duration::from_secs(HEARTBEAT_SECS));
                heartbeat.tick().await; // first tick fires immediately

                loop {
                    tokio::select! {
                        frame = ws.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(event) = parse_change_event(text.as_str()) {
                                    log::debug!(
                                        "Realtime: {:?} on {}",
                                        event.kind, event.table
                                    );
                                    dispatch(&registry, &event);
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                log::warn!("Realtime: socket error: {}", e);
                                break;
                            }
                            None => {
                                log::warn!("Realtime: connection closed by peer");
                                break;
                            }
                        },
                        joined_table = join_rx.recv() => match joined_table {
                            Some(table) => {
                                if joined.insert(table.clone()) {
                                    msg_ref += 1;
                                    let join = json!({
                                        "topic": channel_topic(&table),
                                        "event": "phx_join",
                                        "payload": {},
                                        "ref": msg_ref.to_string(),
                                    });
                                    if ws
                                        .send(Message::Text(join.to_string().into()))
                                        .await
                                        .is_err()
                                    {
                                        break;
                                    }
                                }
                            }
                            // Client dropped; the task is being aborted anyway.
                            None => return,
                        },
                        _ = heartbeat.tick() => {
                            msg_ref += 1;
                            let beat = json!({
                                "topic": "phoenix",
                                "event": "heartbeat",
                                "payload": {},
                                "ref": msg_ref.to_string(),
                            });
                            if ws.send(Message::Text(beat.to_string().into())).await.is_err() {
                                log::warn!("Realtime: heartbeat send failed");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("Realtime: connect failed: {}", e);
            }
        }

        let jitter_ms: u64 = rand::rng().random_range(0..1000);
        let delay = Duration::from_secs(backoff_secs) + Duration::from_millis(jitter_ms);
        log::info!("Realtime: reconnecting in {:.1}s", delay.as_secs_f32());
        tokio::time::sleep(delay).await;
        backoff_secs = (backoff_secs * 2).min(max_backoff_secs);
    }
}
