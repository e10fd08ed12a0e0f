//! # WebSocket Service
//!
//! One socket per logged-in user, multiplexed to any number of feature
//! subscribers. Screens subscribe and unsubscribe as they come and go while
//! the socket itself outlives them.
//!
//! ## Connection States
//!
//! ```text
//! Disconnected --connect()--> Connecting --handshake--> Open
//!      ^                                                 |
//!      +------------- close (retry after fixed delay) ---+
//! ```
//!
//! - `connect(user_id)` is single-flight: concurrent callers share one attempt.
//! - A dropped socket reconnects after a fixed delay (5 s by default) for as
//!   long as a user id is set. There is no backoff.
//! - `disconnect()` clears the user id, cancels any pending reconnect and
//!   removes every subscription.

use futures::future::{BoxFuture, FutureExt, Shared};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::core::{AppError, ClientConfig, Result, Unsubscribe};
use crate::debug::spawn_tracked;
use shared::dto::realtime::event_types::WILDCARD;

/// Handler for a decoded push event (the whole JSON object, `type` included)
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Socket lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

type ConnectFuture = Shared<BoxFuture<'static, Result<()>>>;

struct Subscription {
    id: String,
    /// Distinguishes re-registrations under the same id
    registration: u64,
    types: Vec<String>,
    handler: MessageHandler,
}

impl Subscription {
    fn wants(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind || t == WILDCARD)
    }
}

struct Connection {
    state: ConnectionState,
    user_id: Option<String>,
    /// Bumped on every new attempt and on disconnect; stale tasks compare
    /// against it and stand down.
    generation: u64,
    pending_connect: Option<ConnectFuture>,
    task: Option<JoinHandle<()>>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

struct ServiceShared {
    reconnect_delay: Duration,
    config: ClientConfig,
    connection: Mutex<Connection>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_registration: AtomicU64,
    messages_received: AtomicU64,
}

/// Shared WebSocket multiplexer. Clones share one connection.
#[derive(Clone)]
pub struct WebSocketService {
    shared: Arc<ServiceShared>,
}

impl WebSocketService {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            shared: Arc::new(ServiceShared {
                reconnect_delay: config.ws_reconnect_delay,
                config: config.clone(),
                connection: Mutex::new(Connection {
                    state: ConnectionState::Disconnected,
                    user_id: None,
                    generation: 0,
                    pending_connect: None,
                    task: None,
                    outbound: None,
                }),
                subscriptions: RwLock::new(Vec::new()),
                next_registration: AtomicU64::new(0),
                messages_received: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.connection.lock().state
    }

    pub fn user_id(&self) -> Option<String> {
        self.shared.connection.lock().user_id.clone()
    }

    pub fn messages_received(&self) -> u64 {
        self.shared.messages_received.load(Ordering::Relaxed)
    }

    /// Open the socket for `user_id`.
    ///
    /// Resolves once the socket is open. Returns immediately when the socket
    /// is already open (or reconnecting) for the same user; joins the
    /// in-flight attempt when one exists. Connecting as another user drops
    /// the current socket first.
    pub async fn connect(&self, user_id: &str) -> Result<()> {
        let attempt = {
            let mut conn = self.shared.connection.lock();

            if conn.user_id.as_deref() == Some(user_id) {
                if let Some(pending) = &conn.pending_connect {
                    debug!(user_id = %user_id, "Joining in-flight WebSocket connect");
                    pending.clone()
                } else if conn.state != ConnectionState::Disconnected {
                    return Ok(());
                } else {
                    self.shared.start_attempt(&mut conn, user_id)
                }
            } else {
                self.shared.start_attempt(&mut conn, user_id)
            }
        };
        attempt.await
    }

    /// Close the socket and forget the user. Clears every subscription.
    pub fn disconnect(&self) {
        let task = {
            let mut conn = self.shared.connection.lock();
            conn.generation += 1;
            conn.user_id = None;
            conn.state = ConnectionState::Disconnected;
            conn.pending_connect = None;
            conn.outbound = None;
            conn.task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        self.shared.subscriptions.write().clear();
        info!("WebSocket disconnected");
    }

    /// Register `handler` for events whose `type` is in `types` (or `*`).
    ///
    /// Re-registering an id replaces its types and handler. The returned
    /// handle only removes the registration it came from.
    pub fn subscribe<F>(&self, id: &str, types: &[&str], handler: F) -> Unsubscribe
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let registration = self.shared.next_registration.fetch_add(1, Ordering::Relaxed);
        let subscription = Subscription {
            id: id.to_string(),
            registration,
            types: types.iter().map(|t| t.to_string()).collect(),
            handler: Arc::new(handler),
        };

        {
            let mut subs = self.shared.subscriptions.write();
            match subs.iter_mut().find(|s| s.id == id) {
                Some(existing) => *existing = subscription,
                None => subs.push(subscription),
            }
        }
        debug!(id = %id, types = ?types, "WebSocket subscription registered");

        let weak: Weak<ServiceShared> = Arc::downgrade(&self.shared);
        let id = id.to_string();
        Unsubscribe::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared
                    .subscriptions
                    .write()
                    .retain(|s| !(s.id == id && s.registration == registration));
            }
        })
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.subscriptions.read().len()
    }

    /// Send a JSON text frame. Fails unless the socket is open.
    pub fn send(&self, value: &Value) -> Result<()> {
        let conn = self.shared.connection.lock();
        match (&conn.state, &conn.outbound) {
            (ConnectionState::Open, Some(tx)) => tx
                .send(Message::Text(value.to_string()))
                .map_err(|_| AppError::WebSocket("Socket writer has stopped".to_string())),
            _ => Err(AppError::WebSocket("Not connected".to_string())),
        }
    }

    /// Decode one text frame and deliver it to every matching subscription.
    ///
    /// Returns the number of handlers invoked. Malformed JSON is logged and
    /// dropped; a panicking handler is logged and does not stop delivery to
    /// the others.
    pub fn dispatch_text(&self, text: &str) -> usize {
        self.shared.dispatch_text(text)
    }
}

impl ServiceShared {
    /// Begin a fresh connection attempt, replacing any previous task.
    fn start_attempt(self: &Arc<Self>, conn: &mut Connection, user_id: &str) -> ConnectFuture {
        if let Some(task) = conn.task.take() {
            task.abort();
        }
        conn.generation += 1;
        conn.user_id = Some(user_id.to_string());
        conn.state = ConnectionState::Connecting;
        conn.outbound = None;

        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let attempt: ConnectFuture = async move {
            ready_rx
                .await
                .unwrap_or_else(|_| Err(AppError::WebSocket("Connection attempt cancelled".to_string())))
        }
        .boxed()
        .shared();
        conn.pending_connect = Some(attempt.clone());

        info!(user_id = %user_id, generation = conn.generation, "Connecting WebSocket");
        conn.task = Some(spawn_tracked(
            "websocket_connection",
            Arc::clone(self).run(user_id.to_string(), conn.generation, ready_tx),
        ));
        attempt
    }

    fn is_current(&self, generation: u64) -> bool {
        let conn = self.connection.lock();
        conn.generation == generation && conn.user_id.is_some()
    }

    async fn run(self: Arc<Self>, user_id: String, generation: u64, ready: oneshot::Sender<Result<()>>) {
        let url = self.config.ws_url(&user_id);
        let mut ready = Some(ready);

        loop {
            if !self.is_current(generation) {
                return;
            }
            self.set_state(generation, ConnectionState::Connecting);

            match connect_async(&url).await {
                Ok((stream, response)) => {
                    info!(url = %url, status = ?response.status(), "WebSocket connection established");
                    let (out_tx, out_rx) = mpsc::unbounded_channel();
                    if !self.mark_open(generation, out_tx) {
                        return;
                    }
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    }
                    self.pump(stream, out_rx).await;
                    self.mark_closed(generation);
                }
                Err(e) => {
                    error!(url = %url, error = %e, "Failed to connect WebSocket");
                    self.mark_closed(generation);
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(e.into()));
                    }
                }
            }

            if !self.is_current(generation) {
                return;
            }
            info!(
                delay_secs = self.reconnect_delay.as_secs_f32(),
                "WebSocket closed, reconnecting after delay"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    fn set_state(&self, generation: u64, state: ConnectionState) {
        let mut conn = self.connection.lock();
        if conn.generation == generation {
            conn.state = state;
        }
    }

    fn mark_open(&self, generation: u64, outbound: mpsc::UnboundedSender<Message>) -> bool {
        let mut conn = self.connection.lock();
        if conn.generation != generation {
            return false;
        }
        conn.state = ConnectionState::Open;
        conn.pending_connect = None;
        conn.outbound = Some(outbound);
        true
    }

    fn mark_closed(&self, generation: u64) {
        let mut conn = self.connection.lock();
        if conn.generation == generation {
            conn.state = ConnectionState::Disconnected;
            conn.pending_connect = None;
            conn.outbound = None;
        }
    }

    /// Read frames until the socket closes; forward queued outbound frames.
    async fn pump(
        &self,
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        mut outbound: mpsc::UnboundedReceiver<Message>,
    ) {
        let (mut write, mut read) = stream.split();
        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.dispatch_text(&text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        trace!(data_len = data.len(), "Received ping, sending pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            error!(error = %e, "Failed to send pong response");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(
                            code = ?frame.as_ref().map(|f| f.code),
                            reason = ?frame.as_ref().map(|f| f.reason.to_string()),
                            "WebSocket connection closed by server"
                        );
                        break;
                    }
                    Some(Ok(_)) => trace!("Ignoring non-text WebSocket frame"),
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket read error");
                        break;
                    }
                    None => break,
                },
                queued = outbound.recv() => match queued {
                    Some(message) => {
                        if let Err(e) = write.send(message).await {
                            error!(error = %e, "WebSocket write error");
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                },
            }
        }
    }

    fn dispatch_text(&self, text: &str) -> usize {
        self.messages_received.fetch_add(1, Ordering::Relaxed);

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    error = %e,
                    message_preview = %shared::truncate_preview(text, 100),
                    "Failed to parse WebSocket message"
                );
                return 0;
            }
        };
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            warn!(
                message_preview = %shared::truncate_preview(text, 100),
                "WebSocket message without a type"
            );
            return 0;
        };

        // Handlers may (un)subscribe, so release the lock before calling them
        let targets: Vec<(String, MessageHandler)> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.wants(kind))
            .map(|s| (s.id.clone(), Arc::clone(&s.handler)))
            .collect();

        debug!(message_type = %kind, handlers = targets.len(), "Dispatching WebSocket message");
        for (id, handler) in &targets {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| handler(&value))) {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(subscription = %id, message_type = %kind, reason = %reason, "WebSocket handler panicked");
            }
        }
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (hits, move |_: &Value| {
            h.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn service() -> WebSocketService {
        WebSocketService::new(&ClientConfig::default())
    }

    #[test]
    fn test_dispatch_matches_exact_type() {
        let ws = service();
        let (hits, handler) = counter();
        let _sub = ws.subscribe("a2a", &["a2a_request"], handler);

        ws.dispatch_text(r#"{"type":"a2a_request","session_id":"s1"}"#);
        ws.dispatch_text(r#"{"type":"friend_request"}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wildcard_receives_everything() {
        let ws = service();
        let (hits, handler) = counter();
        let _sub = ws.subscribe("all", &["*"], handler);

        ws.dispatch_text(r#"{"type":"a2a_request"}"#);
        ws.dispatch_text(r#"{"type":"friend_request"}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_handler_does_not_block_others() {
        let ws = service();
        let _bad = ws.subscribe("bad", &["notification"], |_| panic!("boom"));
        let (hits, handler) = counter();
        let _good = ws.subscribe("good", &["notification"], handler);

        assert_eq!(ws.dispatch_text(r#"{"type":"notification"}"#), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let ws = service();
        let (hits, handler) = counter();
        let _sub = ws.subscribe("all", &["*"], handler);

        assert_eq!(ws.dispatch_text("{oops"), 0);
        assert_eq!(ws.dispatch_text(r#"{"no_type":true}"#), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(ws.messages_received(), 2);
    }

    #[test]
    fn test_resubscribe_replaces_and_stale_handle_is_inert() {
        let ws = service();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();

        let stale = ws.subscribe("friends", &["friend_request"], first);
        let _current = ws.subscribe("friends", &["friend_accepted"], second);
        assert_eq!(ws.subscription_count(), 1);

        stale.unsubscribe();
        assert_eq!(ws.subscription_count(), 1);

        ws.dispatch_text(r#"{"type":"friend_request"}"#);
        ws.dispatch_text(r#"{"type":"friend_accepted"}"#);
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let ws = service();
        let (hits, handler) = counter();
        let sub = ws.subscribe("x", &["*"], handler);
        sub.unsubscribe();
        ws.dispatch_text(r#"{"type":"notification"}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_send_requires_open_socket() {
        let ws = service();
        assert!(matches!(
            ws.send(&serde_json::json!({"type": "ping"})),
            Err(AppError::WebSocket(_))
        ));
    }

    async fn local_config() -> (TcpListener, ClientConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig {
            api_base_url: format!("http://{}", listener.local_addr().unwrap()),
            ws_reconnect_delay: Duration::from_millis(50),
            ..ClientConfig::default()
        };
        (listener, config)
    }

    #[tokio::test]
    async fn test_connect_is_single_flight_and_delivers_messages() {
        let (listener, config) = local_config().await;
        let accepted = Arc::new(AtomicUsize::new(0));

        let acc = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                acc.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut ws = accept_async(stream).await.unwrap();
                    ws.send(Message::Text(r#"{"type":"a2a_request","session_id":"s1"}"#.to_string()))
                        .await
                        .unwrap();
                    // Hold the socket open
                    while ws.next().await.is_some() {}
                });
            }
        });

        let ws = WebSocketService::new(&config);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = ws.subscribe("a2a", &["a2a_request"], move |v| {
            let _ = tx.send(v.clone());
        });

        let (a, b) = tokio::join!(ws.connect("u1"), ws.connect("u1"));
        a.unwrap();
        b.unwrap();
        assert_eq!(ws.state(), ConnectionState::Open);
        ws.connect("u1").await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event["session_id"], "s1");
        assert_eq!(accepted.load(Ordering::SeqCst), 1);

        ws.disconnect();
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert_eq!(ws.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_reconnects_after_server_close() {
        let (listener, config) = local_config().await;
        let accepted = Arc::new(AtomicUsize::new(0));

        let acc = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let n = acc.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut ws = accept_async(stream).await.unwrap();
                    if n == 0 {
                        let _ = ws.close(None).await;
                    } else {
                        while ws.next().await.is_some() {}
                    }
                });
            }
        });

        let ws = WebSocketService::new(&config);
        ws.connect("u1").await.unwrap();

        let reconnected = tokio::time::timeout(Duration::from_secs(5), async {
            while accepted.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(reconnected.is_ok());
        ws.disconnect();
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let (listener, config) = local_config().await;
        drop(listener);

        let ws = WebSocketService::new(&config);
        assert!(matches!(ws.connect("u1").await, Err(AppError::WebSocket(_))));
        ws.disconnect();
    }
}
