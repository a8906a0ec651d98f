//! Per-session bridge between HTTP exchanges and a protocol engine.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::ProtocolEngine;
use crate::session::SessionId;
use crate::types::{JsonRpcMessage, McpError, McpResult};

use super::push::PushSender;

/// Default number of outbound messages buffered per session.
pub const DEFAULT_PUSH_BUFFER: usize = 64;

/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

/// Callback fired when the client side of the transport goes away.
pub type CloseHook = Box<dyn FnOnce() + Send + 'static>;

/// Tuning for a transport adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Capacity of the outbound push buffer.
    pub push_buffer: usize,
    /// Interval between keep-alive comments on the push stream.
    pub keep_alive: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            push_buffer: DEFAULT_PUSH_BUFFER,
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
        }
    }
}

/// Bridges one engine to the HTTP boundary.
///
/// POST bodies go through [`forward`](Self::forward), which admits one
/// message at a time in arrival order. Messages the engine pushes are
/// delivered on the stream returned by [`open_stream`](Self::open_stream).
pub struct TransportAdapter {
    engine: Arc<dyn ProtocolEngine>,
    session_id: Arc<OnceLock<SessionId>>,
    inflight: tokio::sync::Mutex<()>,
    push_tx: mpsc::Sender<JsonRpcMessage>,
    push_rx: Mutex<Option<mpsc::Receiver<JsonRpcMessage>>>,
    closed: CancellationToken,
    on_close: Mutex<Option<CloseHook>>,
    next_event_id: Arc<AtomicU64>,
    keep_alive: Duration,
}

impl TransportAdapter {
    /// Create an adapter for `engine`. The engine is not attached here.
    pub fn new(engine: Arc<dyn ProtocolEngine>, config: &AdapterConfig) -> Self {
        let (push_tx, push_rx) = mpsc::channel(config.push_buffer.max(1));
        Self {
            engine,
            session_id: Arc::new(OnceLock::new()),
            inflight: tokio::sync::Mutex::new(()),
            push_tx,
            push_rx: Mutex::new(Some(push_rx)),
            closed: CancellationToken::new(),
            on_close: Mutex::new(None),
            next_event_id: Arc::new(AtomicU64::new(0)),
            keep_alive: config.keep_alive,
        }
    }

    /// A sender the engine can use to push messages to the client.
    pub fn push_sender(&self) -> PushSender {
        PushSender::new(
            self.push_tx.clone(),
            self.session_id.clone(),
            self.closed.clone(),
        )
    }

    /// Bind the session id. Allowed once, after the handshake succeeded.
    pub fn assign_session_id(&self, id: SessionId) -> McpResult<()> {
        self.session_id.set(id).map_err(|_| {
            McpError::InternalError("session id already assigned to transport".to_string())
        })
    }

    /// The session id, if assigned.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.get().copied()
    }

    /// Keep-alive interval for the push stream.
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Deliver one inbound message to the engine.
    ///
    /// Calls on the same adapter are serialized in arrival order.
    pub async fn forward(&self, message: JsonRpcMessage) -> McpResult<Option<Value>> {
        if self.is_closed() {
            return Err(McpError::SessionClosed);
        }
        let _turn = self.inflight.lock().await;
        // Teardown may have run while we waited for our turn.
        if self.is_closed() {
            return Err(McpError::SessionClosed);
        }
        self.engine.handle(message).await
    }

    /// Take the push stream. Only one stream can be open per session.
    ///
    /// Dropping the returned stream (for example because the client hung up)
    /// fires the close hook. The stream ends when the adapter is closed.
    pub fn open_stream(
        self: &Arc<Self>,
    ) -> McpResult<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        if self.is_closed() {
            return Err(McpError::SessionClosed);
        }
        let rx = lock(&self.push_rx)?
            .take()
            .ok_or(McpError::StreamAlreadyOpen)?;

        let guard = StreamGuard {
            adapter: Arc::downgrade(self),
        };
        let event_ids = self.next_event_id.clone();

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        })
        .take_until(self.closed.clone().cancelled_owned())
        .map(move |message| {
            let _guard = &guard;
            let id = event_ids.fetch_add(1, Ordering::Relaxed);
            let event = Event::default()
                .event("message")
                .id(id.to_string())
                .json_data(&message)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
            Ok(event)
        });

        Ok(stream)
    }

    /// Register the callback fired when the client disconnects.
    ///
    /// Replaces any previous hook. Ignored once the adapter is closed.
    pub fn on_close(&self, hook: CloseHook) {
        if self.is_closed() {
            return;
        }
        match self.on_close.lock() {
            Ok(mut slot) => *slot = Some(hook),
            Err(e) => tracing::error!("Close hook lock poisoned: {e}"),
        }
    }

    /// Report that the client side went away. Fires the close hook at most once.
    pub fn notify_disconnected(&self) {
        let hook = match self.on_close.lock() {
            Ok(mut slot) => slot.take(),
            Err(e) => {
                tracing::error!("Close hook lock poisoned: {e}");
                None
            }
        };
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Close the transport. Idempotent.
    ///
    /// Ends any open push stream, discards buffered messages and drops the
    /// close hook without firing it.
    pub fn close(&self) -> McpResult<()> {
        self.closed.cancel();
        let hook = lock(&self.on_close)?.take();
        drop(hook);
        lock(&self.push_rx)?.take();
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Stop admitting messages and end the push stream.
    ///
    /// Forwards still waiting for their turn return `SessionClosed`.
    pub fn stop_accepting(&self) {
        self.closed.cancel();
    }

    /// Wait until the message being handled, if any, has finished.
    pub async fn drain(&self) {
        let _turn = self.inflight.lock().await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> McpResult<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| McpError::InternalError(format!("transport lock poisoned: {e}")))
}

/// Fires the adapter's close hook when the push stream is dropped.
struct StreamGuard {
    adapter: Weak<TransportAdapter>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Some(adapter) = self.adapter.upgrade() {
            tracing::debug!(
                "Push stream dropped for session {}",
                adapter
                    .session_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default()
            );
            adapter.notify_disconnected();
        }
    }
}
