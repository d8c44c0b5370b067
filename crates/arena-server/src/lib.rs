//! Arena room-synchronization server.
//!
//! Coordinates rooms of collaborators editing a shared buffer: who is in each
//! room, which language the room is set to, and relaying buffer and chat
//! updates between members. Rooms exist only while someone is in them.
//!
//! # Architecture
//!
//! The [`ServerDriver`] is pure logic in the Sans-IO style: it consumes
//! [`ServerEvent`]s and returns [`ServerAction`]s. [`Server`] is the
//! production glue that drives it from WebSocket connections on a Tokio
//! runtime and executes the resulting actions.
//!
//! # Components
//!
//! - [`gateway`]: resolves the identity a connection claims at handshake
//! - [`RoomRegistry`]: room membership and language, created on first join and
//!   deleted on last leave
//! - [`MemberList`]: presence snapshots broadcast on every membership change
//! - [`ServerDriver`]: event router; disconnect reconciliation lives alongside
//!   it
//! - [`ConnectionRegistry`]: session to room fan-out bookkeeping
//! - [`WebSocketTransport`]: TCP listener and WebSocket upgrade

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
pub mod gateway;
mod presence;
mod reconciler;
mod registry;
mod rooms;
mod server_error;
mod transport;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

pub use driver::{DriverConfig, LogLevel, ServerAction, ServerDriver, ServerEvent};
pub use error::ServerError;
use futures_util::{SinkExt, StreamExt};
pub use gateway::{Connection, ConnectionError};
pub use presence::MemberList;
pub use registry::{ConnectionRegistry, SessionInfo};
pub use rooms::{DEFAULT_LANGUAGE, Removal, Room, RoomRegistry};
pub use server_error::DriverError;
use tokio::{
    net::TcpStream,
    sync::{Mutex, RwLock, mpsc, mpsc::error::TrySendError},
};
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
pub use transport::{WebSocketTransport, WsStream};

/// How long a peer-initiated close may take to complete.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for all connections.
///
/// Holds the outbound queue of every live session. Each queue is drained by
/// that session's writer task, so all messages to a client leave in the order
/// they were queued.
struct SharedState {
    /// Session ID → outbound message queue
    outbound: RwLock<HashMap<u64, mpsc::Sender<Message>>>,
    /// Next session ID to hand out
    next_session_id: AtomicU64,
    /// Capacity of each outbound queue
    outbound_buffer: usize,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
    /// Per-session outbound queue capacity. A full queue drops messages.
    pub outbound_buffer: usize,
    /// Driver configuration (limits, default language)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            outbound_buffer: 256,
            driver: DriverConfig::default(),
        }
    }
}

/// Production Arena server.
///
/// Wraps `ServerDriver` with the WebSocket transport.
pub struct Server {
    /// The action-based server driver
    driver: ServerDriver,
    /// TCP listener
    transport: WebSocketTransport,
    /// Per-session outbound queue capacity
    outbound_buffer: usize,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        if config.outbound_buffer == 0 {
            return Err(ServerError::Config("outbound buffer must be at least 1".to_string()));
        }

        let driver = ServerDriver::new(config.driver);
        let transport = WebSocketTransport::bind(&config.bind_address).await?;

        Ok(Self { driver, transport, outbound_buffer: config.outbound_buffer })
    }

    /// Run the server, accepting connections and processing events.
    ///
    /// This method runs until the server is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let driver = Arc::new(Mutex::new(self.driver));
        let shared = Arc::new(SharedState {
            outbound: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            outbound_buffer: self.outbound_buffer,
        });

        loop {
            match self.transport.accept().await {
                Ok((stream, peer)) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, driver, shared).await {
                            tracing::warn!("Connection error from {}: {}", peer, e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single WebSocket connection from upgrade to teardown.
///
/// Frames from one connection are processed strictly in arrival order.
/// `ConnectionClosed` is fed to the driver exactly once for every admitted
/// session, whether the peer closed cleanly or the transport failed.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    driver: Arc<Mutex<ServerDriver>>,
    shared: Arc<SharedState>,
) -> Result<(), ServerError> {
    let (ws, handshake) = transport::upgrade(stream).await?;
    let session_id = shared.next_session_id.fetch_add(1, Ordering::Relaxed);

    tracing::debug!("New connection {} from {}", session_id, peer);

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Message>(shared.outbound_buffer);

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = sink.send(message).await {
                tracing::debug!("Write failed for session {}: {}", session_id, e);
                return;
            }
            if closing {
                break;
            }
        }
        // Flushes any pending close reply; errors once the handshake is done.
        if let Err(e) = sink.close().await {
            tracing::trace!("Close for session {} finished: {}", session_id, e);
        }
    });

    shared.outbound.write().await.insert(session_id, tx);

    let admitted = {
        let mut driver = driver.lock().await;
        let result = driver.process_event(ServerEvent::ConnectionAccepted { session_id, handshake });
        match result {
            Ok(actions) => execute_actions(&driver, actions, &shared).await?,
            Err(e) => {
                shared.outbound.write().await.remove(&session_id);
                return Err(e.into());
            },
        }
        driver.registry().has_session(session_id)
    };

    if !admitted {
        shared.outbound.write().await.remove(&session_id);
        return Ok(());
    }

    let reason = loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => {
                let mut driver = driver.lock().await;
                let event = ServerEvent::FrameReceived { session_id, text: text.as_str().to_owned() };
                match driver.process_event(event) {
                    Ok(actions) => {
                        if let Err(e) = execute_actions(&driver, actions, &shared).await {
                            tracing::error!("Failed to execute actions: {}", e);
                        }
                    },
                    Err(e) => tracing::warn!("Frame processing error: {}", e),
                }
            },
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!("Dropping binary frame from session {}", session_id);
            },
            // tungstenite answers pings itself
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {},
            Some(Ok(Message::Close(_))) => {
                // tungstenite queues the close reply and flushes it on the
                // next read, so keep reading until the stream ends.
                let drain = async { while let Some(Ok(_)) = source.next().await {} };
                if tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, drain).await.is_err() {
                    tracing::debug!("Session {} did not finish the close handshake", session_id);
                }
                break "connection closed".to_string();
            },
            None => break "connection closed".to_string(),
            Some(Err(e)) => break format!("transport error: {e}"),
        }
    };

    shared.outbound.write().await.remove(&session_id);

    {
        let mut driver = driver.lock().await;
        let actions = driver.process_event(ServerEvent::ConnectionClosed { session_id, reason })?;
        execute_actions(&driver, actions, &shared).await?;
    }

    Ok(())
}

/// Execute server actions.
///
/// Broadcast targets are resolved against the driver's post-event state; the
/// caller holds the driver lock for the whole batch.
async fn execute_actions(
    driver: &ServerDriver,
    actions: Vec<ServerAction>,
    shared: &SharedState,
) -> Result<(), ServerError> {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, message } => {
                let text = message.encode()?;
                let outbound = shared.outbound.read().await;
                enqueue(&outbound, session_id, Message::text(text));
            },

            ServerAction::BroadcastToRoom { room_id, message, exclude_session } => {
                let sessions: Vec<u64> = driver
                    .sessions_in_room(&room_id)
                    .filter(|session_id| Some(*session_id) != exclude_session)
                    .collect();

                if sessions.is_empty() {
                    continue;
                }

                let text = message.encode()?;
                let outbound = shared.outbound.read().await;
                for session_id in sessions {
                    enqueue(&outbound, session_id, Message::text(text.clone()));
                }
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("Closing connection {}: {}", session_id, reason);
                let frame = CloseFrame { code: CloseCode::Policy, reason: reason.into() };
                let outbound = shared.outbound.read().await;
                enqueue(&outbound, session_id, Message::Close(Some(frame)));
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }

    Ok(())
}

/// Queue a message without waiting. Slow consumers lose messages rather than
/// stalling everyone else behind the driver lock.
fn enqueue(outbound: &HashMap<u64, mpsc::Sender<Message>>, session_id: u64, message: Message) {
    let Some(tx) = outbound.get(&session_id) else {
        tracing::debug!("Session {} has no outbound queue", session_id);
        return;
    };

    match tx.try_send(message) {
        Ok(()) => {},
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Outbound queue full for session {}, dropping message", session_id);
        },
        Err(TrySendError::Closed(_)) => {
            tracing::debug!("Writer for session {} already stopped", session_id);
        },
    }
}
