//! WebSocket transport.
//!
//! Plain TCP listener plus a tungstenite upgrade. The upgrade runs inside the
//! per-connection task so a slow client handshake never stalls the accept
//! loop. The handshake callback captures the request query, which carries
//! the client's claimed identity.

use std::net::SocketAddr;

use arena_proto::Handshake;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::handshake::server::{ErrorResponse, Request, Response},
};

use crate::error::ServerError;

/// Upgraded client connection.
pub type WsStream = WebSocketStream<TcpStream>;

/// TCP listener accepting WebSocket clients.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Bind a listener on `address`.
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("WebSocket transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Accept a raw TCP connection. The WebSocket upgrade is done by [`upgrade`].
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        Ok(self.listener.accept().await?)
    }

    /// Local address of the listener.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}

/// Complete the WebSocket upgrade and extract the handshake parameters.
pub async fn upgrade(stream: TcpStream) -> Result<(WsStream, Handshake), ServerError> {
    let mut query: Option<String> = None;

    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
            query = req.uri().query().map(str::to_string);
            Ok(response)
        },
    )
    .await?;

    Ok((ws, Handshake::from_query(query.as_deref())))
}
