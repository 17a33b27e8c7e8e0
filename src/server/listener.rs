//! Hub WebSocket server
//!
//! Accepts TCP connections, performs the authenticated WebSocket upgrade and
//! runs one reader/writer task pair per connection. The credential travels in
//! the upgrade request (`Authorization: Bearer` header or `token` query
//! parameter) and is verified before the upgrade completes, so a refused
//! connection never touches the registry or any room.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};
use tokio_tungstenite::tungstenite::Message;

use crate::auth::{extract_token, Identity, JwtVerifier, TokenVerifier};
use crate::error::Result;
use crate::hub::DeviceHub;
use crate::server::config::ServerConfig;
use crate::session::{ConnectionHandle, ConnectionId, Session, SessionState};

/// WebSocket front door of the hub
pub struct HubServer {
    config: ServerConfig,
    hub: Arc<DeviceHub>,
    verifier: Arc<dyn TokenVerifier>,
    next_conn_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl HubServer {
    /// Create a server over an existing hub instance
    ///
    /// Verifies credentials with an HS256 verifier built from the config's
    /// shared secret.
    pub fn new(config: ServerConfig, hub: Arc<DeviceHub>) -> Self {
        let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));
        Self::with_verifier(config, hub, verifier)
    }

    /// Create a server with a custom credential verifier
    pub fn with_verifier(
        config: ServerConfig,
        hub: Arc<DeviceHub>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub,
            verifier,
            next_conn_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<DeviceHub> {
        &self.hub
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Hub server listening");
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Hub server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Accept connections on an already-bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let conn_id = ConnectionId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(conn = %conn_id, peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let hub = Arc::clone(&self.hub);
        let verifier = Arc::clone(&self.verifier);
        let config = self.config.clone();

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_connection(hub, verifier, config, conn_id, socket, peer_addr).await
            {
                tracing::debug!(conn = %conn_id, error = %e, "Connection error");
            }

            tracing::debug!(conn = %conn_id, "Connection closed");
        });
    }
}

/// Drive one connection from upgrade to teardown
async fn serve_connection(
    hub: Arc<DeviceHub>,
    verifier: Arc<dyn TokenVerifier>,
    config: ServerConfig,
    conn_id: ConnectionId,
    socket: TcpStream,
    peer_addr: SocketAddr,
) -> Result<()> {
    let mut state = SessionState::new(conn_id, peer_addr);

    // The upgrade callback runs verification so a bad credential is refused
    // with 401 before the WebSocket ever exists.
    let admitted: Arc<Mutex<Option<Identity>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&admitted);
    let callback = move |req: &Request, response: Response| {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let query_token = req
            .uri()
            .query()
            .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("token=")));

        match extract_token(authorization, query_token).and_then(|token| verifier.verify(token)) {
            Ok(identity) => {
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(identity);
                }
                Ok(response)
            }
            Err(e) => {
                let mut refusal = ErrorResponse::new(Some(e.to_string()));
                *refusal.status_mut() = StatusCode::UNAUTHORIZED;
                Err(refusal)
            }
        }
    };

    let upgrade = tokio::time::timeout(
        config.handshake_timeout,
        tokio_tungstenite::accept_hdr_async(socket, callback),
    )
    .await;

    let ws_stream = match upgrade {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            state.close();
            tracing::info!(conn = %conn_id, peer = %peer_addr, error = %e, "Handshake refused");
            return Ok(());
        }
        Err(_) => {
            state.close();
            tracing::info!(conn = %conn_id, peer = %peer_addr, "Handshake timed out");
            return Ok(());
        }
    };

    let Some(identity) = admitted.lock().ok().and_then(|mut slot| slot.take()) else {
        state.close();
        return Ok(());
    };
    state.authenticated();
    tracing::debug!(
        conn = %conn_id,
        user_id = %identity.id,
        handshake = ?state.connected_at.elapsed(),
        "Handshake complete"
    );

    let (outbound_tx, mut outbound_rx) = mpsc::channel(config.outbound_queue_capacity);
    let handle = ConnectionHandle::new(conn_id, identity, outbound_tx);
    hub.admit(&handle).await?;

    let (mut write, mut read) = ws_stream.split();

    // Writer task: drains the outbound queue onto the socket in FIFO order.
    // It ends when every sender (session, registry, rooms) is gone.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            match std::str::from_utf8(&frame.json) {
                Ok(text) => {
                    if write.send(Message::text(text.to_owned())).await.is_err() {
                        break;
                    }
                }
                Err(_) => continue, // frames come from serde_json, always UTF-8
            }
        }
        let _ = write.close().await;
    });

    let mut session = Session::new(handle, Arc::clone(&hub), state);

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {} // ping/pong handled by the protocol layer
        }
    }

    session.close().await;
    drop(session);
    let _ = writer.await;

    Ok(())
}
