//! TCP acceptor: one session task per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::session::{self, Session, SessionContext};

/// Listening QT server.
///
/// Sessions are not capped: every accepted connection gets its own task. Admission
/// control, if ever needed, belongs in [`QtServer::run`] before the spawn.
pub struct QtServer {
    listener: TcpListener,
    context: Arc<SessionContext>,
    active_sessions: Arc<AtomicUsize>,
}

impl QtServer {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr, context: SessionContext) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            context: Arc::new(context),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever. Accept failures are logged and skipped.
    pub async fn run(self) -> Result<()> {
        info!("QT server listening on {}", self.local_addr()?);

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let context = Arc::clone(&self.context);
            let active_sessions = Arc::clone(&self.active_sessions);
            tokio::spawn(async move {
                let active = active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
                info!("Client connected: {} (active_sessions={})", peer_addr, active);

                handle_connection(stream, peer_addr, context).await;

                let active = active_sessions.fetch_sub(1, Ordering::SeqCst) - 1;
                info!("Client disconnected: {} (active_sessions={})", peer_addr, active);
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, context: Arc<SessionContext>) {
    let peer = peer_addr.to_string();
    let mut session = Session::new(context);
    match session::serve(stream, &peer, &mut session).await {
        Ok(()) => debug!("Session {} ended", peer),
        Err(Error::Io(e)) if is_disconnect(&e) => debug!("Client {} went away: {}", peer, e),
        Err(e) => warn!("Session {} ended with error: {}", peer, e),
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
    )
}
