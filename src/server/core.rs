use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::dispatch::Dispatcher;
use crate::error::RelayError;
use crate::protocol::Address;
use crate::registry::{Entry, Registry};
use crate::server::connection::spawn_connection_tasks;
use crate::session::SessionHandler;

pub struct Server {
    listener: TcpListener,
    session: SessionHandler,
    config: Arc<RelayConfig>,
}

impl Server {
    /// Binds the listening socket described by `config`.
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        let socket = config.listen_socket();

        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e.into());
            }
        };

        let registry = Arc::new(Mutex::new(Registry::new()));
        Ok(Self {
            listener,
            session: SessionHandler::new(Dispatcher::new(registry)),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever.
    pub async fn run(self) {
        info!(
            "Starting chat relay on {} (max {} connections)",
            self.config.listen_socket(),
            self.config.max_connections
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let session = self.session.clone();
                    let config = Arc::clone(&self.config);

                    // Registration waits on the registry lock; keep the accept loop free
                    tokio::spawn(async move {
                        if let Err(e) = accept_connection(stream, addr, session, config).await {
                            warn!("Failed to accept client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Registers a new connection and starts its reader, writer, and keepalive tasks.
async fn accept_connection(
    stream: TcpStream,
    peer: SocketAddr,
    session: SessionHandler,
    config: Arc<RelayConfig>,
) -> Result<(), RelayError> {
    let address = Address::from_peer(&peer).ok_or(RelayError::UnsupportedPeer(peer))?;
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity);
    let shutdown = CancellationToken::new();

    let id = {
        let mut registry = session.dispatcher().registry().lock().await;
        if registry.len() >= config.max_connections {
            warn!(
                "Rejecting {}: {} connections already open",
                peer,
                registry.len()
            );
            return Ok(());
        }
        let id = registry.allocate_id();
        registry.register(id, Entry::new(address, outbound_tx, shutdown.clone()))?;
        info!(
            "New connection {} from {} ({}/{} connections)",
            id,
            address,
            registry.len(),
            config.max_connections
        );
        id
    };

    spawn_connection_tasks(stream, outbound_rx, id, address, session, &config, shutdown);
    Ok(())
}
