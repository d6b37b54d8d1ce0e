//! Session handler for the relay.
//!
//! Interprets decoded client frames against registry state: the welcome
//! handshake, chat and typing forwarding, and online table requests.
//! Policy violations are dropped silently and only logged here.

use bytes::Bytes;
use log::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::error::RegistryError;
use crate::protocol::frame::MAX_MESSAGE_LEN;
use crate::protocol::{Address, Frame, TableEntry};
use crate::registry::ConnectionId;
use crate::session::results::{DropReason, SessionOutcome};

#[derive(Clone)]
pub struct SessionHandler {
    dispatcher: Dispatcher,
}

impl SessionHandler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatches a frame received on connection `id` from peer `peer`.
    ///
    /// # Arguments
    ///
    /// * `id` - Connection the frame arrived on.
    /// * `peer` - Server-known address of that connection. Address bytes
    ///   inside the frame are never used in its place.
    /// * `frame` - Frame decoded with [`Frame::from_client`].
    pub async fn handle(&self, id: ConnectionId, peer: Address, frame: Frame) -> SessionOutcome {
        debug!("Received from {}: {}", peer, frame);

        match frame {
            Frame::Welcome { name, .. } => self.handle_welcome(peer, name).await,
            Frame::Chat { text, .. } => {
                self.forward(peer, text.len(), Frame::Chat { address: peer, text })
                    .await
            }
            Frame::Typing { payload, .. } => {
                self.forward(peer, payload.len(), Frame::Typing { address: peer, payload })
                    .await
            }
            Frame::TableRequest => self.send_online_table(id).await,
            Frame::OnlineTable(_)
            | Frame::Joined { .. }
            | Frame::Left { .. }
            | Frame::Keepalive
            | Frame::Unknown(_) => SessionOutcome::Ignored,
        }
    }

    async fn handle_welcome(&self, peer: Address, name: Bytes) -> SessionOutcome {
        let target = self.dispatcher.registry().lock().await.find_by_address(peer);
        let Some(target) = target else {
            warn!("Welcome from unknown client {}", peer);
            return SessionOutcome::Dropped(DropReason::UnknownClient);
        };

        let named = self
            .dispatcher
            .registry()
            .lock()
            .await
            .set_name(target, name.clone());
        match named {
            Ok(()) => {}
            Err(RegistryError::NameTooLong { len, max }) => {
                warn!("Name of {} bytes from {} exceeds {} bytes", len, peer, max);
                return SessionOutcome::Dropped(DropReason::NameTooLong);
            }
            Err(e) => {
                warn!("Welcome from {} lost its connection: {}", peer, e);
                return SessionOutcome::Dropped(DropReason::UnknownClient);
            }
        }

        if peer.has_zero_octet() {
            // A 0x00 octet would terminate a table frame mid-payload.
            warn!("{} contains a zero octet and will be omitted from online tables", peer);
        }

        let joined = Frame::Joined {
            address: peer,
            name,
        };
        let recipients = self.dispatcher.broadcast(&joined.to_raw()).await;
        self.send_online_table(target).await;
        SessionOutcome::Joined { recipients }
    }

    async fn forward(&self, peer: Address, len: usize, frame: Frame) -> SessionOutcome {
        if len > MAX_MESSAGE_LEN {
            warn!("Message of {} bytes from {} exceeds {} bytes", len, peer, MAX_MESSAGE_LEN);
            return SessionOutcome::Dropped(DropReason::MessageTooLong);
        }
        let recipients = self.dispatcher.broadcast(&frame.to_raw()).await;
        SessionOutcome::Forwarded { recipients }
    }

    /// Queues the current online table for connection `id` only.
    pub async fn send_online_table(&self, id: ConnectionId) -> SessionOutcome {
        let entries: Vec<TableEntry> = self
            .dispatcher
            .registry()
            .lock()
            .await
            .snapshot()
            .into_iter()
            .filter(|entry| !entry.address.has_zero_octet())
            .collect();

        let table = Frame::OnlineTable(entries);
        debug!("Sending to {}: {}", id, table);
        match self.dispatcher.send_to(id, &table.to_raw()).await {
            Ok(()) => SessionOutcome::TableSent,
            Err(e) => {
                debug!("Online table for {} not delivered: {}", id, e);
                SessionOutcome::Dropped(DropReason::Undeliverable)
            }
        }
    }
}
