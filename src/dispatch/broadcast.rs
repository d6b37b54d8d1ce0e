//! Module `broadcast`
//!
//! Delivers frames to connections through their outbound queues and runs
//! the disconnect procedure shared by every teardown path.

use bytes::Bytes;
use log::{debug, error, info, trace};

use crate::error::{DispatchError, RelayError};
use crate::protocol::frame::hex_dump;
use crate::protocol::{Frame, RawFrame};
use crate::registry::{ConnectionId, Registry, SharedRegistry};

/// Sends frames to registered connections.
///
/// Frames are placed on each connection's bounded outbound queue while the
/// registry lock is held, so every connection observes broadcasts in the
/// order they were issued. A slow peer only fills its own queue.
#[derive(Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
}

impl Dispatcher {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Queues `frame` for every named connection and returns how many accepted it.
    ///
    /// A full or closed queue is skipped; the connection stays registered
    /// until its reader, writer, or keepalive path tears it down.
    pub async fn broadcast(&self, frame: &RawFrame) -> usize {
        let wire = match frame.encode() {
            Ok(wire) => wire,
            Err(e) => {
                error!("Refusing to broadcast: {}", e);
                return 0;
            }
        };
        debug!("Broadcasting: {}", Frame::from_server(frame.clone()));
        trace!("\t{}", hex_dump(&wire));

        let registry = self.registry.lock().await;
        fan_out(&registry, &wire)
    }

    /// Queues `frame` for a single connection, named or not.
    pub async fn send_to(&self, id: ConnectionId, frame: &RawFrame) -> Result<(), RelayError> {
        let wire = frame.encode()?;
        let registry = self.registry.lock().await;
        let entry = registry.get(id).ok_or(DispatchError::NotRegistered(id))?;
        entry.outbound().try_send(wire).map_err(|e| match e {
            tokio::sync::mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull(id),
            tokio::sync::mpsc::error::TrySendError::Closed(_) => DispatchError::QueueClosed(id),
        })?;
        Ok(())
    }

    /// Removes a connection and stops its tasks.
    ///
    /// Named connections produce one departure notice to the remaining named
    /// connections. Returns `false` if the connection was already gone, in
    /// which case nothing is sent.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut registry = self.registry.lock().await;
        let Some(entry) = registry.unregister(id) else {
            return false;
        };
        entry.shutdown().cancel();
        info!("Client {} ({}) disconnected", entry.address(), id);

        if entry.is_named() {
            let notice = Frame::Left {
                address: entry.address(),
            };
            match notice.to_raw().encode() {
                Ok(wire) => {
                    debug!("Broadcasting: {}", notice);
                    fan_out(&registry, &wire);
                }
                Err(e) => error!("Failed to encode departure notice: {}", e),
            }
        }
        true
    }
}

fn fan_out(registry: &Registry, wire: &Bytes) -> usize {
    let mut delivered = 0;
    for (id, entry) in registry.named() {
        match entry.outbound().try_send(wire.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => debug!("Skipping {} during broadcast: {}", id, e),
        }
    }
    delivered
}
