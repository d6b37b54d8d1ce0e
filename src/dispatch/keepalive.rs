//! Module `keepalive`
//!
//! Periodic liveness probing for a single connection.

use log::{debug, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, RelayError};
use crate::protocol::Frame;
use crate::registry::ConnectionId;

/// Sends a `k` probe every `interval` until the connection is removed.
///
/// A closed queue or a missing registry entry runs the disconnect
/// procedure. A full queue only skips this probe: the writer is still
/// draining, and a dead socket surfaces through its write error. The task
/// exits as soon as `shutdown` is cancelled, whichever path cancelled it.
pub async fn run_keepalive(
    dispatcher: Dispatcher,
    id: ConnectionId,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let probe = Frame::Keepalive.to_raw();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match dispatcher.send_to(id, &probe).await {
            Ok(()) => {}
            Err(RelayError::Dispatch(DispatchError::QueueFull(_))) => {
                debug!("Outbound queue of {} is full, skipping keepalive", id);
            }
            Err(e) => {
                warn!("Keepalive to {} failed: {}", id, e);
                dispatcher.disconnect(id).await;
                break;
            }
        }
    }

    debug!("Keepalive for {} stopped", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Address;
    use crate::registry::{Entry, Registry};
    use bytes::Bytes;
    use std::sync::Arc;
    use tokio::sync::{Mutex, mpsc};
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(20);

    async fn setup(capacity: usize) -> (Dispatcher, ConnectionId, mpsc::Receiver<Bytes>, CancellationToken) {
        let dispatcher = Dispatcher::new(Arc::new(Mutex::new(Registry::new())));
        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();
        let id = {
            let mut registry = dispatcher.registry().lock().await;
            let id = registry.allocate_id();
            registry
                .register(id, Entry::new(Address::new([127, 0, 0, 2]), tx, shutdown.clone()))
                .unwrap();
            id
        };
        (dispatcher, id, rx, shutdown)
    }

    #[tokio::test]
    async fn test_sends_probes() {
        let (dispatcher, id, mut rx, shutdown) = setup(8).await;
        let task = tokio::spawn(run_keepalive(dispatcher, id, TICK, shutdown.clone()));

        let probe = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(&probe[..], b"k\x00\x00\x00\x00\x00");

        shutdown.cancel();
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_connection_removed() {
        let (dispatcher, id, _rx, shutdown) = setup(8).await;
        let task = tokio::spawn(run_keepalive(dispatcher.clone(), id, TICK, shutdown));

        assert!(dispatcher.disconnect(id).await);
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failed_probe_disconnects() {
        let (dispatcher, id, rx, shutdown) = setup(8).await;
        drop(rx);
        let task = tokio::spawn(run_keepalive(dispatcher.clone(), id, TICK, shutdown.clone()));

        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(shutdown.is_cancelled());
        assert!(!dispatcher.registry().lock().await.contains(id));
    }

    #[tokio::test]
    async fn test_full_queue_skips_probe_without_disconnect() {
        let (dispatcher, id, mut rx, shutdown) = setup(2).await;
        let chat = Frame::Chat {
            address: Address::new([127, 1, 1, 9]),
            text: Bytes::from_static(b"busy"),
        }
        .to_raw();
        dispatcher.send_to(id, &chat).await.unwrap();
        dispatcher.send_to(id, &chat).await.unwrap();

        let task = tokio::spawn(run_keepalive(dispatcher.clone(), id, TICK, shutdown.clone()));
        tokio::time::sleep(TICK * 5).await;

        assert!(!shutdown.is_cancelled());
        assert!(dispatcher.registry().lock().await.contains(id));
        assert_eq!(rx.len(), 2);

        // Once the backlog drains, probes resume.
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        let probe = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(&probe[..], b"k\x00\x00\x00\x00\x00");

        shutdown.cancel();
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }
}
