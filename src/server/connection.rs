//! Module `connection`
//!
//! Per-connection tasks. Each accepted connection runs a reader, a writer,
//! and a keepalive prober, all bound to one cancellation token. Every
//! terminal event converges on [`Dispatcher::disconnect`], which cancels
//! the token and so stops the other two tasks.

use bytes::Bytes;
use futures::StreamExt;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::dispatch::{Dispatcher, run_keepalive};
use crate::protocol::{Address, Frame, FrameCodec};
use crate::registry::ConnectionId;
use crate::session::SessionHandler;

/// Splits the stream and spawns the reader, writer, and keepalive tasks.
///
/// `outbound` must be the receiving side of the queue registered for `id`.
pub fn spawn_connection_tasks(
    stream: TcpStream,
    outbound: mpsc::Receiver<Bytes>,
    id: ConnectionId,
    peer: Address,
    session: SessionHandler,
    config: &RelayConfig,
    shutdown: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", peer, e);
    }
    let (read_half, write_half) = stream.into_split();
    let dispatcher = session.dispatcher().clone();

    tokio::spawn(run_writer(
        write_half,
        outbound,
        dispatcher.clone(),
        id,
        shutdown.clone(),
    ));
    tokio::spawn(run_keepalive(
        dispatcher,
        id,
        config.keepalive_interval(),
        shutdown.clone(),
    ));
    tokio::spawn(run_reader(
        read_half,
        session,
        id,
        peer,
        FrameCodec::new(config.max_payload_len),
        config.read_timeout(),
        shutdown,
    ));
}

/// Decodes frames from the peer and hands them to the session handler.
///
/// A read timeout only gives the loop a chance to observe cancellation;
/// end of stream or a read error disconnects.
async fn run_reader(
    read_half: OwnedReadHalf,
    session: SessionHandler,
    id: ConnectionId,
    peer: Address,
    codec: FrameCodec,
    read_timeout: Duration,
    shutdown: CancellationToken,
) {
    let mut frames = FramedRead::new(read_half, codec);

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = tokio::time::timeout(read_timeout, frames.next()) => next,
        };

        match next {
            Err(_) => {
                if frames.decoder().is_mid_frame() {
                    debug!("Timeout for {} with a partial frame", peer);
                }
            }
            Ok(None) => {
                info!("Connection closed by client {}", peer);
                break;
            }
            Ok(Some(Err(e))) => {
                warn!("Failed to read from {}: {}", peer, e);
                break;
            }
            Ok(Some(Ok(raw))) => {
                session.handle(id, peer, Frame::from_client(raw)).await;
            }
        }
    }

    session.dispatcher().disconnect(id).await;
    debug!("Reader for {} stopped", id);
}

/// Drains the outbound queue into the socket.
async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    dispatcher: Dispatcher,
    id: ConnectionId,
    shutdown: CancellationToken,
) {
    loop {
        let wire = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            wire = outbound.recv() => match wire {
                Some(wire) => wire,
                None => break,
            },
        };

        let written = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            written = write_half.write_all(&wire) => written,
        };
        if let Err(e) = written {
            warn!("Failed to write to {}: {}", id, e);
            dispatcher.disconnect(id).await;
            break;
        }
    }

    let _ = write_half.shutdown().await;
    debug!("Writer for {} stopped", id);
}
