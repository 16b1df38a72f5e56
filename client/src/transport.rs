//! Message channel to the game server.
//!
//! A `Channel` is a pair of unbounded queues. For a real session the other end is a
//! WebSocket driven by two spawned tasks (reader and writer); for tests and local
//! tooling `Channel::in_memory` hands the other end to the caller directly. The frame
//! loop only ever touches the queues, so no network work happens on the game thread.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("channel closed")]
    Closed,
}

pub struct Channel {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    reader: Option<JoinHandle<()>>,
}

/// Server side of an in-memory channel.
pub struct RemoteEnd {
    pub to_client: mpsc::UnboundedSender<ServerMessage>,
    pub from_client: mpsc::UnboundedReceiver<ClientMessage>,
}

impl RemoteEnd {
    pub fn push(&self, message: ServerMessage) -> Result<(), TransportError> {
        self.to_client
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    /// Everything the client has sent so far.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        let mut received = Vec::new();
        while let Ok(message) = self.from_client.try_recv() {
            received.push(message);
        }
        received
    }
}

impl Channel {
    pub fn in_memory() -> (Channel, RemoteEnd) {
        let (outbound, from_client) = mpsc::unbounded_channel();
        let (to_client, inbound) = mpsc::unbounded_channel();
        (
            Channel {
                outbound,
                inbound,
                reader: None,
            },
            RemoteEnd {
                to_client,
                from_client,
            },
        )
    }

    pub fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    /// Next queued server message, `Ok(None)` when nothing is waiting.
    pub fn try_recv(&mut self) -> Result<Option<ServerMessage>, TransportError> {
        match self.inbound.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    /// Stops reading and lets the writer flush a close frame.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Re-emits every item `delay` after it arrived, preserving order.
///
/// Each item carries its own deadline, so a burst of items is delayed once as a whole
/// rather than once per item. A zero delay returns `input` untouched.
fn delay_queue<T: Send + 'static>(
    delay: Duration,
    mut input: mpsc::UnboundedReceiver<T>,
) -> mpsc::UnboundedReceiver<T> {
    if delay.is_zero() {
        return input;
    }

    let (stamped_tx, mut stamped_rx) = mpsc::unbounded_channel::<(Instant, T)>();
    let (output_tx, output) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(item) = input.recv().await {
            if stamped_tx.send((Instant::now() + delay, item)).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some((deadline, item)) = stamped_rx.recv().await {
            sleep_until(deadline).await;
            if output_tx.send(item).is_err() {
                break;
            }
        }
    });

    output
}

/// Opens a WebSocket session. Must be called from within a tokio runtime.
///
/// `fake_ping` delays every frame by half its value in each direction.
pub async fn connect(endpoint: &str, fake_ping: Duration) -> Result<Channel, TransportError> {
    let (stream, _) = connect_async(endpoint)
        .await
        .map_err(|source| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
    info!("Connected to {}", endpoint);
    if !fake_ping.is_zero() {
        info!("Simulating {}ms latency", fake_ping.as_millis());
    }

    let (mut sink, mut source) = stream.split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let half_ping = fake_ping / 2;
    let mut outbound_rx = delay_queue(half_ping, outbound_rx);
    let inbound = delay_queue(half_ping, inbound_rx);

    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = match message.encode() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {}: {}", message.kind(), e);
                    continue;
                }
            };

            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!("Failed to send {}: {}", message.kind(), e);
                break;
            }
        }

        let _ = sink.close().await;
        debug!("Writer task finished");
    });

    let reader = tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    match ServerMessage::decode(&text) {
                        Ok(message) => {
                            if inbound_tx.send(message).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping undecodable frame: {}", e),
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!("Server closed the connection: {:?}", frame);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Connection error: {}", e);
                    break;
                }
            }
        }
        debug!("Reader task finished");
    });

    Ok(Channel {
        outbound,
        inbound,
        reader: Some(reader),
    })
}
