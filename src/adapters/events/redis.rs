//! Redis pub/sub event bus.
//!
//! Channels are `board:{board_id}`; every server process publishes
//! committed mutations to its board's channel and runs one `PSUBSCRIBE
//! board:*` reader that forwards received envelopes to the local room
//! registry. Delivery is at-most-once: Redis pub/sub does not buffer for
//! absent subscribers, and a client that misses an event reconciles on
//! its next full board fetch.
//!
//! The bus is an explicitly-constructed resource with an explicit
//! [`RedisEventBus::shutdown`]; connections are owned here, not by
//! process-wide singletons.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::RedisConfig;
use crate::domain::board::EventEnvelope;
use crate::domain::foundation::BoardId;
use crate::ports::{
    board_channel, parse_board_channel, BoardEventHandler, BusError, EventPublisher,
    EventSubscriber, BOARD_CHANNEL_PATTERN,
};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// How one reader connection ended.
enum ReaderExit {
    Shutdown,
    Disconnected,
}

/// Redis implementation of the event bus ports.
pub struct RedisEventBus {
    client: redis::Client,
    publisher: MultiplexedConnection,
    shutdown_tx: watch::Sender<bool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl RedisEventBus {
    /// Connects to Redis and prepares the publish connection.
    ///
    /// The subscriber connection is opened lazily by
    /// [`EventSubscriber::subscribe`]; pub/sub requires a dedicated
    /// connection separate from the publisher.
    pub async fn connect(config: &RedisConfig) -> Result<Self, BusError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|err| BusError::Connection(err.to_string()))?;

        let publisher = tokio::time::timeout(
            config.connect_timeout(),
            client.get_multiplexed_tokio_connection(),
        )
        .await
        .map_err(|_| BusError::Connection("connect timed out".to_string()))?
        .map_err(|err| BusError::Connection(err.to_string()))?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            client,
            publisher,
            shutdown_tx,
            reader: Mutex::new(None),
        })
    }

    /// Stops the reader task and refuses further publishes.
    ///
    /// Idempotent; awaits the reader so no envelope is half-processed
    /// when this returns.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.reader.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::warn!("Bus reader task ended abnormally: {}", err);
            }
        }
    }

    async fn run_reader(
        client: redis::Client,
        handler: Arc<dyn BoardEventHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            if *shutdown.borrow() {
                break;
            }

            match Self::read_until_closed(&client, handler.as_ref(), &mut shutdown).await {
                Ok(ReaderExit::Shutdown) => break,
                Ok(ReaderExit::Disconnected) => {
                    tracing::warn!("Bus subscriber connection closed, reconnecting");
                    backoff = INITIAL_BACKOFF;
                }
                Err(err) => {
                    tracing::warn!("Bus subscriber error, reconnecting: {}", err);
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = next_backoff(backoff);
        }
        tracing::debug!("Bus reader stopped");
    }

    async fn read_until_closed(
        client: &redis::Client,
        handler: &dyn BoardEventHandler,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<ReaderExit, redis::RedisError> {
        let connection = client.get_async_connection().await?;
        let mut pubsub = connection.into_pubsub();
        pubsub.psubscribe(BOARD_CHANNEL_PATTERN).await?;
        tracing::info!(pattern = BOARD_CHANNEL_PATTERN, "Subscribed to board channels");

        let mut stream = pubsub.on_message();
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(ReaderExit::Shutdown),
                message = stream.next() => {
                    match message {
                        Some(message) => Self::dispatch(handler, message).await,
                        None => return Ok(ReaderExit::Disconnected),
                    }
                }
            }
        }
    }

    async fn dispatch(handler: &dyn BoardEventHandler, message: redis::Msg) {
        let channel = message.get_channel_name().to_string();
        let Some(board_id) = parse_board_channel(&channel) else {
            tracing::warn!(channel = %channel, "Ignoring message on unrecognized channel");
            return;
        };

        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(channel = %channel, "Failed to read message payload: {}", err);
                return;
            }
        };

        match serde_json::from_str::<EventEnvelope>(&payload) {
            Ok(envelope) => {
                tracing::debug!(
                    board_id = %board_id,
                    event = envelope.event.name(),
                    handler = handler.name(),
                    "Delivering bus event"
                );
                handler.handle(board_id, envelope).await;
            }
            Err(err) => {
                tracing::warn!(channel = %channel, "Discarding undecodable event: {}", err);
            }
        }
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, board_id: &BoardId, envelope: EventEnvelope) -> Result<(), BusError> {
        if *self.shutdown_tx.borrow() {
            return Err(BusError::ShutDown);
        }

        let payload =
            serde_json::to_string(&envelope).map_err(|err| BusError::Encoding(err.to_string()))?;

        let mut connection = self.publisher.clone();
        connection
            .publish::<_, _, ()>(board_channel(board_id), payload)
            .await
            .map_err(|err| BusError::Connection(err.to_string()))
    }
}

#[async_trait]
impl EventSubscriber for RedisEventBus {
    async fn subscribe(&self, handler: Arc<dyn BoardEventHandler>) -> Result<(), BusError> {
        let mut reader = self.reader.lock().await;
        if reader.is_some() {
            return Err(BusError::Connection(
                "subscriber already running".to_string(),
            ));
        }

        let client = self.client.clone();
        let shutdown = self.shutdown_tx.subscribe();
        *reader = Some(tokio::spawn(Self::run_reader(client, handler, shutdown)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let first = next_backoff(INITIAL_BACKOFF);
        assert_eq!(first, Duration::from_millis(200));

        let mut backoff = INITIAL_BACKOFF;
        for _ in 0..10 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_BACKOFF);
    }
}
