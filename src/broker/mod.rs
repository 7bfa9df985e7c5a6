//! AMQP broker: the process's only I/O boundary with the outside world.
//! Owns a single topic exchange and the two durable queues named in
//! `config::defaults`, a consumer loop gated by a single in-flight busy
//! flag, and a publishing loop draining the coordinator's event channel
//! onto the response queue.
//!
//! `lapin` is an async client; the rest of this crate is synchronous
//! thread-and-channel code, so the broker gets its own single-threaded
//! Tokio runtime on a dedicated OS thread. `tokio-executor-trait`/
//! `tokio-reactor-trait` bridge that runtime into
//! `lapin::ConnectionProperties` — lapin doesn't pick up an ambient Tokio
//! context automatically.

pub mod instance_lock;

use crate::config::{self, defaults};
use crate::coordinator::{Coordinator, CoordinatorEvent, CoordinatorEventReceiver};
use crate::dispatch;
use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_executor_trait::Tokio as TokioExecutor;
use tokio_reactor_trait::Tokio as TokioReactor;

/// Runs the broker to completion: forever, barring a fatal transport
/// error on the initial attach, which is logged and ends the process.
pub struct BrokerServer {
    coordinator: Arc<Coordinator>,
    events_rx: CoordinatorEventReceiver,
    busy: Arc<AtomicBool>,
}

impl BrokerServer {
    pub fn new(coordinator: Arc<Coordinator>, events_rx: CoordinatorEventReceiver) -> Self {
        Self {
            coordinator,
            events_rx,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Blocks the calling thread for the lifetime of the process.
    pub fn run(self, host: &str, port: u16) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build broker runtime")?;
        runtime.block_on(self.run_async(host, port))
    }

    async fn run_async(self, host: &str, port: u16) -> Result<()> {
        let settings = config::get();
        let channel = connect_with_retries(host, port).await?;
        declare_topology(&channel, &settings.broker).await?;
        tracing::info!(%host, port, "broker attached and topology declared");

        let publisher = tokio::spawn(publish_loop(
            channel.clone(),
            self.events_rx,
            settings.broker.response_routing_key.clone(),
            settings.broker.publish_max_attempts,
            settings.broker.publish_retry_secs,
        ));

        consume_loop(&channel, &self.coordinator, &self.busy, &settings.broker).await?;
        publisher.abort();
        Ok(())
    }
}

/// Bounded reconnect: `CONNECT_MAX_ATTEMPTS` attempts spaced
/// `CONNECT_BACKOFF_SECS` apart, then a fatal exit.
async fn connect_with_retries(host: &str, port: u16) -> Result<Channel> {
    let settings = &config::get().broker;
    let uri = format!(
        "amqp://{}:{}@{host}:{port}/%2f",
        settings.username, settings.password
    );
    let props = ConnectionProperties::default()
        .with_executor(TokioExecutor::current())
        .with_reactor(TokioReactor::current());

    let mut last_err = None;
    for attempt in 1..=settings.connect_max_attempts {
        match Connection::connect(&uri, props.clone()).await {
            Ok(connection) => {
                return connection
                    .create_channel()
                    .await
                    .context("failed to open AMQP channel");
            }
            Err(err) => {
                tracing::warn!(attempt, %err, "broker connection attempt failed");
                last_err = Some(err);
                if attempt < settings.connect_max_attempts {
                    tokio::time::sleep(Duration::from_secs(settings.connect_backoff_secs)).await;
                }
            }
        }
    }
    Err(anyhow::anyhow!(
        "could not connect to broker after {} attempts: {:?}",
        settings.connect_max_attempts,
        last_err
    ))
}

async fn declare_topology(
    channel: &Channel,
    settings: &config::BrokerSettings,
) -> Result<()> {
    channel
        .exchange_declare(
            &settings.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("failed to declare topic exchange")?;

    for (queue, routing_key) in [
        (&settings.command_queue, &settings.command_routing_key),
        (&settings.response_queue, &settings.response_routing_key),
    ] {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to declare queue {queue}"))?;
        channel
            .queue_bind(
                queue,
                &settings.exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to bind queue {queue}"))?;
    }
    Ok(())
}

/// Consumes the command queue one message at a time, gated by `busy` so at
/// most one command is in flight at once. While busy, the consumer parks
/// for `BUSY_YIELD_MS` instead of acking a second message, which is the
/// back-pressure mechanism — the broker itself holds unacked messages
/// rather than queueing them internally.
async fn consume_loop(
    channel: &Channel,
    coordinator: &Arc<Coordinator>,
    busy: &Arc<AtomicBool>,
    settings: &config::BrokerSettings,
) -> Result<()> {
    let mut consumer = channel
        .basic_consume(
            &settings.command_queue,
            "shipnetsim-core",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("failed to start consuming the command queue")?;

    loop {
        if busy.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(settings.busy_yield_ms)).await;
            continue;
        }

        let next = tokio::time::timeout(
            Duration::from_millis(settings.consume_poll_ms),
            consumer.next(),
        )
        .await;

        let delivery = match next {
            Ok(Some(Ok(delivery))) => delivery,
            Ok(Some(Err(err))) => {
                tracing::error!(%err, "error reading from command queue");
                continue;
            }
            Ok(None) => {
                tracing::warn!("command queue consumer stream ended");
                return Ok(());
            }
            Err(_) => continue,
        };

        busy.store(true, Ordering::SeqCst);
        let coordinator = Arc::clone(coordinator);
        let busy_guard = BusyGuard(Arc::clone(busy));
        let body = delivery.data.clone();

        if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
            tracing::warn!(%err, "failed to ack inbound command");
        }

        // Dispatch runs synchronously on a blocking thread: it may invoke
        // a World's worker queue and wait for the reply, which must not
        // stall the broker's async reactor.
        let result = tokio::task::spawn_blocking(move || {
            dispatch::dispatch(&coordinator, &body);
        })
        .await;
        if let Err(err) = result {
            tracing::error!(%err, "dispatch task panicked");
        }
        drop(busy_guard);
    }
}

/// Releases the busy flag on every exit path out of the consume loop body.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drains the coordinator's event channel and publishes each event to the
/// response queue, retrying a failed publish up to `max_attempts` times
/// before logging it and moving on.
async fn publish_loop(
    channel: Channel,
    events_rx: CoordinatorEventReceiver,
    routing_key: String,
    max_attempts: u32,
    retry_secs: u64,
) {
    loop {
        let event = match tokio::task::spawn_blocking({
            let events_rx = events_rx.clone();
            move || events_rx.recv_timeout(Duration::from_millis(defaults::CONSUME_POLL_MS))
        })
        .await
        {
            Ok(Ok(event)) => event,
            Ok(Err(_timeout_or_disconnect)) => continue,
            Err(err) => {
                tracing::error!(%err, "event-channel poll task panicked");
                continue;
            }
        };

        let payload = to_wire_json(event);
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(%err, "failed to serialize outbound event");
                continue;
            }
        };

        publish_with_retry(&channel, &routing_key, &bytes, max_attempts, retry_secs).await;
    }
}

async fn publish_with_retry(
    channel: &Channel,
    routing_key: &str,
    bytes: &[u8],
    max_attempts: u32,
    retry_secs: u64,
) {
    for attempt in 1..=max_attempts {
        let result = channel
            .basic_publish(
                &config::get().broker.exchange,
                routing_key,
                BasicPublishOptions::default(),
                bytes,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await;
        match result {
            Ok(confirm) => match confirm.await {
                Ok(_) => return,
                Err(err) => tracing::warn!(attempt, %err, "publish confirmation failed"),
            },
            Err(err) => tracing::warn!(attempt, %err, "publish attempt failed"),
        }
        if attempt < max_attempts {
            tokio::time::sleep(Duration::from_secs(retry_secs)).await;
        }
    }
    tracing::error!("dropping outbound event after exhausting publish retries");
}

fn per_world_array<T>(worlds: Vec<(String, T)>, value_key: &str, to_value: impl Fn(T) -> Value) -> Value {
    Value::Array(
        worlds
            .into_iter()
            .map(|(name, value)| json!({ "networkName": name, value_key: to_value(value) }))
            .collect(),
    )
}

/// Translates one coordinator event into its wire envelope.
/// The spec's event list is illustrative, not exhaustive; aggregated
/// (barrier/immediate) events are rendered here as a `"results"` array of
/// per-world objects rather than flattened singular fields, so the shape
/// is the same whether one world or many reported (DESIGN.md).
fn to_wire_json(event: CoordinatorEvent) -> Value {
    let host = defaults::HOST_ID;
    match event {
        CoordinatorEvent::ConnectionStatus { connected } => json!({
            "event": "connectionStatus",
            "status": if connected { "connected" } else { "disconnected" },
            "host": host,
        }),
        CoordinatorEvent::NetworkLoaded { world } => json!({
            "event": "simulationNetworkLoaded",
            "networkName": world,
            "host": host,
        }),
        CoordinatorEvent::Created { world } => json!({
            "event": "simulationCreated",
            "networkName": world,
            "host": host,
        }),
        CoordinatorEvent::ShipsAdded { world, ship_ids } => json!({
            "event": "shipAddedToSimulator",
            "networkName": world,
            "shipIDs": ship_ids,
            "host": host,
        }),
        CoordinatorEvent::Paused { worlds } => json!({
            "event": "simulationsPaused",
            "networkNames": worlds,
            "host": host,
        }),
        CoordinatorEvent::Resumed { worlds } => json!({
            "event": "simulationsResumed",
            "networkNames": worlds,
            "host": host,
        }),
        CoordinatorEvent::Terminated { worlds } => json!({
            "event": "simulationsTerminated",
            "networkNames": worlds,
            "host": host,
        }),
        CoordinatorEvent::Restarted { worlds } => json!({
            "event": "simulationsRestarted",
            "networkNames": worlds,
            "host": host,
        }),
        CoordinatorEvent::Advanced { worlds } => json!({
            "event": "simulationAdvanced",
            "networkNamesTimes": worlds.iter().map(|(n, clock, _)| json!({"networkName": n, "clock": clock})).collect::<Vec<_>>(),
            "networkNamesProgress": worlds.into_iter().map(|(n, _, percent)| json!({"networkName": n, "progress": percent})).collect::<Vec<_>>(),
            "host": host,
        }),
        CoordinatorEvent::ProgressUpdated { world, percent } => json!({
            "event": "simulationProgressUpdate",
            "networkName": world,
            "newProgress": percent,
            "host": host,
        }),
        CoordinatorEvent::AllReachedDestination { world } => json!({
            "event": "shipReachedDestination",
            "networkName": world,
            "state": "allReachedDestination",
            "host": host,
        }),
        CoordinatorEvent::ResultsAvailable { worlds } => {
            let results = per_world_array(worlds, "shipResults", |results| {
                results.to_json().unwrap_or_else(|err| {
                    json!({ "error": err.to_string() })
                })
            });
            json!({
                "event": "simulationResultsAvailable",
                "results": results,
                "host": host,
            })
        }
        CoordinatorEvent::PortsAvailable { worlds } => json!({
            "event": "networkSeaPortsAvailable",
            "results": per_world_array(worlds, "seaPorts", Value::from),
            "host": host,
        }),
        CoordinatorEvent::CurrentResults { worlds } => json!({
            "event": "currentResultsAvailable",
            "results": per_world_array(worlds, "summaryData", |kv: Vec<(String, String)>| {
                Value::Array(kv.into_iter().map(|(k, v)| json!({ k: v })).collect())
            }),
            "host": host,
        }),
        CoordinatorEvent::CurrentState {
            world,
            clock,
            progress_percent,
            ship_ids,
        } => json!({
            "event": "currentState",
            "networkName": world,
            "clock": clock,
            "progress": progress_percent,
            "shipIDs": ship_ids,
            "host": host,
        }),
        CoordinatorEvent::ShipState {
            world,
            ship_id,
            position,
            speed,
            reached_destination,
        } => json!({
            "event": "shipState",
            "networkName": world,
            "shipID": ship_id,
            "position": { "lon": position.0, "lat": position.1 },
            "speed": speed,
            "reachedDestination": reached_destination,
            "host": host,
        }),
        CoordinatorEvent::ServerReset => json!({
            "event": "serverReset",
            "host": host,
        }),
        CoordinatorEvent::Error { message } => json!({
            "event": "errorOccurred",
            "errorMessage": message,
            "host": host,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_status_serializes_with_host() {
        let value = to_wire_json(CoordinatorEvent::ConnectionStatus { connected: true });
        assert_eq!(value["event"], "connectionStatus");
        assert_eq!(value["status"], "connected");
        assert_eq!(value["host"], defaults::HOST_ID);
    }

    #[test]
    fn error_event_carries_the_message() {
        let value = to_wire_json(CoordinatorEvent::Error {
            message: "boom".to_string(),
        });
        assert_eq!(value["event"], "errorOccurred");
        assert_eq!(value["errorMessage"], "boom");
    }

    #[test]
    fn paused_lists_every_world() {
        let value = to_wire_json(CoordinatorEvent::Paused {
            worlds: vec!["A".to_string(), "B".to_string()],
        });
        assert_eq!(value["networkNames"], json!(["A", "B"]));
    }
}
