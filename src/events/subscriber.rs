//! Background bridge from the Redis bus to the in-process event bus.
//!
//! One task per process subscribes to every registered channel and re-raises
//! decoded events on a local broadcast channel. Undecodable payloads are
//! logged and dropped. A lost connection is retried forever with doubling,
//! jittered delays.

use crate::events::channels;
use crate::events::envelope::{DomainEvent, EventEnvelope};
use anyhow::Context;
use metrics::counter;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

/// Capacity of the local in-process bus.
pub const LOCAL_BUS_CAPACITY: usize = 256;

const INITIAL_RETRY_DELAY_SECS: f64 = 1.0;
const MAX_RETRY_DELAY_SECS: f64 = 60.0;
const JITTER_PERCENT: f64 = 0.2;

/// Spawn the subscriber bridge. The task runs until the process exits.
pub fn spawn_subscriber(redis_url: String, bus: broadcast::Sender<DomainEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_with_reconnect(&redis_url, bus).await;
    })
}

async fn run_with_reconnect(redis_url: &str, bus: broadcast::Sender<DomainEvent>) {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if let Err(e) = run_subscription(redis_url, &bus).await {
            let delay = retry_delay(attempt);
            warn!(
                error = format!("{e:#}"),
                attempt,
                retry_delay_secs = delay.as_secs_f64(),
                "event subscription lost, reconnecting"
            );
            sleep(delay).await;

            // Keep the delay pinned near the cap without growing the counter
            // unboundedly.
            if attempt >= 16 {
                attempt = 8;
            }
        }
    }
}

fn retry_delay(attempt: u32) -> Duration {
    let doublings = attempt.saturating_sub(1).min(16);
    let base = INITIAL_RETRY_DELAY_SECS * 2f64.powi(doublings as i32);
    let capped = base.min(MAX_RETRY_DELAY_SECS);

    let jitter = (rand::random::<f64>() * 2.0 - 1.0) * capped * JITTER_PERCENT;
    Duration::from_secs_f64((capped + jitter).max(0.1))
}

async fn run_subscription(
    redis_url: &str,
    bus: &broadcast::Sender<DomainEvent>,
) -> anyhow::Result<()> {
    let client = redis::Client::open(redis_url).context("invalid Redis URL")?;
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .context("failed to open subscriber connection")?;

    for channel in channels::ALL {
        pubsub
            .subscribe(*channel)
            .await
            .with_context(|| format!("failed to subscribe to {channel}"))?;
    }
    info!(channels = ?channels::ALL, "event subscription established");

    let mut stream = pubsub.into_on_message();
    while let Some(msg) = stream.next().await {
        let channel = msg.get_channel_name().to_string();

        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(channel, error = %e, "event payload was not a UTF-8 string, dropping");
                counter!("patio_events_dropped_total", "channel" => channel).increment(1);
                continue;
            }
        };

        match EventEnvelope::from_json(&payload) {
            Ok(envelope) => {
                if envelope.channel != channel {
                    warn!(
                        channel,
                        addressed_to = envelope.channel,
                        "event arrived on a channel it was not addressed to"
                    );
                }
                counter!("patio_events_received_total", "channel" => channel).increment(1);
                // No local listeners is not an error.
                let _ = bus.send(envelope.payload);
            }
            Err(e) => {
                error!(channel, error = %e, "failed to decode event envelope, dropping");
                counter!("patio_events_dropped_total", "channel" => channel).increment(1);
            }
        }
    }

    anyhow::bail!("event subscription stream ended")
}
