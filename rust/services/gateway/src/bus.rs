//! In-process event bus
//!
//! Pub/sub partitioned by run id. Each run gets its own bounded
//! `tokio::sync::broadcast` channel: delivery to subscribers is best-effort,
//! and a slow sink lags and skips rather than blocking producers or peers.
//! Subscribers joining mid-run receive only events published after they
//! joined; there is no replay.
//!
//! The registry mutex is the only cross-client shared state and is held for
//! O(subscriptions) work only, never across an await point.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Buffered events per run before slow subscribers start lagging
const CHANNEL_CAPACITY: usize = 256;

/// Per-run broadcast fan-out for live run events
#[derive(Clone, Default)]
pub struct EventBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Value>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a run's events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, run_id: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.lock().expect("bus registry poisoned");
        channels
            .entry(run_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Broadcast an event to the run's current subscribers.
    ///
    /// Returns how many subscribers received it. Events for runs nobody
    /// watches are dropped; senders whose last receiver is gone are pruned.
    pub fn broadcast(&self, run_id: &str, event: Value) -> usize {
        let mut channels = self.channels.lock().expect("bus registry poisoned");
        let Some(sender) = channels.get(run_id) else {
            return 0;
        };
        match sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                // No receivers left; drop the channel entry.
                channels.remove(run_id);
                0
            }
        }
    }

    /// Number of runs with at least one live channel (for tests/diagnostics)
    pub fn channel_count(&self) -> usize {
        self.channels.lock().expect("bus registry poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("run_1");

        for i in 0..5 {
            bus.broadcast("run_1", json!({"event": "step.log", "line": i}));
        }

        for i in 0..5 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event["line"], i);
        }
    }

    #[tokio::test]
    async fn test_events_are_partitioned_by_run() {
        let bus = EventBus::new();
        let mut rx_one = bus.subscribe("run_1");
        let mut rx_two = bus.subscribe("run_2");

        bus.broadcast("run_1", json!({"run_id": "run_1"}));
        bus.broadcast("run_2", json!({"run_id": "run_2"}));

        assert_eq!(rx_one.recv().await.unwrap()["run_id"], "run_1");
        assert_eq!(rx_two.recv().await.unwrap()["run_id"], "run_2");
        assert!(rx_one.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.broadcast("run_1", json!({})), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let bus = EventBus::new();
        let _early = bus.subscribe("run_1");
        bus.broadcast("run_1", json!({"seq": 1}));

        let mut late = bus.subscribe("run_1");
        bus.broadcast("run_1", json!({"seq": 2}));

        let event = late.recv().await.unwrap();
        assert_eq!(event["seq"], 2);
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_prunes_channel() {
        let bus = EventBus::new();
        let rx = bus.subscribe("run_1");
        assert_eq!(bus.channel_count(), 1);

        drop(rx);
        // First broadcast after the drop notices and prunes.
        assert_eq!(bus.broadcast("run_1", json!({})), 0);
        assert_eq!(bus.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_without_blocking() {
        let bus = EventBus::new();
        let mut slow = bus.subscribe("run_1");

        // Overflow the channel; the producer must never block.
        for i in 0..(CHANNEL_CAPACITY + 10) {
            bus.broadcast("run_1", json!({"seq": i}));
        }

        // The slow reader observes a lag error, then the surviving tail.
        match slow.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                assert!(skipped >= 10);
            }
            other => panic!("expected lag, got {other:?}"),
        }
        assert!(slow.recv().await.is_ok());
    }
}
