//! Per-match broadcast channels behind the [`MatchNotifier`] seam.

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::{dto::sse::ServerEvent, state::versus::MatchCode};

/// A fan-out sink refused an event.
#[derive(Debug, Error)]
#[error("fan-out unavailable: {0}")]
pub struct NotifyError(pub String);

/// One-way, best-effort publication of match events.
pub trait MatchNotifier: Send + Sync {
    /// Push `event` to every subscriber of `code`, returning how many received it.
    fn publish(&self, code: &MatchCode, event: ServerEvent) -> Result<usize, NotifyError>;
}

/// Broadcast hub keyed by match code.
///
/// Channels are created on first subscription and dropped once no receiver is
/// left: subscribers call [`MatchHub::prune`] when they go away, and a publish
/// that reaches nobody prunes as well.
pub struct MatchHub {
    channels: DashMap<MatchCode, broadcast::Sender<ServerEvent>>,
    capacity: usize,
}

impl MatchHub {
    /// Construct a hub whose per-match channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber that will receive subsequent events for `code`.
    pub fn subscribe(&self, code: &MatchCode) -> broadcast::Receiver<ServerEvent> {
        self.channels
            .entry(code.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop the channel of `code` if its last receiver is gone.
    pub fn prune(&self, code: &MatchCode) {
        self.channels
            .remove_if(code, |_, sender| sender.receiver_count() == 0);
    }

    /// Matches that currently hold a channel.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Live subscribers of `code`.
    pub fn subscriber_count(&self, code: &MatchCode) -> usize {
        self.channels
            .get(code)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl MatchNotifier for MatchHub {
    fn publish(&self, code: &MatchCode, event: ServerEvent) -> Result<usize, NotifyError> {
        let delivered = match self.channels.get(code) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => return Ok(0),
        };

        if delivered == 0 {
            self.prune(code);
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> ServerEvent {
        ServerEvent {
            event: Some("match.state".into()),
            data: data.into(),
        }
    }

    #[tokio::test]
    async fn subscribers_only_see_their_match() {
        let hub = MatchHub::new(4);
        let first = MatchCode::parse("AAAAAA").unwrap();
        let second = MatchCode::parse("BBBBBB").unwrap();

        let mut rx_first = hub.subscribe(&first);
        let mut rx_second = hub.subscribe(&second);

        assert_eq!(hub.publish(&first, event("1")).unwrap(), 1);
        assert_eq!(rx_first.recv().await.unwrap(), event("1"));
        assert!(rx_second.try_recv().is_err());
    }

    #[test]
    fn publishing_without_listeners_drops_the_channel() {
        let hub = MatchHub::new(4);
        let code = MatchCode::parse("CCCCCC").unwrap();

        assert_eq!(hub.publish(&code, event("ignored")).unwrap(), 0);

        let receiver = hub.subscribe(&code);
        assert_eq!(hub.subscriber_count(&code), 1);
        drop(receiver);

        assert_eq!(hub.publish(&code, event("gone")).unwrap(), 0);
        assert_eq!(hub.subscriber_count(&code), 0);
    }

    #[test]
    fn departing_subscribers_release_the_channel() {
        let hub = MatchHub::new(4);
        let code = MatchCode::parse("DDDDDD").unwrap();

        let first = hub.subscribe(&code);
        let second = hub.subscribe(&code);
        drop(first);
        hub.prune(&code);
        assert_eq!(hub.channel_count(), 1);

        drop(second);
        hub.prune(&code);
        assert_eq!(hub.channel_count(), 0);
    }
}
