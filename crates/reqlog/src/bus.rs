//! Event bus connecting request event sources to the activity logger
//!
//! Sources publish [`RequestEvent`]s as requests start and finish; the
//! activity logger subscribes and renders them. Publishing is non-blocking
//! and tolerates having no subscribers, so instrumented traffic pays almost
//! nothing while logging is inactive.
//!
//! # Example
//!
//! ```rust
//! use reqlog::{EventBus, RequestDescriptor, RequestEvent, RequestId};
//!
//! # tokio_test::block_on(async {
//! let bus = EventBus::new();
//! let mut subscriber = bus.subscribe();
//!
//! bus.publish(RequestEvent::Started {
//!     id: RequestId(1),
//!     request: RequestDescriptor::new("GET", "https://api.example.com/users"),
//! });
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.id(), RequestId(1));
//! # });
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::events::{RequestEvent, RequestId};

/// Buffered events per subscriber before the oldest are dropped
const CHANNEL_CAPACITY: usize = 1024;

/// Typed pub/sub channel for request lifecycle events
///
/// Cloning is cheap; every clone publishes into the same channel and draws
/// request ids from the same sequence. Each subscriber receives every event
/// published after it subscribed.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<RequestEvent>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the default capacity (1024 events)
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a bus with a custom per-subscriber buffer capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate the next request id for events published on this bus
    ///
    /// The sequence is shared across clones, so independently constructed
    /// sources feeding the same logger never hand out the same id.
    pub fn allocate_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish an event to all current subscribers
    ///
    /// Non-blocking. With no subscribers the event is dropped; a slow
    /// subscriber loses the oldest buffered events rather than stalling the
    /// publisher.
    pub fn publish(&self, event: RequestEvent) {
        // Ignore errors - it's ok if there are no subscribers
        let _ = self.sender.send(event);
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RequestDescriptor, RequestId, RequestResult, ResponseSnapshot};

    #[tokio::test]
    async fn test_publish_subscribe_roundtrip() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.publish(RequestEvent::Started {
            id: RequestId(1),
            request: RequestDescriptor::new("GET", "https://example.com"),
        });

        let event = subscriber.recv().await.unwrap();
        match event {
            RequestEvent::Started { id, request } => {
                assert_eq!(id, RequestId(1));
                assert_eq!(request.method, "GET");
            }
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_event() {
        let bus = EventBus::new();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(RequestEvent::Finished {
            id: RequestId(9),
            result: RequestResult::Response(ResponseSnapshot::new(204)),
        });

        assert_eq!(sub1.recv().await.unwrap().id(), RequestId(9));
        assert_eq!(sub2.recv().await.unwrap().id(), RequestId(9));
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        bus.publish(RequestEvent::Started {
            id: RequestId(1),
            request: RequestDescriptor::new("GET", "https://example.com"),
        });
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_later_events() {
        let bus = EventBus::new();

        bus.publish(RequestEvent::Started {
            id: RequestId(1),
            request: RequestDescriptor::new("GET", "https://example.com"),
        });

        let mut subscriber = bus.subscribe();
        bus.publish(RequestEvent::Started {
            id: RequestId(2),
            request: RequestDescriptor::new("GET", "https://example.com"),
        });

        assert_eq!(subscriber.recv().await.unwrap().id(), RequestId(2));
        assert!(subscriber.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_with_capacity_drops_oldest_for_slow_subscriber() {
        let bus = EventBus::with_capacity(2);
        let mut subscriber = bus.subscribe();

        for id in 1..=4 {
            bus.publish(RequestEvent::Started {
                id: RequestId(id),
                request: RequestDescriptor::new("GET", "https://example.com"),
            });
        }

        let lagged = subscriber.recv().await;
        assert!(matches!(
            lagged,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(subscriber.recv().await.unwrap().id(), RequestId(3));
        assert_eq!(subscriber.recv().await.unwrap().id(), RequestId(4));
    }

    #[test]
    fn test_allocate_id_sequence_is_shared_across_clones() {
        let bus = EventBus::new();
        let clone = bus.clone();

        assert_eq!(bus.allocate_id(), RequestId(1));
        assert_eq!(clone.allocate_id(), RequestId(2));
        assert_eq!(bus.allocate_id(), RequestId(3));
    }
}
