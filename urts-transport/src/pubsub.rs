//! Publish/subscribe transport (spec §4.6): packets flow from the
//! packet cache to the picker pipeline, and picks/origins flow out to
//! downstream consumers, over a fan-out channel per topic.

use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::queue::BoundedQueue;

/// Publishes messages of type `T` to every current subscriber.
pub trait Publisher<T> {
    fn publish(&self, message: T) -> Result<(), TransportError>;
}

/// Receives messages published on a topic.
pub trait Subscriber<T> {
    fn try_recv(&self) -> Option<T>;
    fn recv_timeout(&self, timeout: Duration) -> Option<T>;
}

struct Topic<T> {
    queues: parking_lot::RwLock<Vec<Arc<BoundedQueue<T>>>>,
    queue_capacity: usize,
}

/// An in-process, fan-out pub/sub topic. Every call to [`InProcessBus::subscribe`]
/// allocates a fresh bounded queue that receives a copy of every
/// subsequent publish; a slow subscriber only drops its own copy of a
/// message when its queue is full, rather than blocking the publisher.
pub struct InProcessBus<T> {
    topic: Arc<Topic<T>>,
}

impl<T> InProcessBus<T> {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            topic: Arc::new(Topic {
                queues: parking_lot::RwLock::new(Vec::new()),
                queue_capacity,
            }),
        }
    }

    pub fn subscribe(&self) -> InProcessSubscription<T> {
        let queue = Arc::new(BoundedQueue::new(self.topic.queue_capacity));
        self.topic.queues.write().push(queue.clone());
        InProcessSubscription { queue }
    }

    pub fn subscriber_count(&self) -> usize {
        self.topic.queues.read().len()
    }
}

impl<T: Clone> Publisher<T> for InProcessBus<T> {
    /// Best-effort broadcast (spec §5): a lagging subscriber never
    /// blocks the publisher and never costs the newly published
    /// message — its own oldest still-queued message is evicted
    /// instead to make room.
    fn publish(&self, message: T) -> Result<(), TransportError> {
        let queues = self.topic.queues.read();
        if queues.is_empty() {
            return Ok(());
        }
        let mut any_evicted = false;
        for queue in queues.iter() {
            if queue.push_evicting_oldest(message.clone()).is_some() {
                any_evicted = true;
            }
        }
        if any_evicted {
            tracing::warn!("evicted oldest queued message for at least one lagging subscriber");
        }
        Ok(())
    }
}

pub struct InProcessSubscription<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Subscriber<T> for InProcessSubscription<T> {
    fn try_recv(&self) -> Option<T> {
        self.queue.try_pop()
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.queue.pop_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_subscriber_gets_its_own_copy() {
        let bus: InProcessBus<u32> = InProcessBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(7).unwrap();
        assert_eq!(a.try_recv(), Some(7));
        assert_eq!(b.try_recv(), Some(7));
    }

    #[test]
    fn publish_with_no_subscribers_is_a_no_op() {
        let bus: InProcessBus<u32> = InProcessBus::new(8);
        assert!(bus.publish(1).is_ok());
    }

    #[test]
    fn late_subscriber_does_not_see_earlier_messages() {
        let bus: InProcessBus<u32> = InProcessBus::new(8);
        bus.publish(1).unwrap();
        let sub = bus.subscribe();
        bus.publish(2).unwrap();
        assert_eq!(sub.try_recv(), Some(2));
    }

    #[test]
    fn lagging_subscriber_loses_its_oldest_message_not_the_newest() {
        let bus: InProcessBus<u32> = InProcessBus::new(2);
        let sub = bus.subscribe();
        bus.publish(1).unwrap();
        bus.publish(2).unwrap();
        // Subscriber's queue (capacity 2) is now full; a third publish
        // must evict 1, not drop 3.
        bus.publish(3).unwrap();
        assert_eq!(sub.try_recv(), Some(2));
        assert_eq!(sub.try_recv(), Some(3));
        assert_eq!(sub.try_recv(), None);
    }
}
