//! Bounded, thread-safe queue used to build the pub/sub and
//! request/reply primitives on top of a lock-free ring buffer (the
//! same `ringbuf` crate the data-plane crates use for their audio
//! buffers, here carrying messages instead of samples).

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::error::TransportError;

/// How long `pop_timeout` sleeps between polls of the ring buffer.
/// Chosen to keep worker threads responsive without spinning the CPU.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A fixed-capacity queue shared between any number of producer and
/// consumer threads. `try_push` fails immediately on a full queue
/// (`TransportError::QueueFull`); `push` blocks until a slot frees;
/// `push_evicting_oldest` instead drops the oldest queued element to
/// make room. Consuming supports both a non-blocking `try_pop` and a
/// `pop_timeout` polling wait.
pub struct BoundedQueue<T> {
    producer: Mutex<HeapProd<T>>,
    consumer: Mutex<HeapCons<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<T>::new(capacity.max(1));
        let (producer, consumer) = rb.split();
        Self {
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.consumer.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn try_push(&self, item: T) -> Result<(), TransportError> {
        self.producer
            .lock()
            .try_push(item)
            .map_err(|_| TransportError::QueueFull)
    }

    /// Blocks until the push succeeds. Matches spec §5: ordinary
    /// pipeline queues have producers that "block on `push` when
    /// full," unlike the best-effort broadcast queues behind
    /// [`crate::pubsub::InProcessBus`], which evict the oldest element
    /// instead.
    pub fn push(&self, item: T) {
        let mut item = item;
        loop {
            match self.producer.lock().try_push(item) {
                Ok(()) => return,
                Err(rejected) => item = rejected,
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Pushes `item`, first evicting the oldest queued element if the
    /// queue is full. Used by best-effort broadcast queues (spec §5:
    /// "for best-effort broadcasts, evict the oldest element") where
    /// dropping a lagging subscriber's stalest message is preferable to
    /// dropping the newly published one or blocking the publisher.
    /// Returns the evicted element, if any.
    pub fn push_evicting_oldest(&self, item: T) -> Option<T> {
        let mut producer = self.producer.lock();
        match producer.try_push(item) {
            Ok(()) => None,
            Err(rejected) => {
                let evicted = self.consumer.lock().try_pop();
                if producer.try_push(rejected).is_err() {
                    tracing::warn!(
                        "push_evicting_oldest could not make room even after evicting the oldest element"
                    );
                }
                evicted
            }
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.consumer.lock().try_pop()
    }

    /// Polls for a message until one arrives or `timeout` elapses.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_round_trips() {
        let q = BoundedQueue::new(4);
        q.try_push(1).unwrap();
        q.try_push(2).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn full_queue_rejects_further_pushes() {
        let q = BoundedQueue::new(2);
        q.try_push(1).unwrap();
        q.try_push(2).unwrap();
        assert_eq!(q.try_push(3), Err(TransportError::QueueFull));
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let q: BoundedQueue<u32> = BoundedQueue::new(2);
        let start = Instant::now();
        let result = q.pop_timeout(Duration::from_millis(10));
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn pop_timeout_observes_a_late_push() {
        use std::sync::Arc;
        let q = Arc::new(BoundedQueue::new(2));
        let q2 = q.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            q2.try_push(42).unwrap();
        });
        let result = q.pop_timeout(Duration::from_millis(200));
        handle.join().unwrap();
        assert_eq!(result, Some(42));
    }

    #[test]
    fn push_blocks_until_a_slot_frees() {
        use std::sync::Arc;
        let q = Arc::new(BoundedQueue::new(2));
        q.try_push(1).unwrap();
        q.try_push(2).unwrap();

        let q2 = q.clone();
        let handle = std::thread::spawn(move || {
            q2.push(3);
        });

        // The pushing thread must be blocked: nothing has drained yet.
        std::thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        assert_eq!(q.try_pop(), Some(1));
        handle.join().unwrap();
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
    }

    #[test]
    fn push_evicting_oldest_drops_the_front_element_when_full() {
        let q = BoundedQueue::new(2);
        q.try_push(1).unwrap();
        q.try_push(2).unwrap();
        assert_eq!(q.push_evicting_oldest(3), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn push_evicting_oldest_behaves_like_a_normal_push_when_not_full() {
        let q = BoundedQueue::new(2);
        assert_eq!(q.push_evicting_oldest(1), None);
        assert_eq!(q.try_pop(), Some(1));
    }
}
