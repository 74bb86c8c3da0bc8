use std::collections::VecDeque;
use thiserror::Error;
use urts_types::{MicroTime, Packet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
}

/// A fixed-capacity, time-ordered ring buffer of packets for a single
/// channel (spec §4.1, `CircularBuffer<Packet>`).
///
/// One instance exists per (network, station, channel, location)
/// tuple. Callers are expected to guard a single instance behind a
/// mutex (see [`crate::registry::CacheRegistry`]); this type itself
/// performs no locking.
pub struct CircularPacketCache<P> {
    packets: VecDeque<P>,
    capacity: usize,
}

impl<P: Packet + Clone> CircularPacketCache<P> {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            packets: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Front element's start time (spec §4.1 `earliest_start_time`).
    pub fn earliest_start_time(&self) -> Option<MicroTime> {
        self.packets.front().map(|p| p.start_time())
    }

    fn evict_overflow(&mut self) {
        while self.packets.len() > self.capacity {
            self.packets.pop_front();
        }
    }

    /// Insert a packet, maintaining start-time order.
    ///
    /// Implements the algorithm in spec §4.1: append fast-path when the
    /// packet is newer than everything cached, silent drop of
    /// already-expired backfill once the buffer is full, overwrite of
    /// an identical start time (treated as a more authoritative copy),
    /// and otherwise an ordered insert.
    pub fn add(&mut self, packet: P) {
        if self.packets.is_empty() {
            self.packets.push_back(packet);
            return;
        }

        let back_start = self.packets.back().unwrap().start_time();
        if packet.start_time() > back_start {
            self.packets.push_back(packet);
            self.evict_overflow();
            return;
        }

        let front_start = self.packets.front().unwrap().start_time();
        if packet.start_time() < front_start && self.packets.len() >= self.capacity {
            tracing::trace!(
                channel = %packet.channel(),
                start = packet.start_time().as_micros(),
                "dropping expired backfill packet"
            );
            return;
        }

        // Upper-bound search: first index whose start time is strictly
        // greater than the incoming packet's start time.
        let pos = self
            .packets
            .partition_point(|p| p.start_time() <= packet.start_time());

        if pos > 0 && self.packets[pos - 1].start_time() == packet.start_time() {
            self.packets[pos - 1] = packet;
        } else {
            self.packets.insert(pos, packet);
            self.evict_overflow();
        }
    }

    /// Every packet whose `[start, end]` interval intersects
    /// `[t0, t1]` (spec §4.1 `query`, §8 testable property 2).
    pub fn query(&self, t0: MicroTime, t1: MicroTime) -> Vec<P> {
        let mut result = Vec::new();
        if self.packets.is_empty() {
            return result;
        }

        let mut idx = self.packets.partition_point(|p| p.start_time() <= t0);
        if idx > 0 {
            let prev = &self.packets[idx - 1];
            let prev_reaches_window = match prev.end_time() {
                Some(end) => end >= t0,
                None => prev.start_time() >= t0,
            };
            if prev_reaches_window {
                idx -= 1;
            }
        }

        for packet in self.packets.iter().skip(idx) {
            if packet.start_time() > t1 {
                break;
            }
            let overlaps = match packet.end_time() {
                Some(end) => end >= t0 && packet.start_time() <= t1,
                None => packet.start_time() >= t0 && packet.start_time() <= t1,
            };
            if overlaps {
                result.push(packet.clone());
            }
        }

        result
    }

    /// A snapshot copy of every cached packet, in start-time order.
    pub fn query_all(&self) -> Vec<P> {
        self.packets.iter().cloned().collect()
    }
}
