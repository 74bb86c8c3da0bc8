use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use urts_types::{ChannelId, Packet};

use crate::buffer::{CacheError, CircularPacketCache};

/// Handle to one channel's cache: the mutex serializes every operation
/// against that channel, and nothing else (spec §5: "one lock per
/// channel, so different channels never contend").
pub type CacheHandle<P> = Arc<Mutex<CircularPacketCache<P>>>;

/// Maps (network, station, channel, location) to its own
/// [`CircularPacketCache`] (spec §4.1, "the cache registry").
///
/// Lookups take the read lock; only inserting a brand-new channel
/// takes the write lock, so steady-state traffic (every channel has
/// already been seen) never blocks on other channels' lookups (spec
/// §5: "lookups are read-locked, new channels acquire the write
/// lock").
pub struct CacheRegistry<P> {
    caches: RwLock<HashMap<ChannelId, CacheHandle<P>>>,
    capacity_per_channel: usize,
}

impl<P: Packet + Clone> CacheRegistry<P> {
    pub fn new(capacity_per_channel: usize) -> Result<Self, CacheError> {
        if capacity_per_channel == 0 {
            return Err(CacheError::InvalidCapacity(capacity_per_channel));
        }
        Ok(Self {
            caches: RwLock::new(HashMap::new()),
            capacity_per_channel,
        })
    }

    /// Returns the existing cache for `channel`, or creates one sized
    /// to `capacity_per_channel`.
    pub fn get_or_create(&self, channel: &ChannelId) -> CacheHandle<P> {
        if let Some(existing) = self.caches.read().get(channel) {
            return existing.clone();
        }

        let mut write_guard = self.caches.write();
        // Re-check under the write lock: another thread may have
        // created this channel's cache between our read and write
        // acquisitions.
        if let Some(existing) = write_guard.get(channel) {
            return existing.clone();
        }

        tracing::debug!(channel = %channel, "registering new channel cache");
        let cache = Arc::new(Mutex::new(
            CircularPacketCache::new(self.capacity_per_channel)
                .expect("capacity validated at registry construction"),
        ));
        write_guard.insert(channel.clone(), cache.clone());
        cache
    }

    /// Looks up a channel's cache without creating one.
    pub fn get(&self, channel: &ChannelId) -> Option<CacheHandle<P>> {
        self.caches.read().get(channel).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.caches.read().len()
    }

    /// Drops every registered channel's cache. Spec §4.1: "removal
    /// happens only on shutdown."
    pub fn clear(&self) {
        self.caches.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urts_types::{DataPacket, MicroTime};

    fn ch(station: &str) -> ChannelId {
        ChannelId::new("UU", station, "HHZ", "01")
    }

    #[test]
    fn get_or_create_returns_same_handle_for_same_channel() {
        let registry: CacheRegistry<DataPacket> = CacheRegistry::new(4).unwrap();
        let a = registry.get_or_create(&ch("ABC"));
        let b = registry.get_or_create(&ch("ABC"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.channel_count(), 1);
    }

    #[test]
    fn different_channels_get_different_caches() {
        let registry: CacheRegistry<DataPacket> = CacheRegistry::new(4).unwrap();
        let a = registry.get_or_create(&ch("ABC"));
        let b = registry.get_or_create(&ch("DEF"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.channel_count(), 2);
    }

    #[test]
    fn channels_do_not_interfere() {
        let registry: CacheRegistry<DataPacket> = CacheRegistry::new(4).unwrap();
        let a = registry.get_or_create(&ch("ABC"));
        let b = registry.get_or_create(&ch("DEF"));
        a.lock().add(
            DataPacket::new(ch("ABC"), 1.0, MicroTime::from_seconds(0.0), vec![1.0]).unwrap(),
        );
        assert_eq!(a.lock().len(), 1);
        assert_eq!(b.lock().len(), 0);
    }

    #[test]
    fn clear_drops_all_channels() {
        let registry: CacheRegistry<DataPacket> = CacheRegistry::new(4).unwrap();
        registry.get_or_create(&ch("ABC"));
        registry.clear();
        assert_eq!(registry.channel_count(), 0);
    }
}
