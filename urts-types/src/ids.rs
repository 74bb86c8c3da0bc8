use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic identifier generator shared across picks and origins.
///
/// Picks and origins are both specified as carrying a "monotonic
/// identifier" (spec §3); this is a thin wrapper over an atomic
/// counter rather than a UUID so that ordering between identifiers
/// reflects creation order within one process.
#[derive(Debug, Default)]
pub struct IdentifierGenerator {
    next: AtomicU64,
}

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
