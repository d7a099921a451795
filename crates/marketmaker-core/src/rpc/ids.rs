use std::sync::atomic::{AtomicU64, Ordering};

/// Source of JSON-RPC request ids.
///
/// Ids are handed out in strictly increasing order and never reused, even
/// when the call that consumed them fails. The allocator is owned by the
/// caller and shared through an `Arc`, so several proxies can draw from one
/// sequence while tests can still start from a known value.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    next: AtomicU64,
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Atomically reserve `count` consecutive ids and return the first one.
    ///
    /// Concurrent callers always receive disjoint blocks.
    pub fn reserve(&self, count: u64) -> u64 {
        self.next.fetch_add(count, Ordering::Relaxed)
    }

    /// The id the next reservation will start at.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
