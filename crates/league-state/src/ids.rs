//! Identifier generation for new league records.
//!
//! Stores receive an [`IdGenerator`] at construction instead of keeping a
//! process-wide counter, so concurrent requests never race on a shared
//! sequence.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique record identifiers.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier starting with `prefix` (e.g. `"bounty"`).
    fn next_id(&self, prefix: &str) -> String;
}

/// Random UUIDv4 identifiers: `<prefix>-<uuid>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4())
    }
}

/// Deterministic `<prefix>-<n>` identifiers, counting from 1 per instance.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_per_instance() {
        let a = SequentialIdGenerator::new();
        let b = SequentialIdGenerator::new();
        assert_eq!(a.next_id("sub"), "sub-1");
        assert_eq!(a.next_id("sub"), "sub-2");
        assert_eq!(b.next_id("bounty"), "bounty-1");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let gen = UuidIdGenerator;
        let first = gen.next_id("bounty");
        assert!(first.starts_with("bounty-"));
        assert_ne!(first, gen.next_id("bounty"));
    }
}
