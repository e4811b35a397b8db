//! Core types for the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a record. Two records with the same id are the same
/// logical entity, whatever their content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creation order of a record within one pipeline instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }
}

/// Data-race-free creation sequence counter, scoped to one pipeline
/// instance so concurrent pipelines stay isolated.
///
/// The producer advances it from the production context; readers may
/// observe it from any context.
#[derive(Clone, Debug, Default)]
pub struct SequenceCounter(Arc<AtomicU64>);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the next sequence. First call returns `Seq(1)`.
    pub fn advance(&self) -> Sequence {
        Sequence(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Most recently assigned sequence (`Seq(0)` before the first advance).
    pub fn current(&self) -> Sequence {
        Sequence(self.0.load(Ordering::SeqCst))
    }
}

/// A single record flowing through the pipeline.
///
/// Owned by whichever collection currently holds it; reconciliation
/// replaces records, it never mutates them in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identity (stable across content changes).
    pub id: RecordId,

    /// Display name.
    pub name: String,

    /// Free-form display note.
    pub note: String,

    /// Creation sequence (assigned by the producer).
    pub sequence: Sequence,
}

/// Strategy applied when a record arrives with no demand credits
/// outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the arriving record. The default.
    DropLatest,

    /// Keep the arriving record in a single-slot stash, discarding the
    /// previously stashed one. A later request delivers the newest record.
    DropOldest,

    /// Terminate the stream with an overflow error.
    Error,

    /// Queue up to `capacity` records, discarding arrivals once full.
    Buffer { capacity: usize },
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DropLatest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counter_monotonic() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.current(), Sequence(0));
        assert_eq!(counter.advance(), Sequence(1));
        assert_eq!(counter.advance(), Sequence(2));
        assert_eq!(counter.current(), Sequence(2));
    }

    #[test]
    fn test_sequence_counter_shared() {
        let counter = SequenceCounter::new();
        let clone = counter.clone();
        clone.advance();
        assert_eq!(counter.current(), Sequence(1));
    }
}
