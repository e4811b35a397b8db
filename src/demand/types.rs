//! Demand regulation types.

use crate::error::PipelineError;
use crate::types::Record;

/// Signal posted to the delivery context.
#[derive(Clone, Debug)]
pub enum Delivery {
    /// A record forwarded against one demand credit.
    Record(Record),

    /// Production failed. Terminal.
    Error(PipelineError),

    /// The producer reached its emission bound. Terminal.
    Complete,
}

/// What the regulator did with an offered record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Forwarded toward the delivery context against one credit.
    Forwarded,

    /// Stashed until demand arrives.
    Buffered,

    /// Discarded by the overflow policy.
    Dropped,

    /// The subscription is over; the producer should stop emitting.
    Halted,
}

/// Counters for one producer/consumer pairing.
///
/// Overflow drops are not failures; they are counted here so tests and
/// callers can observe them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DemandStats {
    /// Cumulative credits granted via `request`.
    pub requested: u64,

    /// Cumulative records forwarded. Never exceeds `requested`.
    pub forwarded: u64,

    /// Records discarded by the overflow policy.
    pub dropped: u64,

    /// Records currently stashed awaiting demand.
    pub buffered: usize,

    /// Outstanding demand credits.
    pub demand: u64,
}
