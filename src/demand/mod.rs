//! Demand regulation between production and delivery.
//!
//! The regulator sits between the hot producer and the delivery context:
//! - Consumers grant demand credits with `request(n)`.
//! - The producer calls `offer(record)` for every emission; a record is
//!   forwarded only against an outstanding credit, otherwise the configured
//!   overflow policy decides its fate.
//! - The producer is never blocked and never slowed.
//!
//! Forwarded records are posted to the delivery context in offer order, and
//! the cumulative forwarded count never exceeds the cumulative requested
//! count.

mod regulator;
mod types;

pub use regulator::DemandRegulator;
pub use types::{Delivery, DemandStats, OfferOutcome};
