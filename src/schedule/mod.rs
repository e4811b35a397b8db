//! Stage-to-context scheduling.
//!
//! Three primitives map pipeline stages onto execution contexts:
//!
//! - [`spawn_loop`] runs the production loop on its own dedicated thread.
//! - [`ExecutionContext`] is a named thread draining a FIFO work queue.
//!   The delivery context is one of these, so consumer-visible effects are
//!   serialized on a single context and arrive in forwarding order.
//! - [`RequestTimer`] replays deferred demand grants after a delay, keeping
//!   refill pacing off the delivery context.
//!
//! Hand-off between contexts is asynchronous: posting never blocks the
//! posting side.

mod context;
mod timer;

pub use context::{spawn_loop, ExecutionContext};
pub use timer::{DeferredRequest, RequestTimer, TimerHandle};
