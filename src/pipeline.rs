//! Pipeline orchestration: wiring stages onto execution contexts.

use crate::consumer::{Consumer, RefillPolicy};
use crate::demand::{Delivery, DemandRegulator, DemandStats};
use crate::diff::EditOp;
use crate::error::Result;
use crate::generator::{RecordGenerator, SyntheticUsers};
use crate::producer::HotProducer;
use crate::schedule::{ExecutionContext, RequestTimer};
use crate::types::{OverflowPolicy, Record, Sequence, SequenceCounter};
use crossbeam_channel::{bounded, Receiver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Demand credits granted when the subscription starts.
    pub initial_demand: u64,

    /// Credits granted after each delivery (zero disables refills).
    pub refill_credits: u64,

    /// Delay before each refill grant. Rate-limited consumption is a
    /// consumer-side policy, not a production concern.
    pub refill_delay: Duration,

    /// Policy for emissions that arrive without demand credits.
    pub overflow: OverflowPolicy,

    /// Emission bound for the producer (`None` = emit until canceled).
    pub emit_limit: Option<u64>,

    /// Capacity of the event channel toward the external receiver.
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_demand: 3,
            refill_credits: 2,
            refill_delay: Duration::from_secs(2),
            overflow: OverflowPolicy::DropLatest,
            emit_limit: Some(100_000),
            event_buffer: 1024,
        }
    }
}

/// Events delivered to the external receiver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A record was delivered and applied to the ordered collection.
    Record { record: Record },

    /// Edit script reconciling the previous collection with the current
    /// one. Apply it to a mirror to stay in sync.
    Edits { script: Vec<EditOp> },

    /// A consumer-side side effect failed. Non-terminal.
    SideEffectError { reason: String },

    /// Production failed. Terminal.
    Error { reason: String },

    /// The producer reached its emission bound. Terminal.
    Complete,
}

/// A configured pipeline, ready to subscribe.
pub struct Pipeline {
    config: PipelineConfig,
    generator: Box<dyn RecordGenerator + Send>,
}

impl Pipeline {
    /// A pipeline over the built-in synthetic generator.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_generator(config, Box::new(SyntheticUsers::new()))
    }

    pub fn with_generator(
        config: PipelineConfig,
        generator: Box<dyn RecordGenerator + Send>,
    ) -> Self {
        Self { config, generator }
    }

    /// Start the pipeline.
    ///
    /// Wires the contexts, issues the consumer's initial demand request,
    /// then begins hot production. Stage-to-context mapping:
    /// production runs on its own loop thread (regulation decisions happen
    /// inline on it), delivery drains a FIFO queue on a single serialized
    /// thread, and deferred refills replay on the timer context.
    pub fn subscribe(self) -> Result<PipelineHandle> {
        let Pipeline { config, generator } = self;

        let (event_tx, event_rx) = bounded(config.event_buffer);
        let (timer_shutdown_tx, timer_shutdown_rx) = bounded(0);

        let regulator = Arc::new(DemandRegulator::new(config.overflow));
        let timer = RequestTimer::spawn(Arc::clone(&regulator), timer_shutdown_rx)?;

        let mut consumer = Consumer::new(
            event_tx,
            timer.handle(),
            Arc::clone(&regulator),
            RefillPolicy {
                credits: config.refill_credits,
                delay: config.refill_delay,
            },
        );
        let delivery = ExecutionContext::spawn("delivery", move |d| consumer.handle(d))?;

        regulator.connect(delivery.sender(), timer_shutdown_tx);

        // Initial demand lands before the first emission can.
        regulator.request(config.initial_demand);

        let sequence = SequenceCounter::new();
        let producer = HotProducer::new(
            generator,
            Arc::clone(&regulator),
            sequence.clone(),
            config.emit_limit,
        )
        .start()?;

        debug!(
            initial_demand = config.initial_demand,
            overflow = ?config.overflow,
            "pipeline subscribed"
        );

        Ok(PipelineHandle {
            events: event_rx,
            regulator,
            sequence,
            producer: Some(producer),
            delivery: Some(delivery),
            timer: Some(timer),
        })
    }
}

/// Handle to a running pipeline.
///
/// Receives events, grants demand, and tears the pipeline down on
/// `cancel` or drop.
pub struct PipelineHandle {
    events: Receiver<PipelineEvent>,
    regulator: Arc<DemandRegulator>,
    sequence: SequenceCounter,
    producer: Option<JoinHandle<()>>,
    delivery: Option<ExecutionContext<Delivery>>,
    timer: Option<RequestTimer>,
}

impl PipelineHandle {
    /// Grant `n` more demand credits (e.g. from a UI refresh action).
    /// Safe to call from any context.
    pub fn request(&self, n: u64) {
        self.regulator.request(n);
    }

    /// Stop production and tear the subscription down. Already-forwarded
    /// records still drain to the event channel; no terminal event is
    /// delivered.
    pub fn cancel(&self) {
        self.regulator.cancel();
    }

    /// Demand-side counters.
    pub fn stats(&self) -> DemandStats {
        self.regulator.stats()
    }

    /// Most recently created sequence (production-side progress).
    pub fn sequence(&self) -> Sequence {
        self.sequence.current()
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> std::result::Result<PipelineEvent, crossbeam_channel::RecvError> {
        self.events.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<PipelineEvent, crossbeam_channel::TryRecvError> {
        self.events.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<PipelineEvent, crossbeam_channel::RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }
}

impl Drop for PipelineHandle {
    /// An unobserved pipeline must not keep producing: cancel, then join
    /// every context. Each join is bounded: the producer checks the halt
    /// flag between emissions, the delivery queue holds at most the
    /// already-forwarded records, and the timer is interrupted mid-delay.
    fn drop(&mut self) {
        self.regulator.cancel();
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
        if let Some(delivery) = self.delivery.take() {
            delivery.shutdown();
        }
        if let Some(timer) = self.timer.take() {
            timer.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.initial_demand, 3);
        assert_eq!(config.refill_credits, 2);
        assert_eq!(config.refill_delay, Duration::from_secs(2));
        assert_eq!(config.overflow, OverflowPolicy::DropLatest);
        assert_eq!(config.emit_limit, Some(100_000));
    }
}
