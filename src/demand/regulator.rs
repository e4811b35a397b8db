//! The demand regulator.

use crate::error::PipelineError;
use crate::types::{OverflowPolicy, Record};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

use super::types::{Delivery, DemandStats, OfferOutcome};

/// Mutable regulator state. `request` and `offer` may arrive from
/// different execution contexts; the mutex serializes them.
struct RegulatorState {
    demand: u64,
    requested: u64,
    forwarded: u64,
    dropped: u64,
    stash: VecDeque<Record>,
    delivery: Option<Sender<Delivery>>,
    timer_shutdown: Option<Sender<()>>,
    terminated: bool,
}

/// Maintains the outstanding-demand counter and applies the overflow
/// policy when production outpaces requested demand.
pub struct DemandRegulator {
    policy: OverflowPolicy,
    state: Mutex<RegulatorState>,
    /// Lock-free halt flag for the producer's per-emission check.
    halted: AtomicBool,
}

impl DemandRegulator {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RegulatorState {
                demand: 0,
                requested: 0,
                forwarded: 0,
                dropped: 0,
                stash: VecDeque::new(),
                delivery: None,
                timer_shutdown: None,
                terminated: false,
            }),
            halted: AtomicBool::new(false),
        }
    }

    /// Attach the delivery queue and the timer shutdown trigger.
    ///
    /// Called once while wiring the pipeline, before production starts.
    /// Dropping these senders on termination is what lets the delivery
    /// context and the request timer drain and exit.
    pub(crate) fn connect(&self, delivery: Sender<Delivery>, timer_shutdown: Sender<()>) {
        let mut state = self.state.lock();
        state.delivery = Some(delivery);
        state.timer_shutdown = Some(timer_shutdown);
    }

    /// Grant `n` demand credits. A zero grant is a no-op.
    ///
    /// Stashed records are drained first, in arrival order, before any new
    /// emission can consume the fresh credits.
    pub fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut state = self.state.lock();
        if state.terminated {
            return;
        }
        state.demand += n;
        state.requested += n;
        trace!(credits = n, demand = state.demand, "demand granted");
        while state.demand > 0 {
            let Some(record) = state.stash.pop_front() else {
                break;
            };
            Self::forward(&mut state, &self.halted, record);
        }
    }

    /// Offer one emission. Never blocks: the record is forwarded against a
    /// credit, stashed, or discarded per the overflow policy.
    pub fn offer(&self, record: Record) -> OfferOutcome {
        let mut state = self.state.lock();
        if state.terminated {
            return OfferOutcome::Halted;
        }
        if state.demand > 0 {
            debug_assert!(state.stash.is_empty(), "stash must drain before fresh emissions");
            Self::forward(&mut state, &self.halted, record);
            return OfferOutcome::Forwarded;
        }

        match self.policy {
            OverflowPolicy::DropLatest => {
                state.dropped += 1;
                trace!(id = %record.id, dropped = state.dropped, "no demand, record dropped");
                OfferOutcome::Dropped
            }
            OverflowPolicy::DropOldest => {
                if state.stash.pop_front().is_some() {
                    state.dropped += 1;
                }
                state.stash.push_back(record);
                OfferOutcome::Buffered
            }
            OverflowPolicy::Error => {
                debug!("no demand under `error` policy, terminating");
                Self::finish(&mut state, &self.halted, Delivery::Error(PipelineError::Overflow));
                OfferOutcome::Halted
            }
            OverflowPolicy::Buffer { capacity } => {
                if state.stash.len() < capacity {
                    state.stash.push_back(record);
                    OfferOutcome::Buffered
                } else {
                    state.dropped += 1;
                    OfferOutcome::Dropped
                }
            }
        }
    }

    /// The producer reached its emission bound. Terminal, at most once.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        Self::finish(&mut state, &self.halted, Delivery::Complete);
    }

    /// Production failed. Terminal, at most once.
    pub fn fail(&self, error: PipelineError) {
        let mut state = self.state.lock();
        Self::finish(&mut state, &self.halted, Delivery::Error(error));
    }

    /// Graceful teardown. No terminal signal is delivered; the delivery
    /// queue disconnects after draining.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if state.terminated {
            return;
        }
        debug!("subscription canceled");
        Self::terminate(&mut state, &self.halted);
    }

    /// Lock-free check used by the producer between emissions.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DemandStats {
        let state = self.state.lock();
        DemandStats {
            requested: state.requested,
            forwarded: state.forwarded,
            dropped: state.dropped,
            buffered: state.stash.len(),
            demand: state.demand,
        }
    }

    /// Consume one credit and post the record to the delivery queue.
    fn forward(state: &mut RegulatorState, halted: &AtomicBool, record: Record) {
        state.demand -= 1;
        state.forwarded += 1;
        let posted = state
            .delivery
            .as_ref()
            .map(|tx| tx.send(Delivery::Record(record)).is_ok())
            .unwrap_or(false);
        if !posted {
            debug!("delivery context unavailable, terminating");
            Self::terminate(state, halted);
        }
    }

    /// Deliver a terminal signal exactly once, then tear down.
    fn finish(state: &mut RegulatorState, halted: &AtomicBool, terminal: Delivery) {
        if state.terminated {
            return;
        }
        if let Some(tx) = state.delivery.take() {
            let _ = tx.send(terminal);
        }
        Self::terminate(state, halted);
    }

    fn terminate(state: &mut RegulatorState, halted: &AtomicBool) {
        state.terminated = true;
        state.stash.clear();
        state.delivery = None;
        state.timer_shutdown = None;
        halted.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, Sequence};
    use crossbeam_channel::{bounded, unbounded, Receiver};
    use std::sync::Arc;

    fn make_record(id: u64, sequence: u64) -> Record {
        Record {
            id: RecordId(id),
            name: format!("record-{id}"),
            note: String::new(),
            sequence: Sequence(sequence),
        }
    }

    fn connected(policy: OverflowPolicy) -> (DemandRegulator, Receiver<Delivery>) {
        let regulator = DemandRegulator::new(policy);
        let (delivery_tx, delivery_rx) = unbounded();
        // The timer end is not under test here; the regulator only ever
        // drops this sender.
        let (shutdown_tx, _) = bounded(0);
        regulator.connect(delivery_tx, shutdown_tx);
        (regulator, delivery_rx)
    }

    fn delivered_ids(rx: &Receiver<Delivery>) -> Vec<u64> {
        let mut ids = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            if let Delivery::Record(record) = delivery {
                ids.push(record.id.0);
            }
        }
        ids
    }

    #[test]
    fn test_request_zero_is_noop() {
        let (regulator, _rx) = connected(OverflowPolicy::DropLatest);
        regulator.request(0);
        assert_eq!(regulator.stats(), DemandStats::default());
    }

    #[test]
    fn test_offer_without_demand_drops() {
        let (regulator, rx) = connected(OverflowPolicy::DropLatest);
        for n in 0..5 {
            assert_eq!(regulator.offer(make_record(n, n + 1)), OfferOutcome::Dropped);
        }
        let stats = regulator.stats();
        assert_eq!(stats.forwarded, 0);
        assert_eq!(stats.dropped, 5);
        assert!(delivered_ids(&rx).is_empty());
    }

    #[test]
    fn test_demand_decrements_in_lockstep() {
        let (regulator, rx) = connected(OverflowPolicy::DropLatest);
        regulator.request(3);

        let outcomes: Vec<_> = (0..5).map(|n| regulator.offer(make_record(n, n + 1))).collect();
        assert_eq!(
            outcomes,
            vec![
                OfferOutcome::Forwarded,
                OfferOutcome::Forwarded,
                OfferOutcome::Forwarded,
                OfferOutcome::Dropped,
                OfferOutcome::Dropped,
            ]
        );

        let stats = regulator.stats();
        assert_eq!(stats.requested, 3);
        assert_eq!(stats.forwarded, 3);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.demand, 0);

        // Forwarded in offer order.
        assert_eq!(delivered_ids(&rx), vec![0, 1, 2]);
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let (regulator, rx) = connected(OverflowPolicy::DropOldest);
        for n in 0..5 {
            assert_eq!(regulator.offer(make_record(n, n + 1)), OfferOutcome::Buffered);
        }
        let stats = regulator.stats();
        assert_eq!(stats.dropped, 4);
        assert_eq!(stats.buffered, 1);

        regulator.request(1);
        assert_eq!(delivered_ids(&rx), vec![4]);
        assert_eq!(regulator.stats().buffered, 0);
    }

    #[test]
    fn test_buffer_policy_queues_then_drops() {
        let (regulator, rx) = connected(OverflowPolicy::Buffer { capacity: 3 });
        for n in 0..5 {
            let outcome = regulator.offer(make_record(n, n + 1));
            if n < 3 {
                assert_eq!(outcome, OfferOutcome::Buffered);
            } else {
                assert_eq!(outcome, OfferOutcome::Dropped);
            }
        }

        regulator.request(10);
        assert_eq!(delivered_ids(&rx), vec![0, 1, 2]);

        let stats = regulator.stats();
        assert_eq!(stats.forwarded, 3);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.demand, 7);
    }

    #[test]
    fn test_error_policy_terminates() {
        let (regulator, rx) = connected(OverflowPolicy::Error);
        assert_eq!(regulator.offer(make_record(1, 1)), OfferOutcome::Halted);
        assert!(regulator.is_halted());

        let terminal = rx.try_recv().unwrap();
        assert!(matches!(
            terminal,
            Delivery::Error(PipelineError::Overflow)
        ));

        // Terminated: further offers and requests are inert.
        assert_eq!(regulator.offer(make_record(2, 2)), OfferOutcome::Halted);
        regulator.request(5);
        assert_eq!(regulator.stats().requested, 0);
    }

    #[test]
    fn test_terminal_signal_at_most_once() {
        let (regulator, rx) = connected(OverflowPolicy::DropLatest);
        regulator.complete();
        regulator.complete();
        regulator.fail(PipelineError::Generation("late".into()));

        assert!(matches!(rx.try_recv(), Ok(Delivery::Complete)));
        // Sender was dropped at termination, so the channel is now empty
        // and disconnected.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_halts_without_signal() {
        let (regulator, rx) = connected(OverflowPolicy::DropLatest);
        regulator.request(2);
        regulator.cancel();

        assert!(regulator.is_halted());
        assert!(matches!(
            rx.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        ));
        assert_eq!(regulator.offer(make_record(1, 1)), OfferOutcome::Halted);
    }

    #[test]
    fn test_concurrent_offer_and_request() {
        let (regulator, rx) = connected(OverflowPolicy::DropLatest);
        let regulator = Arc::new(regulator);

        let producer = {
            let regulator = Arc::clone(&regulator);
            std::thread::spawn(move || {
                for n in 0..10_000u64 {
                    regulator.offer(make_record(n, n + 1));
                }
            })
        };

        for _ in 0..100 {
            regulator.request(7);
        }
        producer.join().unwrap();

        let stats = regulator.stats();
        assert!(stats.forwarded <= stats.requested);
        assert_eq!(stats.forwarded + stats.dropped, 10_000);
        assert_eq!(delivered_ids(&rx).len() as u64, stats.forwarded);
    }
}
