//! The delivery-context consumer.

use crate::demand::{Delivery, DemandRegulator};
use crate::diff::diff;
use crate::pipeline::PipelineEvent;
use crate::schedule::TimerHandle;
use crate::types::Record;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Consumer-side demand refill policy.
///
/// Granularity and timing of follow-up requests are a consumer policy,
/// decoupled from the production rate.
#[derive(Clone, Copy, Debug)]
pub struct RefillPolicy {
    /// Credits granted after each delivery. Zero disables refills.
    pub credits: u64,

    /// Delay before each grant.
    pub delay: Duration,
}

/// Applies delivered records to the ordered collection, reconciles, and
/// emits events toward the external receiver.
///
/// Runs exclusively on the delivery context: the collection is mutated by
/// one thread only and the reconciler reads it right after, so it needs no
/// lock.
pub struct Consumer {
    records: Vec<Record>,
    events: Sender<PipelineEvent>,
    timer: TimerHandle,
    regulator: Arc<DemandRegulator>,
    refill: RefillPolicy,
    missed_events: u64,
    report_pending: bool,
    done: bool,
}

impl Consumer {
    pub fn new(
        events: Sender<PipelineEvent>,
        timer: TimerHandle,
        regulator: Arc<DemandRegulator>,
        refill: RefillPolicy,
    ) -> Self {
        Self {
            records: Vec::new(),
            events,
            timer,
            regulator,
            refill,
            missed_events: 0,
            report_pending: false,
            done: false,
        }
    }

    /// The ordered collection as of the last delivery.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Process one signal from the delivery queue.
    pub fn handle(&mut self, delivery: Delivery) {
        if self.done {
            return;
        }
        match delivery {
            Delivery::Record(record) => self.on_record(record),
            Delivery::Error(error) => {
                debug!(%error, "stream failed");
                self.done = true;
                self.emit(PipelineEvent::Error {
                    reason: error.to_string(),
                });
            }
            Delivery::Complete => {
                debug!(records = self.records.len(), "stream complete");
                self.done = true;
                self.emit(PipelineEvent::Complete);
            }
        }
    }

    fn on_record(&mut self, record: Record) {
        let previous = self.records.clone();

        // A recurring identity supersedes its record in place, keeping the
        // collection uniquely keyed; a new identity appends in arrival
        // order.
        match self.records.iter().position(|r| r.id == record.id) {
            Some(pos) => self.records[pos] = record.clone(),
            None => self.records.push(record.clone()),
        }

        let script = diff(&previous, &self.records);
        self.emit(PipelineEvent::Record { record });
        self.emit(PipelineEvent::Edits { script });

        if self.refill.credits > 0 {
            if self.refill.delay.is_zero() {
                self.regulator.request(self.refill.credits);
            } else if !self.timer.request_after(self.refill.credits, self.refill.delay) {
                debug!("request timer gone, skipping refill");
            }
        }
    }

    /// Post an event to the external receiver without ever blocking the
    /// delivery context. A full buffer is a consumer-side failure: counted,
    /// logged, reported on the next opening, never terminal.
    fn emit(&mut self, event: PipelineEvent) {
        if self.report_pending {
            let report = PipelineEvent::SideEffectError {
                reason: format!("event buffer full, {} events lost", self.missed_events),
            };
            if self.events.try_send(report).is_ok() {
                self.report_pending = false;
            }
        }

        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.missed_events += 1;
                self.report_pending = true;
                warn!(missed = self.missed_events, ?event, "event buffer full, event lost");
            }
            Err(TrySendError::Disconnected(_)) => {
                // Receiver is gone; treat as cancellation so the producer
                // does not keep feeding an unobserved pipeline.
                debug!("event receiver disconnected, canceling");
                self.done = true;
                self.regulator.cancel();
            }
        }
    }
}
