//! The hot producer.

use crate::demand::{DemandRegulator, OfferOutcome};
use crate::error::Result;
use crate::generator::RecordGenerator;
use crate::schedule::spawn_loop;
use crate::types::SequenceCounter;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// Emits records on the production context as fast as it allows, with no
/// awareness of downstream readiness. Every emission goes through the
/// regulator's `offer`.
pub struct HotProducer {
    generator: Box<dyn RecordGenerator + Send>,
    regulator: Arc<DemandRegulator>,
    sequence: SequenceCounter,
    emit_limit: Option<u64>,
}

impl HotProducer {
    pub fn new(
        generator: Box<dyn RecordGenerator + Send>,
        regulator: Arc<DemandRegulator>,
        sequence: SequenceCounter,
        emit_limit: Option<u64>,
    ) -> Self {
        Self {
            generator,
            regulator,
            sequence,
            emit_limit,
        }
    }

    /// Begin emission on the production context. Returns immediately.
    pub fn start(self) -> Result<JoinHandle<()>> {
        spawn_loop("production", move || self.run())
    }

    fn run(mut self) {
        let mut emitted = 0u64;
        loop {
            // Cancellation is observed between emissions.
            if self.regulator.is_halted() {
                debug!(emitted, "production halted");
                return;
            }
            if let Some(limit) = self.emit_limit {
                if emitted >= limit {
                    debug!(emitted, "emission bound reached");
                    self.regulator.complete();
                    return;
                }
            }

            let record = match self.generator.generate(self.sequence.advance()) {
                Ok(record) => record,
                Err(error) => {
                    debug!(%error, emitted, "generation failed");
                    self.regulator.fail(error);
                    return;
                }
            };

            emitted += 1;
            if self.regulator.offer(record) == OfferOutcome::Halted {
                return;
            }
        }
    }
}
