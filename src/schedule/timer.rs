//! Deferred demand requests.

use crate::demand::DemandRegulator;
use crate::error::{PipelineError, Result};
use crossbeam_channel::{after, select, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::trace;

/// A demand grant scheduled for later.
#[derive(Clone, Copy, Debug)]
pub struct DeferredRequest {
    pub credits: u64,
    pub delay: Duration,
}

/// Clonable scheduling endpoint, safe to call from any context.
#[derive(Clone)]
pub struct TimerHandle {
    queue: Sender<DeferredRequest>,
}

impl TimerHandle {
    /// Schedule `credits` to be granted after `delay`. Returns false if
    /// the timer has shut down.
    pub fn request_after(&self, credits: u64, delay: Duration) -> bool {
        self.queue.send(DeferredRequest { credits, delay }).is_ok()
    }
}

/// Replays demand requests after their delay on a dedicated context.
///
/// The `shutdown` receiver interrupts a pending delay as soon as its sender
/// side is dropped, so teardown never waits out a sleep.
pub struct RequestTimer {
    handle: TimerHandle,
    thread: JoinHandle<()>,
}

impl RequestTimer {
    pub fn spawn(regulator: Arc<DemandRegulator>, shutdown: Receiver<()>) -> Result<Self> {
        let (queue_tx, queue_rx) = unbounded::<DeferredRequest>();
        let thread = thread::Builder::new()
            .name("flowline-timer".into())
            .spawn(move || loop {
                let request = match queue_rx.recv() {
                    Ok(request) => request,
                    Err(_) => break,
                };
                let deadline = after(request.delay);
                select! {
                    recv(deadline) -> _ => {
                        trace!(credits = request.credits, "deferred demand due");
                        regulator.request(request.credits);
                    }
                    recv(shutdown) -> _ => break,
                }
            })
            .map_err(|e| PipelineError::ContextSpawn {
                context: "timer".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle: TimerHandle { queue: queue_tx },
            thread,
        })
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Stop accepting requests and join the timer context.
    pub fn shutdown(self) {
        let Self { handle, thread } = self;
        drop(handle);
        let _ = thread.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OverflowPolicy;
    use crossbeam_channel::bounded;
    use std::time::Instant;

    #[test]
    fn test_deferred_request_lands() {
        let regulator = Arc::new(DemandRegulator::new(OverflowPolicy::DropLatest));
        let (shutdown_tx, shutdown_rx) = bounded(0);
        let timer = RequestTimer::spawn(Arc::clone(&regulator), shutdown_rx).unwrap();

        assert!(timer.handle().request_after(4, Duration::from_millis(10)));

        let deadline = Instant::now() + Duration::from_secs(5);
        while regulator.stats().requested < 4 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(regulator.stats().requested, 4);

        drop(shutdown_tx);
        timer.shutdown();
    }

    #[test]
    fn test_shutdown_interrupts_pending_delay() {
        let regulator = Arc::new(DemandRegulator::new(OverflowPolicy::DropLatest));
        let (shutdown_tx, shutdown_rx) = bounded(0);
        let timer = RequestTimer::spawn(Arc::clone(&regulator), shutdown_rx).unwrap();

        timer.handle().request_after(1, Duration::from_secs(60));
        thread::sleep(Duration::from_millis(20));
        drop(shutdown_tx);

        let start = Instant::now();
        timer.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(regulator.stats().requested, 0);
    }
}
