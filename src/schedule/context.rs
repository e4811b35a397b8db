//! Named worker threads with FIFO work queues.

use crate::error::{PipelineError, Result};
use crossbeam_channel::{unbounded, Sender};
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

/// A dedicated thread draining a FIFO queue of messages.
///
/// Posting is asynchronous and never blocks. The drain loop preserves
/// posting order, and the thread exits once every sender is gone and the
/// queue is drained.
pub struct ExecutionContext<T: Send + 'static> {
    name: &'static str,
    sender: Sender<T>,
    thread: JoinHandle<()>,
}

impl<T: Send + 'static> ExecutionContext<T> {
    /// Spawn a context running `handler` for every posted message.
    pub fn spawn<F>(name: &'static str, mut handler: F) -> Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let thread = thread::Builder::new()
            .name(format!("flowline-{name}"))
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    handler(message);
                }
                trace!(context = name, "context drained");
            })
            .map_err(|e| PipelineError::ContextSpawn {
                context: name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            sender,
            thread,
        })
    }

    /// Post a message to this context's queue. Returns false if the drain
    /// loop is no longer running.
    pub fn post(&self, message: T) -> bool {
        self.sender.send(message).is_ok()
    }

    /// A sender other stages can post through.
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// Drop this context's own sender and join the drain loop.
    ///
    /// Blocks until every cloned sender is gone and the queue has drained,
    /// so release external senders first.
    pub fn shutdown(self) {
        let Self {
            name,
            sender,
            thread,
        } = self;
        drop(sender);
        if thread.join().is_err() {
            warn!(context = name, "context thread panicked");
        }
    }
}

/// Run `f` to completion on a dedicated named thread.
///
/// For stages that are loops rather than queue drains (the production
/// stage).
pub fn spawn_loop<F>(name: &'static str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("flowline-{name}"))
        .spawn(f)
        .map_err(|e| PipelineError::ContextSpawn {
            context: name.to_string(),
            reason: e.to_string(),
        })
}
