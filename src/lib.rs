//! # Flowline
//!
//! A demand-regulated record pipeline with minimal list reconciliation.
//!
//! ## Core Concepts
//!
//! - **Hot production**: a producer on its own execution context emits
//!   records as fast as it can, with no awareness of downstream readiness.
//! - **Demand regulation**: the consumer grants bounded demand credits;
//!   an overflow policy decides the fate of emissions that arrive without
//!   credit. The producer is never blocked.
//! - **Serialized delivery**: consumer-visible effects land on a single
//!   delivery context, in forwarding order.
//! - **Reconciliation**: every mutation of the consumer's ordered
//!   collection yields a minimal insert/remove/move/update edit script for
//!   an external list view.
//!
//! ## Example
//!
//! ```ignore
//! use flowline::{Pipeline, PipelineConfig, PipelineEvent};
//!
//! let handle = Pipeline::new(PipelineConfig::default()).subscribe()?;
//!
//! while let Ok(event) = handle.recv() {
//!     match event {
//!         PipelineEvent::Record { record } => println!("delivered {}", record.name),
//!         PipelineEvent::Edits { script } => view.apply(&script),
//!         PipelineEvent::Complete => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod consumer;
pub mod demand;
pub mod diff;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod producer;
pub mod schedule;
pub mod types;

// Re-exports
pub use consumer::{Consumer, RefillPolicy};
pub use demand::{Delivery, DemandRegulator, DemandStats, OfferOutcome};
pub use diff::{apply_edits, diff, EditOp};
pub use error::{PipelineError, Result};
pub use generator::{RecordGenerator, SyntheticUsers};
pub use pipeline::{Pipeline, PipelineConfig, PipelineEvent, PipelineHandle};
pub use producer::HotProducer;
pub use schedule::{spawn_loop, ExecutionContext, RequestTimer, TimerHandle};
pub use types::{OverflowPolicy, Record, RecordId, Sequence, SequenceCounter};
