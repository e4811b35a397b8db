//! List reconciliation.
//!
//! Given two ordered, uniquely-keyed collections, [`diff`] computes the
//! minimal sequence of position-level edits transforming the old one into
//! the new one without recreating unchanged elements, and [`apply_edits`]
//! replays such a script.
//!
//! Identity (`Record::id`) decides whether two positions hold the same
//! item; full field equality at matched identities decides whether the
//! item needs an in-place update.

mod ops;
mod reconciler;

pub use ops::{apply_edits, EditOp};
pub use reconciler::diff;
