//! Edit operations and their application.

use crate::error::{PipelineError, Result};
use crate::types::Record;
use serde::{Deserialize, Serialize};

/// One structural edit, addressed by position in the collection as it
/// stands when the edit is applied (scripts apply left to right).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Insert `record` so it ends up at `pos`.
    Insert { pos: usize, record: Record },

    /// Remove the record at `pos`.
    Remove { pos: usize },

    /// Remove the record at `from` and reinsert it at `to`.
    Move { from: usize, to: usize },

    /// Replace the record at `pos` (same identity, new content).
    Update { pos: usize, record: Record },
}

/// Apply an edit script to `base`, yielding the transformed collection.
///
/// Positions are validated as the script replays; an out-of-bounds edit
/// fails the whole application.
pub fn apply_edits(base: &[Record], script: &[EditOp]) -> Result<Vec<Record>> {
    let mut list = base.to_vec();
    for op in script {
        match op {
            EditOp::Insert { pos, record } => {
                if *pos > list.len() {
                    return Err(out_of_bounds(*pos, list.len()));
                }
                list.insert(*pos, record.clone());
            }
            EditOp::Remove { pos } => {
                if *pos >= list.len() {
                    return Err(out_of_bounds(*pos, list.len()));
                }
                list.remove(*pos);
            }
            EditOp::Move { from, to } => {
                if *from >= list.len() {
                    return Err(out_of_bounds(*from, list.len()));
                }
                let record = list.remove(*from);
                if *to > list.len() {
                    return Err(out_of_bounds(*to, list.len()));
                }
                list.insert(*to, record);
            }
            EditOp::Update { pos, record } => {
                if *pos >= list.len() {
                    return Err(out_of_bounds(*pos, list.len()));
                }
                list[*pos] = record.clone();
            }
        }
    }
    Ok(list)
}

fn out_of_bounds(position: usize, len: usize) -> PipelineError {
    PipelineError::EditOutOfBounds { position, len }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, Sequence};

    fn make_record(id: u64) -> Record {
        Record {
            id: RecordId(id),
            name: format!("record-{id}"),
            note: String::new(),
            sequence: Sequence(id),
        }
    }

    #[test]
    fn test_apply_each_op() {
        let base = vec![make_record(1), make_record(2), make_record(3)];

        let script = vec![
            EditOp::Remove { pos: 1 },
            EditOp::Insert {
                pos: 0,
                record: make_record(4),
            },
            EditOp::Move { from: 2, to: 0 },
            EditOp::Update {
                pos: 1,
                record: Record {
                    note: "edited".into(),
                    ..make_record(4)
                },
            },
        ];

        let result = apply_edits(&base, &script).unwrap();
        let ids: Vec<u64> = result.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![3, 4, 1]);
        assert_eq!(result[1].note, "edited");
    }

    #[test]
    fn test_empty_script_is_identity() {
        let base = vec![make_record(1), make_record(2)];
        assert_eq!(apply_edits(&base, &[]).unwrap(), base);
    }

    #[test]
    fn test_out_of_bounds_positions_fail() {
        let base = vec![make_record(1)];

        let cases = vec![
            EditOp::Remove { pos: 1 },
            EditOp::Update {
                pos: 1,
                record: make_record(2),
            },
            EditOp::Insert {
                pos: 2,
                record: make_record(2),
            },
            EditOp::Move { from: 1, to: 0 },
            EditOp::Move { from: 0, to: 1 },
        ];
        for op in cases {
            let result = apply_edits(&base, &[op.clone()]);
            assert!(
                matches!(result, Err(PipelineError::EditOutOfBounds { .. })),
                "expected out of bounds for {op:?}"
            );
        }
    }
}
