//! Minimal edit script computation.

use crate::types::{Record, RecordId};
use std::collections::{HashMap, HashSet};

use super::ops::EditOp;

/// Compute the minimal edit script transforming `old` into `new`.
///
/// Matching is by identity only; matched identities whose content differs
/// become `Update`s. Both collections must be uniquely keyed.
///
/// Applied left to right, the script yields `new` exactly. It is emitted
/// in four phases: removals (descending positions), moves of the
/// identities the common-subsequence backbone does not pin in place,
/// insertions (ascending), and updates at final positions. Backbone ties
/// prefer earlier matches, so unrelated churn never moves stable items,
/// and `diff(x, x)` is always empty.
///
/// The backbone is an O(N·M) dynamic program; collections of UI-list size
/// are the intended inputs.
pub fn diff(old: &[Record], new: &[Record]) -> Vec<EditOp> {
    let old_pos: HashMap<RecordId, usize> =
        old.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
    let new_pos: HashMap<RecordId, usize> =
        new.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
    debug_assert_eq!(old_pos.len(), old.len(), "old collection must be uniquely keyed");
    debug_assert_eq!(new_pos.len(), new.len(), "new collection must be uniquely keyed");

    let mut script = Vec::new();

    // Identities as the script-so-far would leave them.
    let mut work: Vec<RecordId> = old.iter().map(|r| r.id).collect();

    // Removals run descending so earlier positions stay valid.
    for i in (0..old.len()).rev() {
        if !new_pos.contains_key(&old[i].id) {
            script.push(EditOp::Remove { pos: i });
            work.remove(i);
        }
    }

    // Moves: only identities outside the backbone move. Each one lands
    // directly after the closest preceding settled identity in the new
    // order, which keeps settled relative order intact and touches each
    // mover exactly once.
    let mut settled: HashSet<RecordId> = lcs_backbone(old, new);
    for (j, record) in new.iter().enumerate() {
        if !old_pos.contains_key(&record.id) || settled.contains(&record.id) {
            continue;
        }
        let Some(from) = work.iter().position(|id| *id == record.id) else {
            continue;
        };
        work.remove(from);

        let mut to = 0;
        for prior in new[..j].iter().rev() {
            if settled.contains(&prior.id) {
                if let Some(at) = work.iter().position(|id| *id == prior.id) {
                    to = at + 1;
                    break;
                }
            }
        }

        if from != to {
            script.push(EditOp::Move { from, to });
        }
        work.insert(to, record.id);
        settled.insert(record.id);
    }

    // Insertions run ascending at final positions.
    for (j, record) in new.iter().enumerate() {
        if !old_pos.contains_key(&record.id) {
            script.push(EditOp::Insert {
                pos: j,
                record: record.clone(),
            });
            work.insert(j, record.id);
        }
    }

    // Content changes at final positions.
    for (j, record) in new.iter().enumerate() {
        if let Some(&i) = old_pos.get(&record.id) {
            if old[i] != *record {
                script.push(EditOp::Update {
                    pos: j,
                    record: record.clone(),
                });
            }
        }
    }

    debug_assert_eq!(
        work,
        new.iter().map(|r| r.id).collect::<Vec<_>>(),
        "edit script must reproduce the new ordering"
    );
    script
}

/// Identities of one longest common subsequence of `old` and `new`,
/// resolved toward the earliest possible matches.
fn lcs_backbone(old: &[Record], new: &[Record]) -> HashSet<RecordId> {
    let n = old.len();
    let m = new.len();
    let mut backbone = HashSet::new();
    if n == 0 || m == 0 {
        return backbone;
    }

    // lengths[i * width + j] = LCS length of old[i..] and new[j..].
    let width = m + 1;
    let mut lengths = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if old[i].id == new[j].id {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i].id == new[j].id {
            backbone.insert(old[i].id);
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    backbone
}
