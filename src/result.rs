//! Result Aggregator (C3): merges per-shard result sets under a single
//! mutex into one logical [`ScatterResult`].
//!
//! The merge rules are deliberately asymmetric in a few places (insert-id
//! "last wins", extras downgrading on partial absence) — see the Open
//! Question note in `DESIGN.md` before "fixing" any of them.

use std::cmp::Ordering;

/// A single column's wire metadata. Opaque to this crate: the Row/Field
/// wire-format decoder is an external collaborator; this crate only needs
/// field descriptors to compare for equality and to forward verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_name: String,
}

/// One row of decoded column values, already produced by the external
/// wire-format decoder. Opaque byte payload per column; this crate never
/// interprets row contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub values: Vec<Option<Vec<u8>>>,
}

/// A per-read replication-position marker. Aggregates across shards by
/// minimum, in whatever total order the surrounding
/// gateway's replication positions define — here a simple
/// `(timestamp, shard_positions)` pair ordered lexicographically by
/// timestamp, which is the conservative choice when shard-local position
/// formats aren't comparable across shards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventToken {
    pub timestamp: i64,
    pub shard_positions: Vec<(String, String)>,
}

/// `minimum` treats either side being absent as the result being absent —
/// absence of a watermark from any contributing shard means the aggregate
/// has no safe watermark to report.
fn min_event_token(a: Option<EventToken>, b: Option<EventToken>) -> Option<EventToken> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a.cmp(&b) == Ordering::Greater { b } else { a }),
        _ => None,
    }
}

/// Extra, best-effort consistency metadata attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultExtras {
    pub event_token: Option<EventToken>,
    /// True only if every contributing shard observed the read at or after
    /// its replication watermark.
    pub fresher: bool,
}

/// A merged result set.
#[derive(Debug, Clone, Default)]
pub struct ScatterResult {
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    pub insert_id: u64,
    pub extras: Option<ResultExtras>,
}

impl ScatterResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `inner`, a single shard's result, into `self` (the
    /// accumulator). Callers hold the per-call mutex protecting the
    /// accumulator for the duration of this call and do no I/O while
    /// holding it.
    pub fn append(&mut self, inner: ScatterResult) {
        // 1. Empty shard response: nothing to merge.
        if inner.rows_affected == 0 && inner.fields.is_empty() {
            return;
        }

        // 2. First non-empty field header wins.
        if self.fields.is_empty() {
            self.fields = inner.fields;
        }

        // 3. Sum rows_affected.
        self.rows_affected += inner.rows_affected;

        // 4. Last non-zero insert_id wins (scheduling-dependent; see
        //    DESIGN.md Open Question 1 — do not invent stricter semantics).
        if inner.insert_id != 0 {
            self.insert_id = inner.insert_id;
        }

        // 5. Extras merge.
        if self.rows.is_empty() {
            // First contribution: copy verbatim.
            self.extras = inner.extras;
        } else {
            match inner.extras {
                None => {
                    // Presence asymmetry downgrades the aggregate.
                    if let Some(extras) = self.extras.as_mut() {
                        extras.event_token = None;
                        extras.fresher = false;
                    }
                }
                Some(inner_extras) => {
                    let merged = match self.extras.take() {
                        Some(acc_extras) => ResultExtras {
                            event_token: min_event_token(
                                acc_extras.event_token,
                                inner_extras.event_token,
                            ),
                            fresher: acc_extras.fresher && inner_extras.fresher,
                        },
                        None => inner_extras,
                    };
                    self.extras = Some(merged);
                }
            }
        }

        // 6. Append rows, preserving per-shard internal order.
        self.rows.extend(inner.rows);
    }
}
