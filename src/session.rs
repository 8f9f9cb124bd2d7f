//! Session-scoped multi-shard transaction bookkeeping (C2).
//!
//! A [`Session`] is thread-confined at the caller: the [`crate::driver`]
//! Fan-out Driver guarantees no two in-flight actions within a single
//! scatter call touch the same [`Target`], so appends from concurrent tasks
//! can never race on the same shard. Across calls the session belongs to
//! the calling task alone.

use crate::target::Target;

/// The pairing of a [`Target`] and the transaction id a shard minted for it.
///
/// `transaction_id` is non-zero by construction: zero means "no
/// transaction" and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSession {
    pub target: Target,
    pub transaction_id: i64,
}

/// Mutable, per-caller record of an in-flight multi-shard transaction.
///
/// Invariants: no two `ShardSession`s share the same `Target`; entries are
/// only ever appended, never reordered or removed, for the lifetime of one
/// transaction.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub in_transaction: bool,
    shard_sessions: Vec<ShardSession>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session-level transaction. Does not touch any shard state;
    /// shard transactions are opened lazily as shards are first touched.
    pub fn begin(&mut self) {
        self.in_transaction = true;
    }

    /// The shard sessions accumulated so far, in append order.
    pub fn shard_sessions(&self) -> &[ShardSession] {
        &self.shard_sessions
    }

    /// Clear all transaction state. Called by the caller once the
    /// Transaction Coordinator has committed or rolled back.
    pub fn reset(&mut self) {
        self.in_transaction = false;
        self.shard_sessions.clear();
    }

    fn find(&self, target: &Target) -> Option<i64> {
        self.shard_sessions
            .iter()
            .find(|s| &s.target == target)
            .map(|s| s.transaction_id)
    }

    /// Append a newly established shard session.
    ///
    /// No-op if a session for the same target already exists — the
    /// decision function in [`transaction_info`] never asks for a new
    /// transaction on a target that already has one, but this keeps the
    /// no-duplicate-Target invariant even if a caller appends directly.
    pub(crate) fn append(&mut self, session: ShardSession) {
        if self.find(&session.target).is_none() {
            self.shard_sessions.push(session);
        }
    }
}

/// The Driver's per-target decision before invoking a transactional
/// action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInfo {
    /// Whether the action should issue a combined `Begin + Execute`.
    pub should_begin: bool,
    /// The transaction id to reuse, or `0` if none is open yet.
    pub transaction_id: i64,
}

/// `transaction_info(target, session, not_in_transaction) -> (should_begin, tx_id)`.
///
/// - No session-level transaction open: run outside any transaction.
/// - Existing shard session for this target: reuse it.
/// - No existing session, but the caller forbade starting one
///   (`not_in_transaction`): run outside any transaction even though the
///   session is otherwise in a transaction.
/// - Otherwise: signal the gateway to mint a new transaction.
pub fn transaction_info(
    target: &Target,
    session: &Session,
    not_in_transaction: bool,
) -> TransactionInfo {
    if !session.in_transaction {
        return TransactionInfo {
            should_begin: false,
            transaction_id: 0,
        };
    }

    if let Some(tx_id) = session.find(target) {
        return TransactionInfo {
            should_begin: false,
            transaction_id: tx_id,
        };
    }

    if not_in_transaction {
        return TransactionInfo {
            should_begin: false,
            transaction_id: 0,
        };
    }

    TransactionInfo {
        should_begin: true,
        transaction_id: 0,
    }
}
