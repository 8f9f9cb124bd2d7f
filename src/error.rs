//! Error classification and the crate's error taxonomy.

use std::sync::Mutex;

use crate::target::Target;

/// Error codes in a fixed, total severity ordering (least to most severe).
/// `aggregate_code` in [`ScatterError`] is the maximum of the codes of all
/// contributing errors under this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VtErrorCode {
    Ok,
    BadInput,
    IntegrityError,
    QueryNotServed,
    InternalError,
    TransientError,
    Unauthenticated,
    ResourceExhausted,
    Aborted,
    Unknown,
}

impl VtErrorCode {
    /// Client-caused errors are timed but never counted as tablet faults.
    pub fn is_client_caused(&self) -> bool {
        matches!(self, VtErrorCode::IntegrityError | VtErrorCode::BadInput)
    }

    /// Eligible to contribute to a `retryable = true` aggregate, provided
    /// it was also raised outside a transaction.
    fn is_retryable_outside_transaction(&self) -> bool {
        matches!(self, VtErrorCode::QueryNotServed | VtErrorCode::InternalError)
    }
}

/// A single per-shard failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("shard {target}: {message}")]
pub struct ShardError {
    pub target: Target,
    pub code: VtErrorCode,
    pub in_transaction: bool,
    pub message: String,
}

impl ShardError {
    pub fn new(
        target: Target,
        code: VtErrorCode,
        in_transaction: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target,
            code,
            in_transaction,
            message: message.into(),
        }
    }

    fn qualifies_for_retryable(&self) -> bool {
        !self.in_transaction && self.code.is_retryable_outside_transaction()
    }
}

/// The aggregate of every per-shard error from one scatter call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("scatter failed on {} shard(s) (retryable={retryable}): {}", errors.len(), join_messages(errors))]
pub struct ScatterError {
    pub retryable: bool,
    pub aggregate_code: VtErrorCode,
    pub errors: Vec<ShardError>,
}

fn join_messages(errors: &[ShardError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ScatterError {
    /// Classify a non-empty set of per-shard errors into one aggregate.
    /// Returns `None` if `errors` is empty — callers should treat an empty
    /// error set as "no failure", not as a vacuously-retryable aggregate.
    pub fn aggregate(errors: Vec<ShardError>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }

        let retryable = errors.iter().all(|e| e.qualifies_for_retryable());
        let aggregate_code = errors
            .iter()
            .map(|e| e.code)
            .max()
            .unwrap_or(VtErrorCode::Unknown);

        Some(ScatterError {
            retryable,
            aggregate_code,
            errors,
        })
    }
}

/// Top-level error returned by [`crate::executor::ScatterExecutor`]
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Scatter(#[from] ScatterError),

    /// `|shards| = |shard_vars|` must hold in `ExecuteMulti`/
    /// `StreamExecuteMulti`. A mismatch is an unrecoverable programming
    /// error, not a user-facing scatter failure.
    #[error("cardinality mismatch: {shards} shard(s) but {shard_vars} bind-var set(s)")]
    CardinalityMismatch { shards: usize, shard_vars: usize },

    /// The ambient cancellation token fired before or during dispatch.
    #[error("scatter call cancelled")]
    Cancelled,
}

/// Thread-safe accumulator for per-shard errors across an in-flight fan-out
/// call. Append is safe under concurrent access from every spawned shard
/// task; the Driver reads it back once, after its barrier.
#[derive(Debug, Default)]
pub struct ErrorRecord {
    errors: Mutex<Vec<ShardError>>,
}

impl ErrorRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: ShardError) {
        self.errors.lock().unwrap().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().unwrap().is_empty()
    }

    /// Drain the recorded errors. Typically called once, after the
    /// Driver's barrier, to hand the collected errors to the Error
    /// Aggregator.
    pub fn into_vec(self) -> Vec<ShardError> {
        self.errors.into_inner().unwrap()
    }
}
