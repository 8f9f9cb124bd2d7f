//! The Transaction Coordinator interface this crate consumes. Commits or
//! rolls back a set of shard sessions; this crate never implements
//! coordination itself, only invokes it on failure.

use async_trait::async_trait;

use crate::error::ScatterError;
use crate::session::Session;

/// Rolls back (or otherwise reconciles) whatever shard sessions are open in
/// `session`, given the error that triggered the rollback. Idempotent;
/// implementations log but do not propagate their own errors — the trait
/// method therefore returns `()`.
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    async fn rollback_if_needed(&self, error: &ScatterError, session: &Session);
}
