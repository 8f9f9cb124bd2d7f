//! The Shard Gateway interface this crate consumes.
//!
//! The gateway performs the actual per-shard RPC and hides per-tablet
//! failover; this crate never opens a connection itself.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ShardError;
use crate::result::ScatterResult;
use crate::split_query::SplitQueryPart;
use crate::target::Target;

/// Opaque bind variables for one query. The wire encoding is the external
/// collaborator's concern; this crate only threads the map through.
pub type BindVars = Vec<(String, Vec<u8>)>;

/// One query plus its bind variables, as used by the batch RPCs.
#[derive(Debug, Clone)]
pub struct BoundShardQuery {
    pub sql: String,
    pub bind_variables: BindVars,
}

/// A single streamed packet: either a field header (non-empty `fields`,
/// no rows) or a batch of rows.
#[derive(Debug, Clone)]
pub struct StreamPacket {
    pub fields: Vec<crate::result::FieldDescriptor>,
    pub rows: Vec<crate::result::Row>,
}

/// A replication-log event, as yielded by `UpdateStream`.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub payload: Vec<u8>,
}

/// Per-call options forwarded to the gateway verbatim (consistency level,
/// workload tags, …). Opaque to the scatter core.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub options: Vec<(String, String)>,
}

/// One node's health/cache snapshot, as returned by `CacheStatus`.
#[derive(Debug, Clone)]
pub struct TabletCacheStatus {
    pub target: Target,
    pub status: String,
}

/// A stream of results or events from a single shard. Implementors
/// typically wrap an `async_stream`/`tokio::sync::mpsc::Receiver` bridge;
/// this crate only needs `next()`.
#[async_trait]
pub trait ResultStream<T>: Send {
    async fn next(&mut self) -> Option<Result<T, ShardError>>;
}

/// The per-shard RPC surface the Fan-out Driver and facade invoke. One
/// implementation typically fronts many physical tablets and performs
/// failover internally — entirely hidden from this crate.
#[async_trait]
pub trait ShardGateway: Send + Sync {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        sql: &str,
        bind_variables: &BindVars,
        transaction_id: i64,
        options: &ExecuteOptions,
    ) -> Result<ScatterResult, ShardError>;

    /// Begin a shard transaction and execute in one round trip. The
    /// transaction id is returned alongside the outcome rather than nested
    /// inside it: a tablet that successfully opens a transaction but then
    /// fails to execute still reports the minted id, so the Driver can
    /// record the `ShardSession` before propagating the failure. `0` means
    /// no transaction was opened.
    async fn begin_execute(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        sql: &str,
        bind_variables: &BindVars,
        options: &ExecuteOptions,
    ) -> (Result<ScatterResult, ShardError>, i64);

    async fn execute_batch(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        queries: &[BoundShardQuery],
        as_transaction: bool,
        transaction_id: i64,
        options: &ExecuteOptions,
    ) -> Result<Vec<ScatterResult>, ShardError>;

    /// Same transaction-id contract as [`ShardGateway::begin_execute`].
    async fn begin_execute_batch(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        queries: &[BoundShardQuery],
        as_transaction: bool,
        options: &ExecuteOptions,
    ) -> (Result<Vec<ScatterResult>, ShardError>, i64);

    async fn stream_execute(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        sql: &str,
        bind_variables: &BindVars,
        options: &ExecuteOptions,
    ) -> Result<Box<dyn ResultStream<StreamPacket>>, ShardError>;

    async fn split_query(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        query: &BoundShardQuery,
        split_column: &[String],
        split_count: i64,
    ) -> Result<Vec<SplitQueryPart>, ShardError>;

    #[allow(clippy::too_many_arguments)]
    async fn split_query_v2(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        query: &BoundShardQuery,
        split_columns: &[String],
        per_shard_split_count: i64,
        num_rows_per_part: i64,
        algorithm: &str,
    ) -> Result<Vec<SplitQueryPart>, ShardError>;

    async fn update_stream(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        position: &str,
        timestamp: i64,
    ) -> Result<Box<dyn ResultStream<StreamEvent>>, ShardError>;

    async fn close(&self);

    async fn cache_status(&self) -> Vec<TabletCacheStatus>;
}
