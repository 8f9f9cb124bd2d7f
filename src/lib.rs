//! Parallel shard fan-out, transaction-scoped session tracking, and result
//! aggregation for a partitioned SQL gateway.
//!
//! This crate is the scatter core a gateway process embeds: given a
//! `ShardGateway` (the actual per-shard RPC client) and a
//! `TransactionCoordinator` (commit/rollback across shards), it drives one
//! logical query out to many shards, merges their results, tracks
//! multi-shard transaction state on a caller-owned `Session`, and exposes
//! per-operation metrics. It never opens a connection or retries across
//! tablets itself — both are the embedding gateway's concern.

pub mod config;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod metrics;
pub mod result;
pub mod session;
pub mod shuffle;
pub mod split_query;
pub mod stream;
pub mod target;
pub mod telemetry;

pub use config::ScatterExecutorConfig;
pub use coordinator::TransactionCoordinator;
pub use error::{ErrorRecord, ExecutorError, ScatterError, ShardError, VtErrorCode};
pub use executor::{BatchShardRequest, ScatterExecutor};
pub use gateway::{
    BindVars, BoundShardQuery, ExecuteOptions, ResultStream, ShardGateway, StreamEvent,
    StreamPacket, TabletCacheStatus,
};
pub use metrics::{MetricsKey, MetricsSurface};
pub use result::{EventToken, FieldDescriptor, ResultExtras, Row, ScatterResult};
pub use session::{transaction_info, Session, ShardSession, TransactionInfo};
pub use shuffle::{shuffle_parts, FixedRandomSource, RandomSource, ThreadRandomSource};
pub use split_query::{BoundQuery, Placement, SplitQueryPart};
pub use stream::ReplyError;
pub use target::{TabletType, Target};
