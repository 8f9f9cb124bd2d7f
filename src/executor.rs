//! Operation Facade (C6): the public surface composing C1–C5, C7, C8.
//!
//! One [`ScatterExecutor`] is typically constructed once per gateway
//! process and shared behind an `Arc` by every connection handler; all of
//! its state (`metrics`, `random_source`) is interior-mutable so calls can
//! run concurrently across unrelated [`Session`]s.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::ScatterExecutorConfig;
use crate::coordinator::TransactionCoordinator;
use crate::driver;
use crate::error::{ErrorRecord, ExecutorError, ScatterError, ShardError};
use crate::gateway::{
    BindVars, BoundShardQuery, ExecuteOptions, ResultStream, ShardGateway, StreamEvent,
    StreamPacket, TabletCacheStatus,
};
use crate::metrics::MetricsSurface;
use crate::result::ScatterResult;
use crate::session::Session;
use crate::shuffle::{self, RandomSource, ThreadRandomSource};
use crate::split_query::SplitQueryPart;
use crate::stream::{self, ReplyError};
use crate::target::{TabletType, Target};

/// One shard's slice of an `ExecuteBatch` call: its queries and the
/// absolute slot each query's result is written into in the final flat
/// result array.
#[derive(Debug, Clone)]
pub struct BatchShardRequest {
    pub shard: String,
    pub queries: Vec<BoundShardQuery>,
    pub result_indexes: Vec<usize>,
}

/// The Scatter Executor: parallel shard fan-out, transaction-scoped
/// session tracking, and result aggregation behind one facade.
pub struct ScatterExecutor {
    gateway: Arc<dyn ShardGateway>,
    coordinator: Arc<dyn TransactionCoordinator>,
    metrics: Arc<MetricsSurface>,
    random_source: Mutex<Box<dyn RandomSource>>,
}

impl ScatterExecutor {
    pub fn new(
        gateway: Arc<dyn ShardGateway>,
        coordinator: Arc<dyn TransactionCoordinator>,
        config: &ScatterExecutorConfig,
    ) -> Self {
        Self {
            gateway,
            coordinator,
            metrics: Arc::new(MetricsSurface::new(config.timings_metric_name.clone())),
            random_source: Mutex::new(Box::new(ThreadRandomSource::new())),
        }
    }

    /// Swap the shuffle's random source, returning the previous one. Tests
    /// use this to inject a [`crate::shuffle::FixedRandomSource`].
    pub fn set_random_source(&self, source: Box<dyn RandomSource>) -> Box<dyn RandomSource> {
        let mut guard = self.random_source.lock().unwrap();
        std::mem::replace(&mut *guard, source)
    }

    pub fn metrics(&self) -> &Arc<MetricsSurface> {
        &self.metrics
    }

    // -- Execute family -----------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        session: &mut Session,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        sql: &str,
        bind_variables: BindVars,
        not_in_transaction: bool,
        options: ExecuteOptions,
    ) -> Result<ScatterResult, ExecutorError> {
        let sql = sql.to_string();
        self.run_execute(
            "Execute",
            cancel,
            session,
            keyspace,
            shards,
            tablet_type,
            move |_shard| (sql.clone(), bind_variables.clone()),
            not_in_transaction,
            options,
        )
        .await
    }

    /// Reports under the `"Execute"` metrics name even though the entry
    /// point is `ExecuteMulti`, preserved as-is rather than "fixed".
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_multi(
        &self,
        cancel: &CancellationToken,
        session: &mut Session,
        keyspace: &str,
        shards: &[String],
        shard_bind_variables: &[BindVars],
        tablet_type: TabletType,
        sql: &str,
        not_in_transaction: bool,
        options: ExecuteOptions,
    ) -> Result<ScatterResult, ExecutorError> {
        if shards.len() != shard_bind_variables.len() {
            return Err(ExecutorError::CardinalityMismatch {
                shards: shards.len(),
                shard_vars: shard_bind_variables.len(),
            });
        }
        let per_shard_vars: HashMap<String, BindVars> = shards
            .iter()
            .cloned()
            .zip(shard_bind_variables.iter().cloned())
            .collect();
        let sql = sql.to_string();
        self.run_execute(
            "Execute",
            cancel,
            session,
            keyspace,
            shards,
            tablet_type,
            move |shard| (sql.clone(), per_shard_vars.get(shard).cloned().unwrap_or_default()),
            not_in_transaction,
            options,
        )
        .await
    }

    /// Also rolled up under `"Execute"`, same as `execute_multi`.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_entity_ids(
        &self,
        cancel: &CancellationToken,
        session: &mut Session,
        keyspace: &str,
        shards: &[String],
        shard_sql: &[String],
        shard_bind_variables: &[BindVars],
        tablet_type: TabletType,
        not_in_transaction: bool,
        options: ExecuteOptions,
    ) -> Result<ScatterResult, ExecutorError> {
        if shards.len() != shard_bind_variables.len() || shards.len() != shard_sql.len() {
            return Err(ExecutorError::CardinalityMismatch {
                shards: shards.len(),
                shard_vars: shard_bind_variables.len(),
            });
        }
        let per_shard: HashMap<String, (String, BindVars)> = shards
            .iter()
            .cloned()
            .zip(shard_sql.iter().cloned().zip(shard_bind_variables.iter().cloned()))
            .collect();
        self.run_execute(
            "Execute",
            cancel,
            session,
            keyspace,
            shards,
            tablet_type,
            move |shard| per_shard.get(shard).cloned().unwrap_or_default(),
            not_in_transaction,
            options,
        )
        .await
    }

    /// Shared transactional fan-out for the `Execute*` facades: `per_shard`
    /// resolves each shard's sql + bind variables, so `Execute` (one query
    /// for every shard), `ExecuteMulti` (per-shard bind vars) and
    /// `ExecuteEntityIds` (per-shard sql and bind vars) all compose this
    /// one helper — a private helper shared by role, not a class hierarchy.
    #[allow(clippy::too_many_arguments)]
    async fn run_execute<S>(
        &self,
        op_name: &str,
        cancel: &CancellationToken,
        session: &mut Session,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        per_shard: S,
        not_in_transaction: bool,
        options: ExecuteOptions,
    ) -> Result<ScatterResult, ExecutorError>
    where
        S: Fn(&str) -> (String, BindVars) + Send + Sync + 'static,
    {
        let query_id = uuid::Uuid::new_v4();
        tracing::debug!(%query_id, op_name, keyspace, shard_count = shards.len(), "dispatching scatter call");

        let accumulator = Arc::new(Mutex::new(ScatterResult::new()));
        let gateway = self.gateway.clone();
        let cancel = cancel.clone();
        let options = Arc::new(options);
        let per_shard = Arc::new(per_shard);
        let acc = accumulator.clone();

        let errors = driver::multi_go_transaction(
            self.metrics.clone(),
            op_name,
            keyspace,
            shards,
            tablet_type,
            session,
            not_in_transaction,
            move |target, should_begin, tx_id| {
                let gateway = gateway.clone();
                let cancel = cancel.clone();
                let options = options.clone();
                let per_shard = per_shard.clone();
                let acc = acc.clone();
                async move {
                    let (sql, bind_variables) = per_shard(&target.shard);
                    if should_begin {
                        let (result, new_tx_id) = gateway
                            .begin_execute(&cancel, &target, &sql, &bind_variables, &options)
                            .await;
                        match result {
                            Ok(r) => {
                                acc.lock().unwrap().append(r);
                                (new_tx_id, Ok(()))
                            }
                            Err(e) => (new_tx_id, Err(e)),
                        }
                    } else {
                        match gateway
                            .execute(&cancel, &target, &sql, &bind_variables, tx_id, &options)
                            .await
                        {
                            Ok(r) => {
                                acc.lock().unwrap().append(r);
                                (0, Ok(()))
                            }
                            Err(e) => (0, Err(e)),
                        }
                    }
                }
            },
        )
        .await;

        self.finish_transactional(session, errors).await?;
        Ok(Arc::try_unwrap(accumulator)
            .expect("fan-out barrier completed")
            .into_inner()
            .unwrap())
    }

    /// Each shard carries a list of queries and a parallel list of
    /// absolute result-array slots; results are merged into their
    /// designated slot with the same `append` rules as every other
    /// aggregate, so multiple batch items targeting the same slot merge
    /// correctly.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_batch(
        &self,
        cancel: &CancellationToken,
        session: &mut Session,
        keyspace: &str,
        requests: Vec<BatchShardRequest>,
        tablet_type: TabletType,
        as_transaction: bool,
        not_in_transaction: bool,
        options: ExecuteOptions,
    ) -> Result<Vec<ScatterResult>, ExecutorError> {
        for request in &requests {
            if request.queries.len() != request.result_indexes.len() {
                return Err(ExecutorError::CardinalityMismatch {
                    shards: request.queries.len(),
                    shard_vars: request.result_indexes.len(),
                });
            }
        }

        let slot_count = requests
            .iter()
            .flat_map(|r| r.result_indexes.iter())
            .copied()
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);
        let shards: Vec<String> = requests.iter().map(|r| r.shard.clone()).collect();
        let by_shard: HashMap<String, (Vec<BoundShardQuery>, Vec<usize>)> = requests
            .into_iter()
            .map(|r| (r.shard, (r.queries, r.result_indexes)))
            .collect();

        let accumulator = Arc::new(Mutex::new(vec![ScatterResult::new(); slot_count]));
        let gateway = self.gateway.clone();
        let cancel = cancel.clone();
        let options = Arc::new(options);
        let by_shard = Arc::new(by_shard);
        let acc = accumulator.clone();

        let errors = driver::multi_go_transaction(
            self.metrics.clone(),
            "ExecuteBatch",
            keyspace,
            &shards,
            tablet_type,
            session,
            not_in_transaction,
            move |target, should_begin, tx_id| {
                let gateway = gateway.clone();
                let cancel = cancel.clone();
                let options = options.clone();
                let by_shard = by_shard.clone();
                let acc = acc.clone();
                async move {
                    let (queries, result_indexes) =
                        by_shard.get(&target.shard).cloned().unwrap_or_default();
                    if should_begin {
                        let (result, new_tx_id) = gateway
                            .begin_execute_batch(&cancel, &target, &queries, as_transaction, &options)
                            .await;
                        match result {
                            Ok(results) => {
                                merge_batch_results(&acc, results, result_indexes);
                                (new_tx_id, Ok(()))
                            }
                            Err(e) => (new_tx_id, Err(e)),
                        }
                    } else {
                        match gateway
                            .execute_batch(&cancel, &target, &queries, as_transaction, tx_id, &options)
                            .await
                        {
                            Ok(results) => {
                                merge_batch_results(&acc, results, result_indexes);
                                (0, Ok(()))
                            }
                            Err(e) => (0, Err(e)),
                        }
                    }
                }
            },
        )
        .await;

        self.finish_transactional(session, errors).await?;
        Ok(Arc::try_unwrap(accumulator)
            .expect("fan-out barrier completed")
            .into_inner()
            .unwrap())
    }

    async fn finish_transactional(
        &self,
        session: &mut Session,
        errors: ErrorRecord,
    ) -> Result<(), ExecutorError> {
        match ScatterError::aggregate(errors.into_vec()) {
            None => Ok(()),
            Some(scatter_err) => {
                tracing::warn!(
                    retryable = scatter_err.retryable,
                    error_count = scatter_err.errors.len(),
                    shard_sessions = session.shard_sessions().len(),
                    "scatter call failed, invoking rollback"
                );
                self.coordinator.rollback_if_needed(&scatter_err, session).await;
                tracing::error!(
                    aggregate_code = ?scatter_err.aggregate_code,
                    "scatter call aggregated error"
                );
                Err(ExecutorError::Scatter(scatter_err))
            }
        }
    }

    // -- Streaming ------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn stream_execute<F>(
        &self,
        cancel: &CancellationToken,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        sql: &str,
        bind_variables: BindVars,
        options: ExecuteOptions,
        send_reply: F,
    ) -> Option<ScatterError>
    where
        F: Fn(StreamPacket) -> Result<(), ReplyError> + Send + Sync + 'static,
    {
        let shard_bind_variables: HashMap<String, BindVars> = shards
            .iter()
            .cloned()
            .map(|shard| (shard, bind_variables.clone()))
            .collect();
        stream::stream_execute(
            self.metrics.clone(),
            "StreamExecute",
            keyspace,
            shards,
            tablet_type,
            self.gateway.clone(),
            cancel.clone(),
            sql.to_string(),
            shard_bind_variables,
            options,
            send_reply,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn stream_execute_multi<F>(
        &self,
        cancel: &CancellationToken,
        keyspace: &str,
        shards: &[String],
        shard_bind_variables: &[BindVars],
        tablet_type: TabletType,
        sql: &str,
        options: ExecuteOptions,
        send_reply: F,
    ) -> Result<Option<ScatterError>, ExecutorError>
    where
        F: Fn(StreamPacket) -> Result<(), ReplyError> + Send + Sync + 'static,
    {
        if shards.len() != shard_bind_variables.len() {
            return Err(ExecutorError::CardinalityMismatch {
                shards: shards.len(),
                shard_vars: shard_bind_variables.len(),
            });
        }
        let map: HashMap<String, BindVars> = shards
            .iter()
            .cloned()
            .zip(shard_bind_variables.iter().cloned())
            .collect();
        Ok(stream::stream_execute(
            self.metrics.clone(),
            "StreamExecute",
            keyspace,
            shards,
            tablet_type,
            self.gateway.clone(),
            cancel.clone(),
            sql.to_string(),
            map,
            options,
            send_reply,
        )
        .await)
    }

    // -- Split query -----------------------------------------------------

    pub async fn split_query_key_range(
        &self,
        cancel: &CancellationToken,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        query: BoundShardQuery,
        split_column: Vec<String>,
        split_count: i64,
    ) -> Result<Vec<SplitQueryPart>, ExecutorError> {
        self.run_split_query(
            "SplitQueryKeyRange",
            keyspace,
            shards,
            tablet_type,
            cancel,
            query,
            split_column,
            split_count,
        )
        .await
    }

    pub async fn split_query_custom_sharding(
        &self,
        cancel: &CancellationToken,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        query: BoundShardQuery,
        split_column: Vec<String>,
        split_count: i64,
    ) -> Result<Vec<SplitQueryPart>, ExecutorError> {
        self.run_split_query(
            "SplitQueryCustomSharding",
            keyspace,
            shards,
            tablet_type,
            cancel,
            query,
            split_column,
            split_count,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_split_query(
        &self,
        op_name: &str,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        cancel: &CancellationToken,
        query: BoundShardQuery,
        split_column: Vec<String>,
        split_count: i64,
    ) -> Result<Vec<SplitQueryPart>, ExecutorError> {
        let gateway = self.gateway.clone();
        let cancel = cancel.clone();
        let query = Arc::new(query);
        let split_column = Arc::new(split_column);
        self.gather_split_query(op_name, keyspace, shards, tablet_type, move |target| {
            let gateway = gateway.clone();
            let cancel = cancel.clone();
            let query = query.clone();
            let split_column = split_column.clone();
            async move {
                gateway
                    .split_query(&cancel, &target, &query, &split_column, split_count)
                    .await
            }
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn split_query_v2(
        &self,
        cancel: &CancellationToken,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        query: BoundShardQuery,
        split_columns: Vec<String>,
        per_shard_split_count: i64,
        num_rows_per_part: i64,
        algorithm: &str,
    ) -> Result<Vec<SplitQueryPart>, ExecutorError> {
        let gateway = self.gateway.clone();
        let cancel = cancel.clone();
        let query = Arc::new(query);
        let split_columns = Arc::new(split_columns);
        let algorithm: Arc<str> = Arc::from(algorithm);
        self.gather_split_query("SplitQueryV2", keyspace, shards, tablet_type, move |target| {
            let gateway = gateway.clone();
            let cancel = cancel.clone();
            let query = query.clone();
            let split_columns = split_columns.clone();
            let algorithm = algorithm.clone();
            async move {
                gateway
                    .split_query_v2(
                        &cancel,
                        &target,
                        &query,
                        &split_columns,
                        per_shard_split_count,
                        num_rows_per_part,
                        &algorithm,
                    )
                    .await
            }
        })
        .await
    }

    /// Non-transactional fan-out shared by every `SplitQuery*` facade:
    /// `action` runs the shard RPC, the parts from every shard are
    /// collected, and the whole aggregate is shuffled once (C8) before
    /// being returned.
    async fn gather_split_query<A, Fut>(
        &self,
        op_name: &str,
        keyspace: &str,
        shards: &[String],
        tablet_type: TabletType,
        action: A,
    ) -> Result<Vec<SplitQueryPart>, ExecutorError>
    where
        A: Fn(Target) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<SplitQueryPart>, ShardError>> + Send + 'static,
    {
        let accumulator = Arc::new(Mutex::new(Vec::new()));
        let acc = accumulator.clone();

        let errors = driver::multi_go(
            self.metrics.clone(),
            op_name,
            keyspace,
            shards,
            tablet_type,
            move |target| {
                let acc = acc.clone();
                let fut = action(target);
                async move {
                    match fut.await {
                        Ok(parts) => {
                            acc.lock().unwrap().extend(parts);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
            },
        )
        .await;

        if let Some(scatter_err) = ScatterError::aggregate(errors.into_vec()) {
            return Err(ExecutorError::Scatter(scatter_err));
        }

        let mut parts = Arc::try_unwrap(accumulator)
            .expect("fan-out barrier completed")
            .into_inner()
            .unwrap();
        let mut source = self.random_source.lock().unwrap();
        tracing::debug!(op_name, part_count = parts.len(), "shuffling split query parts");
        shuffle::shuffle_parts(&mut parts, source.as_mut());
        Ok(parts)
    }

    // -- Direct gateway forwards ------------------------------------------

    pub async fn update_stream(
        &self,
        cancel: &CancellationToken,
        keyspace: &str,
        shard: &str,
        tablet_type: TabletType,
        position: &str,
        timestamp: i64,
    ) -> Result<Box<dyn ResultStream<StreamEvent>>, ExecutorError> {
        let target = Target::new(keyspace.to_string(), shard.to_string(), tablet_type);
        self.gateway
            .update_stream(cancel, &target, position, timestamp)
            .await
            .map_err(|e| {
                ExecutorError::Scatter(ScatterError::aggregate(vec![e]).expect("one error is non-empty"))
            })
    }

    pub async fn close(&self) {
        self.gateway.close().await;
    }

    pub async fn cache_status(&self) -> Vec<TabletCacheStatus> {
        self.gateway.cache_status().await
    }
}

fn merge_batch_results(
    accumulator: &Mutex<Vec<ScatterResult>>,
    results: Vec<ScatterResult>,
    result_indexes: Vec<usize>,
) {
    let mut acc = accumulator.lock().unwrap();
    for (result, index) in results.into_iter().zip(result_indexes) {
        acc[index].append(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct UnreachableGateway;

    #[async_trait]
    impl ShardGateway for UnreachableGateway {
        async fn execute(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &str,
            _: &BindVars,
            _: i64,
            _: &ExecuteOptions,
        ) -> Result<ScatterResult, ShardError> {
            unreachable!("cardinality check must short-circuit before any gateway call")
        }

        async fn begin_execute(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &str,
            _: &BindVars,
            _: &ExecuteOptions,
        ) -> (Result<ScatterResult, ShardError>, i64) {
            unreachable!()
        }

        async fn execute_batch(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &[BoundShardQuery],
            _: bool,
            _: i64,
            _: &ExecuteOptions,
        ) -> Result<Vec<ScatterResult>, ShardError> {
            unreachable!()
        }

        async fn begin_execute_batch(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &[BoundShardQuery],
            _: bool,
            _: &ExecuteOptions,
        ) -> (Result<Vec<ScatterResult>, ShardError>, i64) {
            unreachable!()
        }

        async fn stream_execute(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &str,
            _: &BindVars,
            _: &ExecuteOptions,
        ) -> Result<Box<dyn ResultStream<StreamPacket>>, ShardError> {
            unreachable!()
        }

        async fn split_query(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &BoundShardQuery,
            _: &[String],
            _: i64,
        ) -> Result<Vec<SplitQueryPart>, ShardError> {
            unreachable!()
        }

        async fn split_query_v2(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &BoundShardQuery,
            _: &[String],
            _: i64,
            _: i64,
            _: &str,
        ) -> Result<Vec<SplitQueryPart>, ShardError> {
            unreachable!()
        }

        async fn update_stream(
            &self,
            _: &CancellationToken,
            _: &Target,
            _: &str,
            _: i64,
        ) -> Result<Box<dyn ResultStream<StreamEvent>>, ShardError> {
            unreachable!()
        }

        async fn close(&self) {}

        async fn cache_status(&self) -> Vec<TabletCacheStatus> {
            vec![]
        }
    }

    struct NoopCoordinator;

    #[async_trait]
    impl TransactionCoordinator for NoopCoordinator {
        async fn rollback_if_needed(&self, _error: &ScatterError, _session: &Session) {}
    }

    fn executor() -> ScatterExecutor {
        ScatterExecutor::new(
            Arc::new(UnreachableGateway),
            Arc::new(NoopCoordinator),
            &ScatterExecutorConfig::default(),
        )
    }

    #[tokio::test]
    async fn execute_multi_rejects_mismatched_cardinality() {
        let executor = executor();
        let mut session = Session::new();
        let err = executor
            .execute_multi(
                &CancellationToken::new(),
                &mut session,
                "ks",
                &["-80".to_string(), "80-".to_string()],
                &[vec![]],
                TabletType::Primary,
                "select 1",
                false,
                ExecuteOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::CardinalityMismatch { shards: 2, shard_vars: 1 }
        ));
    }

    #[tokio::test]
    async fn execute_batch_rejects_mismatched_request_cardinality() {
        let executor = executor();
        let mut session = Session::new();
        let requests = vec![BatchShardRequest {
            shard: "-80".to_string(),
            queries: vec![BoundShardQuery { sql: "select 1".into(), bind_variables: vec![] }],
            result_indexes: vec![0, 1],
        }];
        let err = executor
            .execute_batch(
                &CancellationToken::new(),
                &mut session,
                "ks",
                requests,
                TabletType::Primary,
                true,
                false,
                ExecuteOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::CardinalityMismatch { shards: 1, shard_vars: 2 }
        ));
    }

    #[tokio::test]
    async fn empty_shard_split_query_returns_empty_without_shuffling() {
        let executor = executor();
        let parts = executor
            .split_query_key_range(
                &CancellationToken::new(),
                "ks",
                &[],
                TabletType::Primary,
                BoundShardQuery { sql: "select 1".into(), bind_variables: vec![] },
                vec!["id".into()],
                4,
            )
            .await
            .unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn batch_merge_writes_into_the_designated_slot() {
        let acc = Mutex::new(vec![ScatterResult::new(), ScatterResult::new()]);
        merge_batch_results(
            &acc,
            vec![ScatterResult { rows_affected: 3, ..Default::default() }],
            vec![1],
        );
        let acc = acc.into_inner().unwrap();
        assert_eq!(acc[0].rows_affected, 0);
        assert_eq!(acc[1].rows_affected, 3);
    }
}
