//! Fan-out Driver: schedules per-shard actions in parallel and collects
//! their errors.
//!
//! A `tokio::spawn` per target, a `handle.await` barrier, and per-target
//! timing around each call. The facade (`executor.rs`) owns one ambient
//! runtime; this module is purely `async fn`, spawned onto whatever
//! runtime the caller is already driving.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinSet;

use crate::error::{ErrorRecord, ShardError};
use crate::metrics::{MetricsKey, MetricsSurface};
use crate::session::{transaction_info, Session, ShardSession, TransactionInfo};
use crate::target::{TabletType, Target};

/// Deduplicate by set identity; order of the result is not meaningful.
fn dedup_shards(shards: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(shards.len());
    let mut out = Vec::with_capacity(shards.len());
    for s in shards {
        if seen.insert(s.clone()) {
            out.push(s.clone());
        }
    }
    out
}

async fn timed<Fut>(
    metrics: &MetricsSurface,
    errors: &ErrorRecord,
    op_name: &str,
    target: &Target,
    action_future: Fut,
) where
    Fut: Future<Output = Result<(), ShardError>>,
{
    let key = MetricsKey::new(op_name.to_string(), target);
    tracing::debug!(
        op_name,
        keyspace = %target.keyspace,
        shard = %target.shard,
        tablet_type = target.tablet_type.as_str(),
        "dispatching shard action"
    );
    let start = Instant::now();
    let result = action_future.await;
    metrics.record_timing(key.clone(), start.elapsed());
    if let Err(err) = result {
        tracing::debug!(
            op_name,
            keyspace = %target.keyspace,
            shard = %target.shard,
            tablet_type = target.tablet_type.as_str(),
            code = ?err.code,
            "shard action failed"
        );
        // Client-caused errors are timed but not counted as tablet faults.
        if !err.code.is_client_caused() {
            metrics.record_error(key);
        }
        errors.push(err);
    }
}

/// Non-transactional fan-out. `action(target)` performs the gateway call
/// and merges its own success payload (e.g. into a [`crate::result::ScatterResult`]
/// accumulator under its own mutex); the Driver only needs to know whether
/// it failed.
pub async fn multi_go<A, Fut>(
    metrics: Arc<MetricsSurface>,
    op_name: &str,
    keyspace: &str,
    shards: &[String],
    tablet_type: TabletType,
    action: A,
) -> ErrorRecord
where
    A: Fn(Target) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ShardError>> + Send + 'static,
{
    let unique = dedup_shards(shards);
    if unique.is_empty() {
        return ErrorRecord::new();
    }

    if unique.len() == 1 {
        let errors = ErrorRecord::new();
        let target = Target::new(keyspace.to_string(), unique.into_iter().next().unwrap(), tablet_type);
        timed(&metrics, &errors, op_name, &target, action(target.clone())).await;
        return errors;
    }

    let action = Arc::new(action);
    let errors = Arc::new(ErrorRecord::new());
    let mut set = JoinSet::new();
    for shard in unique {
        let target = Target::new(keyspace.to_string(), shard, tablet_type);
        let action = action.clone();
        let metrics = metrics.clone();
        let errors = errors.clone();
        let op_name = op_name.to_string();
        set.spawn(async move {
            timed(&metrics, &errors, &op_name, &target, action(target.clone())).await;
        });
    }
    while set.join_next().await.is_some() {}

    Arc::try_unwrap(errors).expect("all spawned fan-out tasks have completed by this point")
}

async fn timed_transactional<Fut>(
    metrics: &MetricsSurface,
    errors: &ErrorRecord,
    new_sessions: &Mutex<Vec<ShardSession>>,
    op_name: &str,
    target: &Target,
    info: TransactionInfo,
    action_future: Fut,
) where
    Fut: Future<Output = (i64, Result<(), ShardError>)>,
{
    let key = MetricsKey::new(op_name.to_string(), target);
    tracing::debug!(
        op_name,
        keyspace = %target.keyspace,
        shard = %target.shard,
        tablet_type = target.tablet_type.as_str(),
        should_begin = info.should_begin,
        transaction_id = info.transaction_id,
        "dispatching transactional shard action"
    );
    let start = Instant::now();
    let (new_tx_id, result) = action_future.await;
    metrics.record_timing(key.clone(), start.elapsed());

    // Append the shard session even if the action also failed, so the
    // Coordinator can roll back work that began before the failure.
    if info.should_begin && new_tx_id != 0 {
        tracing::debug!(
            keyspace = %target.keyspace,
            shard = %target.shard,
            transaction_id = new_tx_id,
            "shard session begun"
        );
        new_sessions.lock().unwrap().push(ShardSession {
            target: target.clone(),
            transaction_id: new_tx_id,
        });
    }

    if let Err(err) = result {
        tracing::debug!(
            op_name,
            keyspace = %target.keyspace,
            shard = %target.shard,
            tablet_type = target.tablet_type.as_str(),
            code = ?err.code,
            "transactional shard action failed"
        );
        if !err.code.is_client_caused() {
            metrics.record_error(key);
        }
        errors.push(err);
    }
}

/// Transactional fan-out. `action(target, should_begin, tx_id)` returns the
/// newly minted transaction id (`0` if none) and the outcome.
pub async fn multi_go_transaction<A, Fut>(
    metrics: Arc<MetricsSurface>,
    op_name: &str,
    keyspace: &str,
    shards: &[String],
    tablet_type: TabletType,
    session: &mut Session,
    not_in_transaction: bool,
    action: A,
) -> ErrorRecord
where
    A: Fn(Target, bool, i64) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (i64, Result<(), ShardError>)> + Send + 'static,
{
    let unique = dedup_shards(shards);
    if unique.is_empty() {
        return ErrorRecord::new();
    }

    // Decisions are made synchronously, before any task is spawned: the
    // Driver's Target-uniqueness invariant means no two decisions race on
    // the same shard, so reading `session` here (and only here) is safe.
    let plan: Vec<(Target, TransactionInfo)> = unique
        .into_iter()
        .map(|shard| {
            let target = Target::new(keyspace.to_string(), shard, tablet_type);
            let info = transaction_info(&target, session, not_in_transaction);
            (target, info)
        })
        .collect();

    let new_sessions = Arc::new(Mutex::new(Vec::new()));

    let errors = if plan.len() == 1 {
        let errors = ErrorRecord::new();
        let (target, info) = plan.into_iter().next().unwrap();
        let fut = action(target.clone(), info.should_begin, info.transaction_id);
        timed_transactional(&metrics, &errors, &new_sessions, op_name, &target, info, fut).await;
        errors
    } else {
        let action = Arc::new(action);
        let errors = Arc::new(ErrorRecord::new());
        let mut set = JoinSet::new();
        for (target, info) in plan {
            let action = action.clone();
            let metrics = metrics.clone();
            let errors = errors.clone();
            let new_sessions = new_sessions.clone();
            let op_name = op_name.to_string();
            set.spawn(async move {
                let fut = action(target.clone(), info.should_begin, info.transaction_id);
                timed_transactional(&metrics, &errors, &new_sessions, &op_name, &target, info, fut)
                    .await;
            });
        }
        while set.join_next().await.is_some() {}
        Arc::try_unwrap(errors).expect("all spawned fan-out tasks have completed by this point")
    };

    // Final read of the accumulated shard sessions happens on the caller's
    // task, after the barrier — the capability to append was the only
    // thing handed to the spawned tasks.
    let new_sessions = Arc::try_unwrap(new_sessions)
        .expect("all spawned fan-out tasks have completed by this point")
        .into_inner()
        .unwrap();
    for shard_session in new_sessions {
        session.append(shard_session);
    }

    errors
}
