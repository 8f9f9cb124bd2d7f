//! Streaming Multiplexer: interleaves per-shard result streams into one
//! logical packet stream.
//!
//! Generalizes the same fan-out shape the Driver uses, from "collect once,
//! return" to "forward packets as they arrive", keeping delivery to
//! `send_reply` serialized under one mutex that also tracks the
//! exactly-once field header and the sticky send failure.
//!
//! The final return is the aggregation of (i) all shard action errors and
//! (ii) a `send_reply` failure, if any. This is implemented by folding a
//! `send_reply` failure into the same per-shard [`ErrorRecord`] the
//! gateway-call failures use: the shard whose `send_reply` call actually
//! failed records it as a [`ShardError`]; every other shard that later
//! observes the sticky failure simply stops without recording anything
//! more, returning success on its own account. The single [`ScatterError`]
//! produced from that record is therefore already the full aggregation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorRecord, ScatterError, ShardError, VtErrorCode};
use crate::gateway::{BindVars, ExecuteOptions, ShardGateway, StreamPacket};
use crate::metrics::{MetricsKey, MetricsSurface};
use crate::target::{TabletType, Target};

/// A `send_reply` failure, e.g. the client disconnected mid-stream.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ReplyError(pub String);

struct MultiplexState {
    field_sent: bool,
    reply_err: Option<ReplyError>,
}

enum Dispatch {
    Continue,
    StopWithError(ReplyError),
    StopSilently,
}

struct Multiplexer<F> {
    state: Mutex<MultiplexState>,
    send_reply: F,
}

impl<F> Multiplexer<F>
where
    F: Fn(StreamPacket) -> Result<(), ReplyError>,
{
    fn new(send_reply: F) -> Self {
        Self {
            state: Mutex::new(MultiplexState {
                field_sent: false,
                reply_err: None,
            }),
            send_reply,
        }
    }

    /// Dispatch one packet under the shared mutex. Header packets
    /// (non-empty `fields`, no rows) are dropped after the first one;
    /// everything else is forwarded.
    fn dispatch(&self, packet: StreamPacket) -> Dispatch {
        let mut state = self.state.lock().unwrap();

        if state.reply_err.is_some() {
            return Dispatch::StopSilently;
        }

        let is_header = !packet.fields.is_empty() && packet.rows.is_empty();
        if is_header {
            if state.field_sent {
                return Dispatch::Continue;
            }
            state.field_sent = true;
        }

        match (self.send_reply)(packet) {
            Ok(()) => Dispatch::Continue,
            Err(e) => {
                state.reply_err = Some(e.clone());
                Dispatch::StopWithError(e)
            }
        }
    }
}

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

#[allow(clippy::too_many_arguments)]
async fn consume_shard<F>(
    gateway: Arc<dyn ShardGateway>,
    cancel: CancellationToken,
    target: Target,
    sql: Arc<str>,
    shard_bind_variables: Arc<HashMap<String, BindVars>>,
    options: Arc<ExecuteOptions>,
    mux: Arc<Multiplexer<F>>,
    errors: Arc<ErrorRecord>,
    metrics: Arc<MetricsSurface>,
    op_name: Arc<str>,
) where
    F: Fn(StreamPacket) -> Result<(), ReplyError>,
{
    let key = MetricsKey::new(op_name.to_string(), &target);
    tracing::debug!(
        op_name = %op_name,
        keyspace = %target.keyspace,
        shard = %target.shard,
        tablet_type = target.tablet_type.as_str(),
        "opening shard stream"
    );
    let start = Instant::now();
    let empty_bind_variables = BindVars::new();
    let bind_variables = shard_bind_variables
        .get(&target.shard)
        .unwrap_or(&empty_bind_variables);

    let mut stream = match gateway
        .stream_execute(&cancel, &target, &sql, bind_variables, &options)
        .await
    {
        Ok(stream) => stream,
        Err(err) => {
            metrics.record_timing(key.clone(), start.elapsed());
            if !err.code.is_client_caused() {
                metrics.record_error(key);
            }
            errors.push(err);
            return;
        }
    };

    loop {
        match stream.next().await {
            None => break, // per-shard EOF: not an error
            Some(Ok(packet)) => match mux.dispatch(packet) {
                Dispatch::Continue => {}
                Dispatch::StopSilently => {
                    drain(stream.as_mut()).await;
                    break;
                }
                Dispatch::StopWithError(reply_err) => {
                    tracing::warn!(
                        op_name = %op_name,
                        keyspace = %target.keyspace,
                        shard = %target.shard,
                        tablet_type = target.tablet_type.as_str(),
                        error = %reply_err.0,
                        "sticky send_reply failure, draining shard stream"
                    );
                    errors.push(ShardError::new(
                        target.clone(),
                        VtErrorCode::TransientError,
                        false,
                        reply_err.0,
                    ));
                    metrics.record_error(key.clone());
                    drain(stream.as_mut()).await;
                    break;
                }
            },
            Some(Err(err)) => {
                if !err.code.is_client_caused() {
                    metrics.record_error(key.clone());
                }
                errors.push(err);
                break;
            }
        }
    }

    metrics.record_timing(key, start.elapsed());
}

/// Drain a shard's stream to completion without forwarding anything, so the
/// gateway releases its server-side cursor.
async fn drain(stream: &mut (dyn crate::gateway::ResultStream<StreamPacket> + '_)) {
    while stream.next().await.is_some() {}
}

/// Stream-execute across `shards`, forwarding merged packets to
/// `send_reply`. Returns the aggregated error, if any.
///
/// `shard_bind_variables` is looked up per shard, so both `StreamExecute`
/// (the same bind vars repeated for every shard) and `StreamExecuteMulti`
/// (distinct bind vars per shard) are expressed with one function — the
/// facade (`executor.rs`) builds the map accordingly.
#[allow(clippy::too_many_arguments)]
pub async fn stream_execute<F>(
    metrics: Arc<MetricsSurface>,
    op_name: &str,
    keyspace: &str,
    shards: &[String],
    tablet_type: TabletType,
    gateway: Arc<dyn ShardGateway>,
    cancel: CancellationToken,
    sql: String,
    shard_bind_variables: HashMap<String, BindVars>,
    options: ExecuteOptions,
    send_reply: F,
) -> Option<ScatterError>
where
    F: Fn(StreamPacket) -> Result<(), ReplyError> + Send + Sync + 'static,
{
    let unique = dedup_shards(shards);
    if unique.is_empty() {
        return None;
    }

    let mux = Arc::new(Multiplexer::new(send_reply));
    let errors = Arc::new(ErrorRecord::new());
    let sql: Arc<str> = Arc::from(sql);
    let shard_bind_variables = Arc::new(shard_bind_variables);
    let options = Arc::new(options);
    let op_name: Arc<str> = Arc::from(op_name);

    if unique.len() == 1 {
        let target = Target::new(keyspace.to_string(), unique.into_iter().next().unwrap(), tablet_type);
        consume_shard(
            gateway,
            cancel,
            target,
            sql,
            shard_bind_variables,
            options,
            mux,
            errors.clone(),
            metrics,
            op_name,
        )
        .await;
    } else {
        let mut set = JoinSet::new();
        for shard in unique {
            let target = Target::new(keyspace.to_string(), shard, tablet_type);
            set.spawn(consume_shard(
                gateway.clone(),
                cancel.clone(),
                target,
                sql.clone(),
                shard_bind_variables.clone(),
                options.clone(),
                mux.clone(),
                errors.clone(),
                metrics.clone(),
                op_name.clone(),
            ));
        }
        while set.join_next().await.is_some() {}
    }

    let errors = Arc::try_unwrap(errors)
        .expect("all spawned streaming tasks have completed by this point")
        .into_vec();
    ScatterError::aggregate(errors)
}
