//! Data model for `SplitQuery`/`SplitQueryV2` results.

/// A SQL query together with the bind variables needed to run it, as
/// produced by the external gateway's `SplitQuery`/`SplitQueryV2` RPCs.
/// Opaque here: this crate only shuffles and forwards these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    pub sql: String,
    pub bind_variables: Vec<(String, Vec<u8>)>,
}

/// Where a [`SplitQueryPart`] should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A slice of a keyspace's key range.
    KeyRange {
        keyspace: String,
        key_ranges: Vec<(Vec<u8>, Vec<u8>)>,
    },
    /// An explicit set of shards.
    Shards {
        keyspace: String,
        shards: Vec<String>,
    },
}

/// One independent sub-query of a split, suitable for parallel
/// map-reduce-style consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitQueryPart {
    pub bound_query: BoundQuery,
    pub placement: Placement,
    pub size_rows: u64,
}
