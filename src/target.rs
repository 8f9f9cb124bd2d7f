//! The addressable triple every scatter operation fans out over.

use std::fmt;

/// The role a tablet plays within its shard.
///
/// Equality and hashing are derived so a `Target` can be used directly as a
/// map key for the metrics surface and the per-call transaction tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabletType {
    Primary,
    Replica,
    ReadOnly,
    /// Any tablet type the gateway understands that this crate does not
    /// need to reason about specially (e.g. experimental roles added by a
    /// topology without a core code change).
    Other(u8),
}

impl TabletType {
    /// The string used as the fourth metrics-key component.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabletType::Primary => "primary",
            TabletType::Replica => "replica",
            TabletType::ReadOnly => "rdonly",
            TabletType::Other(_) => "other",
        }
    }
}

impl fmt::Display for TabletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(keyspace, shard, tablet-type)` — the identity key for metrics,
/// transaction lookup, and deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub keyspace: String,
    pub shard: String,
    pub tablet_type: TabletType,
}

impl Target {
    pub fn new(
        keyspace: impl Into<String>,
        shard: impl Into<String>,
        tablet_type: TabletType,
    ) -> Self {
        Self {
            keyspace: keyspace.into(),
            shard: shard.into(),
            tablet_type,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.keyspace, self.shard, self.tablet_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_on_all_three_fields() {
        let a = Target::new("ks", "-80", TabletType::Primary);
        let b = Target::new("ks", "-80", TabletType::Primary);
        let c = Target::new("ks", "-80", TabletType::Replica);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dedups_in_a_hash_set() {
        let mut set = HashSet::new();
        set.insert(Target::new("ks", "-80", TabletType::Primary));
        set.insert(Target::new("ks", "-80", TabletType::Primary));
        set.insert(Target::new("ks", "80-", TabletType::Primary));
        assert_eq!(set.len(), 2);
    }
}
