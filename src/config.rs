//! gmon-profile config module.

pub const FAILURE: i32 = 1;

/// Raw link-time address or program counter read from a gmon file.
pub type Address = u64;
/// Index into the function table and its parallel tables.
pub type Index = usize;
/// Accumulated sample or call count.
pub type Cost = u64;

/// Size of one profiling sample unit in bytes. Histogram bins and scaled
/// function addresses are expressed in multiples of this unit.
pub const SAMPLE_UNIT_SIZE: Address = 2;

/// Highest supported gmon file version.
pub const GMON_VERSION: u32 = 1;

/// Reserved class id; the gmon format carries no class information.
pub const NO_CLASS: u32 = 0;

/// Tolerance used when comparing histogram scale factors across records.
pub const SCALE_EPSILON: f64 = 0.00001;

#[cfg(not(test))]
pub type Map<K, V> = std::collections::HashMap<K, V>;

// Use less performant BTree in tests for deterministic sequences
#[cfg(test)]
pub type Map<K, V> = std::collections::BTreeMap<K, V>;
