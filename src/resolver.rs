//! gmon-profile resolver module.

use crate::config::{Address, Index};
use crate::error::Result;
use crate::symbols::{self, FunctionEntry};
use crate::filebuf;
use std::path::Path;

/// Reads the symbol listing (if any) and returns an address resolver.
/// A missing or unreadable listing degrades to an empty resolver: every
/// lookup misses and the profile comes out empty, but the load proceeds.
pub fn read(filepath: Option<&Path>) -> Result<Resolver> {
    match filepath {
        None => Ok(Resolver::default()),
        Some(path) => match filebuf::open(path) {
            Ok(reader) => Ok(Resolver::from_entries(symbols::parse_listing(reader)?)),
            Err(err) => {
                tracing::warn!("No symbols loaded: {}", err);
                Ok(Resolver::default())
            }
        },
    }
}

/// Sorted function-address table with floor-search lookups.
///
/// The table is sorted ascending by raw address at construction and never
/// mutated afterwards, except for the one-shot scale pass. Entry `i` owns
/// the address range up to entry `i + 1`; the last entry is open-ended.
#[derive(Default, Debug)]
pub struct Resolver {
    functions: Vec<FunctionEntry>,
}

impl Resolver {
    /// Builds the resolver from unsorted symbol entries.
    pub fn from_entries(mut entries: Vec<FunctionEntry>) -> Self {
        // Addresses are expected unique; ties keep unspecified order
        entries.sort_unstable_by_key(|e| e.address);
        Resolver { functions: entries }
    }

    /// Returns the function table, ordered by address.
    pub fn functions(&self) -> &[FunctionEntry] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Divides every entry address by the sample unit size. Histogram
    /// bins are expressed in these units, not in raw byte addresses.
    /// Division preserves the table order.
    pub fn scale(&mut self, unit_size: Address) {
        for entry in &mut self.functions {
            entry.scaled_address = entry.address / unit_size;
        }
    }

    /// Floor search: index of the highest-addressed entry whose (raw or
    /// scaled) address does not exceed the query. `None` when the query
    /// lies below the lowest entry.
    pub fn find_owner(&self, address: Address, use_scaled: bool) -> Option<Index> {
        let n = self
            .functions
            .partition_point(|e| Self::key(e, use_scaled) <= address);
        if n == 0 {
            tracing::debug!("find_owner(0x{:x}): below lowest entry", address);
            return None;
        }
        Some(n - 1)
    }

    /// Indices of all entries whose owned range can intersect
    /// `[low, high)`: the floor entry at `low`, then consecutive entries
    /// while their address stays below `high`.
    pub fn owners_in_range(&self, low: f64, high: f64, use_scaled: bool) -> Vec<Index> {
        let mut index = self
            .functions
            .partition_point(|e| (Self::key(e, use_scaled) as f64) <= low)
            .saturating_sub(1);

        let mut owners = Vec::new();
        while index < self.functions.len()
            && (Self::key(&self.functions[index], use_scaled) as f64) < high
        {
            owners.push(index);
            index += 1;
        }
        owners
    }

    /// Upper bound of the range owned by entry `index`, in scaled units:
    /// the next entry's scaled address, open-ended for the last entry.
    pub fn scaled_upper_bound(&self, index: Index) -> f64 {
        match self.functions.get(index + 1) {
            Some(next) => next.scaled_address as f64,
            None => f64::INFINITY,
        }
    }

    fn key(entry: &FunctionEntry, use_scaled: bool) -> Address {
        if use_scaled {
            entry.scaled_address
        } else {
            entry.address
        }
    }
}
