//! gmon-profile implementation of the derived profile views.

use crate::config::{Cost, Index, Map, SAMPLE_UNIT_SIZE};
use crate::error::{Error, Result};
use crate::gmon::GmonDump;
use crate::resolver::{self, Resolver};
use crate::symbols::FunctionEntry;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Per-function cost summary, index-parallel to the function table.
#[derive(Clone, Debug)]
pub struct FlatProfileRecord {
    /// Index of the function this record belongs to.
    pub function_id: Index,
    /// Sum of resolved arc counts targeting this function.
    pub call_count: Cost,
    /// Time credited from histogram overlap, in seconds once the load
    /// completes (internal rate units before normalization).
    pub time_total: f64,
    /// Share of the total sampled time, in percent. Derived value.
    pub time_total_pct: f32,
}

/// Aggregated caller/callee edges: `(caller, callee)` function indices
/// mapped to the summed call count.
pub type CallGraph = Map<(Index, Index), Cost>;

/// Decodes a gmon dump and derives the profile views from it.
///
/// A missing symbol listing is not fatal; it yields an empty function
/// table and an empty profile. The dump file handle is released before
/// this returns, on success and on failure alike.
pub fn load(gmon_path: &Path, symbols_path: Option<&Path>) -> Result<Profile> {
    tracing::debug!("Loading gmon file {:?}", gmon_path);

    let file = File::open(gmon_path).map_err(|e| Error::OpenFile(e, gmon_path.into()))?;
    let dump = GmonDump::read(BufReader::new(file))?;

    let resolver = resolver::read(symbols_path)?;
    if resolver.is_empty() {
        tracing::warn!("Empty function table, the profile will carry no attribution");
    }

    Profile::create(&dump, resolver)
}

/// The two analytical views derived from one decoded dump, together with
/// the function table they refer into.
#[derive(Debug)]
pub struct Profile {
    resolver: Resolver,
    flat: Vec<FlatProfileRecord>,
    call_graph: CallGraph,
    total_time: f64,
    prof_rate: u32,
    dimension: String,
}

impl Profile {
    /// Runs the attribution passes over a decoded dump.
    pub fn create(dump: &GmonDump, mut resolver: Resolver) -> Result<Self> {
        resolver.scale(SAMPLE_UNIT_SIZE);

        let mut flat: Vec<FlatProfileRecord> = (0..resolver.len())
            .map(|function_id| FlatProfileRecord {
                function_id,
                call_count: 0,
                time_total: 0.0,
                time_total_pct: 0.0,
            })
            .collect();

        distribute_samples(dump, &resolver, &mut flat);
        count_calls(dump, &resolver, &mut flat);
        let call_graph = build_call_graph(dump, &resolver);

        let total_time: f64 = flat.iter().map(|fp| fp.time_total).sum();
        if total_time > 0.0 {
            for fp in &mut flat {
                fp.time_total_pct = (fp.time_total / total_time * 100.0) as f32;
            }
        }

        Ok(Profile {
            resolver,
            flat,
            call_graph,
            total_time,
            prof_rate: dump.prof_rate(),
            dimension: dump.dimension(),
        })
    }

    /// Returns the function table, ordered by address.
    pub fn functions(&self) -> &[FunctionEntry] {
        self.resolver.functions()
    }

    /// Returns the flat profile, index-parallel to the function table.
    pub fn flat(&self) -> &[FlatProfileRecord] {
        &self.flat
    }

    /// Returns the aggregated call-graph map.
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    /// Returns the total sampled time across all functions, in seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Writes the flat profile as a text table, most expensive function
    /// first, call count as the tie-break.
    pub fn write_flat(&self, mut output: impl Write) -> Result<()> {
        writeln!(
            output,
            "Flat profile: {} functions, {:.6} {} total, rate {}",
            self.flat.len(),
            self.total_time,
            if self.dimension.is_empty() {
                "units"
            } else {
                self.dimension.as_str()
            },
            self.prof_rate
        )?;
        writeln!(output, " %time      seconds      calls  name")?;

        let mut order: Vec<Index> = (0..self.flat.len()).collect();
        order.sort_by(|&a, &b| {
            let fa = &self.flat[a];
            let fb = &self.flat[b];
            fb.time_total
                .partial_cmp(&fa.time_total)
                .unwrap_or(Ordering::Equal)
                .then(fb.call_count.cmp(&fa.call_count))
        });

        for index in order {
            let fp = &self.flat[index];
            writeln!(
                output,
                "{:6.2} {:12.6} {:10}  {}",
                fp.time_total_pct,
                fp.time_total,
                fp.call_count,
                self.resolver.functions()[fp.function_id].name
            )?;
        }

        output.flush()?;
        Ok(())
    }

    /// Writes the call-graph edges as `caller -> callee: count` lines,
    /// ordered by function index.
    pub fn write_call_graph(&self, mut output: impl Write) -> Result<()> {
        writeln!(output, "Call graph: {} edges", self.call_graph.len())?;

        let mut edges: Vec<(&(Index, Index), &Cost)> = self.call_graph.iter().collect();
        edges.sort();

        let functions = self.resolver.functions();
        for (&(caller, callee), count) in edges {
            writeln!(
                output,
                "{} -> {}: {}",
                functions[caller].name, functions[callee].name, count
            )?;
        }

        output.flush()?;
        Ok(())
    }
}

/// Distributes histogram sample time over the functions whose scaled
/// ranges overlap each bin, then normalizes by the profiling rate.
///
/// A bin spanning several functions splits its time proportionally to
/// the covered width; the credits for one bin always sum to the bin's
/// full sample count.
fn distribute_samples(dump: &GmonDump, resolver: &Resolver, flat: &mut [FlatProfileRecord]) {
    for record in dump.histograms() {
        if record.num_bins == 0 {
            continue;
        }
        let scale = record.scale();
        let base = (record.lowpc / SAMPLE_UNIT_SIZE) as f64;

        for (i, &sample) in record.samples.iter().enumerate() {
            if sample == 0 {
                continue;
            }
            let bin_low = base + i as f64 * scale;
            let bin_high = bin_low + scale;

            let owners = resolver.owners_in_range(bin_low, bin_high, true);
            if owners.is_empty() {
                tracing::warn!(
                    "No function owns sample bucket [{}, {}), {} samples dropped",
                    bin_low,
                    bin_high,
                    sample
                );
                continue;
            }

            for index in owners {
                let entry_low = resolver.functions()[index].scaled_address as f64;
                let entry_high = resolver.scaled_upper_bound(index);
                let overlap = bin_high.min(entry_high) - bin_low.max(entry_low);
                if overlap > 0.0 {
                    flat[index].time_total += overlap * sample as f64 / scale;
                }
            }
        }
    }

    // Convert from rate units to real time
    let rate = dump.prof_rate();
    if rate > 0 {
        for fp in flat.iter_mut() {
            fp.time_total /= f64::from(rate);
        }
    }
}

/// Adds every arc's count to its callee, resolved by raw address.
fn count_calls(dump: &GmonDump, resolver: &Resolver, flat: &mut [FlatProfileRecord]) {
    for arc in dump.arcs() {
        match resolver.find_owner(arc.self_pc, false) {
            Some(index) => flat[index].call_count += Cost::from(arc.count),
            None => tracing::warn!(
                "No function owns arc target 0x{:x}, {} calls dropped",
                arc.self_pc,
                arc.count
            ),
        }
    }
}

/// Aggregates arcs into caller/callee edges. Arcs with an unresolved
/// endpoint are dropped; the rest of the profile is unaffected.
fn build_call_graph(dump: &GmonDump, resolver: &Resolver) -> CallGraph {
    let mut graph = CallGraph::new();

    for arc in dump.arcs() {
        let caller = resolver.find_owner(arc.from_pc, false);
        let callee = resolver.find_owner(arc.self_pc, false);
        match (caller, callee) {
            (Some(caller), Some(callee)) => {
                *graph.entry((caller, callee)).or_insert(0) += Cost::from(arc.count);
            }
            _ => tracing::warn!(
                "Unresolved arc 0x{:x} -> 0x{:x} dropped from the call graph",
                arc.from_pc,
                arc.self_pc
            ),
        }
    }

    graph
}
