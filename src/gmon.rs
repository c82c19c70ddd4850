//! gmon-profile dump file decoder module.

use crate::config::{Address, Cost, GMON_VERSION, SAMPLE_UNIT_SIZE, SCALE_EPSILON};
use crate::error::{Error, Result};
use crate::reader::ByteReader;
use std::io::Read;

/// Magic cookie opening every gmon file.
pub const GMON_MAGIC: &[u8; 4] = b"gmon";

/// Histogram record tag.
pub const TAG_TIME_HIST: u8 = 0;
/// Call-graph arc record tag.
pub const TAG_CG_ARC: u8 = 1;
/// Basic-block record tag.
pub const TAG_BB_COUNT: u8 = 2;

const DIMENSION_LEN: usize = 15;
const HEADER_SPARE_LEN: usize = 12;

/// One histogram of sample counts over the address range
/// `[lowpc, highpc)`, split into `num_bins` fixed-width buckets.
///
/// Records with the same range merge into one in-memory histogram;
/// samples add up across records.
#[derive(Debug)]
pub struct Histogram {
    /// Low end of the covered address range.
    pub lowpc: Address,
    /// High end of the covered address range (exclusive).
    pub highpc: Address,
    /// Number of buckets the range is split into.
    pub num_bins: u32,
    /// Accumulated sample count per bucket.
    pub samples: Vec<Cost>,
}

impl Histogram {
    /// Per-bin scale factor: bucket width in sample units.
    pub fn scale(&self) -> f64 {
        (self.highpc.saturating_sub(self.lowpc) / SAMPLE_UNIT_SIZE) as f64
            / f64::from(self.num_bins)
    }
}

/// One raw caller/callee observation. Endpoints are raw program counters;
/// resolution to functions happens later, once the whole table is known.
#[derive(Debug)]
pub struct CallArc {
    /// Program counter of the call site (the caller side).
    pub from_pc: Address,
    /// Entry program counter of the called function.
    pub self_pc: Address,
    /// Number of times this arc was observed.
    pub count: u32,
}

/// Decoded contents of one gmon dump file.
#[derive(Debug, Default)]
pub struct GmonDump {
    version: u32,
    prof_rate: u32,
    dimension: [u8; DIMENSION_LEN],
    dimension_abbrev: u8,
    scale: f64,
    histograms: Vec<Histogram>,
    arcs: Vec<CallArc>,
    tag_count: [u64; 3],
}

impl GmonDump {
    /// Decodes a complete gmon byte stream.
    ///
    /// The header is read first, then records are consumed tag by tag
    /// until a clean end of file at a tag boundary. A bad magic cookie,
    /// a short header, an unknown tag or any cross-record inconsistency
    /// fails the whole load; a record truncated by end of file is
    /// dropped with a warning and the scan moves on.
    pub fn read(source: impl Read) -> Result<Self> {
        let mut reader = ByteReader::new(source);
        let mut dump = GmonDump::default();

        dump.read_header(&mut reader)?;

        while let Some(tag) = reader.read_tag()? {
            let decoded = match tag {
                TAG_TIME_HIST => {
                    tracing::debug!("Reading histogram record");
                    dump.read_histogram_record(&mut reader)
                }
                TAG_CG_ARC => {
                    tracing::debug!("Reading call-graph record");
                    dump.read_call_graph_record(&mut reader)
                }
                TAG_BB_COUNT => {
                    tracing::debug!("Reading basic block record");
                    dump.read_basic_block_record(&mut reader)
                }
                other => return Err(Error::UnknownTag(other)),
            };

            if let Err(err) = decoded {
                if !err.is_record_local() {
                    return Err(err);
                }
                tracing::warn!("Dropping truncated record: {}", err);
            }
        }

        tracing::info!(
            "gmon file loaded, {} histogram records, {} call-graph records, {} basic block records",
            dump.tag_count[TAG_TIME_HIST as usize],
            dump.tag_count[TAG_CG_ARC as usize],
            dump.tag_count[TAG_BB_COUNT as usize],
        );

        Ok(dump)
    }

    /// Returns the file version from the header.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the shared profiling rate (samples per second).
    pub fn prof_rate(&self) -> u32 {
        self.prof_rate
    }

    /// Returns the shared sampling dimension label, NUL padding stripped.
    pub fn dimension(&self) -> String {
        dimension_text(&self.dimension)
    }

    /// Returns the one-letter abbreviation of the sampling dimension.
    pub fn dimension_abbrev(&self) -> char {
        char::from(self.dimension_abbrev)
    }

    /// Returns the shared histogram scale factor seeded by the first
    /// histogram record.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the merged histogram records.
    pub fn histograms(&self) -> &[Histogram] {
        &self.histograms
    }

    /// Returns the raw call-graph arcs in file order.
    pub fn arcs(&self) -> &[CallArc] {
        &self.arcs
    }

    /// Returns how many records of each tag were decoded.
    pub fn tag_count(&self) -> &[u64; 3] {
        &self.tag_count
    }

    fn read_header(&mut self, reader: &mut ByteReader<impl Read>) -> Result<()> {
        let mut magic = [0_u8; 4];
        reader.read_bytes(&mut magic).map_err(|_| Error::Header)?;
        if &magic != GMON_MAGIC {
            return Err(Error::Magic);
        }

        // The version bytes are taken as a raw integer, no endian
        // normalization, matching how the files are written.
        self.version = reader.read_u32().map_err(|_| Error::Header)?;
        if self.version > GMON_VERSION {
            tracing::warn!(
                "File version {} is newer than supported version {}",
                self.version,
                GMON_VERSION
            );
        }

        let mut spare = [0_u8; HEADER_SPARE_LEN];
        reader.read_bytes(&mut spare).map_err(|_| Error::Header)?;
        Ok(())
    }

    fn read_histogram_record(&mut self, reader: &mut ByteReader<impl Read>) -> Result<()> {
        let lowpc = reader.read_vma()?;
        let highpc = reader.read_vma()?;
        let num_bins = reader.read_u32()?;
        let prof_rate = reader.read_u32()?;
        let mut dimension = [0_u8; DIMENSION_LEN];
        reader.read_bytes(&mut dimension)?;
        let mut abbrev = [0_u8; 1];
        reader.read_bytes(&mut abbrev)?;

        // A zero-bin record would seed the shared scale with NaN and
        // disarm the scale check for every record after it
        if num_bins == 0 {
            return Err(Error::EmptyHistogram(lowpc, highpc));
        }

        let scale = (highpc.saturating_sub(lowpc) / SAMPLE_UNIT_SIZE) as f64
            / f64::from(num_bins);

        if self.tag_count[TAG_TIME_HIST as usize] == 0 {
            // First histogram record seeds the shared parameters
            self.prof_rate = prof_rate;
            self.dimension = dimension;
            self.dimension_abbrev = abbrev[0];
            self.scale = scale;
        } else {
            if dimension != self.dimension {
                return Err(Error::DimensionMismatch(
                    dimension_text(&self.dimension),
                    dimension_text(&dimension),
                ));
            }
            if abbrev[0] != self.dimension_abbrev {
                return Err(Error::AbbrevMismatch(
                    char::from(self.dimension_abbrev),
                    char::from(abbrev[0]),
                ));
            }
            if (self.scale - scale).abs() > SCALE_EPSILON {
                return Err(Error::ScaleMismatch(self.scale, scale));
            }
        }

        let index = match self.find_histogram(lowpc, highpc) {
            Some(index) => index,
            None => {
                self.check_overlap(lowpc, highpc)?;
                self.histograms.push(Histogram {
                    lowpc,
                    highpc,
                    num_bins,
                    samples: vec![0; num_bins as usize],
                });
                self.histograms.len() - 1
            }
        };

        // Samples add into the bins, never replace them
        let record = &mut self.histograms[index];
        for i in 0..num_bins as usize {
            let count = reader.read_unit()?;
            if let Some(bin) = record.samples.get_mut(i) {
                *bin += Cost::from(count);
            }
        }

        self.tag_count[TAG_TIME_HIST as usize] += 1;
        Ok(())
    }

    fn read_call_graph_record(&mut self, reader: &mut ByteReader<impl Read>) -> Result<()> {
        let from_pc = reader.read_vma()?;
        let self_pc = reader.read_vma()?;
        let count = reader.read_u32()?;

        tracing::debug!(
            "Read call graph arc, frompc 0x{:x}, selfpc 0x{:x}, count {}",
            from_pc,
            self_pc,
            count
        );

        self.arcs.push(CallArc {
            from_pc,
            self_pc,
            count,
        });

        self.tag_count[TAG_CG_ARC as usize] += 1;
        Ok(())
    }

    /// Walks a basic-block record to keep the cursor positioned for the
    /// next tag. The content carries no analytical value and is dropped.
    fn read_basic_block_record(&mut self, reader: &mut ByteReader<impl Read>) -> Result<()> {
        let nblocks = reader.read_u32()?;

        // Version 0 carried a status string before the blocks
        if self.version == 0 {
            let _ = reader.read_string()?;
        }

        for _ in 0..nblocks {
            if self.version == 0 {
                // Legacy layout: two words, two deprecated strings, line number
                reader.read_vma()?;
                reader.read_vma()?;
                let _ = reader.read_string()?;
                let _ = reader.read_string()?;
                reader.read_u32()?;
            } else {
                reader.read_vma()?;
                reader.read_vma()?;
            }
        }

        self.tag_count[TAG_BB_COUNT as usize] += 1;
        Ok(())
    }

    /// Finds the histogram matching the range exactly, if any.
    fn find_histogram(&self, lowpc: Address, highpc: Address) -> Option<usize> {
        self.histograms
            .iter()
            .position(|h| h.lowpc == lowpc && h.highpc == highpc)
    }

    /// Fails when the new range intersects an existing, different one.
    fn check_overlap(&self, lowpc: Address, highpc: Address) -> Result<()> {
        for h in &self.histograms {
            let common_low = h.lowpc.max(lowpc);
            let common_high = h.highpc.min(highpc);
            if common_low < common_high {
                return Err(Error::HistogramOverlap(lowpc, highpc, h.lowpc, h.highpc));
            }
        }
        Ok(())
    }
}

/// Converts the fixed-width dimension field to text.
fn dimension_text(dimension: &[u8; DIMENSION_LEN]) -> String {
    let end = dimension
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(DIMENSION_LEN);
    String::from_utf8_lossy(&dimension[..end]).into_owned()
}
