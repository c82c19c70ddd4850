//! gmon-profile tests module.


use crate::config::{Address, NO_CLASS};
use crate::error::Error;
use crate::gmon::GmonDump;
use crate::profile::Profile;
use crate::reader::ByteReader;
use crate::resolver::Resolver;
use crate::symbols::{self, FunctionEntry, SymbolKind};
use std::io::Cursor;

fn decode(bytes: Vec<u8>) -> crate::error::Result<GmonDump> {
    GmonDump::read(Cursor::new(bytes))
}

fn resolver_for(listing: &str) -> Resolver {
    let entries = symbols::parse_listing(Cursor::new(listing)).unwrap();
    Resolver::from_entries(entries)
}

fn profile_for(bytes: Vec<u8>, listing: &str) -> Profile {
    let dump = decode(bytes).unwrap();
    Profile::create(&dump, resolver_for(listing)).unwrap()
}

fn entry(address: Address) -> FunctionEntry {
    FunctionEntry {
        address,
        scaled_address: address,
        name: format!("fn_{:x}", address),
        class_id: NO_CLASS,
        kind: SymbolKind::Text,
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ---- header and tag loop ---------------------------------------------

#[test]
fn header_magic_rejected() {
    let mut bytes = mock::header(1);
    bytes[0..4].copy_from_slice(b"gnom");
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::Magic)));
}

#[test]
fn header_truncated() {
    let r = decode(b"gmon\x01".to_vec());
    assert!(matches!(r, Err(Error::Header)));
}

#[test]
fn unknown_tag_aborts_load() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[1, 2, 3, 4]));
    bytes.push(9);
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::UnknownTag(9))));
}

#[test]
fn version_and_tag_counts() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[0, 0, 0, 0]));
    bytes.extend(mock::arc_record(0x1000, 0x1008, 1));
    bytes.extend(mock::basic_block_record(&[(0x1000, 7), (0x1010, 9)]));
    let dump = decode(bytes).unwrap();
    assert_eq!(dump.version(), 1);
    assert_eq!(dump.tag_count(), &[1, 1, 1]);
    assert_eq!(dump.prof_rate(), 100);
    assert_eq!(dump.dimension(), "seconds");
    assert_eq!(dump.dimension_abbrev(), 's');
}

#[test]
fn truncated_record_dropped() {
    let mut bytes = mock::header(1);
    let arc = mock::arc_record(0x1000, 0x1008, 1);
    bytes.extend(&arc[..5]); // tag plus a few bytes of the first word
    let dump = decode(bytes).unwrap();
    assert!(dump.arcs().is_empty());
    assert_eq!(dump.tag_count()[1], 0);
}

// ---- histogram records -----------------------------------------------

#[test]
fn histogram_merge_adds_samples() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[10, 0, 0, 0]));
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[0, 0, 0, 7]));
    let dump = decode(bytes).unwrap();
    assert_eq!(dump.histograms().len(), 1);
    assert_eq!(dump.histograms()[0].samples, vec![10, 0, 0, 7]);
    assert_eq!(dump.tag_count()[0], 2);
    assert!(approx(dump.scale(), 32.0)); // 128 sample units over 4 bins
}

#[test]
fn histogram_overlap_rejected() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[0, 0, 0, 0]));
    bytes.extend(mock::histogram_record(0x1080, 0x1180, 100, &[0, 0, 0, 0]));
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::HistogramOverlap(..))));
}

#[test]
fn dimension_change_rejected() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[0, 0, 0, 0]));
    bytes.extend(mock::histogram_record_with(
        0x2000,
        0x2100,
        100,
        b"ticks\0\0\0\0\0\0\0\0\0\0",
        b't',
        &[0, 0, 0, 0],
    ));
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::DimensionMismatch(..))));
}

#[test]
fn abbrev_change_rejected() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[0, 0, 0, 0]));
    bytes.extend(mock::histogram_record_with(
        0x2000,
        0x2100,
        100,
        mock::DIMENSION,
        b'm',
        &[0, 0, 0, 0],
    ));
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::AbbrevMismatch(..))));
}

#[test]
fn scale_change_rejected() {
    let mut bytes = mock::header(1);
    // 128 units over 4 bins vs 32 units over 4 bins
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[0, 0, 0, 0]));
    bytes.extend(mock::histogram_record(0x2000, 0x2040, 100, &[0, 0, 0, 0]));
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::ScaleMismatch(..))));
}

#[test]
fn zero_bin_histogram_rejected() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[]));
    let r = decode(bytes);
    assert!(matches!(r, Err(Error::EmptyHistogram(..))));
}

// ---- basic-block records ---------------------------------------------

#[test]
fn basic_block_records_walked() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::basic_block_record(&[(0x1000, 3), (0x1010, 4)]));
    bytes.extend(mock::arc_record(0x1000, 0x2000, 5));
    let dump = decode(bytes).unwrap();
    assert_eq!(dump.tag_count()[2], 1);
    assert_eq!(dump.arcs().len(), 1);
    assert_eq!(dump.arcs()[0].count, 5);
}

#[test]
fn basic_block_legacy_layout_walked() {
    let mut bytes = mock::header(0);
    bytes.extend(mock::basic_block_record_v0(&[(3, 0x1000, 42)]));
    bytes.extend(mock::arc_record(0x1000, 0x2000, 5));
    let dump = decode(bytes).unwrap();
    assert_eq!(dump.version(), 0);
    assert_eq!(dump.tag_count()[2], 1);
    assert_eq!(dump.arcs().len(), 1);
}

// ---- byte reader ------------------------------------------------------

#[test]
fn read_string_stops_at_zero() {
    let mut reader = ByteReader::new(Cursor::new(b"abc\0rest".to_vec()));
    assert_eq!(reader.read_string().unwrap(), "abc");
}

#[test]
fn read_string_fails_on_eof() {
    let mut reader = ByteReader::new(Cursor::new(b"abc".to_vec()));
    assert!(reader.read_string().is_err());
}

#[test]
fn read_tag_reports_clean_eof() {
    let mut reader = ByteReader::new(Cursor::new(Vec::new()));
    assert_eq!(reader.read_tag().unwrap(), None);
}

// ---- symbol listing ---------------------------------------------------

#[test]
fn symbols_short_lines_skipped() {
    let listing = "main\n0123456\n0000000000000010 T f\n";
    let entries = symbols::parse_listing(Cursor::new(listing)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, 0x10);
    assert_eq!(entries[0].name, "f");
}

#[test]
fn symbols_kinds() {
    let listing = "0000000000000010 T code\n\
                   0000000000000020 t local\n\
                   0000000000000030 D data\n";
    let entries = symbols::parse_listing(Cursor::new(listing)).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, SymbolKind::Text);
    assert_eq!(entries[1].kind, SymbolKind::Text);
    assert_eq!(entries[2].kind, SymbolKind::Misc);
    assert_eq!(entries[2].name, "data");
}

#[test]
fn symbols_multibyte_line_tolerated() {
    // Hex prefix ending inside a multi-byte character must not panic on
    // the name slice; the line degrades to a lossy entry instead.
    let listing = "0000000\u{e9}\u{e9}\n0000000000000010 T f\n";
    let entries = symbols::parse_listing(Cursor::new(listing)).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].address, 0x10);
    assert_eq!(entries[1].name, "f");
}

#[test]
fn symbols_non_utf8_name_tolerated() {
    let listing = b"0000000000000010 T f\xffg\n".to_vec();
    let entries = symbols::parse_listing(Cursor::new(listing)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, 0x10);
    assert_eq!(entries[0].name, "f\u{fffd}g");
}

#[test]
fn symbols_corruption_stops_parsing() {
    // The second line is all hex digits with no room for the type byte;
    // everything from there on is dropped.
    let listing = "00000000000000ff T early\nffffffffffff\n0000000000000100 T late\n";
    let entries = symbols::parse_listing(Cursor::new(listing)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "early");
}

// ---- address resolver -------------------------------------------------

#[test]
fn floor_search() {
    let resolver = Resolver::from_entries(vec![entry(10), entry(2), entry(5)]);
    assert_eq!(resolver.find_owner(7, false), Some(1));
    assert_eq!(resolver.functions()[1].address, 5);
    assert_eq!(resolver.find_owner(1, false), None);
    assert_eq!(resolver.find_owner(10, false), Some(2));
}

#[test]
fn range_enumeration() {
    let mut resolver = Resolver::from_entries(vec![entry(4), entry(10), entry(20)]);
    resolver.scale(2); // scaled addresses 2, 5, 10
    assert_eq!(resolver.owners_in_range(3.0, 9.0, true), vec![0, 1]);
    assert_eq!(resolver.owners_in_range(11.0, 20.0, true), vec![2]);
    assert_eq!(resolver.owners_in_range(0.0, 1.0, true), Vec::<usize>::new());
}

// ---- attribution ------------------------------------------------------

#[test]
fn time_round_trip_single_function() {
    // 4 bins of 32 scaled units each, all inside f's range
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[10, 0, 5, 0]));
    let prof = profile_for(bytes, mock::SYMBOLS_FAR);

    assert!(approx(prof.flat()[0].time_total, 0.15));
    assert!(approx(prof.flat()[1].time_total, 0.0));
    assert!(approx(prof.total_time(), 0.15));
    assert!((prof.flat()[0].time_total_pct - 100.0).abs() < 1e-3);
}

#[test]
fn bin_split_conserves_time() {
    // One 16-unit bin straddling the f/g boundary at its midpoint
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1020, 1, &[10]));
    let prof = profile_for(bytes, mock::SYMBOLS_MID);

    assert!(approx(prof.flat()[0].time_total, 5.0));
    assert!(approx(prof.flat()[1].time_total, 5.0));
    assert!(approx(prof.total_time(), 10.0));
}

#[test]
fn call_count_conservation() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::arc_record(0x1000, 0x2000, 1));
    bytes.extend(mock::arc_record(0x1000, 0x2000, 2));
    bytes.extend(mock::arc_record(0x1000, 0x3000, 5));
    bytes.extend(mock::arc_record(0x10, 0x2000, 4)); // caller below lowest entry
    bytes.extend(mock::arc_record(0x1000, 0x10, 9)); // callee below lowest entry
    let prof = profile_for(bytes, mock::SYMBOLS_FGH);

    // Call counts follow the callee regardless of the caller
    assert_eq!(prof.flat()[0].call_count, 0);
    assert_eq!(prof.flat()[1].call_count, 7);
    assert_eq!(prof.flat()[2].call_count, 5);

    // Graph edges only exist where both endpoints resolved
    assert_eq!(prof.call_graph().get(&(0, 1)), Some(&3));
    assert_eq!(prof.call_graph().get(&(0, 2)), Some(&5));
    assert_eq!(prof.call_graph().len(), 2);

    // Outgoing edges of f sum to its resolved outgoing arc count
    let outgoing: u64 = prof
        .call_graph()
        .iter()
        .filter(|((caller, _), _)| *caller == 0)
        .map(|(_, count)| *count)
        .sum();
    assert_eq!(outgoing, 8);
}

#[test]
fn end_to_end_scenario() {
    // Histogram [0x1000, 0x1010) in 4 bins of 2 scaled units, boundary
    // between f and g at 0x1008; one explicit f -> g arc.
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1010, 100, &[10, 10, 10, 10]));
    bytes.extend(mock::arc_record(0x1000, 0x1008, 3));
    let prof = profile_for(bytes, mock::SYMBOLS_NEAR);

    assert!(approx(prof.flat()[0].time_total, 0.2));
    assert!(approx(prof.flat()[1].time_total, 0.2));
    assert_eq!(prof.flat()[0].call_count, 0);
    assert_eq!(prof.flat()[1].call_count, 3);
    assert_eq!(prof.call_graph().get(&(0, 1)), Some(&3));
}

#[test]
fn empty_symbol_source_still_loads() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1100, 100, &[10, 0, 0, 0]));
    bytes.extend(mock::arc_record(0x1000, 0x1008, 3));
    let dump = decode(bytes).unwrap();
    let prof = Profile::create(&dump, Resolver::default()).unwrap();

    assert!(prof.functions().is_empty());
    assert!(prof.flat().is_empty());
    assert!(prof.call_graph().is_empty());
}

// ---- reports ----------------------------------------------------------

#[test]
fn flat_report_orders_by_time() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::histogram_record(0x1000, 0x1010, 100, &[10, 10, 10, 10]));
    let prof = profile_for(bytes, mock::SYMBOLS_NEAR);

    let mut output = Vec::<u8>::new();
    prof.write_flat(&mut output).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("Flat profile: 2 functions"));
    assert!(text.contains(" f\n"));
    assert!(text.contains(" g\n"));
}

#[test]
fn call_graph_report_names_edges() {
    let mut bytes = mock::header(1);
    bytes.extend(mock::arc_record(0x1000, 0x1008, 3));
    let prof = profile_for(bytes, mock::SYMBOLS_NEAR);

    let mut output = Vec::<u8>::new();
    prof.write_call_graph(&mut output).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("Call graph: 1 edges"));
    assert!(text.contains("f -> g: 3"));
}
