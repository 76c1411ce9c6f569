//! Minimal usage demo: extract one local or remote MRF document to a
//! directory of CSV files. Not part of the crate's public contract — CLI
//! argument parsing is explicitly out of scope (spec §1); this just shows
//! the library's entry point wired to `std::env::args`.

use std::collections::HashSet;

use mrf_extract::extractor::{run, ExtractorConfig};
use mrf_extract::sink::CsvSink;
use mrf_extract::Location;

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let source = args.next().expect("usage: extract <source> <out_dir>");
    let out_dir = args.next().expect("usage: extract <source> <out_dir>");

    let location = Location::parse(&source);
    let config = ExtractorConfig {
        npi_set: HashSet::new(),
        code_set: HashSet::new(),
        ..Default::default()
    };
    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");
    let mut sink = CsvSink::new(out_dir);

    match run(&location, &config, &mut sink) {
        Ok(outcome) => println!("{outcome:?}"),
        Err(e) => {
            eprintln!("extraction failed: {e}");
            std::process::exit(1);
        }
    }
}
