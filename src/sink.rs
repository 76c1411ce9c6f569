//! Row sink (C8): appends rows to per-kind CSV files under one output
//! directory, writing the header on first encounter of each kind.
//!
//! The "has the root row been written yet" latch lives on the sink
//! instance, not process-wide state — a second `CsvSink` over a fresh
//! `out_dir` starts with a clean latch even if one process holds both at
//! once.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use csv::Writer;

use crate::error::SinkError;
use crate::rows::{InNetworkRow, NegotiatedPriceRow, ProviderGroupRow, Row, RootRow};

/// Destination for flattened rows. Implementations may batch or flush
/// however they like; `write` must make each row durable (or buffered for a
/// later explicit flush) before returning.
pub trait RowSink {
    fn write_root(&mut self, row: &RootRow) -> Result<(), SinkError>;
    fn write_rows(&mut self, rows: &[Row]) -> Result<(), SinkError>;
}

/// The reference sink: one CSV file per row kind under `out_dir`.
pub struct CsvSink {
    out_dir: PathBuf,
    writers: HashMap<&'static str, Writer<File>>,
    root_written: bool,
}

impl CsvSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            writers: HashMap::new(),
            root_written: false,
        }
    }

    fn writer_for(&mut self, kind: &'static str) -> Result<&mut Writer<File>, SinkError> {
        if !self.writers.contains_key(kind) {
            let path = self.out_dir.join(format!("{kind}.csv"));
            let exists = path.exists();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let writer = csv::WriterBuilder::new()
                .has_headers(!exists)
                .from_writer(file);
            self.writers.insert(kind, writer);
        }
        Ok(self.writers.get_mut(kind).expect("just inserted"))
    }
}

impl RowSink for CsvSink {
    fn write_root(&mut self, row: &RootRow) -> Result<(), SinkError> {
        if self.root_written {
            return Ok(());
        }
        let writer = self.writer_for("root")?;
        writer.serialize(row)?;
        writer.flush()?;
        self.root_written = true;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<(), SinkError> {
        for row in rows {
            let kind = row.kind();
            let writer = self.writer_for(kind)?;
            match row {
                Row::Root(r) => writer.serialize(r as &RootRow)?,
                Row::InNetwork(r) => writer.serialize(r as &InNetworkRow)?,
                Row::NegotiatedPrice(r) => writer.serialize(r as &NegotiatedPriceRow)?,
                Row::ProviderGroup(r) => writer.serialize(r as &ProviderGroupRow)?,
            }
            writer.flush()?;
        }
        Ok(())
    }
}
