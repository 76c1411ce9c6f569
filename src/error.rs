//! Error types for the extraction pipeline.
//!
//! Only fatal cases (`InvalidSource`, `InvalidMRF`, sink failures) are
//! surfaced to callers as `Err`. Per-reference and per-item failures (a
//! broken remote provider reference, a filter that drops everything) are
//! absorbed internally and logged; see `provider_refs` and `extractor`.

use std::io;

use thiserror::Error;

/// Fatal errors that abort an extraction run.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source location could not be opened: an unsupported extension,
    /// or the opened stream could not produce its first byte.
    #[error("invalid source {location}: {reason}")]
    InvalidSource { location: String, reason: String },

    /// A structural violation in the MRF document itself (e.g. the root
    /// never reaches a `provider_references`/`in_network` key, or a
    /// required field is missing where the schema demands one).
    #[error("invalid MRF document: {0}")]
    InvalidMrf(String),

    /// The underlying JSON token stream could not be read.
    #[error("JSON parse error: {0}")]
    Json(#[from] struson::reader::ReaderError),

    /// Writing a row to the output sink failed.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Reading from or opening the input byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from a `RowSink` implementation.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing rows: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error writing rows: {0}")]
    Csv(#[from] csv::Error),
}

/// Error computing a content hash for a record.
///
/// Returned when a record is empty, which can never join correctly
/// downstream and is treated as a programming-level invariant violation
/// rather than a transient failure.
#[derive(Debug, Error)]
#[error("cannot hash an empty record")]
pub struct InvalidHashInput;

pub type ExtractResult<T> = Result<T, ExtractError>;
