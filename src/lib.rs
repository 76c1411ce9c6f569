//! Streaming extractor for Transparency in Coverage machine-readable files
//! (MRFs): consumes one MRF document, filters it against a caller-supplied
//! billing-code set and NPI set, resolves provider references (local and
//! remote), and emits a flat, hash-keyed row stream.
//!
//! The pipeline is a single-threaded pull chain, leaves first:
//!
//! ```text
//! source -> event -> root -> provider_refs -> in_network -> rows -> sink
//! ```
//!
//! [`extractor::run`] drives the whole chain for one document. Everything
//! else in this crate is a component of that pipeline and can be used on its
//! own by a caller that wants finer control (e.g. streaming straight from an
//! already-open `Read`, or substituting a [`sink::RowSink`] other than CSV).

pub mod builder;
pub mod error;
pub mod event;
pub mod extractor;
pub mod hash;
pub mod in_network;
pub mod provider_refs;
pub mod root;
pub mod rows;
pub mod sink;
pub mod source;
pub mod types;

pub use error::{ExtractError, ExtractResult};
pub use extractor::{run, run_async, ExtractionOutcome, ExtractorConfig};
pub use source::Location;
