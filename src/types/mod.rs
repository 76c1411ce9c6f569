//! Canonical (post-extraction) data model for a single MRF document.
//!
//! These types represent the *normalized* shape the pipeline emits rows
//! from: by the time an [`in_network::InNetworkItem`] reaches C7, every
//! `NegotiatedRate` carries a resolved `provider_groups` list regardless of
//! whether the source expressed it inline or by reference. Classification
//! fields that are only ever echoed into output columns (entity type,
//! billing code type, negotiation arrangement, ...) are kept as `String`
//! rather than re-validated into an enum — filtering never needs more than
//! the raw value.
//!
//! There is no standalone `ProviderReference` type: the provider-reference
//! resolver's output is a `HashMap<i64, Vec<ProviderGroup>>` keyed by
//! `provider_group_id`, and that map *is* the resolved representation
//! in-network streaming substitutes against.

mod common;
mod in_network;
mod root;

pub use common::*;
pub use in_network::*;
pub use root::*;
