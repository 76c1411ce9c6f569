//! Top-level plan/payer metadata (C4): the scalar fields that sit beside
//! `provider_references` and `in_network` at the root of an MRF document.

use serde::{Deserialize, Serialize};

/// Scalar fields read from the root of the document, before `in_network`
/// streaming begins. Field names match the source JSON's `snake_case` keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootFields {
    pub reporting_entity_name: String,
    pub reporting_entity_type: String,
    pub plan_name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_id_type: Option<String>,
    pub plan_market_type: Option<String>,
    pub last_updated_on: String,
    pub version: String,
    pub url: Option<String>,
}
