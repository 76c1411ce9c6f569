//! Canonical in-network item (C6 output): the normalized shape emitted by
//! the streamer, after provider-reference substitution and NPI/code
//! filtering. Classification fields are kept as `String` — see the module
//! doc comment in `types::mod` for why.

use serde::{Deserialize, Serialize};

use super::common::{coerce_numeric_strings, DynField, ProviderGroup};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InNetworkItem {
    pub negotiation_arrangement: String,
    pub name: String,
    pub billing_code_type: String,
    pub billing_code_type_version: String,
    pub billing_code: String,
    pub description: String,
    pub negotiated_rates: Vec<NegotiatedRate>,

    /// Passed through unfiltered; no row kind consumes this yet, so adding
    /// a dedicated row later is additive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_codes: Option<Vec<serde_json::Value>>,
}

/// A single negotiated rate, after `provider_references` has been resolved
/// away and merged into `provider_groups`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiatedRate {
    pub provider_groups: Vec<ProviderGroup>,
    pub negotiated_prices: Vec<NegotiatedPrice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiatedPrice {
    pub billing_class: String,
    pub negotiated_type: String,
    pub expiration_date: String,
    pub negotiated_rate: f64,

    /// Array elements coerce to integer where the source text is a valid
    /// decimal (e.g. `"11"` -> `11`), else stay as a string (e.g.
    /// `"CSTM-00"`) — the numeric policy is scoped to this field alone, not
    /// `additional_information` or `billing_code_modifier`.
    #[serde(default, deserialize_with = "coerce_numeric_strings")]
    pub service_code: DynField,
    #[serde(default)]
    pub additional_information: DynField,
    #[serde(default)]
    pub billing_code_modifier: DynField,
}
