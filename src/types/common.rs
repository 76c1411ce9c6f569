//! Types shared across the canonical in-network model.
//!
//! Classification fields (entity type, billing code type, negotiation
//! arrangement, ...) are kept as plain `String` on `RootFields` and
//! `InNetworkItem` rather than parsed into enums — filtering never needs
//! more than the raw value, and the row flattener echoes it straight into
//! the output column.

use serde::{Deserialize, Serialize};

/// A group of providers sharing one TIN.
///
/// Invariant (enforced by the provider-reference resolver and the
/// in-network streamer, not by this type): a `ProviderGroup` with empty
/// `npi` after NPI filtering is dropped before it ever reaches a row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderGroup {
    pub npi: Vec<i64>,
    pub tin: TaxIdentifier,
}

/// Tax identifier carried with a provider group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxIdentifier {
    #[serde(rename = "type")]
    pub id_type: String,
    pub value: String,
}

/// A field that is absent, a single scalar string, or a JSON array whose
/// elements may be a mix of numbers and strings (e.g. `service_code`, which
/// coerces individual elements to integers where the source text is a valid
/// decimal and otherwise leaves them as strings).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynField {
    #[default]
    Absent,
    List(Vec<serde_json::Value>),
    Scalar(String),
}

impl<'de> Deserialize<'de> for DynField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Null => DynField::Absent,
            serde_json::Value::String(s) => DynField::Scalar(s),
            serde_json::Value::Array(items) => DynField::List(items),
            other => DynField::Scalar(other.to_string()),
        })
    }
}

impl Serialize for DynField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            DynField::Absent => serializer.serialize_none(),
            DynField::Scalar(s) => serializer.serialize_str(s),
            DynField::List(items) => items.serialize(serializer),
        }
    }
}

impl DynField {
    /// Encoding for the output column: list-valued fields (`service_code`,
    /// `billing_code_modifier`) become a compact JSON array; a bare scalar
    /// (`additional_information`) passes through unquoted; absent fields
    /// encode as an empty string. Matches the external-interface spec,
    /// under which only the array-typed columns get JSON-array encoding.
    pub fn to_csv_cell(&self) -> String {
        match self {
            DynField::Absent => String::new(),
            DynField::Scalar(s) => s.clone(),
            DynField::List(items) => serde_json::Value::Array(items.clone()).to_string(),
        }
    }
}

/// Deserialize a [`DynField`], then coerce each list element's string text to
/// an integer where it parses as a plain decimal. Elements that don't parse
/// (e.g. `"CSTM-00"`) are left as strings.
pub fn coerce_numeric_strings<'de, D>(deserializer: D) -> Result<DynField, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let field = DynField::deserialize(deserializer)?;
    Ok(match field {
        DynField::List(items) => DynField::List(
            items
                .into_iter()
                .map(|item| match item.as_str().and_then(|s| s.parse::<i64>().ok()) {
                    Some(n) => serde_json::Value::Number(n.into()),
                    None => item,
                })
                .collect(),
        ),
        other => other,
    })
}
