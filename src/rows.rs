//! Row flattening (rest of C7): turns one canonical [`InNetworkItem`] plus
//! the run's `root_hash_key` into the flat rows that get written to `out_dir`.
//!
//! Rows are emitted bottom-up per field order in the fixed column schema so
//! the sink can serialize each struct directly via `csv`'s `Serialize`
//! derive — field declaration order on each row struct *is* the output
//! column order.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::InvalidHashInput;
use crate::hash::hash_record;
use crate::types::{InNetworkItem, RootFields};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RootRow {
    pub root_hash_key: String,
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

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InNetworkRow {
    pub root_hash_key: String,
    pub in_network_hash_key: String,
    pub negotiation_arrangement: String,
    pub name: String,
    pub billing_code_type_version: String,
    pub description: String,
    pub billing_code: String,
    pub billing_code_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NegotiatedPriceRow {
    pub root_hash_key: String,
    pub in_network_hash_key: String,
    pub negotiated_rates_hash_key: String,
    pub billing_class: String,
    pub negotiated_type: String,
    pub service_code: String,
    pub expiration_date: String,
    pub additional_information: String,
    pub billing_code_modifier: String,
    pub negotiated_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderGroupRow {
    pub root_hash_key: String,
    pub in_network_hash_key: String,
    pub negotiated_rates_hash_key: String,
    pub tin_type: String,
    pub tin_value: String,
    pub npi_numbers: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Root(RootRow),
    InNetwork(InNetworkRow),
    NegotiatedPrice(NegotiatedPriceRow),
    ProviderGroup(ProviderGroupRow),
}

impl Row {
    /// The output file's stem, e.g. `"in_network"` for `in_network.csv`.
    pub fn kind(&self) -> &'static str {
        match self {
            Row::Root(_) => "root",
            Row::InNetwork(_) => "in_network",
            Row::NegotiatedPrice(_) => "negotiated_prices",
            Row::ProviderGroup(_) => "provider_groups",
        }
    }
}

/// Build the `root` row and its `root_hash_key`, hashed over every field
/// except the key itself.
pub fn hash_root(root: &RootFields) -> Result<RootRow, InvalidHashInput> {
    let record = json!({
        "reporting_entity_name": root.reporting_entity_name,
        "reporting_entity_type": root.reporting_entity_type,
        "plan_name": root.plan_name,
        "plan_id": root.plan_id,
        "plan_id_type": root.plan_id_type,
        "plan_market_type": root.plan_market_type,
        "last_updated_on": root.last_updated_on,
        "version": root.version,
        "url": root.url,
    });
    let root_hash_key = hash_record(&record)?;
    Ok(RootRow {
        root_hash_key,
        reporting_entity_name: root.reporting_entity_name.clone(),
        reporting_entity_type: root.reporting_entity_type.clone(),
        plan_name: root.plan_name.clone(),
        plan_id: root.plan_id.clone(),
        plan_id_type: root.plan_id_type.clone(),
        plan_market_type: root.plan_market_type.clone(),
        last_updated_on: root.last_updated_on.clone(),
        version: root.version.clone(),
        url: root.url.clone(),
    })
}

/// Flatten one canonical item into its contiguous group of rows, in the
/// order: one `in_network` row, then per rate one `provider_groups` row per
/// provider group and one `negotiated_prices` row per price.
pub fn flatten(item: &InNetworkItem, root_hash_key: &str) -> Result<Vec<Row>, InvalidHashInput> {
    let mut rows = Vec::new();

    let in_network_record = json!({
        "root_hash_key": root_hash_key,
        "negotiation_arrangement": item.negotiation_arrangement,
        "name": item.name,
        "billing_code_type": item.billing_code_type,
        "billing_code_type_version": item.billing_code_type_version,
        "billing_code": item.billing_code,
        "description": item.description,
    });
    let in_network_hash_key = hash_record(&in_network_record)?;

    rows.push(Row::InNetwork(InNetworkRow {
        root_hash_key: root_hash_key.to_owned(),
        in_network_hash_key: in_network_hash_key.clone(),
        negotiation_arrangement: item.negotiation_arrangement.clone(),
        name: item.name.clone(),
        billing_code_type_version: item.billing_code_type_version.clone(),
        description: item.description.clone(),
        billing_code: item.billing_code.clone(),
        billing_code_type: item.billing_code_type.clone(),
    }));

    for rate in &item.negotiated_rates {
        let rate_value: Value = serde_json::to_value(rate)
            .expect("NegotiatedRate always serializes to a JSON object");
        let negotiated_rates_hash_key = hash_record(&rate_value)?;

        for group in &rate.provider_groups {
            let npi_numbers = Value::Array(
                group
                    .npi
                    .iter()
                    .map(|n| Value::Number((*n).into()))
                    .collect(),
            )
            .to_string();

            rows.push(Row::ProviderGroup(ProviderGroupRow {
                root_hash_key: root_hash_key.to_owned(),
                in_network_hash_key: in_network_hash_key.clone(),
                negotiated_rates_hash_key: negotiated_rates_hash_key.clone(),
                tin_type: group.tin.id_type.clone(),
                tin_value: group.tin.value.clone(),
                npi_numbers,
            }));
        }

        for price in &rate.negotiated_prices {
            rows.push(Row::NegotiatedPrice(NegotiatedPriceRow {
                root_hash_key: root_hash_key.to_owned(),
                in_network_hash_key: in_network_hash_key.clone(),
                negotiated_rates_hash_key: negotiated_rates_hash_key.clone(),
                billing_class: price.billing_class.clone(),
                negotiated_type: price.negotiated_type.clone(),
                service_code: price.service_code.to_csv_cell(),
                expiration_date: price.expiration_date.clone(),
                additional_information: price.additional_information.to_csv_cell(),
                billing_code_modifier: price.billing_code_modifier.to_csv_cell(),
                negotiated_rate: price.negotiated_rate,
            }));
        }
    }

    Ok(rows)
}
