//! In-network streamer (C6): walks the `in_network` array one item at a
//! time, filtering by billing-code set and NPI set, substituting resolved
//! provider references, and yielding canonical [`InNetworkItem`] values.
//!
//! Assumes billing-code fields precede `negotiated_rates` in source order,
//! matching the published MRF schema — the code-set predicate is evaluated
//! against whatever the item's builder has accumulated by the time
//! `negotiated_rates` opens.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use serde_json::Value;

use crate::builder::ValueBuilder;
use crate::error::ExtractError;
use crate::event::{IncrementalParser, JsonEvent};
use crate::provider_refs::{apply_npi_filter, drop_provider_group_if_empty_npi};
use crate::types::{InNetworkItem, ProviderGroup};

const ITEM: &str = "in_network.item";
const RATES: &str = "in_network.item.negotiated_rates";
const RATE_ITEM: &str = "in_network.item.negotiated_rates.item";
const RATE_GROUP_ITEM: &str = "in_network.item.negotiated_rates.item.provider_groups.item";
const RATE_GROUP_NPI_ITEM: &str =
    "in_network.item.negotiated_rates.item.provider_groups.item.npi.item";
const RATE_REF_ITEM: &str = "in_network.item.negotiated_rates.item.provider_references.item";

/// Pull iterator over the `in_network` array. Construct after the caller has
/// already consumed `in_network`'s own `start_array` event.
pub struct InNetworkStreamer<'a, R: Read> {
    parser: &'a mut IncrementalParser<R>,
    builder: ValueBuilder,
    code_set: &'a HashSet<(String, String)>,
    npi_set: &'a HashSet<i64>,
    provider_ref_map: &'a HashMap<i64, Vec<ProviderGroup>>,
    extra_groups: Vec<ProviderGroup>,
}

impl<'a, R: Read> InNetworkStreamer<'a, R> {
    pub fn new(
        parser: &'a mut IncrementalParser<R>,
        code_set: &'a HashSet<(String, String)>,
        npi_set: &'a HashSet<i64>,
        provider_ref_map: &'a HashMap<i64, Vec<ProviderGroup>>,
    ) -> Self {
        let mut builder = ValueBuilder::new();
        builder.feed(JsonEvent::StartArray);
        Self {
            parser,
            builder,
            code_set,
            npi_set,
            provider_ref_map,
            extra_groups: Vec::new(),
        }
    }

    /// Abandon the in-progress item: skip to its closing brace and discard
    /// whatever the builder accumulated for it.
    fn abandon_item(&mut self) -> Result<(), ExtractError> {
        self.parser.fast_forward_to(ITEM, &JsonEvent::EndObject)?;
        self.builder.pop_abandon();
        self.extra_groups.clear();
        Ok(())
    }

    /// Merge a rate's inline `provider_groups` with whatever was resolved
    /// from `provider_references`, dropping the rate if both are empty.
    fn finish_rate(&mut self) {
        let Some(rates_arr) = self.builder.peek_top_array_mut() else {
            return;
        };
        let drop_rate = match rates_arr.last_mut() {
            Some(rate_obj) => {
                let inline_groups = rate_obj
                    .get("provider_groups")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let mut combined = inline_groups;
                combined.extend(
                    std::mem::take(&mut self.extra_groups)
                        .into_iter()
                        .map(|g| serde_json::to_value(g).expect("ProviderGroup always serializes")),
                );
                if combined.is_empty() {
                    true
                } else {
                    if let Some(obj) = rate_obj.as_object_mut() {
                        obj.insert("provider_groups".to_owned(), Value::Array(combined));
                    }
                    false
                }
            }
            None => false,
        };
        if drop_rate {
            rates_arr.pop();
        }
    }

    /// Pull the next canonical item, or `None` once `in_network` ends.
    pub fn next_item(&mut self) -> Result<Option<InNetworkItem>, ExtractError> {
        loop {
            let Some((path, event)) = self.parser.next_event()? else {
                return Ok(None);
            };

            if path == "in_network" && event == JsonEvent::EndArray {
                return Ok(None);
            }

            if path == RATES && event == JsonEvent::StartArray && !self.code_set.is_empty() {
                let code_matches = self
                    .builder
                    .peek_top_object()
                    .map(|item| {
                        let bt = item
                            .get("billing_code_type")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        let bc = item
                            .get("billing_code")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        self.code_set.contains(&(bt.to_owned(), bc.to_owned()))
                    })
                    .unwrap_or(false);
                if !code_matches {
                    self.abandon_item()?;
                    continue;
                }
            }

            self.builder.feed(event.clone());

            if path == RATE_ITEM && event == JsonEvent::EndObject {
                self.finish_rate();
            }

            apply_npi_filter(&mut self.builder, &path, &event, RATE_GROUP_NPI_ITEM, self.npi_set);
            drop_provider_group_if_empty_npi(&mut self.builder, &path, &event, RATE_GROUP_ITEM);

            if path == RATE_REF_ITEM {
                if let JsonEvent::Int(group_id) = &event {
                    if let Some(groups) = self.provider_ref_map.get(group_id) {
                        self.extra_groups.extend(groups.iter().cloned());
                    }
                }
            }

            if path == RATES && event == JsonEvent::EndArray {
                let empty = self
                    .builder
                    .peek_top_object()
                    .and_then(|item| item.get("negotiated_rates"))
                    .and_then(Value::as_array)
                    .map(|a| a.is_empty())
                    .unwrap_or(true);
                if empty {
                    self.abandon_item()?;
                    continue;
                }
            }

            if path == ITEM && event == JsonEvent::EndObject {
                let finished = self.builder.peek_top_array_mut().and_then(|arr| arr.pop());
                if let Some(value) = finished {
                    let item: InNetworkItem = serde_json::from_value(value)
                        .map_err(|e| ExtractError::InvalidMrf(e.to_string()))?;
                    return Ok(Some(item));
                }
            }
        }
    }
}
