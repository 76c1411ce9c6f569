//! Provider-reference resolution (C5): builds the `provider_group_id →
//! [ProviderGroup]` map that the in-network streamer substitutes in for
//! every `negotiated_rates.item.provider_references` entry.
//!
//! Two phases: a local walk of the `provider_references` array (Phase A),
//! followed by a parallel fetch of whichever references only carried a
//! `location` (Phase B). The map is frozen before in-network streaming
//! starts; nothing about it changes once [`resolve`] returns.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use tracing::warn;

use crate::builder::ValueBuilder;
use crate::error::ExtractError;
use crate::event::{IncrementalParser, JsonEvent};
use crate::source::{self, FetchPolicy, Location};
use crate::types::ProviderGroup;

/// Drop the array element just fed if its event is an NPI integer absent
/// from `npi_set` (a no-op when `npi_set` is empty, per the accept-all
/// convention). `npi_array_path` is the dotted path of `npi.item` relative
/// to whatever subtree is being walked.
pub(crate) fn apply_npi_filter(
    builder: &mut ValueBuilder,
    path: &str,
    event: &JsonEvent,
    npi_array_path: &str,
    npi_set: &HashSet<i64>,
) {
    if path != npi_array_path || npi_set.is_empty() {
        return;
    }
    if let JsonEvent::Int(npi) = event {
        if !npi_set.contains(npi) {
            if let Some(arr) = builder.peek_top_array_mut() {
                arr.pop();
            }
        }
    }
}

/// Drop the provider group just closed if its `npi` list ended up empty.
/// `group_end_path` is the dotted path of `provider_groups.item` relative to
/// whatever subtree is being walked.
pub(crate) fn drop_provider_group_if_empty_npi(
    builder: &mut ValueBuilder,
    path: &str,
    event: &JsonEvent,
    group_end_path: &str,
) {
    if path != group_end_path || *event != JsonEvent::EndObject {
        return;
    }
    let empty = builder
        .peek_top_array()
        .and_then(|arr| arr.last())
        .map(|v| {
            v.get("npi")
                .and_then(|n| n.as_array())
                .map(|a| a.is_empty())
                .unwrap_or(true)
        })
        .unwrap_or(false);
    if empty {
        if let Some(arr) = builder.peek_top_array_mut() {
            arr.pop();
        }
    }
}

fn parsed_provider_groups(groups: Vec<serde_json::Value>) -> Vec<ProviderGroup> {
    groups
        .into_iter()
        .filter_map(|g| serde_json::from_value(g).ok())
        .collect()
}

/// Phase A: walk the `provider_references` array, already entered (the
/// caller has consumed its `start_array` event). Returns the map of locally
/// resolved groups plus the `(provider_group_id, location)` pairs that still
/// need a remote fetch.
fn resolve_local<R: Read>(
    parser: &mut IncrementalParser<R>,
    npi_set: &HashSet<i64>,
) -> Result<(HashMap<i64, Vec<ProviderGroup>>, Vec<(i64, String)>), ExtractError> {
    let mut local = HashMap::new();
    let mut remote = Vec::new();

    let mut builder = ValueBuilder::new();
    builder.feed(JsonEvent::StartArray);

    while let Some((path, event)) = parser.next_event()? {
        if path == "provider_references" && event == JsonEvent::EndArray {
            break;
        }

        builder.feed(event.clone());

        apply_npi_filter(
            &mut builder,
            &path,
            &event,
            "provider_references.item.provider_groups.item.npi.item",
            npi_set,
        );
        drop_provider_group_if_empty_npi(
            &mut builder,
            &path,
            &event,
            "provider_references.item.provider_groups.item",
        );

        if path == "provider_references.item" && event == JsonEvent::EndObject {
            let finished = builder
                .peek_top_array_mut()
                .and_then(|arr| arr.pop())
                .unwrap_or(serde_json::Value::Null);

            let group_id = finished.get("provider_group_id").and_then(|v| v.as_i64());
            let location = finished
                .get("location")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_owned);
            let groups = finished
                .get("provider_groups")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();

            let Some(gid) = group_id else { continue };
            match location {
                Some(loc) => remote.push((gid, loc)),
                None => {
                    let parsed = parsed_provider_groups(groups);
                    if !parsed.is_empty() {
                        local.insert(gid, parsed);
                    }
                }
            }
        }
    }

    Ok((local, remote))
}

/// Phase B: fetch and parse one remote, `ProviderReference`-shaped document,
/// applying the same NPI filter. Any failure is returned as an error string
/// for the caller to log; it never aborts the run.
fn resolve_remote(
    url: &str,
    npi_set: &HashSet<i64>,
    policy: &FetchPolicy,
) -> Result<Vec<ProviderGroup>, String> {
    let stream = source::open(&Location::parse(url), policy).map_err(|e| e.to_string())?;
    let mut parser = IncrementalParser::new(stream);
    let mut builder = ValueBuilder::new();

    while let Some((path, event)) = parser.next_event().map_err(|e| e.to_string())? {
        builder.feed(event.clone());
        apply_npi_filter(
            &mut builder,
            &path,
            &event,
            "provider_groups.item.npi.item",
            npi_set,
        );
        drop_provider_group_if_empty_npi(&mut builder, &path, &event, "provider_groups.item");
    }

    let value = builder
        .take_finished()
        .ok_or_else(|| "remote provider reference produced no value".to_owned())?;
    let groups = value
        .get("provider_groups")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let parsed = parsed_provider_groups(groups);
    if parsed.is_empty() {
        return Err("no provider groups survive filtering".to_owned());
    }
    Ok(parsed)
}

/// Run both phases and return the frozen `provider_group_id → [ProviderGroup]`
/// map. `parser` must already be positioned just past `provider_references`'s
/// `start_array` event.
pub fn resolve<R: Read>(
    parser: &mut IncrementalParser<R>,
    npi_set: &HashSet<i64>,
    policy: &FetchPolicy,
) -> Result<HashMap<i64, Vec<ProviderGroup>>, ExtractError> {
    let (mut map, remote) = resolve_local(parser, npi_set)?;

    if !remote.is_empty() {
        let results: Vec<(i64, String, Result<Vec<ProviderGroup>, String>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = remote
                    .iter()
                    .map(|(gid, url)| {
                        let gid = *gid;
                        let url = url.clone();
                        scope.spawn(move || {
                            let result = resolve_remote(&url, npi_set, policy);
                            (gid, url, result)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().expect("fetch thread panicked")).collect()
            });

        for (gid, url, result) in results {
            match result {
                Ok(groups) => {
                    map.insert(gid, groups);
                }
                Err(reason) => {
                    warn!(provider_group_id = gid, url, reason, "remote provider reference failed");
                }
            }
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::{logs_contain, traced_test};

    fn run(json: &str, npi_set: &HashSet<i64>) -> HashMap<i64, Vec<ProviderGroup>> {
        let mut parser = IncrementalParser::new(json.as_bytes());
        // consume the wrapping object's start, the key, and the array start
        parser.next_event().unwrap(); // start_object
        parser.next_event().unwrap(); // key "provider_references"
        parser.next_event().unwrap(); // start_array
        resolve(&mut parser, npi_set, &FetchPolicy::default()).unwrap()
    }

    #[test]
    fn resolves_inline_groups() {
        let json = r#"{"provider_references": [
            {"provider_group_id": 1, "provider_groups": [
                {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
            ]}
        ]}"#;
        let map = run(json, &HashSet::new());
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1][0].npi, vec![1467915983]);
    }

    #[test]
    fn npi_filter_drops_group_with_no_surviving_npi() {
        let json = r#"{"provider_references": [
            {"provider_group_id": 1, "provider_groups": [
                {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
            ]}
        ]}"#;
        let mut npi_set = HashSet::new();
        npi_set.insert(9999999999);
        let map = run(json, &npi_set);
        assert!(map.is_empty());
    }

    #[test]
    fn reference_with_empty_provider_groups_is_dropped() {
        let json = r#"{"provider_references": [
            {"provider_group_id": 1, "provider_groups": []}
        ]}"#;
        let map = run(json, &HashSet::new());
        assert!(map.is_empty());
    }

    #[traced_test]
    #[test]
    fn remote_reference_failure_is_isolated_and_logged() {
        let mut server = mockito::Server::new();
        let broken = server.mock("GET", "/broken.json").with_status(500).create();

        let json = format!(
            r#"{{"provider_references": [
                {{"provider_group_id": 1, "location": "{}/broken.json"}},
                {{"provider_group_id": 2, "provider_groups": [
                    {{"npi": [1467915983], "tin": {{"type": "ein", "value": "12-3456789"}}}}
                ]}}
            ]}}"#,
            server.url()
        );
        let policy = FetchPolicy {
            timeout: std::time::Duration::from_secs(5),
            max_retries: 0,
        };
        let mut parser = IncrementalParser::new(json.as_bytes());
        parser.next_event().unwrap();
        parser.next_event().unwrap();
        parser.next_event().unwrap();

        let map = resolve(&mut parser, &HashSet::new(), &policy).unwrap();

        // The broken reference produced no entry, but its sibling still did.
        assert!(!map.contains_key(&1));
        assert_eq!(map[&2][0].npi, vec![1467915983]);
        assert!(logs_contain("remote provider reference failed"));
        broken.assert();
    }
}
