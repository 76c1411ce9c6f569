//! Top-level orchestration: the extractor lifecycle state machine
//! (`Idle -> RootBuilding -> ProvRefs? -> InNetworkStreaming -> Done`),
//! wiring C1 through C8 into a single blocking call.
//!
//! The streaming core (C2's `struson` reader) is inherently synchronous, so
//! `run` is a blocking function; [`run_async`] offloads it onto a blocking
//! thread pool via `tokio::task::spawn_blocking` for callers already inside
//! an async runtime, keeping blocking I/O off the executor without forcing
//! the parser itself through an async adapter.

use std::collections::HashSet;
use std::io::Read;

use tracing::{info, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::event::IncrementalParser;
use crate::in_network::InNetworkStreamer;
use crate::provider_refs;
use crate::root::{build_root, Terminator};
use crate::rows::{flatten, hash_root};
use crate::sink::RowSink;
use crate::source::{self, FetchPolicy, Location};

/// Inputs that stay constant for one extractor run.
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    /// Accept-all when empty.
    pub npi_set: HashSet<i64>,
    /// Accept-all when empty.
    pub code_set: HashSet<(String, String)>,
    pub fetch_policy: FetchPolicy,
}

/// What a run produced, distinguishing a clean no-op from real output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// At least one `in_network` item was emitted.
    Done { items_emitted: usize },
    /// Provider-reference filtering left nothing for a non-empty NPI set;
    /// the run ends cleanly with no rows written at all.
    EmptyAfterFilter,
}

/// Run the extractor against one MRF document, writing rows to `sink`.
pub fn run<S: RowSink>(
    location: &Location,
    config: &ExtractorConfig,
    sink: &mut S,
) -> ExtractResult<ExtractionOutcome> {
    let stream: Box<dyn Read> = source::open(location, &config.fetch_policy)?;
    let mut parser = IncrementalParser::new(stream);

    let (root_fields, terminator) = build_root(&mut parser)?;
    let root_row = hash_root(&root_fields)
        .map_err(|_| ExtractError::InvalidMrf("root record hashed to empty".to_owned()))?;

    let provider_ref_map = match terminator {
        Terminator::ProviderReferences => {
            // `build_root` stopped right after the `provider_references` key;
            // consume its `start_array` before handing the parser to C5.
            parser.next_event()?;
            let map = provider_refs::resolve(&mut parser, &config.npi_set, &config.fetch_policy)?;
            if map.is_empty() && !config.npi_set.is_empty() {
                info!("provider references empty after NPI filtering, short-circuiting run");
                return Ok(ExtractionOutcome::EmptyAfterFilter);
            }
            advance_to_in_network(&mut parser)?;
            map
        }
        Terminator::InNetwork => {
            // `build_root` stopped right after the `in_network` key; consume
            // its `start_array` before streaming items.
            parser.next_event()?;
            Default::default()
        }
    };

    let mut streamer = InNetworkStreamer::new(
        &mut parser,
        &config.code_set,
        &config.npi_set,
        &provider_ref_map,
    );

    let mut items_emitted = 0usize;
    while let Some(item) = streamer.next_item()? {
        let rows = flatten(&item, &root_row.root_hash_key)
            .map_err(|_| ExtractError::InvalidMrf("in_network record hashed to empty".to_owned()))?;
        if items_emitted == 0 {
            sink.write_root(&root_row)?;
        }
        sink.write_rows(&rows)?;
        items_emitted += 1;
    }

    if items_emitted == 0 {
        warn!("no in_network items survived filtering; no rows written");
    }

    Ok(ExtractionOutcome::Done { items_emitted })
}

/// Async wrapper for callers already on a tokio runtime. The streaming core
/// itself stays synchronous (`struson`'s reader is a blocking `Read`
/// adapter); this just keeps that blocking work off the async executor.
pub async fn run_async<S>(
    location: Location,
    config: ExtractorConfig,
    mut sink: S,
) -> ExtractResult<(ExtractionOutcome, S)>
where
    S: RowSink + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let outcome = run(&location, &config, &mut sink)?;
        Ok((outcome, sink))
    })
    .await
    .expect("extractor blocking task panicked")
}

/// After C5 has consumed `provider_references` to its closing bracket,
/// advance past whatever else sits at the document root until `in_network`
/// opens (matching the published schema, `in_network` is the only other
/// structural key, but scalar fields could in principle be interleaved).
fn advance_to_in_network<R: Read>(parser: &mut IncrementalParser<R>) -> ExtractResult<()> {
    loop {
        let Some((path, event)) = parser.next_event()? else {
            return Err(ExtractError::InvalidMrf(
                "document ended before in_network".to_owned(),
            ));
        };
        if path.is_empty() {
            if let crate::event::JsonEvent::Key(name) = &event {
                if name == "in_network" {
                    parser.next_event()?; // start_array
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CsvSink;

    fn write_source(dir: &std::path::Path, name: &str, json: &str) -> Location {
        let path = dir.join(name);
        std::fs::write(&path, json).unwrap();
        Location::Path(path)
    }

    #[tokio::test]
    async fn run_async_offloads_onto_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "insurer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "in_network": []
        }"#;
        let location = write_source(dir.path(), "mrf.json", json);
        let out_dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(out_dir.path());

        let (outcome, _sink) = run_async(location, ExtractorConfig::default(), sink)
            .await
            .unwrap();
        assert_eq!(outcome, ExtractionOutcome::Done { items_emitted: 0 });
    }

    #[test]
    fn s1_inline_only_no_filter_emits_one_row_group() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "insurer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2020",
                    "billing_code": "01925",
                    "description": "desc",
                    "negotiated_rates": [
                        {
                            "provider_groups": [
                                {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
                            ],
                            "negotiated_prices": [
                                {
                                    "billing_class": "professional",
                                    "negotiated_type": "negotiated",
                                    "negotiated_rate": 100.0,
                                    "expiration_date": "9999-12-31",
                                    "service_code": ["11"]
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let location = write_source(dir.path(), "mrf.json", json);
        let out_dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(out_dir.path());

        let outcome = run(&location, &ExtractorConfig::default(), &mut sink).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Done { items_emitted: 1 });
        drop(sink);

        for name in ["root.csv", "in_network.csv", "provider_groups.csv", "negotiated_prices.csv"] {
            assert!(out_dir.path().join(name).exists(), "missing {name}");
        }
        let service_code_cell =
            std::fs::read_to_string(out_dir.path().join("negotiated_prices.csv")).unwrap();
        assert!(service_code_cell.contains("[11]"));
    }

    #[test]
    fn s2_code_filter_miss_emits_no_rows_including_root() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "insurer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2020",
                    "billing_code": "01925",
                    "description": "desc",
                    "negotiated_rates": [
                        {
                            "provider_groups": [
                                {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
                            ],
                            "negotiated_prices": [
                                {
                                    "billing_class": "professional",
                                    "negotiated_type": "negotiated",
                                    "negotiated_rate": 100.0,
                                    "expiration_date": "9999-12-31"
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let location = write_source(dir.path(), "mrf.json", json);
        let out_dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(out_dir.path());

        let mut config = ExtractorConfig::default();
        config.code_set.insert(("CPT".to_owned(), "99999".to_owned()));

        let outcome = run(&location, &config, &mut sink).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Done { items_emitted: 0 });
        drop(sink);

        assert!(!out_dir.path().join("root.csv").exists());
        assert!(!out_dir.path().join("in_network.csv").exists());
    }

    #[test]
    fn s3_provider_reference_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "insurer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "provider_references": [
                {"provider_group_id": 1, "provider_groups": [
                    {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
                ]}
            ],
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2020",
                    "billing_code": "01925",
                    "description": "desc",
                    "negotiated_rates": [
                        {
                            "provider_references": [1],
                            "negotiated_prices": [
                                {
                                    "billing_class": "professional",
                                    "negotiated_type": "negotiated",
                                    "negotiated_rate": 100.0,
                                    "expiration_date": "9999-12-31"
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let location = write_source(dir.path(), "mrf.json", json);
        let out_dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(out_dir.path());

        let outcome = run(&location, &ExtractorConfig::default(), &mut sink).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Done { items_emitted: 1 });
        drop(sink);

        let groups = std::fs::read_to_string(out_dir.path().join("provider_groups.csv")).unwrap();
        assert!(groups.contains("1467915983"));
    }

    #[test]
    fn s4_npi_filter_short_circuits_before_in_network() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "insurer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "provider_references": [
                {"provider_group_id": 1, "provider_groups": [
                    {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
                ]}
            ],
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2020",
                    "billing_code": "01925",
                    "description": "desc",
                    "negotiated_rates": [
                        {
                            "provider_references": [1],
                            "negotiated_prices": [
                                {
                                    "billing_class": "professional",
                                    "negotiated_type": "negotiated",
                                    "negotiated_rate": 100.0,
                                    "expiration_date": "9999-12-31"
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let location = write_source(dir.path(), "mrf.json", json);
        let out_dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(out_dir.path());

        let mut config = ExtractorConfig::default();
        config.npi_set.insert(9_999_999_999);

        let outcome = run(&location, &config, &mut sink).unwrap();
        assert_eq!(outcome, ExtractionOutcome::EmptyAfterFilter);
    }

    #[test]
    fn hash_stability_across_two_runs() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "insurer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2020",
                    "billing_code": "01925",
                    "description": "desc",
                    "negotiated_rates": [
                        {
                            "provider_groups": [
                                {"npi": [1467915983], "tin": {"type": "ein", "value": "12-3456789"}}
                            ],
                            "negotiated_prices": [
                                {
                                    "billing_class": "professional",
                                    "negotiated_type": "negotiated",
                                    "negotiated_rate": 100.0,
                                    "expiration_date": "9999-12-31"
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let location = write_source(dir.path(), "mrf.json", json);

        let out_a = tempfile::tempdir().unwrap();
        let mut sink_a = CsvSink::new(out_a.path());
        run(&location, &ExtractorConfig::default(), &mut sink_a).unwrap();
        drop(sink_a);

        let out_b = tempfile::tempdir().unwrap();
        let mut sink_b = CsvSink::new(out_b.path());
        run(&location, &ExtractorConfig::default(), &mut sink_b).unwrap();
        drop(sink_b);

        let a = std::fs::read_to_string(out_a.path().join("in_network.csv")).unwrap();
        let b = std::fs::read_to_string(out_b.path().join("in_network.csv")).unwrap();
        assert_eq!(a, b);
    }
}
