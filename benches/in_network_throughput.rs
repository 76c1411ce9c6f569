//! Throughput of the in-network streamer (C6) over a synthetic document,
//! checked against item count rather than file size — memory use is bounded
//! by a single item plus the provider-reference map, so wall-clock should
//! scale linearly with item count regardless of how the document got this
//! large.

use std::collections::{HashMap, HashSet};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mrf_extract::event::IncrementalParser;
use mrf_extract::in_network::InNetworkStreamer;

fn synthetic_document(item_count: usize) -> String {
    let mut items = Vec::with_capacity(item_count);
    for i in 0..item_count {
        items.push(format!(
            r#"{{
                "negotiation_arrangement": "ffs",
                "name": "service {i}",
                "billing_code_type": "CPT",
                "billing_code_type_version": "2020",
                "billing_code": "{:05}",
                "description": "synthetic",
                "negotiated_rates": [
                    {{
                        "provider_groups": [
                            {{"npi": [1467915983, 1234567890], "tin": {{"type": "ein", "value": "12-3456789"}}}}
                        ],
                        "negotiated_prices": [
                            {{
                                "billing_class": "professional",
                                "negotiated_type": "negotiated",
                                "negotiated_rate": 100.0,
                                "expiration_date": "9999-12-31",
                                "service_code": ["11"]
                            }}
                        ]
                    }}
                ]
            }}"#,
            i % 100_000,
        ));
    }
    format!(r#"{{"in_network": [{}]}}"#, items.join(","))
}

fn bench_stream_items(c: &mut Criterion) {
    let doc = synthetic_document(2_000);
    let code_set = HashSet::new();
    let npi_set = HashSet::new();
    let refs = HashMap::new();

    c.bench_function("in_network_stream_2000_items", |b| {
        b.iter(|| {
            let mut parser = IncrementalParser::new(doc.as_bytes());
            parser.next_event().unwrap(); // start_object
            parser.next_event().unwrap(); // key "in_network"
            parser.next_event().unwrap(); // start_array
            let mut streamer =
                InNetworkStreamer::new(&mut parser, &code_set, &npi_set, &refs);
            let mut count = 0usize;
            while let Some(item) = streamer.next_item().unwrap() {
                black_box(&item);
                count += 1;
            }
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_stream_items);
criterion_main!(benches);
