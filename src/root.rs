//! Root extractor (C4): reads the MRF's top-level scalar fields up to
//! whichever structural array starts the document's next section.
//!
//! Consumes the document's own `start_object` event itself — this is the
//! first thing called against a fresh [`IncrementalParser`]. Stops right
//! after the `map_key` event naming the terminator, without touching the
//! array's `start_array` event, so the caller can act on which section
//! follows (`provider_references` or straight to `in_network`) before
//! consuming it.

use std::io::Read;

use serde_json::Value;

use crate::builder::ValueBuilder;
use crate::error::ExtractError;
use crate::event::{IncrementalParser, JsonEvent};
use crate::types::RootFields;

/// Which structural array the document moves to after its scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    ProviderReferences,
    InNetwork,
}

pub fn build_root<R: Read>(
    parser: &mut IncrementalParser<R>,
) -> Result<(RootFields, Terminator), ExtractError> {
    let mut builder = ValueBuilder::new();

    loop {
        let Some((path, event)) = parser.next_event()? else {
            return Err(ExtractError::InvalidMrf(
                "document ended before a provider_references or in_network key".to_owned(),
            ));
        };

        if path.is_empty() {
            if let JsonEvent::Key(name) = &event {
                match name.as_str() {
                    "provider_references" => {
                        return Ok((extract_root_fields(&builder)?, Terminator::ProviderReferences));
                    }
                    "in_network" => {
                        return Ok((extract_root_fields(&builder)?, Terminator::InNetwork));
                    }
                    _ => {}
                }
            }
        }

        builder.feed(event);
    }
}

fn extract_root_fields(builder: &ValueBuilder) -> Result<RootFields, ExtractError> {
    let map = builder
        .peek_top_object()
        .cloned()
        .ok_or_else(|| ExtractError::InvalidMrf("root is not a JSON object".to_owned()))?;
    serde_json::from_value(Value::Object(map))
        .map_err(|e| ExtractError::InvalidMrf(format!("invalid root fields: {e}")))
}
