//! Incremental JSON parser (C2): a lazy sequence of `(path, event)` pairs
//! over a byte stream, built as a thin shim over `struson`'s pull reader.
//!
//! `struson` hands out a structured begin/end-object pull API but no notion
//! of a JSON-pointer-style path; we maintain that path ourselves by mirroring
//! the container nesting in an explicit stack, one step at a time, so the
//! walk can be paused after every single event (needed by the subtree
//! builder and the in-network streamer to interleave filtering decisions
//! with parsing).

use std::io::Read;

use struson::reader::{JsonReader, JsonStreamReader, ReaderError, ValueType};

/// One token out of the incremental parser.
///
/// Numbers are integers unless the source text carries a fractional part or
/// exponent.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// An object member name. Carried as its own event (rather than folded
    /// into the following value) because several predicates key off the
    /// name alone, before the value has even started.
    Key(String),
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A dot-delimited JSON-pointer-ish path, e.g.
/// `in_network.item.negotiated_rates.item.provider_groups.item.npi.item`.
///
/// `map_key` events carry the path of the *enclosing* object; every other
/// event carries its own address.
pub type JsonPath = String;

#[derive(Clone, Copy, PartialEq)]
enum ContainerKind {
    Object,
    Array,
}

struct ContainerFrame {
    path: JsonPath,
    kind: ContainerKind,
}

/// What the driver should do on the next call to [`IncrementalParser::next_event`].
enum Pending {
    /// Read whatever value sits at `path` next (object, array, or scalar).
    ReadValue { path: JsonPath },
    /// We're inside an object; check whether another member follows.
    ObjectStep,
    /// We're inside an array; check whether another element follows.
    ArrayStep,
}

/// Shim over `struson::reader::JsonStreamReader` producing `(path, event)`
/// pairs one at a time.
pub struct IncrementalParser<R: Read> {
    reader: JsonStreamReader<R>,
    containers: Vec<ContainerFrame>,
    pending: Vec<Pending>,
}

impl<R: Read> IncrementalParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: JsonStreamReader::new(reader),
            containers: Vec::new(),
            pending: vec![Pending::ReadValue {
                path: JsonPath::new(),
            }],
        }
    }

    fn current_container_path(&self) -> JsonPath {
        self.containers
            .last()
            .map(|f| f.path.clone())
            .unwrap_or_default()
    }

    /// Pull the next `(path, event)` pair, or `None` once the top-level
    /// value has been fully consumed.
    pub fn next_event(&mut self) -> Result<Option<(JsonPath, JsonEvent)>, ReaderError> {
        loop {
            let action = match self.pending.pop() {
                Some(a) => a,
                None => return Ok(None),
            };

            match action {
                Pending::ReadValue { path } => {
                    let value_type = self.reader.peek()?;
                    match value_type {
                        ValueType::Object => {
                            self.reader.begin_object()?;
                            self.containers.push(ContainerFrame {
                                path: path.clone(),
                                kind: ContainerKind::Object,
                            });
                            self.pending.push(Pending::ObjectStep);
                            return Ok(Some((path, JsonEvent::StartObject)));
                        }
                        ValueType::Array => {
                            self.reader.begin_array()?;
                            self.containers.push(ContainerFrame {
                                path: path.clone(),
                                kind: ContainerKind::Array,
                            });
                            self.pending.push(Pending::ArrayStep);
                            return Ok(Some((path, JsonEvent::StartArray)));
                        }
                        ValueType::String => {
                            let s = self.reader.next_string()?;
                            return Ok(Some((path, JsonEvent::Str(s))));
                        }
                        ValueType::Number => {
                            let raw = self.reader.next_number_as_string()?;
                            return Ok(Some((path, parse_number(&raw))));
                        }
                        ValueType::Boolean => {
                            let b = self.reader.next_bool()?;
                            return Ok(Some((path, JsonEvent::Bool(b))));
                        }
                        ValueType::Null => {
                            self.reader.next_null()?;
                            return Ok(Some((path, JsonEvent::Null)));
                        }
                    }
                }
                Pending::ObjectStep => {
                    let container_path = self.current_container_path();
                    if self.reader.has_next()? {
                        let name = self.reader.next_name()?.to_owned();
                        let child_path = join_path(&container_path, &name);
                        self.pending.push(Pending::ObjectStep);
                        self.pending.push(Pending::ReadValue { path: child_path });
                        return Ok(Some((container_path, JsonEvent::Key(name))));
                    } else {
                        self.reader.end_object()?;
                        self.containers.pop();
                        return Ok(Some((container_path, JsonEvent::EndObject)));
                    }
                }
                Pending::ArrayStep => {
                    let container_path = self.current_container_path();
                    if self.reader.has_next()? {
                        let child_path = join_item(&container_path);
                        self.pending.push(Pending::ArrayStep);
                        self.pending.push(Pending::ReadValue { path: child_path });
                        continue;
                    } else {
                        self.reader.end_array()?;
                        self.containers.pop();
                        return Ok(Some((container_path, JsonEvent::EndArray)));
                    }
                }
            }
        }
    }

    /// Consume and discard events until the exact `(path, event)` pair is
    /// seen, then stop (that pair has been consumed). Used to skip the rest
    /// of a subtree once a predicate has decided to drop it.
    pub fn fast_forward_to(
        &mut self,
        target_path: &str,
        target: &JsonEvent,
    ) -> Result<(), ReaderError> {
        while let Some((path, event)) = self.next_event()? {
            if path == target_path && &event == target {
                return Ok(());
            }
        }
        Ok(())
    }
}

fn join_path(parent: &str, key: &str) -> JsonPath {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}

fn join_item(parent: &str) -> JsonPath {
    if parent.is_empty() {
        "item".to_owned()
    } else {
        format!("{parent}.item")
    }
}

/// Numeric policy: integers stay integers, fractional/exponent text parses
/// as floating-point.
fn parse_number(raw: &str) -> JsonEvent {
    if raw.contains('.') || raw.contains('e') || raw.contains('E') {
        JsonEvent::Float(raw.parse().unwrap_or(f64::NAN))
    } else if let Ok(i) = raw.parse::<i64>() {
        JsonEvent::Int(i)
    } else {
        JsonEvent::Float(raw.parse().unwrap_or(f64::NAN))
    }
}
