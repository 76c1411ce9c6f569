//! Subtree builder (C3): accumulates a generic `serde_json::Value` from a
//! stream of [`JsonEvent`]s, bounded to whatever subtree is currently open.
//!
//! The builder exposes enough surface for callers to peek at a
//! partially-built container (to make a filtering decision mid-build) and to
//! drop one (pop it off before it's finished, discarding whatever was
//! accumulated so far) — the move the in-network streamer and the
//! provider-reference resolver both rely on to abandon a subtree whose
//! predicate failed without materializing the rest of it.

use serde_json::{Map, Number, Value};

use crate::event::JsonEvent;

enum OpenContainer {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

/// Stack-based accumulator mirroring the currently open containers.
///
/// Values are completed and folded into their parent as soon as the
/// corresponding `end_map`/`end_array` event (or a scalar event at
/// top-of-stack) is fed in. A pending object key is tracked separately since
/// `Key` and the value that follows arrive as two events.
#[derive(Default)]
pub struct ValueBuilder {
    stack: Vec<OpenContainer>,
    pending_key: Option<String>,
    /// Completed top-level value, once the outermost container has closed.
    finished: Option<Value>,
}

impl ValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event into the builder.
    pub fn feed(&mut self, event: JsonEvent) {
        match event {
            JsonEvent::Key(k) => self.pending_key = Some(k),
            JsonEvent::StartObject => self.stack.push(OpenContainer::Object(Map::new())),
            JsonEvent::StartArray => self.stack.push(OpenContainer::Array(Vec::new())),
            JsonEvent::EndObject => {
                let value = match self.stack.pop() {
                    Some(OpenContainer::Object(map)) => Value::Object(map),
                    _ => Value::Null,
                };
                self.place(value);
            }
            JsonEvent::EndArray => {
                let value = match self.stack.pop() {
                    Some(OpenContainer::Array(vec)) => Value::Array(vec),
                    _ => Value::Null,
                };
                self.place(value);
            }
            JsonEvent::Null => self.place(Value::Null),
            JsonEvent::Bool(b) => self.place(Value::Bool(b)),
            JsonEvent::Int(i) => self.place(Value::Number(Number::from(i))),
            JsonEvent::Float(f) => self.place(
                Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            ),
            JsonEvent::Str(s) => self.place(Value::String(s)),
        }
    }

    /// Place a completed value into whatever container is now on top, or
    /// stash it as the finished top-level value if the stack is empty.
    fn place(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(OpenContainer::Object(map)) => {
                if let Some(key) = self.pending_key.take() {
                    map.insert(key, value);
                }
            }
            Some(OpenContainer::Array(vec)) => vec.push(value),
            None => self.finished = Some(value),
        }
    }

    /// The top-of-stack container, as built so far, if it is an object.
    pub fn peek_top_object(&self) -> Option<&Map<String, Value>> {
        match self.stack.last() {
            Some(OpenContainer::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// The top-of-stack container, as built so far, if it is an array.
    pub fn peek_top_array(&self) -> Option<&Vec<Value>> {
        match self.stack.last() {
            Some(OpenContainer::Array(vec)) => Some(vec),
            _ => None,
        }
    }

    /// Mutable access to the top-of-stack array, e.g. to drop its last
    /// element once a predicate rejects it.
    pub fn peek_top_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self.stack.last_mut() {
            Some(OpenContainer::Array(vec)) => Some(vec),
            _ => None,
        }
    }

    /// Drop the last element pushed onto the top-of-stack array (or entry
    /// set into the top-of-stack object with the given key), discarding it
    /// without ever placing it in the parent. Used when a built child turns
    /// out to fail a predicate only after it finished accumulating.
    pub fn drop_last_array_item(&mut self) {
        if let Some(OpenContainer::Array(vec)) = self.stack.last_mut() {
            vec.pop();
        }
    }

    /// Discard the entire container currently open at the top of the stack,
    /// without placing anything into its parent. Used to abandon a subtree
    /// mid-build once a predicate has decided to reject it (the caller must
    /// still fast-forward the underlying parser to the matching close
    /// event).
    pub fn pop_abandon(&mut self) {
        self.stack.pop();
    }

    /// Take the fully-built top-level value, if the outermost container has
    /// closed.
    pub fn take_finished(&mut self) -> Option<Value> {
        self.finished.take()
    }
}
