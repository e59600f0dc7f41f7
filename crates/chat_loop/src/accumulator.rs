//! Assembly of streamed tool-call fragments.
//!
//! Providers split a single call across many deltas keyed by index: the
//! first usually carries id and function name, later ones only argument
//! fragments. The id and name themselves may also arrive in pieces, so
//! every field is append-only.

use std::collections::BTreeMap;

use chat_core::{FunctionCall, ToolCall};
use llm_client::ToolCallDelta;

#[derive(Debug, Default)]
struct Slot {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Debug)]
pub struct ToolCallAccumulator {
    slots: BTreeMap<u32, Slot>,
    created_ms: i64,
}

impl Default for ToolCallAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            created_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Merge one delta into the slot for its index, creating the slot on
    /// first sight. Fragments are concatenated, never overwritten.
    pub fn apply(&mut self, delta: &ToolCallDelta) {
        let slot = self.slots.entry(delta.index).or_default();

        if let Some(id) = &delta.id {
            slot.id.push_str(id);
        }
        if let Some(name) = &delta.name {
            slot.name.push_str(name);
        }
        if let Some(arguments) = &delta.arguments {
            slot.arguments.push_str(arguments);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Produce complete calls in index order. Slots that never received a
    /// function name are dropped silently (a partial call the provider
    /// abandoned). A slot the provider never gave an id gets a deterministic
    /// local one for bookkeeping; it is never sent upstream in place of a
    /// provider id.
    pub fn finalize(self) -> Vec<ToolCall> {
        let created_ms = self.created_ms;
        self.slots
            .into_iter()
            .filter(|(_, slot)| !slot.name.trim().is_empty())
            .map(|(index, slot)| ToolCall {
                id: if slot.id.is_empty() {
                    format!("call_{created_ms}_{index}")
                } else {
                    slot.id
                },
                tool_type: "function".to_string(),
                function: FunctionCall {
                    name: slot.name,
                    arguments: slot.arguments,
                },
            })
            .collect()
    }
}
