use std::pin::Pin;

use futures::Stream;

use crate::error::ClientError;

/// One decoded protocol unit. Produced by [`crate::sse::SseDecoder`] and
/// consumed exactly once per turn by the stream assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    Content(String),
    /// A fragment of a tool call, keyed by the provider's call index.
    ToolCall(ToolCallDelta),
    /// A generated image URL.
    Image { url: String, index: u32 },
    /// The provider's terminal marker for the current response.
    Finish(FinishReason),
    /// Token counts as reported by the provider. Only the report seen at the
    /// terminal stop is trusted downstream.
    Usage {
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: Option<u64>,
    },
    /// A record that could not be decoded; carried verbatim so the caller can
    /// log it. Never fatal.
    Malformed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;
